use anyhow::Result;
use folio_client::{App, FetchClient, FetchConfig, LinkPattern, LinkRepairer, RepairReport};
use folio_core::{AppConfig, storage};

pub struct RepairArgs {
    pub site_url: String,
    pub src_url: String,
    pub apps: Vec<App>,
    pub pattern: Option<String>,
    pub json: bool,
}

pub async fn run(config: &AppConfig, args: RepairArgs) -> Result<()> {
    let store = super::open_store(config).await?;
    let storage = storage::from_config(config).await?;
    let probe = FetchClient::new(FetchConfig::from(config))?;
    let pattern = match &args.pattern {
        Some(pattern) => LinkPattern::new(pattern)?,
        None => LinkPattern::default(),
    };
    let apps = if args.apps.is_empty() { App::ALL.to_vec() } else { args.apps };

    let mut repairer = LinkRepairer::new(store, storage, probe, &args.site_url, &args.src_url, pattern)?;
    tracing::info!(site = repairer.site_domain(), source = repairer.src_domain(), "repairing links");

    let report = repairer.run(&apps).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn render_report(report: &RepairReport) -> String {
    let mut out = String::new();
    for app in &report.apps {
        out.push_str(&format!(
            "{}: {} records, {} updated, {} links, {} replaced\n",
            app.app, app.records_scanned, app.records_updated, app.links_found, app.links_replaced
        ));
    }
    let sections = [
        ("External broken links", &report.external_broken),
        ("Broken on both sites", &report.broken),
        ("Failed checks", &report.failed),
    ];
    for (title, links) in sections {
        if links.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:\n"));
        for link in links {
            out.push_str(&format!("  {} {}: {}", link.kind, link.id, link.link));
            if let Some(error) = &link.error {
                out.push_str(&format!(" ({error})"));
            }
            out.push('\n');
        }
    }
    out.push_str(&format!("\nTotal links replaced: {}\n", report.total_replaced()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_client::repair::{AppSummary, ReportedLink};
    use folio_core::ContentKind;

    #[test]
    fn test_render_report() {
        let report = RepairReport {
            apps: vec![AppSummary {
                app: "pages".into(),
                records_scanned: 3,
                records_updated: 1,
                links_found: 5,
                links_replaced: 2,
            }],
            external_broken: vec![],
            broken: vec![ReportedLink { kind: ContentKind::Page, id: 7, link: "/old.pdf".into(), error: None }],
            failed: vec![],
        };

        let text = render_report(&report);

        assert!(text.starts_with("pages: 3 records, 1 updated, 5 links, 2 replaced\n"));
        assert!(text.contains("Broken on both sites:\n  page 7: /old.pdf\n"));
        assert!(!text.contains("External broken links"));
        assert!(text.ends_with("Total links replaced: 2\n"));
    }
}
