//! Broken-link repair for CMS content.
//!
//! The repairer walks every record of the selected apps, pulls links out of
//! the body with a [`LinkPattern`], and sorts each link into one of:
//!
//! - another host: checked, reported when broken, never rewritten
//! - present on the site: left alone
//! - missing on the site but present on the source site: downloaded into
//!   storage as a new file record and rewritten to the file's URL
//! - missing on both: reported
//!
//! Links are processed one at a time. Network failures that survive the
//! fetch client's retries are recorded in the [`RepairReport`] and the scan
//! moves on; store and storage failures end the run.

mod report;

pub use report::{AppSummary, RepairReport, ReportedLink};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use folio_core::{ContentItem, ContentKind, Error, FileRecord, MediaStorage, NewFile, Store};
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use url::Url;

use crate::fetch::{FetchClient, LinkTarget, bare_host, canonicalize, resolve_link};
use crate::links::LinkPattern;

/// Network access needed by the repairer.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    /// Whether `url` answers a `HEAD` with 200 or 304.
    async fn link_exists(&self, url: &Url) -> Result<bool, Error>;

    /// Full body of `url`.
    async fn download(&self, url: &Url) -> Result<Bytes, Error>;
}

#[async_trait]
impl LinkProbe for FetchClient {
    async fn link_exists(&self, url: &Url) -> Result<bool, Error> {
        let status = self.head_status(url).await?;
        tracing::debug!(url = %url, status = status.as_u16(), "probed link");
        Ok(matches!(status, StatusCode::OK | StatusCode::NOT_MODIFIED))
    }

    async fn download(&self, url: &Url) -> Result<Bytes, Error> {
        Ok(self.fetch(url).await?.bytes)
    }
}

/// A group of content kinds scanned together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum App {
    Articles,
    News,
    Pages,
    Jobs,
    /// Events and their speakers.
    Events,
}

impl App {
    pub const ALL: [App; 5] = [App::Articles, App::News, App::Pages, App::Jobs, App::Events];

    pub fn name(&self) -> &'static str {
        match self {
            App::Articles => "articles",
            App::News => "news",
            App::Pages => "pages",
            App::Jobs => "jobs",
            App::Events => "events",
        }
    }

    pub fn kinds(&self) -> &'static [ContentKind] {
        match self {
            App::Articles => &[ContentKind::Article],
            App::News => &[ContentKind::News],
            App::Pages => &[ContentKind::Page],
            App::Jobs => &[ContentKind::Job],
            App::Events => &[ContentKind::Event, ContentKind::Speaker],
        }
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for App {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        App::ALL
            .into_iter()
            .find(|app| app.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown app: {s}")))
    }
}

/// What happened to one link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// Not an http(s) link (mailto:, anchors, ...).
    Unsupported,
    /// Points at a third host.
    External { exists: bool },
    /// Already served by the site.
    OnSite,
    /// Copied from the source site into a new file record.
    Fetched { file: FileRecord },
    /// Missing from the site and the source.
    Broken,
}

/// Scans content for links the site lost and copies them from the source.
pub struct LinkRepairer<P> {
    store: Store,
    storage: Arc<dyn MediaStorage>,
    probe: P,
    site_url: Url,
    src_url: Url,
    pattern: LinkPattern,
    links_found: u64,
    total_count: u64,
    report: RepairReport,
}

impl<P: LinkProbe> LinkRepairer<P> {
    /// Create a repairer for `site_url`, restoring links from `src_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if either URL is not an http(s) URL with
    /// a host.
    pub fn new(
        store: Store, storage: Arc<dyn MediaStorage>, probe: P, site_url: &str, src_url: &str, pattern: LinkPattern,
    ) -> Result<Self, Error> {
        let site_url = canonicalize(site_url).map_err(|e| Error::InvalidUrl(format!("site url: {e}")))?;
        let src_url = canonicalize(src_url).map_err(|e| Error::InvalidUrl(format!("source url: {e}")))?;

        Ok(Self {
            store,
            storage,
            probe,
            site_url,
            src_url,
            pattern,
            links_found: 0,
            total_count: 0,
            report: RepairReport::default(),
        })
    }

    pub fn site_domain(&self) -> &str {
        self.site_url.host_str().unwrap_or_default()
    }

    pub fn src_domain(&self) -> &str {
        self.src_url.host_str().unwrap_or_default()
    }

    /// Links replaced so far, across all apps.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn report(&self) -> &RepairReport {
        &self.report
    }

    /// Process each app in order and hand back the accumulated report.
    pub async fn run(&mut self, apps: &[App]) -> Result<RepairReport, Error> {
        for app in apps {
            self.process_app(*app).await?;
        }
        Ok(std::mem::take(&mut self.report))
    }

    /// Scan every record of `app`, saving the records whose body changed.
    pub async fn process_app(&mut self, app: App) -> Result<AppSummary, Error> {
        let mut summary = AppSummary { app: app.name().to_string(), ..Default::default() };
        let replaced_before = self.total_count;
        let found_before = self.links_found;

        for kind in app.kinds() {
            for item in self.store.list_content(*kind).await? {
                tracing::info!(kind = %item.kind, id = item.id, title = %item.title, "processing record");
                summary.records_scanned += 1;

                let (updated, body) = self.process_content(&item.body, &item).await?;
                if updated {
                    self.store.update_content_body(item.kind, item.id, &body).await?;
                    summary.records_updated += 1;
                }
            }
        }

        summary.links_found = self.links_found - found_before;
        summary.links_replaced = self.total_count - replaced_before;
        tracing::info!(
            app = %app,
            records = summary.records_scanned,
            updated = summary.records_updated,
            replaced = summary.links_replaced,
            "finished app"
        );

        self.report.apps.push(summary.clone());
        Ok(summary)
    }

    /// Check every link in `content` and rewrite the ones copied from the
    /// source site. Returns whether anything changed, and the new content.
    pub async fn process_content(&mut self, content: &str, owner: &ContentItem) -> Result<(bool, String), Error> {
        let links: Vec<String> = self.pattern.extract_links(content).into_iter().map(str::to_string).collect();
        tracing::debug!(kind = %owner.kind, id = owner.id, matches = links.len(), "links found");
        self.links_found += links.len() as u64;

        let mut replacements: Vec<(String, String)> = Vec::new();
        for link in links {
            match self.process_link(&link, owner).await {
                Ok(LinkOutcome::Fetched { file }) => replacements.push((link, file.absolute_url())),
                Ok(_) => {}
                Err(e) if e.is_network() => {
                    tracing::warn!(link = %link, error = %e, "link check failed");
                    self.report.failed.push(reported(owner, &link, Some(e.to_string())));
                }
                Err(e) => return Err(e),
            }
        }

        if replacements.is_empty() {
            return Ok((false, content.to_string()));
        }

        // longest first so `/a` never rewrites part of `/a/b`
        replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let mut content = content.to_string();
        for (find, replace) in &replacements {
            content = content.replace(find.as_str(), replace);
        }
        tracing::info!(kind = %owner.kind, id = owner.id, count = replacements.len(), "links replaced");
        self.total_count += replacements.len() as u64;

        Ok((true, content))
    }

    /// Classify one link, copying it from the source site when the site
    /// lost it.
    pub async fn process_link(&mut self, link: &str, owner: &ContentItem) -> Result<LinkOutcome, Error> {
        let path = match resolve_link(&self.site_url, link) {
            LinkTarget::Unsupported => return Ok(LinkOutcome::Unsupported),
            LinkTarget::Relative { path } => path,
            LinkTarget::Absolute { mut url, host, path } => {
                if !self.is_known_host(&host) {
                    url.set_query(None);
                    url.set_fragment(None);
                    let exists = self.link_exists(&url).await?;
                    if !exists {
                        tracing::warn!(link = %link, "external broken link");
                        self.report.external_broken.push(reported(owner, link, None));
                    }
                    return Ok(LinkOutcome::External { exists });
                }
                path
            }
        };

        let on_site = join_path(&self.site_url, &path)?;
        if self.link_exists(&on_site).await? {
            return Ok(LinkOutcome::OnSite);
        }

        let on_src = join_path(&self.src_url, &path)?;
        if self.link_exists(&on_src).await? {
            let download = append_path(&self.src_url, &path);
            let file = self.save_file_from_url(&download, owner).await?;
            tracing::info!(link = %link, file_id = file.id, "copied from source site");
            return Ok(LinkOutcome::Fetched { file });
        }

        tracing::warn!(link = %link, "broken link, missing on both sites");
        self.report.broken.push(reported(owner, link, None));
        Ok(LinkOutcome::Broken)
    }

    /// Whether `url` answers with 200 or 304.
    pub async fn link_exists(&self, url: &Url) -> Result<bool, Error> {
        self.probe.link_exists(url).await
    }

    /// Download `url` into storage as a file attached to `owner`.
    ///
    /// The file name is the last path segment, percent-decoded, with spaces
    /// turned into underscores.
    pub async fn save_file_from_url(&self, url: &Url, owner: &ContentItem) -> Result<FileRecord, Error> {
        let name = file_name_from_url(url);
        let content = self.probe.download(url).await?;

        let key = format!("files/{}/{}/{}", owner.kind, owner.id, name);
        let mime_type = mime_guess::from_path(&name).first_or_octet_stream().to_string();
        self.storage.put(&key, &content, &mime_type).await?;

        let file = NewFile {
            name,
            path: key,
            size: content.len() as u64,
            mime_type: Some(mime_type),
            ..Default::default()
        }
        .attached_to(owner);

        self.store.insert_file(&file).await
    }

    fn is_known_host(&self, host: &str) -> bool {
        let host = bare_host(host);
        host == bare_host(self.site_domain()) || host == bare_host(self.src_domain())
    }
}

fn reported(owner: &ContentItem, link: &str, error: Option<String>) -> ReportedLink {
    ReportedLink { kind: owner.kind, id: owner.id, link: link.to_string(), error }
}

fn join_path(base: &Url, path: &str) -> Result<Url, Error> {
    base.join(path).map_err(|e| Error::InvalidUrl(format!("{base} + {path}: {e}")))
}

/// `base` with `path` appended to its own path, so a source site mounted
/// under `/legacy` serves `/images/a.gif` from `/legacy/images/a.gif`.
fn append_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn file_name_from_url(url: &Url) -> String {
    let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
    let name = decoded.rsplit('/').next().unwrap_or_default().replace(' ', "_");
    if name.is_empty() || name == "." || name == ".." { "download".to_string() } else { name }
}
