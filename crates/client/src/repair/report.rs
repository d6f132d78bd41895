//! Structured results of a link repair run.

use folio_core::ContentKind;
use serde::{Deserialize, Serialize};

/// A link reported by the repairer, with the record it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedLink {
    pub kind: ContentKind,
    pub id: i64,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counters for one app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub app: String,
    pub records_scanned: u64,
    pub records_updated: u64,
    pub links_found: u64,
    pub links_replaced: u64,
}

/// Everything a run found, for printing or JSON output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub apps: Vec<AppSummary>,
    /// Links to other hosts that did not answer 200 or 304.
    pub external_broken: Vec<ReportedLink>,
    /// Links missing from both the site and the source.
    pub broken: Vec<ReportedLink>,
    /// Links whose check or download failed after retries.
    pub failed: Vec<ReportedLink>,
}

impl RepairReport {
    pub fn total_replaced(&self) -> u64 {
        self.apps.iter().map(|a| a.links_replaced).sum()
    }

    pub fn has_problems(&self) -> bool {
        !(self.external_broken.is_empty() && self.broken.is_empty() && self.failed.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let report = RepairReport {
            apps: vec![
                AppSummary { app: "articles".into(), links_replaced: 2, ..Default::default() },
                AppSummary { app: "pages".into(), links_replaced: 3, ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(report.total_replaced(), 5);
        assert!(!report.has_problems());
    }

    #[test]
    fn test_json_omits_empty_error() {
        let link = ReportedLink { kind: ContentKind::Page, id: 1, link: "/x".into(), error: None };
        let json = serde_json::to_string(&link).unwrap();
        assert_eq!(json, r#"{"kind":"page","id":1,"link":"/x"}"#);
    }
}
