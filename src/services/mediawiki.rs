//! Page lookup through the MediaWiki action API.

use super::{PageLookup, ServiceError, classify};
use crate::utils::SiteConfig;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The API rejects more ids than this in one request
const MAX_IDS_PER_REQUEST: usize = 50;

const CATEGORY_NAMESPACE: i64 = 14;

pub struct MediaWikiPages {
    client: Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Deserialize)]
struct ApiPage {
    #[serde(default)]
    pageid: Option<u64>,
    #[serde(default)]
    ns: i64,
    title: String,
    #[serde(default)]
    missing: bool,
}

impl MediaWikiPages {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Title without its namespace prefix for category pages
fn page_title(page: &ApiPage) -> String {
    if page.ns == CATEGORY_NAMESPACE
        && let Some((_, name)) = page.title.split_once(':')
    {
        return name.to_string();
    }
    page.title.clone()
}

impl PageLookup for MediaWikiPages {
    fn titles_by_id(&self, site: &SiteConfig, ids: &[u64]) -> Result<Vec<(u64, String)>, ServiceError> {
        let Some(endpoint) = &site.api_endpoint else {
            return Err(ServiceError::NotConfigured(site.name.clone()));
        };

        let mut titles = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let pageids = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join("|");
            debug!(site = %site.name, %pageids, "page id lookup");

            let response = self
                .client
                .get(endpoint)
                .query(&[
                    ("action", "query"),
                    ("format", "json"),
                    ("formatversion", "2"),
                    ("pageids", pageids.as_str()),
                ])
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| classify(e, self.timeout))?;

            let body: ApiResponse = response.json().map_err(|e| classify(e, self.timeout))?;
            for page in body.query.map(|q| q.pages).unwrap_or_default() {
                if page.missing {
                    continue;
                }
                if let Some(id) = page.pageid {
                    titles.push((id, page_title(&page)));
                }
            }
        }
        Ok(titles)
    }
}
