//! Bounded breadth-first docs crawler.
//!
//! Starting from a root URL, the crawler fetches pages level by level up to a
//! configured depth, following `a[href]` links on the same host (external
//! hosts are opt-in). Each fetched page is rendered to pruned markdown;
//! failures are recorded per page and never abort the crawl. The combined
//! output of a crawl is a single markdown file per site.

pub mod github;
pub mod markdown;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::{stream, StreamExt};
use thiserror::Error;
use url::Url;

use self::markdown::{html_to_markdown, prune_markdown, PruneOptions};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid root URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Crawl bounds and fetch settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// How many link levels to follow below the root.
    pub max_depth: usize,
    /// Hard cap on pages fetched (root included).
    pub max_pages: usize,
    /// Follow links to other hosts.
    pub include_external: bool,
    /// Concurrent fetches per level.
    pub concurrency: usize,
    /// User-Agent for page fetches.
    pub user_agent: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_pages: 50,
            include_external: false,
            concurrency: 8,
            user_agent: crate::tools::web::DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

/// One crawled page: pruned markdown on success, an error string otherwise.
#[derive(Debug)]
pub struct CrawledPage {
    pub url: Url,
    pub depth: usize,
    pub result: Result<String, String>,
}

pub struct Crawler {
    client: reqwest::Client,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Crawl from `root`, breadth-first, within the configured bounds.
    pub async fn crawl(&self, root: &str) -> Result<Vec<CrawledPage>, CrawlError> {
        let root = normalize_url(Url::parse(root)?);

        let mut visited: HashSet<Url> = HashSet::new();
        visited.insert(root.clone());
        let mut current = vec![(root.clone(), 0usize)];
        let mut pages = Vec::new();

        while !current.is_empty() {
            let batch = std::mem::take(&mut current);
            let fetched: Vec<(Url, usize, Result<String, String>)> =
                stream::iter(batch)
                    .map(|(url, depth)| {
                        let client = self.client.clone();
                        async move {
                            let result = fetch_html(&client, &url).await;
                            (url, depth, result)
                        }
                    })
                    .buffer_unordered(self.config.concurrency)
                    .collect()
                    .await;

            let mut next = Vec::new();
            for (url, depth, result) in fetched {
                match result {
                    Ok(html) => {
                        if depth < self.config.max_depth {
                            for link in extract_links(&html, &url) {
                                if !in_scope(&link, &root, self.config.include_external) {
                                    continue;
                                }
                                if visited.len() >= self.config.max_pages {
                                    break;
                                }
                                if visited.insert(link.clone()) {
                                    next.push((link, depth + 1));
                                }
                            }
                        }

                        let md =
                            prune_markdown(&html_to_markdown(&html), &PruneOptions::default());
                        pages.push(CrawledPage {
                            url,
                            depth,
                            result: Ok(md),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Page fetch failed");
                        pages.push(CrawledPage {
                            url,
                            depth,
                            result: Err(e),
                        });
                    }
                }
            }
            current = next;
        }

        tracing::info!(pages = pages.len(), "Crawled {} pages in total", pages.len());
        Ok(pages)
    }
}

async fn fetch_html(client: &reqwest::Client, url: &Url) -> Result<String, String> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP error: {}", status));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.contains("text/html") {
        return Err(format!("unsupported content type: {}", content_type));
    }

    response.text().await.map_err(|e| e.to_string())
}

/// Strip the fragment so `#section` anchors don't look like new pages.
pub(crate) fn normalize_url(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Extract and resolve `a[href]` links, deduplicated in document order.
pub(crate) fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let selector = scraper::Selector::parse("a[href]").unwrap();
    let doc = scraper::Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let resolved = normalize_url(resolved);
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }
    links
}

/// Whether a link is eligible for the frontier.
pub(crate) fn in_scope(url: &Url, root: &Url, include_external: bool) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }
    include_external || url.host_str() == root.host_str()
}

/// Join the successful pages into one markdown file under `docs_dir`.
pub fn write_combined(
    pages: &[CrawledPage],
    docs_dir: &Path,
    domain: &str,
) -> std::io::Result<PathBuf> {
    let combined = pages
        .iter()
        .filter_map(|p| p.result.as_ref().ok())
        .filter(|md| !md.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

    std::fs::create_dir_all(docs_dir)?;
    let path = docs_dir.join(format!("{}.md", domain));
    std::fs::write(&path, combined)?;
    Ok(path)
}

/// Filesystem-friendly slug for a site's host, dots replaced by underscores.
pub fn domain_slug(url: &Url) -> String {
    url.host_str().unwrap_or("site").replace('.', "_")
}
