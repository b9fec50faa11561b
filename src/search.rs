//! Web search via DuckDuckGo's HTML endpoint.
//!
//! No API key required: this fetches the plain-HTML results page and parses
//! the `.result` blocks. DDG wraps result links in a `/l/?uddg=…` redirect;
//! those are decoded back to the target URL.

use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Search the web, returning up to `limit` results.
pub async fn search(
    client: &reqwest::Client,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    tracing::info!(query = %query, "Searching the web");

    let url = format!(
        "https://html.duckduckgo.com/html/?q={}",
        urlencoding::encode(query)
    );
    let response = client.get(&url).send().await?.error_for_status()?;
    let html = response.text().await?;

    Ok(extract_results(&html, limit))
}

/// Parse search results out of a DDG HTML results page.
pub fn extract_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let result_sel = Selector::parse(".result").unwrap();
    let title_sel = Selector::parse(".result__a").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();

    let doc = Html::parse_document(html);
    let mut results = Vec::new();

    for block in doc.select(&result_sel) {
        if results.len() >= limit {
            break;
        }

        let Some(anchor) = block.select(&title_sel).next() else {
            continue;
        };

        let title = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(""));
        if title.is_empty() {
            continue;
        }

        let url = anchor
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();

        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join("")))
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }

    results
}

/// Decode DDG's `/l/?uddg=<encoded>` redirect links to the target URL.
fn resolve_redirect(href: &str) -> String {
    // Protocol-relative links need a scheme before Url::parse will accept them.
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(parsed) = url::Url::parse(&absolute) {
        if parsed.path() == "/l/" {
            if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
                return target.into_owned();
            }
        }
    }

    absolute
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="result">
            <h2 class="result__title">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fdocs&amp;rut=abc">Example Docs</a>
            </h2>
            <a class="result__snippet">Documentation   for the
              example project.</a>
          </div>
          <div class="result">
            <h2 class="result__title">
              <a class="result__a" href="https://direct.example.org/page">Direct Result</a>
            </h2>
          </div>
          <div class="result">
            <h2 class="result__title"><a class="result__a" href="https://third.example.org"> Third </a></h2>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_title_snippet_and_decoded_url() {
        let results = extract_results(RESULTS_PAGE, 5);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Example Docs");
        assert_eq!(results[0].url, "https://example.com/docs");
        assert_eq!(results[0].snippet, "Documentation for the example project.");
    }

    #[test]
    fn direct_links_pass_through() {
        let results = extract_results(RESULTS_PAGE, 5);
        assert_eq!(results[1].url, "https://direct.example.org/page");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn limit_caps_results() {
        let results = extract_results(RESULTS_PAGE, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn empty_page_yields_no_results() {
        assert!(extract_results("<html><body></body></html>", 5).is_empty());
    }
}
