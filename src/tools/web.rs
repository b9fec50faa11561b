//! Web access tools: fetch pages and search the web.

use std::path::Path;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value};

use super::Tool;
use crate::crawler::markdown::html_to_markdown;
use crate::search;

/// Default User-Agent for tool-initiated fetches.
pub const DEFAULT_USER_AGENT: &str =
    concat!("agent-relay/", env!("CARGO_PKG_VERSION"), " (web, cli, and code agent)");

const FETCH_TIMEOUT_SECS: u64 = 10;
const MAX_OUTPUT_CHARS: usize = 20_000;

/// Fetch a web page, optionally extracting content with a CSS selector.
pub struct BrowsePage {
    user_agent: String,
}

impl Default for BrowsePage {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait]
impl Tool for BrowsePage {
    fn name(&self) -> &str {
        "browse_page"
    }

    fn description(&self) -> &str {
        "Fetch a webpage and return its title, final URL, and readable content. Pass a CSS selector to extract specific elements instead."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to browse"
                },
                "selector": {
                    "type": "string",
                    "description": "Optional CSS selector to extract specific content"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'url' argument"))?;
        let selector = args["selector"].as_str().map(|s| s.to_string());

        tracing::info!(url = %url, "Browsing URL");

        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();
        let body = response.text().await?;

        if let Some(selector) = selector {
            let selected = select_content(&body, &selector)
                .map_err(|e| anyhow::anyhow!("Invalid selector '{}': {}", selector, e))?;
            if selected.is_empty() {
                return Ok(format!("No elements matched selector: {}", selector));
            }
            let listing = selected
                .iter()
                .enumerate()
                .map(|(i, text)| format!("[{}] {}", i + 1, text))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(truncate_output(listing));
        }

        let mut result = String::new();
        if content_type.contains("text/html") {
            if let Some(title) = page_title(&body) {
                result.push_str(&format!("Title: {}\n", title));
            }
            result.push_str(&format!("URL: {}\n\n", final_url));
            result.push_str(&html_to_markdown(&body));
        } else {
            result.push_str(&format!("URL: {}\n\n", final_url));
            result.push_str(&body);
        }

        Ok(truncate_output(result))
    }
}

/// Extract the text of elements matching a CSS selector.
///
/// Returns an error string for an unparsable selector.
fn select_content(html: &str, selector: &str) -> Result<Vec<String>, String> {
    let selector = Selector::parse(selector).map_err(|e| e.to_string())?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&selector)
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join("")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect())
}

/// Extract the page title, if any.
fn page_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let doc = Html::parse_document(html);
    let title = doc
        .select(&selector)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join("");
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn truncate_output(s: String) -> String {
    if s.len() <= MAX_OUTPUT_CHARS {
        return s;
    }
    let mut end = MAX_OUTPUT_CHARS;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... [content truncated, showing first {} chars]",
        &s[..end],
        end
    )
}

/// Search the web via DuckDuckGo's HTML endpoint.
pub struct WebSearch {
    user_agent: String,
}

impl Default for WebSearch {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns search results with titles, snippets, and URLs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let num_results = args["num_results"].as_u64().unwrap_or(5) as usize;

        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        let results = search::search(&client, query, num_results).await?;

        if results.is_empty() {
            return Ok(format!("No results found for: {}", query));
        }

        Ok(results
            .iter()
            .map(|r| format!("**{}**\n{}\nURL: {}", r.title, r.snippet, r.url))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>  Example Page </title></head>
          <body>
            <h1>Heading</h1>
            <div class="item">first <b>thing</b></div>
            <div class="item">second thing</div>
            <div class="other">ignored</div>
          </body>
        </html>
    "#;

    #[test]
    fn selector_extracts_matching_text() {
        let selected = select_content(PAGE, ".item").unwrap();
        assert_eq!(selected, vec!["first thing", "second thing"]);
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(select_content(PAGE, "[[[").is_err());
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(page_title(PAGE).as_deref(), Some("Example Page"));
        assert_eq!(page_title("<html><body>no title</body></html>"), None);
    }

    #[test]
    fn truncation_is_bounded() {
        let long = "x".repeat(MAX_OUTPUT_CHARS + 100);
        let out = truncate_output(long);
        assert!(out.len() < MAX_OUTPUT_CHARS + 100);
        assert!(out.ends_with("chars]"));
    }
}
