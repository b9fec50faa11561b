//! HTML to markdown rendering and content pruning.
//!
//! The renderer walks the DOM and emits block-level markdown (headings,
//! paragraphs, lists, fenced code, quotes) with inline links, code, and
//! emphasis. Page chrome (scripts, styles, navigation, forms) is skipped
//! during rendering; `prune_markdown` then drops the low-value text blocks
//! that survive, such as link farms and stub lines.

use scraper::{ElementRef, Html, Selector};

/// Tags whose content never reaches the output.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "nav", "footer",
    "aside", "form", "button", "select", "input", "label", "head", "link", "meta", "title",
];

/// Tags that start a new block; containers holding none of these render
/// their inline content as a single paragraph.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

/// Render an HTML document as markdown.
pub fn html_to_markdown(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body_sel = Selector::parse("body").unwrap();
    let root = doc
        .select(&body_sel)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut blocks = Vec::new();
    render_blocks(root, &mut blocks);
    blocks.retain(|b| !b.trim().is_empty());
    blocks.join("\n\n")
}

fn render_blocks(el: ElementRef, blocks: &mut Vec<String>) {
    let name = el.value().name();
    if SKIP_TAGS.contains(&name) {
        return;
    }

    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: usize = name[1..].parse().unwrap_or(1);
            let text = inline_text(el);
            if !text.is_empty() {
                blocks.push(format!("{} {}", "#".repeat(level), text));
            }
        }
        "p" => {
            let text = inline_text(el);
            if !text.is_empty() {
                blocks.push(text);
            }
        }
        "ul" | "ol" => {
            let rendered = render_list(el, name == "ol");
            if !rendered.is_empty() {
                blocks.push(rendered);
            }
        }
        "pre" => {
            let code: String = el.text().collect();
            let code = code.trim_matches('\n');
            if !code.is_empty() {
                blocks.push(format!("```\n{}\n```", code));
            }
        }
        "blockquote" => {
            let text = inline_text(el);
            if !text.is_empty() {
                blocks.push(format!("> {}", text));
            }
        }
        "hr" => blocks.push("---".to_string()),
        _ => {
            if has_block_child(el) {
                for child in el.children() {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        render_blocks(child_el, blocks);
                    }
                }
            } else {
                let text = inline_text(el);
                if !text.is_empty() {
                    blocks.push(text);
                }
            }
        }
    }
}

fn has_block_child(el: ElementRef) -> bool {
    el.children().any(|c| {
        ElementRef::wrap(c)
            .map(|e| BLOCK_TAGS.contains(&e.value().name()))
            .unwrap_or(false)
    })
}

fn render_list(el: ElementRef, ordered: bool) -> String {
    let mut items = Vec::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == "li" {
                let text = inline_text(child_el);
                if !text.is_empty() {
                    items.push(text);
                }
            }
        }
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if ordered {
                format!("{}. {}", i + 1, item)
            } else {
                format!("- {}", item)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the inline content of an element, whitespace-collapsed.
fn inline_text(el: ElementRef) -> String {
    let mut out = String::new();
    inline_children(el, &mut out);
    collapse(&out)
}

fn inline_children(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_el.value().name();
        if SKIP_TAGS.contains(&name) {
            continue;
        }
        match name {
            "a" => {
                let mut label = String::new();
                inline_children(child_el, &mut label);
                let label = collapse(&label);
                match child_el.value().attr("href") {
                    Some(href) if !label.is_empty() => {
                        out.push_str(&format!("[{}]({})", label, href));
                    }
                    _ => out.push_str(&label),
                }
            }
            "code" => {
                let mut text = String::new();
                inline_children(child_el, &mut text);
                let text = collapse(&text);
                if !text.is_empty() {
                    out.push_str(&format!("`{}`", text));
                }
            }
            "strong" | "b" => {
                let mut text = String::new();
                inline_children(child_el, &mut text);
                let text = collapse(&text);
                if !text.is_empty() {
                    out.push_str(&format!("**{}**", text));
                }
            }
            "em" | "i" => {
                let mut text = String::new();
                inline_children(child_el, &mut text);
                let text = collapse(&text);
                if !text.is_empty() {
                    out.push_str(&format!("*{}*", text));
                }
            }
            "br" => out.push(' '),
            _ => inline_children(child_el, out),
        }
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Thresholds for dropping low-value markdown blocks.
#[derive(Debug, Clone)]
pub struct PruneOptions {
    /// Minimum words for a text block to survive.
    pub min_words: usize,
    /// Maximum share of a block's characters that may sit inside links.
    pub max_link_density: f64,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            min_words: 4,
            max_link_density: 0.5,
        }
    }
}

/// Drop low-value blocks from rendered markdown.
///
/// Headings and code fences always survive; other blocks must carry enough
/// words and not be dominated by link text.
pub fn prune_markdown(markdown: &str, options: &PruneOptions) -> String {
    markdown
        .split("\n\n")
        .filter(|block| keep_block(block, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn keep_block(block: &str, options: &PruneOptions) -> bool {
    let trimmed = block.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('#') || trimmed.starts_with("```") {
        return true;
    }

    let (link_chars, total_chars) = link_stats(trimmed);
    if total_chars > 0 && link_chars as f64 / total_chars as f64 > options.max_link_density {
        return false;
    }

    trimmed.split_whitespace().count() >= options.min_words
}

/// Count characters inside `[label](url)` spans vs. the whole block.
fn link_stats(s: &str) -> (usize, usize) {
    let total = s.chars().count();
    let mut link = 0;
    let mut rest = s;

    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let Some(close) = after.find(']') else { break };
        let following = &after[close + 1..];
        if let Some(stripped) = following.strip_prefix('(') {
            if let Some(end) = stripped.find(')') {
                link += after[..close].chars().count() + stripped[..end].chars().count();
                rest = &stripped[end + 1..];
                continue;
            }
        }
        rest = following;
    }

    (link, total)
}
