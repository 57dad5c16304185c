//! Content extraction and normalization
//!
//! Turns an [`Item`] into the normalized text artifact that gets uploaded:
//! title heading, optional metadata block, optional excerpt, the markup-
//! stripped and word-limited body, optional taxonomy block, and a trailing
//! canonical-link reference.
//!
//! An item whose body normalizes to nothing yields an empty string, which
//! callers treat as a hard skip.

use crate::config::ExportSettings;
use crate::content::{kind_label, Item};
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

/// Marker appended when a body is cut at the word cap
const TRUNCATION_MARKER: &str = "*[Content truncated]*";

/// Word count used for generated link descriptions
const SUMMARY_WORDS: usize = 30;

/// Extracts the normalized text artifact for one item
///
/// Returns an empty string when the item has no processable body; the
/// caller skips such items without treating them as errors.
pub fn extract_content(item: &Item, options: &ExportSettings) -> String {
    let body = normalize_body(&item.body, options.max_words as usize);
    if body.is_empty() {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("# {}", item.title));

    if options.include_meta {
        parts.push(meta_block(item));
    }

    if let Some(excerpt) = item.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
        parts.push(format!("> {}", excerpt.trim()));
    }

    parts.push(body);

    if options.include_taxonomies {
        if let Some(block) = taxonomy_block(item) {
            parts.push(block);
        }
    }

    parts.push(format!("---\n**Original URL:** {}", item.permalink));

    parts.join("\n\n")
}

/// Produces a short plain-text summary of a raw body, for link descriptions
pub fn summarize_body(body: &str) -> String {
    let text = normalize_whitespace(&strip_markup(body));
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= SUMMARY_WORDS {
        words.join(" ")
    } else {
        format!("{}…", words[..SUMMARY_WORDS].join(" "))
    }
}

fn normalize_body(raw: &str, max_words: usize) -> String {
    let stripped = strip_markup(raw);
    let normalized = normalize_whitespace(&stripped);
    if normalized.is_empty() {
        return String::new();
    }
    limit_words(&normalized, max_words)
}

/// Strips markup while preserving light markdown structure
fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    render_children(fragment.tree.root())
}

fn render_children(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    for child in node.children() {
        render_node(child, &mut out);
    }
    out
}

fn render_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            let name = element.name();
            match name {
                "script" | "style" | "noscript" | "template" => {}
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = name[1..].parse::<usize>().unwrap_or(1);
                    let inner = render_children(node);
                    out.push_str("\n\n");
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    out.push_str(inner.trim());
                    out.push_str("\n\n");
                }
                "p" => {
                    out.push_str(&render_children(node));
                    out.push_str("\n\n");
                }
                "br" => out.push('\n'),
                "strong" | "b" => {
                    let inner = render_children(node);
                    out.push_str(&format!("**{}**", inner.trim()));
                }
                "em" | "i" => {
                    let inner = render_children(node);
                    out.push_str(&format!("*{}*", inner.trim()));
                }
                "a" => {
                    let inner = render_children(node);
                    match element.attr("href") {
                        Some(href) if !href.starts_with('#') && !href.starts_with("javascript:") => {
                            out.push_str(&format!("[{}]({})", inner.trim(), href));
                        }
                        _ => out.push_str(&inner),
                    }
                }
                "li" => {
                    let inner = render_children(node);
                    out.push_str("- ");
                    out.push_str(inner.trim());
                    out.push('\n');
                }
                "ul" | "ol" => {
                    out.push('\n');
                    out.push_str(&render_children(node));
                    out.push('\n');
                }
                _ => out.push_str(&render_children(node)),
            }
        }
        _ => {}
    }
}

/// Collapses runs of spaces and tabs, trims lines, and caps consecutive
/// blank lines at one
fn normalize_whitespace(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in content.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(collapsed);
    }

    lines.join("\n").trim().to_string()
}

/// Word-limits content with sentence-boundary-aware truncation
///
/// When the body exceeds the cap, the cut point is the sentence-ending word
/// closest to the cap within the window [80% of cap, 120% of cap]; with no
/// boundary in that window the cut lands exactly on the cap.
fn limit_words(content: &str, max_words: usize) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.len() <= max_words {
        return content.to_string();
    }

    let lower = (max_words * 4) / 5;
    let upper = ((max_words * 6) / 5).min(words.len());

    let mut cut = max_words;
    let mut best_distance = usize::MAX;
    for (index, word) in words.iter().enumerate().take(upper).skip(lower) {
        if ends_sentence(word) {
            let count = index + 1;
            let distance = count.abs_diff(max_words);
            if distance < best_distance {
                best_distance = distance;
                cut = count;
            }
        }
    }

    let mut truncated = words[..cut].join(" ");
    truncated.push_str("\n\n");
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

fn ends_sentence(word: &str) -> bool {
    let trimmed = word.trim_end_matches(['"', '\'', ')', ']', '*']);
    trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?')
}

fn meta_block(item: &Item) -> String {
    let date = item
        .published_at
        .split('T')
        .next()
        .unwrap_or(&item.published_at);

    let mut parts = vec![format!("**Published:** {}", date)];
    if let Some(author) = item.author.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("**Author:** {}", author));
    }
    parts.push(format!("**Type:** {}", kind_label(&item.kind)));
    parts.join(" | ")
}

fn taxonomy_block(item: &Item) -> Option<String> {
    let entries: Vec<String> = item
        .taxonomies
        .iter()
        .filter(|(_, terms)| !terms.is_empty())
        .map(|(label, terms)| format!("**{}:** {}", label, terms.join(", ")))
        .collect();

    if entries.is_empty() {
        return None;
    }

    Some(format!("## Taxonomies\n\n{}", entries.join("\n")))
}
