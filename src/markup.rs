//! Markup renderer for reply text.
//!
//! Splits a reply into plain text, `**bold**` spans and bare link tokens so a
//! channel can style them. Links are never written as `[text](url)` in the
//! reply itself; their display label is derived here from the href.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^*]+)\*\*|((?:https?://|mailto:|tel:)\S+)").expect("invalid markup regex")
});

/// Characters stripped from the end of a link token (sentence punctuation).
const LINK_TRAILING: &[char] = &['.', ',', ';', ')'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Bold(String),
    Link { href: String, label: String },
}

/// Split `text` into renderable segments. Adjacent plain text is merged.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut out, &text[last..whole.start()]);

        if let Some(bold) = caps.get(1) {
            out.push(Segment::Bold(bold.as_str().to_string()));
        } else if let Some(link) = caps.get(2) {
            let raw = link.as_str();
            let href = raw.trim_end_matches(LINK_TRAILING);
            out.push(Segment::Link {
                href: href.to_string(),
                label: link_label(href),
            });
            push_text(&mut out, &raw[href.len()..]);
        }
        last = whole.end();
    }
    push_text(&mut out, &text[last..]);
    out
}

fn push_text(out: &mut Vec<Segment>, s: &str) {
    if s.is_empty() {
        return;
    }
    if let Some(Segment::Text(prev)) = out.last_mut() {
        prev.push_str(s);
    } else {
        out.push(Segment::Text(s.to_string()));
    }
}

/// Display label for a link href.
pub fn link_label(href: &str) -> String {
    if let Some(addr) = href.strip_prefix("mailto:") {
        return addr.to_string();
    }
    if let Some(number) = href.strip_prefix("tel:") {
        return number.to_string();
    }
    let lower = href.to_lowercase();
    if lower.contains("github.com") {
        "GitHub".to_string()
    } else if lower.contains("linkedin.com") {
        "LinkedIn".to_string()
    } else if lower.contains("vercel.app") {
        "View on Vercel".to_string()
    } else {
        href.trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string()
    }
}

/// Render segments for a plain terminal: bold as-is, links as `label <href>`
/// unless the label already is the href.
pub fn to_plain(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Text(t) => out.push_str(t),
            Segment::Bold(b) => out.push_str(b),
            Segment::Link { href, label } => {
                if href.ends_with(label.as_str()) {
                    out.push_str(href);
                } else {
                    out.push_str(&format!("{label} <{href}>"));
                }
            }
        }
    }
    out
}
