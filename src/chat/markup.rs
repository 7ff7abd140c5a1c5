//! Inline markup used in bot and error messages.
//!
//! Only `<b>`/`<strong>`, `<i>`/`<em>`, `<br>` and `<a href>` are understood.
//! Every other tag is dropped (its text is kept).

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)([^>]*)>").expect("valid tag regex"));

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']*)["']"#).expect("valid href regex")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("valid link regex")
});

/// Render markup as terminal text.
pub fn to_plain(markup: &str) -> String {
    let linked = LINK.replace_all(markup, "$2 ($1)");
    let rendered = TAG.replace_all(&linked, |caps: &Captures| {
        match caps[2].to_ascii_lowercase().as_str() {
            "br" => "\n",
            "b" | "strong" => "**",
            "i" | "em" => "_",
            _ => "",
        }
    });
    decode_entities(&rendered)
}

/// Render markup as sanitised HTML.
///
/// The markup is split into tags and the text between them. Text is always
/// escaped and only allow-listed tags are rebuilt, so dropping a tag can never
/// splice its neighbours into a new one.
pub fn to_html(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for caps in TAG.captures_iter(markup) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        out.push_str(&escape_text(&markup[last..tag.start()]));
        out.push_str(&allowed_tag(&caps));
        last = tag.end();
    }
    out.push_str(&escape_text(&markup[last..]));
    out
}

fn allowed_tag(caps: &Captures) -> String {
    let closing = !caps[1].is_empty();
    let name = caps[2].to_ascii_lowercase();
    match (name.as_str(), closing) {
        ("br", _) => "<br>".to_string(),
        ("b" | "strong" | "i" | "em", false) => format!("<{name}>"),
        ("b" | "strong" | "i" | "em" | "a", true) => format!("</{name}>"),
        ("a", false) => match HREF.captures(&caps[3]) {
            Some(href) if is_web_url(&href[1]) => format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">",
                escape_html(&decode_entities(&href[1]))
            ),
            _ => "<a>".to_string(),
        },
        _ => String::new(),
    }
}

/// Markup text may already carry entities; decode first so they are not
/// escaped twice.
fn escape_text(text: &str) -> String {
    escape_html(&decode_entities(text))
}

/// Escape text so it is shown literally inside HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn is_web_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
