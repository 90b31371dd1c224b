//! Post-render pass over rendered Markdown HTML.
//!
//! Runs after every rich render, so every step is idempotent:
//! `enhance(&enhance(html)) == enhance(html)`.

use once_cell::sync::Lazy;
use regex::{ Captures, Regex };

const COPY_BUTTON_MARKER: &str = "class=\"copy-btn\"";
const COPY_BUTTON: &str =
    "<button class=\"copy-btn\" type=\"button\" style=\"float:right; cursor:pointer; font-size:11px; padding:3px 8px; border-radius:4px; border:none; background:rgba(255,255,255,0.2); color:inherit;\">Copy Code</button>";

const PARAGRAPH_STYLE: &str = "margin-bottom: 1.5rem; line-height: 1.7; display: block;";
const HEADING_STYLE: &str = "margin-top: 1.5rem; margin-bottom: 0.8rem; font-weight: bold; display: block;";
const LIST_STYLE: &str = "margin-bottom: 1.5rem; padding-left: 1.5rem; display: block;";
const LIST_ITEM_STYLE: &str = "margin-bottom: 0.6rem; line-height: 1.6; display: list-item;";
const CODE_BLOCK_STYLE: &str =
    "background: rgba(0,0,0,0.2); padding: 15px; border-radius: 8px; overflow-x: auto; clear: both; margin: 10px 0;";

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").unwrap()
});

static MATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\$\$(.+?)\$\$|\$([^$\n]+?)\$").unwrap()
});

static BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(p|h[1-3]|ul|ol|li|pre)((?:\s+[a-zA-Z-]+="[^"]*")*)\s*>"#).unwrap()
});

static ATTR: Lazy<Regex> = Lazy::new(|| { Regex::new(r#"\s+([a-zA-Z-]+)="([^"]*)""#).unwrap() });

static PRE_OPEN: Lazy<Regex> = Lazy::new(|| { Regex::new(r"<pre(?:\s[^>]*)?>").unwrap() });

static PRE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<pre(?:\s[^>]*)?>(.*?)</pre>").unwrap()
});

static CODE_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<code(?:\s[^>]*)?>(.*?)</code>").unwrap()
});

pub fn enhance(html: &str) -> String {
    attach_copy_buttons(&apply_spacing(&typeset_math(html)))
}

/// `$$…$$` becomes display math, `$…$` inline math. Text inside `pre`,
/// `code` and already typeset spans is left alone.
pub fn typeset_math(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut raw_depth = 0usize;
    let mut spans: Vec<bool> = Vec::new();
    let mut last = 0;

    for tag in TAG.captures_iter(html) {
        let Some(whole) = tag.get(0) else {
            continue;
        };
        let typeset = raw_depth == 0 && !spans.contains(&true);
        push_text(&mut out, &html[last..whole.start()], typeset);
        out.push_str(whole.as_str());
        last = whole.end();

        let closing = &tag[1] == "/";
        match tag[2].to_ascii_lowercase().as_str() {
            "pre" | "code" => {
                if closing {
                    raw_depth = raw_depth.saturating_sub(1);
                } else {
                    raw_depth += 1;
                }
            }
            "span" => {
                if closing {
                    spans.pop();
                } else {
                    spans.push(tag[3].contains("class=\"math "));
                }
            }
            _ => {}
        }
    }

    let typeset = raw_depth == 0 && !spans.contains(&true);
    push_text(&mut out, &html[last..], typeset);
    out
}

fn push_text(out: &mut String, text: &str, typeset: bool) {
    if !typeset || !text.contains('$') {
        out.push_str(text);
        return;
    }
    let replaced = MATH.replace_all(text, |caps: &Captures| {
        match (caps.get(1), caps.get(2)) {
            (Some(display), _) =>
                format!("<span class=\"math math-display\">{}</span>", display.as_str().trim()),
            (None, Some(inline)) =>
                format!("<span class=\"math math-inline\">{}</span>", inline.as_str().trim()),
            (None, None) => caps[0].to_string(),
        }
    });
    out.push_str(&replaced);
}

fn spacing_for(tag: &str) -> &'static str {
    match tag {
        "p" => PARAGRAPH_STYLE,
        "ul" | "ol" => LIST_STYLE,
        "li" => LIST_ITEM_STYLE,
        "pre" => CODE_BLOCK_STYLE,
        _ => HEADING_STYLE,
    }
}

/// Sets the presentation style of block elements by type, replacing any
/// style already present.
pub fn apply_spacing(html: &str) -> String {
    BLOCK_OPEN.replace_all(html, |caps: &Captures| {
        let tag = &caps[1];
        let attrs: String = ATTR.captures_iter(&caps[2])
            .filter(|attr| &attr[1] != "style")
            .map(|attr| format!(" {}=\"{}\"", &attr[1], &attr[2]))
            .collect();
        format!("<{}{} style=\"{}\">", tag, attrs, spacing_for(tag))
    }).into_owned()
}

/// Prepends one copy button to every code block that does not have one yet.
pub fn attach_copy_buttons(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = PRE_OPEN.find(rest) {
        let (head, body) = rest.split_at(open.end());
        out.push_str(head);
        let body_end = body.find("</pre>").unwrap_or(body.len());
        if !body[..body_end].contains(COPY_BUTTON_MARKER) {
            out.push_str(COPY_BUTTON);
        }
        rest = body;
    }

    out.push_str(rest);
    out
}

/// Text a copy button puts on the clipboard, one entry per code block.
pub fn code_blocks(html: &str) -> Vec<String> {
    PRE_BLOCK.captures_iter(html)
        .map(|block| {
            let body = &block[1];
            let inner = match CODE_BODY.captures(body) {
                Some(code) => code[1].to_string(),
                None => body.replace(COPY_BUTTON, ""),
            };
            unescape(&TAG.replace_all(&inner, ""))
        })
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::clipboard::COPY_LABEL;
    use crate::render::markdown::to_html;
    use pretty_assertions::assert_eq;

    const DOC: &str =
        "# Title\n\nEuler: $e^{i\\pi} + 1 = 0$\n\n$$\\int_0^1 x dx$$\n\n1. one\n2. two\n\n```rust\nlet a = \"$x$\" < 1;\n```\n";

    #[test]
    fn test_enhance_is_a_fixed_point() {
        let once = enhance(&to_html(DOC));
        assert_eq!(enhance(&once), once);
    }

    #[test]
    fn test_code_block_gets_exactly_one_button() {
        let html = to_html("```\ncode\n```\n\ntext\n\n```\nmore\n```");
        let twice = enhance(&enhance(&html));
        assert_eq!(twice.matches(COPY_BUTTON_MARKER).count(), 2);
        assert!(twice.contains(&format!(">{}</button>", COPY_LABEL)));
    }

    #[test]
    fn test_math_is_typeset_outside_code() {
        let html = enhance(&to_html(DOC));
        assert!(html.contains("<span class=\"math math-inline\">e^{i\\pi} + 1 = 0</span>"), "{}", html);
        assert!(html.contains("<span class=\"math math-display\">\\int_0^1 x dx</span>"), "{}", html);
        // the dollar signs inside the fenced block are untouched
        assert!(html.contains("$x$"), "{}", html);
        assert_eq!(html.matches("class=\"math ").count(), 2);
    }

    #[test]
    fn test_inline_code_is_not_typeset() {
        let html = enhance(&to_html("costs `$5 and $6` today"));
        assert!(!html.contains("math-inline"), "{}", html);
    }

    #[test]
    fn test_spacing_applied_by_element_type() {
        let html = apply_spacing("<h2>T</h2><p>x</p><ol start=\"3\"><li>a</li></ol><h4>n</h4>");
        assert_eq!(
            html,
            format!(
                "<h2 style=\"{h}\">T</h2><p style=\"{p}\">x</p><ol start=\"3\" style=\"{l}\"><li style=\"{li}\">a</li></ol><h4>n</h4>",
                h = HEADING_STYLE,
                p = PARAGRAPH_STYLE,
                l = LIST_STYLE,
                li = LIST_ITEM_STYLE
            )
        );
    }

    #[test]
    fn test_spacing_replaces_existing_style() {
        let html = apply_spacing("<p style=\"color: red\">x</p>");
        assert_eq!(html, format!("<p style=\"{}\">x</p>", PARAGRAPH_STYLE));
    }

    #[test]
    fn test_code_blocks_extracts_unescaped_text() {
        let html = enhance(&to_html(DOC));
        assert_eq!(code_blocks(&html), vec!["let a = \"$x$\" < 1;\n".to_string()]);
    }

    #[test]
    fn test_partial_math_waits_for_closing_delimiter() {
        let html = enhance(&to_html("$$x^"));
        assert!(!html.contains("math-display"));
        assert!(html.contains("$$x^"));
    }
}
