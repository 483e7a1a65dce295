//! Sanitation of provider-supplied event descriptions.
//!
//! Descriptions come from whoever can edit the calendar, so they are treated
//! as hostile markup. A pass over a description:
//!
//! 1. un-escapes `\u003c`-style sequences some producers leave behind for
//!    `<`, `>`, `&` and quotes,
//! 2. decodes HTML entities,
//! 3. parses the result as an HTML fragment and re-serializes it, keeping
//!    only [`ALLOWED_TAGS`] and replacing every other element with its text,
//! 4. keeps anchors only when they point at an http(s) destination, and
//!    forces them to open in a new context with `noopener noreferrer nofollow`,
//! 5. unwraps anchors that contain anchors, keeping the inner link.
//!
//! Steps 1 and 2 repeat until the text stops changing, so markup hidden
//! under any number of encoding layers is seen by the parser in one pass.
//! Passes then repeat until the output is stable, which makes
//! [`sanitize_description`] idempotent.

use std::borrow::Cow;

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html, Node};
use thiserror::Error;
use tracing::warn;

/// Elements that survive sanitation. Everything else is flattened to text.
pub const ALLOWED_TAGS: &[&str] = &["a", "br", "p", "strong", "em", "ul", "ol", "li"];

/// `rel` value forced onto every surviving anchor.
pub const ANCHOR_REL: &str = "noopener noreferrer nofollow";

/// `target` value forced onto every surviving anchor.
pub const ANCHOR_TARGET: &str = "_blank";

/// Characters producers are known to double-encode as `\uXXXX`.
const ESCAPED_MARKUP_CHARS: &[char] = &['<', '>', '&', '"', '\''];

const MAX_DEPTH: usize = 256;

#[derive(Debug, Error)]
enum SanitizeError {
    #[error("markup nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Sanitize a description for direct injection into page markup.
///
/// Fails open: when the description cannot be processed, the input is
/// returned unmodified.
pub fn sanitize_description(input: &str) -> String {
    match sanitize_until_stable(input) {
        Ok(clean) => clean,
        Err(err) => {
            warn!("Could not sanitize event description ({err}); keeping it as received");
            input.to_string()
        }
    }
}

/// True for destinations with an `http://` or `https://` scheme.
pub fn is_web_url(href: &str) -> bool {
    let href = href.trim_start();
    ["http://", "https://"].iter().any(|scheme| {
        href.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn sanitize_until_stable(input: &str) -> Result<String, SanitizeError> {
    let mut current = sanitize_pass(input)?;

    loop {
        let next = sanitize_pass(&current)?;
        if next == current {
            return Ok(current);
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> Result<String, SanitizeError> {
    let decoded = decode_fully(input);

    let fragment = Html::parse_fragment(&decoded);
    let root = fragment.root_element();
    let mut out = String::with_capacity(decoded.len());

    let has_markup = root
        .descendants()
        .skip(1)
        .any(|node| node.value().is_element());

    if has_markup {
        write_children(root, &mut out, 0)?;
    } else {
        // Plain-text descriptions keep their line structure
        let text: String = root.text().collect();
        out.push_str(&encode_text(&text).replace("\r\n", "\n").replace('\n', "<br>"));
    }

    Ok(out)
}

/// Un-escape and decode until nothing changes. Every change shortens the
/// text, so this ends.
fn decode_fully(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let unescaped = unescape_markup_chars(&current);
        let decoded = decode_html_entities(&unescaped);
        if decoded == current {
            return current;
        }
        current = decoded.into_owned();
    }
}

/// Replace `\uXXXX` sequences that encode markup characters.
/// Other escapes are left alone.
fn unescape_markup_chars(input: &str) -> Cow<'_, str> {
    if !input.contains("\\u") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];

        let decoded = after
            .get(..4)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32)
            .filter(|c| ESCAPED_MARKUP_CHARS.contains(c));

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &after[4..];
            }
            None => {
                out.push_str("\\u");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn write_children(
    parent: ElementRef<'_>,
    out: &mut String,
    depth: usize,
) -> Result<(), SanitizeError> {
    if depth > MAX_DEPTH {
        return Err(SanitizeError::TooDeep(MAX_DEPTH));
    }

    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&encode_text(&**text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, out, depth + 1)?;
                }
            }
            // comments, doctypes, processing instructions
            _ => {}
        }
    }

    Ok(())
}

fn write_element(
    element: ElementRef<'_>,
    out: &mut String,
    depth: usize,
) -> Result<(), SanitizeError> {
    let name = element.value().name();

    if !ALLOWED_TAGS.contains(&name) {
        write_text_content(element, out);
        return Ok(());
    }

    match name {
        "a" => write_anchor(element, out, depth),
        "br" => {
            out.push_str("<br>");
            Ok(())
        }
        _ => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            write_children(element, out, depth)?;
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
    }
}

fn write_anchor(
    anchor: ElementRef<'_>,
    out: &mut String,
    depth: usize,
) -> Result<(), SanitizeError> {
    // Nested anchors: the innermost link wins, outer wrappers are dropped
    if contains_anchor(anchor) {
        return write_children(anchor, out, depth);
    }

    match anchor.value().attr("href").filter(|href| is_web_url(href)) {
        Some(href) => {
            out.push_str("<a href=\"");
            out.push_str(&encode_double_quoted_attribute(href));
            out.push_str("\" target=\"");
            out.push_str(ANCHOR_TARGET);
            out.push_str("\" rel=\"");
            out.push_str(ANCHOR_REL);
            out.push_str("\">");
            write_children(anchor, out, depth)?;
            out.push_str("</a>");
        }
        None => write_text_content(anchor, out),
    }

    Ok(())
}

fn contains_anchor(anchor: ElementRef<'_>) -> bool {
    anchor
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|element| element.value().name() == "a")
}

fn write_text_content(element: ElementRef<'_>, out: &mut String) {
    for text in element.text() {
        out.push_str(&encode_text(text));
    }
}
