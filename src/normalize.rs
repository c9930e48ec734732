//! Strip the XHTML-style trailing slash from HTML5 void elements.
//!
//! `<img src="a.png" />` becomes `<img src="a.png">` and `<br/>` becomes
//! `<br>`. Matching is case-insensitive and the tag name is written back in
//! lower case. Non-void elements such as `<div />` are left alone.

use regex_lite::{Captures, Regex};
use std::borrow::Cow;

/// Elements that never have content or a closing tag
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

lazy_static::lazy_static! {
    static ref SELF_CLOSING_VOID: Regex = Regex::new(&format!(
        r"(?i)<({})(?:\s+([^>]*?))?\s*/>",
        VOID_ELEMENTS.join("|")
    ))
    .unwrap();
}

/// Rewrite every self-closed void element, keeping its attributes
pub fn remove_trailing_slashes(html: &str) -> Cow<'_, str> {
    SELF_CLOSING_VOID.replace_all(html, |caps: &Captures| {
        let element = caps[1].to_ascii_lowercase();
        match caps.get(2).map(|attrs| attrs.as_str().trim()) {
            Some(attrs) if !attrs.is_empty() => format!("<{} {}>", element, attrs),
            _ => format!("<{}>", element),
        }
    })
}

/// Which collection a rendered item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Page,
    Post,
    Document,
}

/// Output of the site generator for one item, just after rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub kind: PageKind,
    pub output_ext: String,
    pub output: Option<String>,
}

/// Post-render hook, run once per rendered item. Only HTML output is touched.
pub fn post_render(page: &mut RenderedPage) {
    if page.output_ext != ".html" {
        return;
    }
    if let Some(output) = page.output.as_mut() {
        if let Cow::Owned(fixed) = remove_trailing_slashes(output) {
            *output = fixed;
        }
    }
}
