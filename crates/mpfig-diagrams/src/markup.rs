//! Figure markup for rendered diagrams.
//!
//! ```html
//! <figure class="metapost wide" style="width: 50%"><div class="container"><img src="/images/metapost/ab12.svg" alt="Fig 1"></div><figcaption>Fig 1</figcaption></figure>
//! ```
//!
//! Empty `class`, `style` and `div_class` options omit the attribute, and a
//! missing caption omits the `<figcaption>`.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use crate::consts::BASE_CLASS;
use crate::options::OptionSet;

/// XML declaration, doctype and surrounding whitespace at the start of an
/// SVG document.
static SVG_PROLOGUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:<\?xml[^>]*\?>\s*)?(?:<!--.*?-->\s*)*(?:<!DOCTYPE[^>\[]*(?:\[[^\]]*\])?\s*>\s*)?")
        .unwrap()
});

/// What the figure shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactContent {
    /// Reference the artifact by URL.
    Link(String),
    /// Embed an SVG document.
    InlineSvg(String),
}

/// Public URL of an artifact: `{base_url}/{output_dir}/{filename}`.
#[must_use]
pub fn artifact_url(base_url: &str, output_dir: &str, filename: &str) -> String {
    let output_dir = output_dir.trim_matches('/');
    let mut url = base_url.trim_end_matches('/').to_owned();
    if !output_dir.is_empty() {
        url.push('/');
        url.push_str(output_dir);
    }
    url.push('/');
    url.push_str(filename);
    url
}

/// Compose the figure markup for one diagram.
#[must_use]
pub fn compose(content: &ArtifactContent, options: &OptionSet) -> String {
    let caption = options.caption.as_deref().filter(|c| !c.is_empty());

    let mut html = String::from("<figure class=\"");
    html.push_str(BASE_CLASS);
    let class = options.class.trim();
    if !class.is_empty() {
        html.push(' ');
        html.push_str(&escape_html(class));
    }
    html.push('"');
    push_attr(&mut html, "style", &options.style);
    html.push('>');

    html.push_str("<div");
    push_attr(&mut html, "class", &options.div_class);
    html.push('>');
    match content {
        ArtifactContent::Link(url) => {
            let _ = write!(
                html,
                r#"<img src="{}" alt="{}">"#,
                escape_html(url),
                escape_html(caption.unwrap_or("diagram"))
            );
        }
        ArtifactContent::InlineSvg(svg) => html.push_str(strip_xml_prologue(svg).trim_end()),
    }
    html.push_str("</div>");

    if let Some(caption) = caption {
        let _ = write!(html, "<figcaption>{}</figcaption>", escape_html(caption));
    }
    html.push_str("</figure>");
    html
}

/// Remove the XML declaration and doctype so the document can sit inside
/// HTML.
#[must_use]
pub fn strip_xml_prologue(svg: &str) -> &str {
    SVG_PROLOGUE_RE
        .find(svg)
        .map_or(svg, |prologue| &svg[prologue.end()..])
}

fn push_attr(html: &mut String, name: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        let _ = write!(html, r#" {name}="{}""#, escape_html(value));
    }
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
