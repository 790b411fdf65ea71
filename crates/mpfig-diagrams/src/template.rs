//! `{% diagramblock %}` scanning in page text.
//!
//! Finds every `{% diagramblock args %}body{% enddiagramblock %}` and replaces
//! it with the output of a render callback. Liquid whitespace-control markers
//! are honored: `{%-` trims whitespace before a tag and `-%}` after it,
//! including the body side of the opening and closing tags.
//!
//! Blocks do not nest: a body ends at the first closing tag.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::consts::TAG_NAME;

static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?s)\{{%(-?)\s*{TAG_NAME}\b(.*?)(-?)%\}}")).unwrap()
});

static CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\{{%(-?)\s*end{TAG_NAME}\s*(-?)%\}}")).unwrap()
});

/// Non-fatal problem in page markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateWarning {
    /// Opening tag without a matching closing tag.
    #[error("line {line}: diagramblock is not closed; left as is")]
    Unterminated {
        /// 1-based line of the opening tag.
        line: usize,
    },
}

/// Page text with all diagram blocks expanded.
#[derive(Debug, Default)]
pub struct Expanded {
    /// Text with blocks replaced.
    pub output: String,
    /// Number of blocks rendered.
    pub blocks: usize,
    /// Markup problems found while scanning.
    pub warnings: Vec<TemplateWarning>,
}

/// Expand all diagram blocks in `text`.
///
/// `render` receives the raw tag arguments and the block body and returns the
/// replacement markup.
///
/// # Errors
///
/// Returns the first error produced by `render`. Scanning stops there.
pub fn expand_blocks<F, E>(text: &str, mut render: F) -> Result<Expanded, E>
where
    F: FnMut(&str, &str) -> Result<String, E>,
{
    let mut expanded = Expanded::default();
    let mut pos = 0;

    while let Some(open) = OPEN_RE.captures_at(text, pos) {
        let whole = open.get(0).map_or(pos..pos, |m| m.range());
        let Some(close) = CLOSE_RE.captures_at(text, whole.end) else {
            expanded.warnings.push(TemplateWarning::Unterminated {
                line: line_of(text, whole.start),
            });
            break;
        };
        let close_range = close.get(0).map_or(whole.end..whole.end, |m| m.range());

        expanded.output.push_str(&text[pos..whole.start]);
        if is_trim(&open, 1) {
            let kept = expanded.output.trim_end().len();
            expanded.output.truncate(kept);
        }

        let mut body = &text[whole.end..close_range.start];
        if is_trim(&open, 3) {
            body = body.trim_start();
        }
        if is_trim(&close, 1) {
            body = body.trim_end();
        }
        let args = open.get(2).map_or("", |m| m.as_str());

        expanded.output.push_str(&render(args, body)?);
        expanded.blocks += 1;

        pos = close_range.end;
        if is_trim(&close, 2) {
            pos += text[pos..].len() - text[pos..].trim_start().len();
        }
    }

    expanded.output.push_str(&text[pos..]);
    Ok(expanded)
}

fn is_trim(caps: &Captures<'_>, group: usize) -> bool {
    caps.get(group).is_some_and(|m| m.as_str() == "-")
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
