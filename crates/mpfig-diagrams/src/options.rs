//! Diagram block options.
//!
//! A block's options come from three layers, later layers winning:
//! 1. built-in defaults ([`OptionSet::default`])
//! 2. the site's `[metapost]` configuration ([`MetapostConfig`])
//! 3. the tag arguments, e.g. `{% diagramblock class="wide" prefix=fig- %}`
//!
//! Tag arguments only reach the [`OptionSet`] through a fixed table of
//! recognized keys. Anything else is reported as an [`ArgumentWarning`] and
//! dropped.

use mpfig_config::{DEFAULT_OUTPUT_DIR, MetapostConfig, normalize_output_dir};

use crate::consts::DEFAULT_DIV_CLASS;
use crate::site::Site;

/// Artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramFormat {
    /// Vector output via the PDF to SVG converter.
    #[default]
    Svg,
    /// Raster output via Ghostscript.
    Png,
}

impl DiagramFormat {
    /// Parse format from an option value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Return format as string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    /// File extension of artifacts in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

/// Non-fatal problem found while reading block options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentWarning {
    /// Fragment that is neither `key="value"` nor `key=value`.
    #[error("malformed argument '{0}' ignored (expected key=\"value\" or key=value)")]
    Malformed(String),
    /// Key outside the recognized option table.
    #[error("unknown option '{0}' ignored (valid: {valid})", valid = VALID_KEYS)]
    UnknownKey(String),
    /// Recognized key with a value that cannot be used.
    #[error("invalid value '{value}' for option '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Recognized option keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKey {
    OutputDir,
    Class,
    DivClass,
    Style,
    Caption,
    Prefix,
    Debug,
    Increment,
    Format,
    Inline,
}

/// The fixed table of option names accepted from tag arguments.
const OPTION_KEYS: &[(&str, OptionKey)] = &[
    ("output_dir", OptionKey::OutputDir),
    ("class", OptionKey::Class),
    ("div_class", OptionKey::DivClass),
    ("style", OptionKey::Style),
    ("caption", OptionKey::Caption),
    ("prefix", OptionKey::Prefix),
    ("debug", OptionKey::Debug),
    ("increment", OptionKey::Increment),
    ("format", OptionKey::Format),
    ("inline", OptionKey::Inline),
];

const VALID_KEYS: &str =
    "output_dir, class, div_class, style, caption, prefix, debug, increment, format, inline";

impl OptionKey {
    fn lookup(name: &str) -> Option<Self> {
        OPTION_KEYS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, option)| *option)
    }
}

/// Key-value pairs parsed from a tag's argument string.
///
/// Pairs keep their source order; when a key repeats, the last one wins
/// during resolution.
///
/// # Example
///
/// ```
/// use mpfig_diagrams::TagArgs;
///
/// let args = TagArgs::parse(r#"class="wide figure" prefix=fig-"#);
/// assert_eq!(args.get("class"), Some("wide figure"));
/// assert_eq!(args.get("prefix"), Some("fig-"));
/// assert!(args.warnings.is_empty());
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagArgs {
    /// Parsed `(key, value)` pairs.
    pub pairs: Vec<(String, String)>,
    /// Fragments that could not be parsed.
    pub warnings: Vec<ArgumentWarning>,
}

impl TagArgs {
    /// Parse a tag argument string.
    ///
    /// Accepts `key="value"`, `key='value'` and `key=value` separated by
    /// whitespace. Malformed fragments are skipped with a warning and parsing
    /// continues after them.
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let mut args = Self::default();
        let mut remaining = markup.trim_start();

        while !remaining.is_empty() {
            match parse_key_value(remaining) {
                Ok((key, value, rest)) => {
                    args.pairs.push((key.to_owned(), value.to_owned()));
                    remaining = rest;
                }
                Err(rest) => {
                    let fragment = &remaining[..remaining.len() - rest.len()];
                    args.warnings
                        .push(ArgumentWarning::Malformed(fragment.trim().to_owned()));
                    remaining = rest;
                }
            }
            remaining = remaining.trim_start();
        }

        args
    }

    /// Get the last value given for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse one `key=value` fragment from the front of `s`.
///
/// Returns `(key, value, rest)` on success. On failure returns the input
/// remaining after the malformed fragment.
fn parse_key_value(s: &str) -> Result<(&str, &str, &str), &str> {
    let fragment_end = |s: &str| s.find(char::is_whitespace).unwrap_or(s.len());

    let key_end = s
        .find(|c: char| c == '=' || c.is_whitespace())
        .unwrap_or(s.len());
    let key = &s[..key_end];

    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        || !s[key_end..].starts_with('=')
    {
        return Err(&s[fragment_end(s)..]);
    }

    let after_eq = &s[key_end + 1..];

    for quote in ['"', '\''] {
        if let Some(stripped) = after_eq.strip_prefix(quote) {
            let Some(end_quote) = stripped.find(quote) else {
                // Unterminated quote swallows the rest of the markup
                return Err("");
            };
            return Ok((key, &stripped[..end_quote], &stripped[end_quote + 1..]));
        }
    }

    let end = fragment_end(after_eq);
    Ok((key, &after_eq[..end], &after_eq[end..]))
}

/// Parse a boolean option value.
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Fully resolved options for one diagram block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    /// Directory (relative to the site source) for artifacts.
    pub output_dir: String,
    /// Extra class on the `<figure>` (empty means none).
    pub class: String,
    /// Class of the container `<div>` (empty means none).
    pub div_class: String,
    /// Inline style on the `<figure>` (empty means none).
    pub style: String,
    /// Caption rendered after the image.
    pub caption: Option<String>,
    /// Artifact filename prefix.
    pub prefix: String,
    /// Log external commands at info level.
    pub debug: bool,
    /// Reuse an existing artifact instead of regenerating it.
    pub increment: bool,
    /// Artifact format.
    pub format: DiagramFormat,
    /// Embed the SVG document instead of linking it.
    pub inline: bool,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_owned(),
            class: String::new(),
            div_class: DEFAULT_DIV_CLASS.to_owned(),
            style: String::new(),
            caption: None,
            prefix: String::new(),
            debug: false,
            increment: true,
            format: DiagramFormat::Svg,
            inline: false,
        }
    }
}

/// Result of resolving options, with any warnings produced on the way.
#[derive(Debug)]
pub struct Resolved {
    /// Resolved options.
    pub options: OptionSet,
    /// Non-fatal problems in the tag arguments or site defaults.
    pub warnings: Vec<ArgumentWarning>,
}

impl OptionSet {
    /// Resolve options from tag arguments over site-level defaults.
    #[must_use]
    pub fn resolve(args: &TagArgs, host: Option<&MetapostConfig>) -> Resolved {
        let mut options = Self::default();
        let mut warnings = args.warnings.clone();

        if let Some(host) = host {
            options.apply_host(host, &mut warnings);
        }
        for (key, value) in &args.pairs {
            options.apply(key, value, &mut warnings);
        }

        // Raster output cannot be embedded as a document
        if options.format == DiagramFormat::Png {
            options.inline = false;
        }

        Resolved { options, warnings }
    }

    /// Overlay the site's `[metapost]` defaults.
    fn apply_host(&mut self, host: &MetapostConfig, warnings: &mut Vec<ArgumentWarning>) {
        if let Some(output_dir) = &host.output_dir {
            self.set_output_dir(output_dir, warnings);
        }
        if let Some(class) = &host.class {
            self.class.clone_from(class);
        }
        if let Some(div_class) = &host.div_class {
            self.div_class.clone_from(div_class);
        }
        if let Some(style) = &host.style {
            self.style.clone_from(style);
        }
        if let Some(prefix) = &host.prefix {
            self.prefix.clone_from(prefix);
        }
        if let Some(debug) = host.debug {
            self.debug = debug;
        }
        if let Some(increment) = host.increment {
            self.increment = increment;
        }
        if let Some(format) = &host.format {
            self.set_format(format, warnings);
        }
        if let Some(inline) = host.inline {
            self.inline = inline;
        }
    }

    /// Apply one tag argument.
    fn apply(&mut self, key: &str, value: &str, warnings: &mut Vec<ArgumentWarning>) {
        let Some(option) = OptionKey::lookup(key) else {
            warnings.push(ArgumentWarning::UnknownKey(key.to_owned()));
            return;
        };

        match option {
            OptionKey::OutputDir => self.set_output_dir(value, warnings),
            OptionKey::Class => value.clone_into(&mut self.class),
            OptionKey::DivClass => value.clone_into(&mut self.div_class),
            OptionKey::Style => value.clone_into(&mut self.style),
            OptionKey::Caption => {
                self.caption = (!value.is_empty()).then(|| value.to_owned());
            }
            OptionKey::Prefix => value.clone_into(&mut self.prefix),
            OptionKey::Debug => Self::set_bool(&mut self.debug, key, value, warnings),
            OptionKey::Increment => Self::set_bool(&mut self.increment, key, value, warnings),
            OptionKey::Format => self.set_format(value, warnings),
            OptionKey::Inline => Self::set_bool(&mut self.inline, key, value, warnings),
        }
    }

    fn set_output_dir(&mut self, value: &str, warnings: &mut Vec<ArgumentWarning>) {
        match normalize_output_dir(value) {
            Ok(dir) => self.output_dir = dir,
            Err(reason) => warnings.push(ArgumentWarning::InvalidValue {
                key: "output_dir".to_owned(),
                value: value.to_owned(),
                reason,
            }),
        }
    }

    fn set_format(&mut self, value: &str, warnings: &mut Vec<ArgumentWarning>) {
        match DiagramFormat::parse(value) {
            Some(format) => self.format = format,
            None => warnings.push(ArgumentWarning::InvalidValue {
                key: "format".to_owned(),
                value: value.to_owned(),
                reason: "expected 'svg' or 'png'".to_owned(),
            }),
        }
    }

    fn set_bool(target: &mut bool, key: &str, value: &str, warnings: &mut Vec<ArgumentWarning>) {
        match parse_bool(value) {
            Some(flag) => *target = flag,
            None => warnings.push(ArgumentWarning::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
                reason: "expected a boolean".to_owned(),
            }),
        }
    }
}

/// Resolve options for a block rendered on `site`.
///
/// Besides resolving, registers the output directory with the site's
/// exclusion list so the site's generic copy step skips it. The directory is
/// added at most once.
pub fn resolve_for_site<S: Site + ?Sized>(site: &mut S, args: &TagArgs) -> Resolved {
    let resolved = OptionSet::resolve(args, site.diagram_defaults());

    let output_dir = resolved.options.output_dir.trim_end_matches('/');
    let already_excluded = site
        .excludes()
        .iter()
        .any(|entry| entry.trim_end_matches('/') == output_dir);
    if !already_excluded {
        site.exclude(output_dir.to_owned());
    }

    resolved
}
