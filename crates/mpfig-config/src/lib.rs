//! Configuration management for mpfig.
//!
//! Parses `mpfig.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! The file has three sections:
//! - `[site]`: source and destination directories of the site build
//! - `[metapost]`: site-wide defaults for diagram block options
//! - `[toolchain]`: external programs used by the rendering pipeline
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values in `[toolchain]` support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override site source directory.
    pub source_dir: Option<PathBuf>,
    /// Override publish destination directory.
    pub destination: Option<PathBuf>,
    /// Override the site-wide `increment` default (`Some(false)` forces regeneration).
    pub increment: Option<bool>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "mpfig.toml";

/// Default directory (relative to the site source) for rendered diagrams.
pub const DEFAULT_OUTPUT_DIR: &str = "images/metapost";

/// Maximum accepted PNG rasterization DPI.
const MAX_DPI: u32 = 1000;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Site-wide defaults for diagram block options.
    pub metapost: Option<MetapostConfig>,
    /// External toolchain configuration.
    pub toolchain: ToolchainConfig,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw site configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct SiteConfigRaw {
    source_dir: Option<String>,
    destination: Option<String>,
    base_url: Option<String>,
    exclude: Option<Vec<String>>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default, Clone)]
pub struct SiteConfig {
    /// Site source directory (pages, static files, rendered diagrams).
    pub source_dir: PathBuf,
    /// Directory the site is published to.
    pub destination: PathBuf,
    /// URL prefix for artifact references, without trailing slash.
    pub base_url: String,
    /// Source-relative paths excluded from the generic file copy.
    pub exclude: Vec<String>,
}

/// Site-wide defaults for diagram block options (`[metapost]` section).
///
/// Every field is optional; unset fields fall back to the built-in
/// defaults. Unknown keys are rejected at parse time.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MetapostConfig {
    /// Directory (relative to the site source) for rendered artifacts.
    pub output_dir: Option<String>,
    /// Extra CSS class on the `<figure>` element.
    pub class: Option<String>,
    /// CSS class of the inner container `<div>`.
    pub div_class: Option<String>,
    /// Inline style on the `<figure>` element.
    pub style: Option<String>,
    /// Artifact filename prefix.
    pub prefix: Option<String>,
    /// Log external commands at info level.
    pub debug: Option<bool>,
    /// Reuse existing artifacts instead of regenerating them.
    pub increment: Option<bool>,
    /// Artifact format (`svg` or `png`).
    pub format: Option<String>,
    /// Embed SVG documents inline instead of linking them.
    pub inline: Option<bool>,
}

/// External toolchain configuration (`[toolchain]` section).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// MetaPost compiler.
    pub mpost: String,
    /// TeX engine producing DVI.
    pub latex: String,
    /// Extra arguments passed to the TeX engine.
    pub latex_args: Vec<String>,
    /// DVI to PDF converter.
    pub dvipdf: String,
    /// PDF bounding box cropper.
    pub pdfcrop: String,
    /// PDF to SVG converter.
    pub pdf2svg: String,
    /// Ghostscript, used for outline flattening and PNG output.
    pub ghostscript: String,
    /// Document class of the generated wrapper document.
    pub document_class: String,
    /// Whether the PDF to SVG converter emits glyph outlines on this platform.
    ///
    /// When false, fonts are flattened to outlines with Ghostscript before
    /// SVG conversion.
    pub outline_fonts: bool,
    /// Rasterization DPI for PNG output.
    pub png_dpi: u32,
    /// Per-stage timeout in seconds (unset means no limit).
    pub timeout_secs: Option<u64>,
    /// Parent directory for temporary workspaces (defaults to the system temp dir).
    pub workspace_dir: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            mpost: "upmpost".to_owned(),
            latex: "platex".to_owned(),
            latex_args: vec!["-kanji=utf8".to_owned()],
            dvipdf: "dvipdfmx".to_owned(),
            pdfcrop: "pdfcrop".to_owned(),
            pdf2svg: "pdf2svg".to_owned(),
            ghostscript: "gs".to_owned(),
            document_class: "jarticle".to_owned(),
            outline_fonts: true,
            png_dpi: 192,
            timeout_secs: None,
            workspace_dir: None,
        }
    }
}

impl ToolchainConfig {
    /// Per-stage timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`toolchain.mpost`").
        field: String,
        /// Error message (e.g., "${`TEXBIN`} not set").
        message: String,
    },
}

/// Check that an output directory is a non-empty relative path that stays
/// inside the site source.
///
/// # Errors
///
/// Returns a human-readable reason when the path is rejected.
pub fn check_output_dir(value: &str) -> Result<(), String> {
    normalize_output_dir(value).map(drop)
}

/// Check an output directory and return it in canonical form.
///
/// `.` components and trailing slashes are dropped, so `./figs/` becomes
/// `figs`.
///
/// # Errors
///
/// Returns a human-readable reason when the path is rejected.
pub fn normalize_output_dir(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("output_dir cannot be empty".to_owned());
    }
    let mut parts = Vec::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("output_dir '{value}' must not contain '..'"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("output_dir '{value}' must be a relative path"));
            }
        }
    }
    if parts.is_empty() {
        return Err(format!("output_dir '{value}' must name a directory below the source"));
    }
    Ok(parts.join("/"))
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mpfig.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.site_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(destination) = &settings.destination {
            self.site_resolved.destination.clone_from(destination);
        }
        if let Some(increment) = settings.increment {
            self.metapost.get_or_insert_with(MetapostConfig::default).increment = Some(increment);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfigRaw::default(),
            metapost: None,
            toolchain: ToolchainConfig::default(),
            site_resolved: SiteConfig {
                source_dir: base.to_path_buf(),
                destination: base.join("_site"),
                base_url: String::new(),
                exclude: Vec::new(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_metapost()?;
        self.validate_toolchain()?;
        Ok(())
    }

    /// Validate the diagram option defaults.
    fn validate_metapost(&self) -> Result<(), ConfigError> {
        let Some(metapost) = &self.metapost else {
            return Ok(());
        };

        if let Some(output_dir) = &metapost.output_dir {
            check_output_dir(output_dir)
                .map_err(|reason| ConfigError::Validation(format!("metapost.{reason}")))?;
        }

        if let Some(format) = &metapost.format
            && !matches!(format.as_str(), "svg" | "png")
        {
            return Err(ConfigError::Validation(format!(
                "metapost.format must be 'svg' or 'png', got '{format}'"
            )));
        }

        Ok(())
    }

    /// Validate toolchain configuration.
    fn validate_toolchain(&self) -> Result<(), ConfigError> {
        let tc = &self.toolchain;
        require_non_empty(&tc.mpost, "toolchain.mpost")?;
        require_non_empty(&tc.latex, "toolchain.latex")?;
        require_non_empty(&tc.dvipdf, "toolchain.dvipdf")?;
        require_non_empty(&tc.pdfcrop, "toolchain.pdfcrop")?;
        require_non_empty(&tc.pdf2svg, "toolchain.pdf2svg")?;
        require_non_empty(&tc.ghostscript, "toolchain.ghostscript")?;
        require_non_empty(&tc.document_class, "toolchain.document_class")?;

        if tc.png_dpi == 0 {
            return Err(ConfigError::Validation(
                "toolchain.png_dpi must be greater than 0".to_owned(),
            ));
        }
        if tc.png_dpi > MAX_DPI {
            return Err(ConfigError::Validation(format!(
                "toolchain.png_dpi cannot exceed {MAX_DPI}"
            )));
        }
        if tc.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "toolchain.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let tc = &mut self.toolchain;
        tc.mpost = expand::expand_env(&tc.mpost, "toolchain.mpost")?;
        tc.latex = expand::expand_env(&tc.latex, "toolchain.latex")?;
        tc.dvipdf = expand::expand_env(&tc.dvipdf, "toolchain.dvipdf")?;
        tc.pdfcrop = expand::expand_env(&tc.pdfcrop, "toolchain.pdfcrop")?;
        tc.pdf2svg = expand::expand_env(&tc.pdf2svg, "toolchain.pdf2svg")?;
        tc.ghostscript = expand::expand_env(&tc.ghostscript, "toolchain.ghostscript")?;
        for arg in &mut tc.latex_args {
            *arg = expand::expand_env(arg, "toolchain.latex_args")?;
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        let source_dir = resolve(self.site.source_dir.as_deref(), ".");
        let destination = resolve(self.site.destination.as_deref(), "_site");
        let base_url = self
            .site
            .base_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_owned();

        self.site_resolved = SiteConfig {
            source_dir,
            destination,
            base_url,
            exclude: self.site.exclude.clone().unwrap_or_default(),
        };

        if let Some(dir) = &self.toolchain.workspace_dir {
            self.toolchain.workspace_dir = Some(config_dir.join(dir));
        }
    }
}
