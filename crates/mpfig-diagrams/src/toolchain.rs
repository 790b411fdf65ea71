//! External toolchain description.
//!
//! [`Toolchain`] turns a diagram's identity token into the fixed sequence of
//! stages that compiles MetaPost source into an image:
//!
//! ```text
//! {token}.mp  --mpost-->  {token}.1
//! {token}.tex --latex-->  {token}.dvi  (wrapper includes {token}.1)
//! {token}.dvi --dvipdf--> {token}.pdf  --pdfcrop--> {token}.pdf
//! [{token}.pdf --ghostscript--> {token}-outlined.pdf]   (no outline fonts)
//! {token}.pdf --pdf2svg | ghostscript--> artifact
//! ```

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use mpfig_config::ToolchainConfig;

use crate::options::DiagramFormat;
use crate::stage::Stage;

/// The external programs of the rendering pipeline and their capabilities.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    config: ToolchainConfig,
}

impl Toolchain {
    /// Create a toolchain from configuration.
    #[must_use]
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Whether the PDF to SVG converter on this platform cannot emit glyph
    /// outlines, requiring a flattening stage.
    #[must_use]
    pub fn lacks_outline_fonts(&self) -> bool {
        !self.config.outline_fonts
    }

    /// Per-stage timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout()
    }

    /// Parent directory for workspaces, if configured.
    #[must_use]
    pub fn workspace_dir(&self) -> Option<&Path> {
        self.config.workspace_dir.as_deref()
    }

    /// MetaPost source filename for `token`.
    #[must_use]
    pub fn source_name(token: &str) -> String {
        format!("{token}.mp")
    }

    /// Wrapper document filename for `token`.
    #[must_use]
    pub fn wrapper_name(token: &str) -> String {
        format!("{token}.tex")
    }

    /// TeX wrapper document including the MetaPost output for `token`.
    #[must_use]
    pub fn wrapper_document(&self, token: &str) -> String {
        format!(
            "\\documentclass[dvips]{{{class}}}\n\
             \\usepackage{{graphicx}}\n\
             \\pagestyle{{empty}}\n\
             \\begin{{document}}\n\
             \\includegraphics{{{token}.1}}\n\
             \\end{{document}}\n",
            class = self.config.document_class,
        )
    }

    /// Stages producing `output` in `format` from the workspace files of `token`.
    ///
    /// `output` is written by the last stage only.
    #[must_use]
    pub fn stages(&self, token: &str, format: DiagramFormat, output: &Path) -> Vec<Stage> {
        let tc = &self.config;
        let dvi = format!("{token}.dvi");
        let pdf = format!("{token}.pdf");

        let mut latex_args: Vec<OsString> = tc.latex_args.iter().map(OsString::from).collect();
        latex_args.push("-interaction=nonstopmode".into());
        latex_args.push(Self::wrapper_name(token).into());

        let mut stages = vec![
            Stage::new(
                "mpost",
                &tc.mpost,
                ["-interaction=nonstopmode".to_owned(), Self::source_name(token)],
            ),
            Stage::new("latex", &tc.latex, latex_args),
            Stage::new("dvipdf", &tc.dvipdf, ["-o", pdf.as_str(), dvi.as_str()]),
            Stage::new("pdfcrop", &tc.pdfcrop, [&pdf, &pdf]),
        ];

        let final_pdf = if self.lacks_outline_fonts() {
            let outlined = format!("{token}-outlined.pdf");
            stages.push(Stage::new(
                "flatten",
                &tc.ghostscript,
                [
                    "-q",
                    "-dNoOutputFonts",
                    "-sDEVICE=pdfwrite",
                    "-o",
                    outlined.as_str(),
                    pdf.as_str(),
                ],
            ));
            outlined
        } else {
            pdf
        };

        let output = output.as_os_str().to_owned();
        stages.push(match format {
            DiagramFormat::Svg => Stage::new(
                "pdf2svg",
                &tc.pdf2svg,
                [OsString::from(&final_pdf), output],
            ),
            DiagramFormat::Png => Stage::new(
                "rasterize",
                &tc.ghostscript,
                [
                    OsString::from("-q"),
                    OsString::from("-sDEVICE=pngalpha"),
                    OsString::from(format!("-r{}", tc.png_dpi)),
                    OsString::from("-o"),
                    output,
                    OsString::from(&final_pdf),
                ],
            ),
        });

        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(stages: &[Stage]) -> Vec<&'static str> {
        stages.iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_default_svg_stages() {
        let toolchain = Toolchain::default();
        let stages = toolchain.stages("abc", DiagramFormat::Svg, Path::new("/out/.abc.svg.tmp"));

        assert_eq!(names(&stages), ["mpost", "latex", "dvipdf", "pdfcrop", "pdf2svg"]);
        assert_eq!(
            stages[0].command_line(),
            "upmpost -interaction=nonstopmode abc.mp"
        );
        assert_eq!(
            stages[1].command_line(),
            "platex -kanji=utf8 -interaction=nonstopmode abc.tex"
        );
        assert_eq!(stages[2].command_line(), "dvipdfmx -o abc.pdf abc.dvi");
        assert_eq!(stages[3].command_line(), "pdfcrop abc.pdf abc.pdf");
        assert_eq!(stages[4].command_line(), "pdf2svg abc.pdf /out/.abc.svg.tmp");
    }

    #[test]
    fn test_flatten_stage_without_outline_fonts() {
        let toolchain = Toolchain::new(ToolchainConfig {
            outline_fonts: false,
            ..ToolchainConfig::default()
        });
        assert!(toolchain.lacks_outline_fonts());

        let stages = toolchain.stages("abc", DiagramFormat::Svg, Path::new("/out/a.svg"));

        assert_eq!(
            names(&stages),
            ["mpost", "latex", "dvipdf", "pdfcrop", "flatten", "pdf2svg"]
        );
        assert_eq!(
            stages[4].command_line(),
            "gs -q -dNoOutputFonts -sDEVICE=pdfwrite -o abc-outlined.pdf abc.pdf"
        );
        assert_eq!(
            stages[5].command_line(),
            "pdf2svg abc-outlined.pdf /out/a.svg"
        );
    }

    #[test]
    fn test_png_stages() {
        let toolchain = Toolchain::default();
        let stages = toolchain.stages("abc", DiagramFormat::Png, Path::new("/out/a.png"));

        assert_eq!(names(&stages).last(), Some(&"rasterize"));
        assert_eq!(
            stages.last().unwrap().command_line(),
            "gs -q -sDEVICE=pngalpha -r192 -o /out/a.png abc.pdf"
        );
    }

    #[test]
    fn test_only_last_stage_writes_output() {
        let toolchain = Toolchain::new(ToolchainConfig {
            outline_fonts: false,
            ..ToolchainConfig::default()
        });
        let output = "/out/final.svg";
        let stages = toolchain.stages("abc", DiagramFormat::Svg, Path::new(output));
        let (last, rest) = stages.split_last().unwrap();

        assert!(last.command_line().contains(output));
        assert!(rest.iter().all(|s| !s.command_line().contains(output)));
    }

    #[test]
    fn test_wrapper_document_includes_mpost_output() {
        let toolchain = Toolchain::default();
        let doc = toolchain.wrapper_document("abc");
        assert!(doc.starts_with("\\documentclass[dvips]{jarticle}\n"));
        assert!(doc.contains("\\includegraphics{abc.1}\n"));
        assert!(doc.contains("\\pagestyle{empty}\n"));
        assert!(doc.ends_with("\\end{document}\n"));
    }

    #[test]
    fn test_custom_programs_and_args() {
        let toolchain = Toolchain::new(ToolchainConfig {
            mpost: "mpost".to_owned(),
            latex: "latex".to_owned(),
            latex_args: Vec::new(),
            ..ToolchainConfig::default()
        });
        let stages = toolchain.stages("t", DiagramFormat::Svg, Path::new("o.svg"));
        assert_eq!(stages[0].command_line(), "mpost -interaction=nonstopmode t.mp");
        assert_eq!(stages[1].command_line(), "latex -interaction=nonstopmode t.tex");
    }
}
