//! Planning an archive render with Ghostscript
//!
//! The engine never runs the tool itself. It produces the markup, the side
//! file location and the argument list; the caller runs the command and hands
//! the captured output back to [`ArchivePlan::outcome`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::comment::Comment;
use crate::error::ExportError;
use crate::escape::sanitize;
use crate::markup::{render_markup, MarkupOptions};

const PASSWORD_FLAGS: [&str; 3] = ["-sPDFPassword=", "-sOwnerPassword=", "-sUserPassword="];

/// Archive rendering target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Png,
}

impl OutputFormat {
    /// `"png"` selects PNG; anything else, including nothing, is PDF
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("png") => OutputFormat::Png,
            _ => OutputFormat::Pdf,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
        }
    }

    fn device(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "-sDEVICE=pdfwrite",
            OutputFormat::Png => "-sDEVICE=png16m",
        }
    }
}

/// What the caller asked for
#[derive(Debug, Clone, Default)]
pub struct ArchiveRequest {
    pub format: OutputFormat,
    pub password: Option<String>,
    pub highlights: bool,
    /// Restrict the archive to one comment thread and its page
    pub comment_id: Option<String>,
}

/// Deployment-wide export settings
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub producer: String,
    pub ghostscript: PathBuf,
}

/// Files involved in one archive render, all next to the source PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePaths {
    pub source: PathBuf,
    pub markup: PathBuf,
    pub output: PathBuf,
}

impl ArchivePaths {
    /// `<base>.pdf` becomes `<base>-archive.ps` and `<base>-archive.<ext>`
    pub fn for_source(source: &Path, format: OutputFormat) -> Result<Self, ExportError> {
        let stem = match (source.extension(), source.file_stem()) {
            (Some(ext), Some(stem)) if ext == "pdf" => stem.to_string_lossy(),
            _ => return Err(ExportError::InvalidSource(source.display().to_string())),
        };

        Ok(Self {
            source: source.to_path_buf(),
            markup: source.with_file_name(format!("{}-archive.ps", stem)),
            output: source.with_file_name(format!("{}-archive.{}", stem, format.extension())),
        })
    }

    /// The source and every file an archive of it may leave behind
    pub fn artifacts(source: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let pdf = Self::for_source(source, OutputFormat::Pdf)?;
        let png = Self::for_source(source, OutputFormat::Png)?;
        Ok(vec![pdf.source, pdf.markup, pdf.output, png.output])
    }
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Printable command line with passwords redacted
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        for arg in &self.args {
            match PASSWORD_FLAGS.iter().find(|flag| arg.starts_with(*flag)) {
                Some(flag) => parts.push(format!("{}***", flag)),
                None => parts.push(arg.clone()),
            }
        }
        parts.join(" ")
    }
}

/// Captured result of running an [`Invocation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
}

/// Everything needed to produce one archive
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub paths: ArchivePaths,
    pub markup: String,
    pub invocation: Invocation,
}

impl ArchivePlan {
    /// Markup followed by a comment recording the command line
    pub fn side_file(&self) -> String {
        format!("{}%% {}\n", self.markup, self.invocation.command_line())
    }

    /// Write the side file next to the source PDF
    pub fn write_markup(&self) -> Result<(), ExportError> {
        std::fs::write(&self.paths.markup, self.side_file())?;
        Ok(())
    }

    /// Archive path on success, the tool's raw output otherwise
    pub fn outcome(&self, output: ToolOutput) -> Result<PathBuf, ExportError> {
        if output.success {
            Ok(self.paths.output.clone())
        } else {
            Err(ExportError::ExternalToolFailure {
                output: output.stdout,
            })
        }
    }
}

/// Build the markup and Ghostscript invocation for an archive of `source`.
///
/// Nothing is written; a request for an unknown comment fails before any
/// file is touched.
pub fn plan_archive(
    comments: &[Comment],
    source: &Path,
    request: &ArchiveRequest,
    settings: &ExportSettings,
) -> Result<ArchivePlan, ExportError> {
    // Interactive annotations do not survive rasterisation
    let highlights = request.highlights || request.format == OutputFormat::Png;
    let paths = ArchivePaths::for_source(source, request.format)?;

    let mut args: Vec<String> = vec![
        "-dSAFER".into(),
        "-dBATCH".into(),
        "-dNOPAUSE".into(),
        "-q".into(),
        format!("-sOutputFile={}", paths.output.display()),
        request.format.device().into(),
        "-dPDFSETTINGS=/prepress".into(),
    ];

    if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
        let password = sanitize(password);
        for flag in PASSWORD_FLAGS {
            args.push(format!("{}{}", flag, password));
        }
    }

    let mut page_offset = 0;
    let selected: Cow<'_, [Comment]> = match request.comment_id.as_deref() {
        Some(id) => {
            let thread: Vec<Comment> = comments
                .iter()
                .filter(|c| c.id == id || c.reply_to_id.as_deref() == Some(id))
                .cloned()
                .collect();
            if thread.is_empty() {
                return Err(ExportError::NoMatchingComments(id.to_string()));
            }

            page_offset = thread
                .iter()
                .filter_map(|c| c.page_id)
                .last()
                .unwrap_or(0);

            if request.format == OutputFormat::Png {
                args.push("-r250".into());
            }
            args.push("-dPrinted=false".into());
            args.push(format!("-dFirstPage={}", page_offset + 1));
            args.push(format!("-dLastPage={}", page_offset + 1));
            Cow::Owned(thread)
        }
        None => Cow::Borrowed(comments),
    };

    args.push(paths.markup.display().to_string());
    args.push(paths.source.display().to_string());

    let markup = render_markup(
        &selected,
        &MarkupOptions {
            producer: &settings.producer,
            page_offset,
            highlight_overlay: highlights,
        },
    );

    tracing::debug!(
        "Planned archive of {} ({} comments, page offset {})",
        paths.source.display(),
        selected.len(),
        page_offset
    );

    Ok(ArchivePlan {
        paths,
        markup,
        invocation: Invocation {
            program: settings.ghostscript.clone(),
            args,
        },
    })
}
