//! Annotation export for PDF reviews
//!
//! Turns a review's flat comment list into:
//! - a nested reply tree for JSON export (`tree`)
//! - pdfmark markup that Ghostscript burns into an archive PDF or PNG (`markup`)
//! - the Ghostscript invocation that renders it (`archive`)
//!
//! Everything here is synchronous and works on an immutable snapshot of the
//! comments. Running the tool is left to the caller.

pub mod archive;
pub mod comment;
pub mod error;
pub mod escape;
pub mod geometry;
pub mod markup;
pub mod tree;

pub use archive::{
    plan_archive, ArchivePaths, ArchivePlan, ArchiveRequest, ExportSettings, Invocation,
    OutputFormat, ToolOutput,
};
pub use comment::{AnnotationKind, Comment, CommentRow, Rect, ReplyIndex, Viewer};
pub use error::ExportError;
pub use geometry::{place, BoundingBox, Placement};
pub use markup::{render_markup, MarkupOptions};
pub use tree::{export_comment, export_thread, ExportedComment};
