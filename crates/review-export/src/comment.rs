//! Comment model as consumed by the export engine
//!
//! Comments arrive from the data layer as flat rows. The reply forest is kept
//! as that flat arena and navigated by id through [`ReplyIndex`], so no
//! parent/child references are ever stored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status value meaning "no status badge"
pub const NO_STATUS: &str = "None";

/// Maximum reply nesting followed by any thread walk
pub const MAX_THREAD_DEPTH: usize = 50;

/// Rectangle in PDF user-space points.
///
/// Corners are not guaranteed to be min/max ordered: `tl` may well be the
/// numerically lower corner depending on how the client captured it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub tl: [f64; 2],
    pub br: [f64; 2],
}

impl Rect {
    pub fn new(tl: [f64; 2], br: [f64; 2]) -> Self {
        Self { tl, br }
    }
}

/// Annotation subtype a root comment is rendered as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Highlight,
    StrikeOut,
    Text,
}

impl AnnotationKind {
    /// Map a comment `type` to its annotation subtype. Unknown or missing
    /// types fall back to a plain text note.
    pub fn of(kind: Option<&str>) -> Self {
        match kind {
            Some("highlight") => AnnotationKind::Highlight,
            Some("strike") => AnnotationKind::StrikeOut,
            _ => AnnotationKind::Text,
        }
    }

    /// Whether the subtype is drawn over text runs (and so carries quad-points)
    pub fn is_markup(self) -> bool {
        matches!(self, AnnotationKind::Highlight | AnnotationKind::StrikeOut)
    }

    pub fn subtype(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "Highlight",
            AnnotationKind::StrikeOut => "StrikeOut",
            AnnotationKind::Text => "Text",
        }
    }

    /// Fill colour as PostScript RGB components
    pub fn color(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "1 0.95 0.66", // fff2a8
            AnnotationKind::StrikeOut => "1 0.7 0.7",   // ffb7b7
            AnnotationKind::Text => "1 0.95 0.66",
        }
    }
}

/// A comment as seen by one requesting user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub msg: String,
    pub status: String,
    #[serde(rename = "secs_UTC")]
    pub secs_utc: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub rects: Vec<Rect>,
    #[serde(default)]
    pub owner: bool,
    #[serde(rename = "pageId", default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "replyToId", default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unread: bool,
}

impl Comment {
    /// Root comments are anchored to a page; replies inherit their placement.
    pub fn is_root(&self) -> bool {
        self.reply_to_id.is_none()
    }

    /// Non-deleted root comment, i.e. one that gets its own annotation
    pub fn is_anchored(&self) -> bool {
        self.is_root() && !self.deleted
    }

    pub fn annotation_kind(&self) -> AnnotationKind {
        AnnotationKind::of(self.kind.as_deref())
    }

    pub fn has_status(&self) -> bool {
        self.status != NO_STATUS
    }
}

/// The user a comment list is being prepared for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub email: String,
    pub display_name: String,
}

/// Raw comment row as returned by the data layer
#[derive(Debug, Clone, Default)]
pub struct CommentRow {
    pub hash: String,
    pub author: String,
    pub page_id: Option<i64>,
    pub kind: Option<String>,
    pub msg: String,
    pub status: Option<String>,
    /// JSON-encoded `[{tl:[x,y], br:[x,y]}, ...]`
    pub rects: Option<String>,
    pub reply_to_id: Option<String>,
    pub timestamp: Option<i64>,
    pub deleted: bool,
    /// Read marker of the viewer, if any
    pub my_read: Option<bool>,
}

impl CommentRow {
    pub fn into_comment(self, viewer: &Viewer) -> Comment {
        let rects = match self.rects.as_deref() {
            Some(json) => parse_rects(&self.hash, json),
            None => Vec::new(),
        };
        let owner = self.author == viewer.display_name;

        Comment {
            unread: !(self.my_read.unwrap_or(false) || owner),
            id: self.hash,
            author: self.author,
            msg: self.msg,
            status: self.status.unwrap_or_else(|| NO_STATUS.to_string()),
            secs_utc: self.timestamp,
            deleted: self.deleted,
            rects,
            owner,
            page_id: self.page_id,
            kind: self.kind,
            reply_to_id: self.reply_to_id.filter(|id| !id.is_empty()),
        }
    }
}

/// Parse a stored rectangle list. A malformed list only costs this comment
/// its placement, never the whole export.
fn parse_rects(comment_id: &str, json: &str) -> Vec<Rect> {
    match serde_json::from_str::<Vec<Rect>>(json) {
        Ok(rects) => rects,
        Err(e) => {
            tracing::warn!("Malformed rects on comment {}: {}", comment_id, e);
            Vec::new()
        }
    }
}

/// Children of each comment, in input order
pub struct ReplyIndex<'a> {
    children: HashMap<&'a str, Vec<&'a Comment>>,
}

impl<'a> ReplyIndex<'a> {
    pub fn new(comments: &'a [Comment]) -> Self {
        let mut children: HashMap<&str, Vec<&Comment>> = HashMap::new();
        for comment in comments {
            if let Some(parent) = comment.reply_to_id.as_deref() {
                children.entry(parent).or_default().push(comment);
            }
        }
        Self { children }
    }

    /// Non-deleted direct replies to `id`
    pub fn replies_to(&self, id: &str) -> impl Iterator<Item = &'a Comment> + '_ {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|c| !c.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> Viewer {
        Viewer {
            email: "ann@example.com".to_string(),
            display_name: "Ann".to_string(),
        }
    }

    fn row(hash: &str, author: &str) -> CommentRow {
        CommentRow {
            hash: hash.to_string(),
            author: author.to_string(),
            msg: "hello".to_string(),
            status: Some("None".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_row_parses_rects() {
        let mut r = row("c1", "Bob");
        r.rects = Some(r#"[{"tl":[10,20],"br":[30,5.5]}]"#.to_string());
        let c = r.into_comment(&viewer());
        assert_eq!(c.rects, vec![Rect::new([10.0, 20.0], [30.0, 5.5])]);
    }

    #[test]
    fn test_malformed_rects_become_empty() {
        let mut r = row("c1", "Bob");
        r.rects = Some(r#"{"tl":"nope"}"#.to_string());
        let c = r.into_comment(&viewer());
        assert!(c.rects.is_empty());
    }

    #[test]
    fn test_owner_and_unread_follow_viewer() {
        let own = row("c1", "Ann").into_comment(&viewer());
        assert!(own.owner);
        assert!(!own.unread);

        let other = row("c2", "Bob").into_comment(&viewer());
        assert!(!other.owner);
        assert!(other.unread);

        let mut read = row("c3", "Bob");
        read.my_read = Some(true);
        assert!(!read.into_comment(&viewer()).unread);
    }

    #[test]
    fn test_empty_reply_to_is_root() {
        let mut r = row("c1", "Bob");
        r.reply_to_id = Some(String::new());
        assert!(r.into_comment(&viewer()).is_root());
    }

    #[test]
    fn test_missing_status_defaults_to_none() {
        let mut r = row("c1", "Bob");
        r.status = None;
        let c = r.into_comment(&viewer());
        assert_eq!(c.status, NO_STATUS);
        assert!(!c.has_status());
    }

    #[test]
    fn test_annotation_kind_mapping() {
        assert_eq!(AnnotationKind::of(Some("highlight")), AnnotationKind::Highlight);
        assert_eq!(AnnotationKind::of(Some("strike")), AnnotationKind::StrikeOut);
        assert_eq!(AnnotationKind::of(Some("text")), AnnotationKind::Text);
        assert_eq!(AnnotationKind::of(Some("squiggle")), AnnotationKind::Text);
        assert_eq!(AnnotationKind::of(None), AnnotationKind::Text);
    }

    #[test]
    fn test_reply_index_skips_deleted() {
        let mut a = row("a", "Bob").into_comment(&viewer());
        a.page_id = Some(0);
        let mut b = row("b", "Bob").into_comment(&viewer());
        b.reply_to_id = Some("a".to_string());
        let mut d = row("d", "Bob").into_comment(&viewer());
        d.reply_to_id = Some("a".to_string());
        d.deleted = true;
        let comments = vec![a, b, d];

        let index = ReplyIndex::new(&comments);
        let ids: Vec<&str> = index.replies_to("a").map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(index.replies_to("missing").count(), 0);
    }
}
