//! Nested reply-tree export (JSON), independent of the markup path

use serde::Serialize;

use crate::comment::{Comment, Rect, ReplyIndex, MAX_THREAD_DEPTH, NO_STATUS};

/// One node of an exported thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedComment {
    pub id: Option<String>,
    pub author: String,
    pub msg: String,
    pub status: String,
    #[serde(rename = "secs_UTC")]
    pub secs_utc: Option<i64>,
    pub read: bool,
    pub owner: bool,
    #[serde(rename = "pageId")]
    pub page_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub rects: Option<Vec<Rect>>,
    pub replies: Vec<ExportedComment>,
}

impl ExportedComment {
    /// Node for an id that resolved to nothing
    fn placeholder() -> Self {
        Self {
            id: None,
            author: "Anonymous".to_string(),
            msg: String::new(),
            status: NO_STATUS.to_string(),
            secs_utc: None,
            read: true,
            owner: false,
            page_id: None,
            kind: "reply".to_string(),
            rects: None,
            replies: Vec::new(),
        }
    }

    fn from_comment(comment: &Comment) -> Self {
        Self {
            id: Some(comment.id.clone()),
            author: comment.author.clone(),
            msg: comment.msg.clone(),
            status: comment.status.clone(),
            secs_utc: comment.secs_utc,
            read: !comment.unread,
            owner: comment.owner,
            page_id: comment.page_id,
            kind: comment
                .kind
                .clone()
                .unwrap_or_else(|| "reply".to_string()),
            rects: Some(comment.rects.clone()),
            replies: Vec::new(),
        }
    }
}

/// Export every non-deleted root comment with its reply tree
pub fn export_thread(comments: &[Comment]) -> Vec<ExportedComment> {
    let index = ReplyIndex::new(comments);
    comments
        .iter()
        .filter(|c| c.is_anchored())
        .map(|c| export_node(comments, &index, &c.id, 0))
        .collect()
}

/// Export the comment `id` and everything replying to it
pub fn export_comment(comments: &[Comment], id: &str) -> ExportedComment {
    let index = ReplyIndex::new(comments);
    export_node(comments, &index, id, 0)
}

fn export_node(
    comments: &[Comment],
    index: &ReplyIndex<'_>,
    id: &str,
    depth: usize,
) -> ExportedComment {
    let mut node = comments
        .iter()
        .find(|c| c.id == id)
        .map(ExportedComment::from_comment)
        .unwrap_or_else(ExportedComment::placeholder);

    if depth < MAX_THREAD_DEPTH {
        node.replies = index
            .replies_to(id)
            .map(|reply| export_node(comments, index, &reply.id, depth + 1))
            .collect();
    } else {
        tracing::warn!("Reply thread below {} exceeds maximum depth", id);
    }

    node
}
