//! Data models for the review API

use review_export::{Comment, CommentRow, Rect};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Whether a review still accepts comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Open,
    Closed,
}

/// Review stored in database
#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub review_id: String,
    pub owner: String,
    pub closed: bool,
    pub pdf_file: String,
    pub title: String,
}

impl DbReview {
    pub fn status(&self) -> ReviewStatus {
        if self.closed {
            ReviewStatus::Closed
        } else {
            ReviewStatus::Open
        }
    }
}

/// A review as listed for one reader
#[derive(Debug, Clone, Serialize)]
pub struct MyReview {
    pub id: String,
    /// Whether the reader owns the review
    pub owner: bool,
    pub title: String,
    pub closed: bool,
    pub pdf: String,
}

impl MyReview {
    pub fn for_reader(review: DbReview, reader: &str) -> Self {
        Self {
            owner: review.owner == reader,
            id: review.review_id,
            title: review.title,
            closed: review.closed,
            pdf: review.pdf_file,
        }
    }
}

/// A review as listed for administrators
#[derive(Debug, Clone, Serialize)]
pub struct ReviewInfo {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub closed: bool,
    pub pdf: String,
}

impl From<DbReview> for ReviewInfo {
    fn from(review: DbReview) -> Self {
        Self {
            id: review.review_id,
            owner: review.owner,
            title: review.title,
            closed: review.closed,
            pdf: review.pdf_file,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewList<T> {
    pub reviews: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "reviewId")]
    pub review_id: String,
    pub title: String,
}

/// Activity log entry stored in database
#[derive(Debug, Clone, FromRow)]
pub struct DbActivity {
    pub id: i64,
    pub review_id: String,
    pub owner: String,
    pub msg: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// Review the activity belongs to
    pub id: String,
    pub owner: String,
    pub timestamp: i64,
    pub msg: String,
}

impl From<DbActivity> for ActivityEntry {
    fn from(row: DbActivity) -> Self {
        Self {
            id: row.review_id,
            owner: row.owner,
            timestamp: row.timestamp,
            msg: row.msg,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityList {
    pub activity: Vec<ActivityEntry>,
}

/// Comment joined with the requesting user's read marker
#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub hash: String,
    pub author: String,
    pub page_id: Option<i64>,
    pub kind: Option<String>,
    pub msg: String,
    pub status: String,
    pub rects: Option<String>,
    pub reply_to_id: Option<String>,
    pub timestamp: i64,
    pub deleted: bool,
    pub my_read: Option<bool>,
}

impl From<DbComment> for CommentRow {
    fn from(row: DbComment) -> Self {
        CommentRow {
            hash: row.hash,
            author: row.author,
            page_id: row.page_id,
            kind: row.kind,
            msg: row.msg,
            status: Some(row.status),
            rects: row.rects,
            reply_to_id: row.reply_to_id,
            timestamp: Some(row.timestamp),
            deleted: row.deleted,
            my_read: row.my_read,
        }
    }
}

/// Comment list for one review
#[derive(Debug, Clone, Serialize)]
pub struct CommentListResponse {
    pub title: String,
    pub comments: Vec<Comment>,
    pub status: ReviewStatus,
}

/// Comment submitted by a client
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    /// Client-generated id; one is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "pageId", default)]
    pub page_id: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub rects: Option<Vec<Rect>>,
    #[serde(rename = "replyToId", default)]
    pub reply_to_id: Option<String>,
}

impl NewComment {
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to_id.as_deref().filter(|id| !id.is_empty())
    }

    /// A comment must either reply to another or be placed on the page
    pub fn is_placed(&self) -> bool {
        self.reply_to().is_some() || self.rects.as_ref().is_some_and(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCommentResponse {
    pub id: String,
    /// Set when a comment with this id was already stored
    pub ignored: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageUpdate {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadMarker {
    pub read: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "as")]
    pub format: String,
}

/// Archive options, from a query string or a form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveParams {
    #[serde(default)]
    pub commentid: Option<String>,
    #[serde(default, alias = "output_format")]
    pub format: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub highlights: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResponse {
    pub url: String,
}
