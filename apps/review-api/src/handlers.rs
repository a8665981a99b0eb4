//! HTTP handlers for the review API

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use chrono::Utc;
use review_export::escape::{escape_html, sanitize};
use review_export::{
    export_thread, plan_archive, ArchivePaths, ArchiveRequest, Comment, CommentRow, ExportError,
    ExportedComment, OutputFormat,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::feed::ReviewFeed;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

async fn load_review(state: &AppState, review_id: &str) -> Result<DbReview, ApiError> {
    let review: Option<DbReview> = sqlx::query_as(
        r#"
        SELECT review_id, owner, closed, pdf_file, title
        FROM reviews
        WHERE review_id = ?
        "#,
    )
    .bind(review_id)
    .fetch_optional(&state.db)
    .await?;

    review.ok_or_else(|| ExportError::NotFound(review_id.to_string()).into())
}

async fn load_open_review(state: &AppState, review_id: &str) -> Result<DbReview, ApiError> {
    let review = load_review(state, review_id).await?;
    if review.closed {
        return Err(ApiError::ReviewClosed(review_id.to_string()));
    }
    Ok(review)
}

/// All comments of a review in insertion order, as seen by `user`
pub async fn load_comments(
    state: &AppState,
    review_id: &str,
    user: &CurrentUser,
) -> Result<Vec<Comment>, ApiError> {
    let rows: Vec<DbComment> = sqlx::query_as(
        r#"
        SELECT c.hash, c.author, c.page_id, c.kind, c.msg, c.status, c.rects,
               c.reply_to_id, c.timestamp, c.deleted, r.is_read AS my_read
        FROM comments c
        LEFT JOIN myread r
            ON c.hash = r.comment_hash AND c.review_id = r.review_id AND r.reader = ?
        WHERE c.review_id = ?
        ORDER BY c.id ASC
        "#,
    )
    .bind(&user.email)
    .bind(review_id)
    .fetch_all(&state.db)
    .await?;

    let viewer = user.viewer();
    Ok(rows
        .into_iter()
        .map(|row| CommentRow::from(row).into_comment(&viewer))
        .collect())
}

async fn record_activity(
    state: &AppState,
    review_id: &str,
    user: &CurrentUser,
    msg: String,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO activity (review_id, owner, msg, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(review_id)
    .bind(&user.email)
    .bind(msg)
    .bind(Utc::now().timestamp())
    .execute(&state.db)
    .await?;
    Ok(())
}

/// List a review's comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let review = load_review(&state, &review_id).await?;
    let comments = load_comments(&state, &review_id, &user).await?;

    Ok(Json(CommentListResponse {
        status: review.status(),
        title: review.title,
        comments,
    }))
}

/// Add a comment or reply
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<AddCommentResponse>), ApiError> {
    if !req.is_placed() {
        return Err(ApiError::InvalidRequest(
            "Missing parameters for comment".into(),
        ));
    }
    load_open_review(&state, &review_id).await?;

    let comment_id = req
        .id
        .as_deref()
        .map(sanitize)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()));

    // Interrupted client syncs may upload the same comment twice
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT hash FROM comments WHERE hash = ? AND review_id = ?")
            .bind(&comment_id)
            .bind(&review_id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        tracing::debug!("Ignoring duplicate comment {} on {}", comment_id, review_id);
        return Ok((
            StatusCode::OK,
            Json(AddCommentResponse {
                id: comment_id,
                ignored: true,
            }),
        ));
    }

    let msg = sanitize(&req.msg);
    let rects_json = req
        .rects
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Internal(e.into()))?;

    sqlx::query(
        r#"
        INSERT INTO comments (hash, review_id, author, page_id, kind, msg, status, rects, reply_to_id, timestamp, deleted)
        VALUES (?, ?, ?, ?, ?, ?, 'None', ?, ?, ?, 0)
        "#,
    )
    .bind(&comment_id)
    .bind(&review_id)
    .bind(&user.display_name)
    .bind(req.page_id)
    .bind(req.kind.as_deref().map(sanitize))
    .bind(&msg)
    .bind(rects_json)
    .bind(req.reply_to().map(sanitize))
    .bind(Utc::now().timestamp())
    .execute(&state.db)
    .await?;

    let action = if req.reply_to().is_some() {
        "replied to a comment"
    } else {
        "added a comment"
    };
    record_activity(
        &state,
        &review_id,
        &user,
        format!(
            "<b>{}</b> {}: {}",
            escape_html(&user.display_name),
            action,
            escape_html(&msg)
        ),
    )
    .await?;

    tracing::info!("Added comment {} to review {}", comment_id, review_id);

    Ok((
        StatusCode::CREATED,
        Json(AddCommentResponse {
            id: comment_id,
            ignored: false,
        }),
    ))
}

/// Soft-delete one of the requesting user's comments
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((review_id, comment_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    load_open_review(&state, &review_id).await?;

    let result = sqlx::query(
        "UPDATE comments SET deleted = 1 WHERE hash = ? AND review_id = ? AND author = ?",
    )
    .bind(&comment_id)
    .bind(&review_id)
    .bind(&user.display_name)
    .execute(&state.db)
    .await?;

    if result.rows_affected() > 0 {
        record_activity(
            &state,
            &review_id,
            &user,
            format!("<b>{}</b> deleted a comment.", escape_html(&user.display_name)),
        )
        .await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Set a comment's status label. Allowed on closed reviews.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path((review_id, comment_id)): Path<(String, String)>,
    Json(req): Json<StatusUpdate>,
) -> Result<StatusCode, ApiError> {
    load_review(&state, &review_id).await?;

    sqlx::query("UPDATE comments SET status = ? WHERE hash = ? AND review_id = ?")
        .bind(sanitize(&req.status))
        .bind(&comment_id)
        .bind(&review_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Edit the message of one of the requesting user's comments
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((review_id, comment_id)): Path<(String, String)>,
    Json(req): Json<MessageUpdate>,
) -> Result<StatusCode, ApiError> {
    load_open_review(&state, &review_id).await?;

    let msg = sanitize(&req.message);
    let result = sqlx::query(
        "UPDATE comments SET msg = ? WHERE hash = ? AND review_id = ? AND author = ?",
    )
    .bind(&msg)
    .bind(&comment_id)
    .bind(&review_id)
    .bind(&user.display_name)
    .execute(&state.db)
    .await?;

    if result.rows_affected() > 0 {
        record_activity(
            &state,
            &review_id,
            &user,
            format!(
                "<b>{}</b> updated a comment's message. New message: {}",
                escape_html(&user.display_name),
                escape_html(&msg)
            ),
        )
        .await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Mark a comment read or unread for the requesting user
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((review_id, comment_id)): Path<(String, String)>,
    Json(req): Json<ReadMarker>,
) -> Result<StatusCode, ApiError> {
    load_review(&state, &review_id).await?;

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM myread WHERE comment_hash = ? AND review_id = ? AND reader = ?")
        .bind(&comment_id)
        .bind(&review_id)
        .bind(&user.email)
        .execute(&mut *tx)
        .await?;

    if req.read {
        sqlx::query(
            "INSERT INTO myread (comment_hash, review_id, reader, is_read) VALUES (?, ?, ?, 1)",
        )
        .bind(&comment_id)
        .bind(&review_id)
        .bind(&user.email)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_closed(
    state: &AppState,
    user: &CurrentUser,
    review_id: &str,
    closed: bool,
) -> Result<StatusCode, ApiError> {
    let review = load_review(state, review_id).await?;
    if review.owner != user.email {
        return Err(ApiError::NotOwner(if closed { "close" } else { "reopen" }));
    }

    sqlx::query("UPDATE reviews SET closed = ? WHERE review_id = ?")
        .bind(closed)
        .bind(review_id)
        .execute(&state.db)
        .await?;

    tracing::info!("Review {} closed: {}", review_id, closed);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn close_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_closed(&state, &user, &review_id, true).await
}

pub async fn reopen_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_closed(&state, &user, &review_id, false).await
}

/// Export the comment threads as nested JSON
pub async fn export_comments(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Vec<ExportedComment>>, ApiError> {
    if query.format != "json" {
        return Err(ApiError::InvalidRequest(format!(
            "Invalid requested output format: {}",
            query.format
        )));
    }

    load_review(&state, &review_id).await?;
    let comments = load_comments(&state, &review_id, &user).await?;
    Ok(Json(export_thread(&comments)))
}

pub async fn archive_get(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
    Query(params): Query<ArchiveParams>,
) -> Result<Json<ArchiveResponse>, ApiError> {
    archive(&state, &user, &review_id, params).await
}

pub async fn archive_post(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
    Form(params): Form<ArchiveParams>,
) -> Result<Json<ArchiveResponse>, ApiError> {
    archive(&state, &user, &review_id, params).await
}

/// Render the review, or one comment thread, into an annotated PDF or PNG
async fn archive(
    state: &AppState,
    user: &CurrentUser,
    review_id: &str,
    params: ArchiveParams,
) -> Result<Json<ArchiveResponse>, ApiError> {
    let review = load_review(state, review_id).await?;
    let comments = load_comments(state, review_id, user).await?;

    let request = ArchiveRequest {
        format: OutputFormat::parse(params.format.as_deref()),
        password: params.password,
        highlights: params.highlights,
        comment_id: params.commentid.filter(|id| !id.is_empty()),
    };

    let plan = plan_archive(
        &comments,
        FsPath::new(&review.pdf_file),
        &request,
        &state.export_settings(),
    )?;

    // Exports of the same review share this side file
    let plan = tokio::task::spawn_blocking(move || plan.write_markup().map(|()| plan))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let output = state.runner.run(&plan.invocation).await;
    let archive = plan.outcome(output)?;

    tracing::info!("Archived review {} to {}", review_id, archive.display());

    Ok(Json(ArchiveResponse {
        url: archive.display().to_string(),
    }))
}

/// Upload a PDF and open a review on it, owned by the uploader
pub async fn upload_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(sanitize).unwrap_or_default();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read file data: {}", e)))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) = upload
        .filter(|(filename, _)| !filename.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Missing parameters: filename".into()))?;
    if !data.starts_with(b"%PDF") {
        return Err(ApiError::InvalidRequest("Uploaded file is not a PDF".into()));
    }

    let pdf_dir = &state.config.pdf_path;
    tokio::fs::create_dir_all(pdf_dir)
        .await
        .map_err(ExportError::from)?;
    let pdf_file = loop {
        let candidate = pdf_dir.join(format!(
            "{}{}.pdf",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ));
        if !tokio::fs::try_exists(&candidate)
            .await
            .map_err(ExportError::from)?
        {
            break candidate;
        }
    };
    tokio::fs::write(&pdf_file, &data)
        .await
        .map_err(ExportError::from)?;

    let title = unique_title(&state, &filename).await?;
    let review_id = Uuid::new_v4().simple().to_string()[..16].to_string();

    sqlx::query(
        r#"
        INSERT INTO reviews (review_id, owner, closed, pdf_file, title)
        VALUES (?, ?, 0, ?, ?)
        "#,
    )
    .bind(&review_id)
    .bind(&user.email)
    .bind(pdf_file.display().to_string())
    .bind(&title)
    .execute(&state.db)
    .await?;
    follow(&state, &review_id, &user).await?;

    tracing::info!("Created review {} ({} bytes) for {}", review_id, data.len(), user.email);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse { review_id, title }),
    ))
}

/// Title not yet used by another review: `title`, `title - #1`, ...
async fn unique_title(state: &AppState, title: &str) -> Result<String, ApiError> {
    for n in 0..50 {
        let candidate = match n {
            0 => title.to_string(),
            n => format!("{} - #{}", title, n),
        };
        let (taken,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE title = ?")
            .bind(&candidate)
            .fetch_one(&state.db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Ok(format!("{} - one of many", title))
}

async fn follow(state: &AppState, review_id: &str, user: &CurrentUser) -> Result<(), ApiError> {
    sqlx::query("INSERT OR IGNORE INTO myreviews (review_id, reader) VALUES (?, ?)")
        .bind(review_id)
        .bind(&user.email)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Reviews on the requesting user's list, newest id first
pub async fn list_my_reviews(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ReviewList<MyReview>>, ApiError> {
    let rows: Vec<DbReview> = sqlx::query_as(
        r#"
        SELECT r.review_id, r.owner, r.closed, r.pdf_file, r.title
        FROM reviews r
        JOIN myreviews m ON r.review_id = m.review_id
        WHERE m.reader = ?
        ORDER BY r.review_id DESC
        "#,
    )
    .bind(&user.email)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ReviewList {
        reviews: rows
            .into_iter()
            .map(|review| MyReview::for_reader(review, &user.email))
            .collect(),
    }))
}

/// Put a review on the requesting user's list
pub async fn follow_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_review(&state, &review_id).await?;
    follow(&state, &review_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a review off the requesting user's list. Owners must delete instead.
pub async fn unfollow_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let review = load_review(&state, &review_id).await?;
    if review.owner == user.email {
        return Err(ApiError::InvalidRequest(
            "As an owner, you must close or delete a review instead of just removing it from your list"
                .into(),
        ));
    }

    sqlx::query("DELETE FROM myreviews WHERE review_id = ? AND reader = ?")
        .bind(&review_id)
        .bind(&user.email)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a review, its PDF, its archives and everything recorded against it
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let review = load_review(&state, &review_id).await?;
    if review.owner != user.email {
        return Err(ApiError::NotOwner("delete"));
    }

    match ArchivePaths::artifacts(FsPath::new(&review.pdf_file)) {
        Ok(files) => {
            for file in files {
                remove_if_present(&file).await?;
            }
        }
        Err(e) => tracing::warn!("Keeping files of review {}: {}", review_id, e),
    }

    let mut tx = state.db.begin().await?;
    for table in ["reviews", "comments", "myread", "myreviews", "activity"] {
        let sql = format!("DELETE FROM {} WHERE review_id = ?", table);
        sqlx::query(&sql)
            .bind(&review_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Deleted review {}", review_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_if_present(path: &FsPath) -> Result<(), ApiError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExportError::from(e).into()),
    }
}

/// Every review, for administrators
pub async fn all_reviews(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ReviewList<ReviewInfo>>, ApiError> {
    if !state.config.is_admin(&user.email) {
        return Err(ApiError::NotAdmin);
    }

    let rows: Vec<DbReview> = sqlx::query_as(
        "SELECT review_id, owner, closed, pdf_file, title FROM reviews ORDER BY id ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ReviewList {
        reviews: rows.into_iter().map(ReviewInfo::from).collect(),
    }))
}

/// The whole activity log, for administrators
pub async fn all_activity(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ActivityList>, ApiError> {
    if !state.config.is_admin(&user.email) {
        return Err(ApiError::NotAdmin);
    }

    let rows: Vec<DbActivity> = sqlx::query_as(
        "SELECT id, review_id, owner, msg, timestamp FROM activity ORDER BY id ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ActivityList {
        activity: rows.into_iter().map(ActivityEntry::from).collect(),
    }))
}

/// RSS feed of other users' activity on a review
pub async fn review_feed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(review_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let title: Option<(String,)> = sqlx::query_as("SELECT title FROM reviews WHERE review_id = ?")
        .bind(&review_id)
        .fetch_optional(&state.db)
        .await?;

    let activity: Vec<DbActivity> = sqlx::query_as(
        r#"
        SELECT id, review_id, owner, msg, timestamp
        FROM activity
        WHERE review_id = ? AND owner != ?
        ORDER BY id ASC
        "#,
    )
    .bind(&review_id)
    .bind(&user.email)
    .fetch_all(&state.db)
    .await?;

    let link = state.config.review_url(&review_id);
    let xml = ReviewFeed {
        review_id: &review_id,
        title: title.as_ref().map(|(title,)| title.as_str()),
        link: &link,
        branding: &state.config.branding,
    }
    .render(&activity)?;

    Ok(([(header::CONTENT_TYPE, "application/rss+xml")], xml))
}
