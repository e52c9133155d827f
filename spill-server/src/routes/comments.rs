use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use spill_shared::errors::{AppError, AppResult, ErrorCode};
use spill_shared::middleware::OptionalAuthUser;
use spill_shared::types::{ApiResponse, ChangeEvent, ChangeKind, Collection};

use crate::device::ClientMeta;
use crate::models::{Comment, NewComment, PublicComment};
use crate::routes::confessions::ensure_confession_exists;
use crate::schema::confession_comments;
use crate::AppState;

pub const DEFAULT_COMMENT_AUTHOR: &str = "Anonymous";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(length(max = 50, message = "author name must be at most 50 characters"))]
    pub author_name: Option<String>,
    #[validate(length(max = 1000, message = "comment must be at most 1000 characters"))]
    pub content: String,
}

impl CreateCommentRequest {
    /// Trim and check the request before any store access.
    pub fn checked(self) -> AppResult<(String, String)> {
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyComment, "comment cannot be empty"));
        }
        let req = Self {
            author_name: self.author_name.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            content,
        };
        req.validate()?;
        let author = req.author_name.unwrap_or_else(|| DEFAULT_COMMENT_AUTHOR.to_string());
        Ok((author, req.content))
    }
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(confession_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<PublicComment>>>> {
    let mut conn = state.conn()?;
    ensure_confession_exists(&mut conn, confession_id)?;

    let comments: Vec<Comment> = confession_comments::table
        .filter(confession_comments::confession_id.eq(confession_id))
        .order(confession_comments::created_at.desc())
        .select(Comment::as_select())
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(comments.into_iter().map(Into::into).collect())))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    meta: ClientMeta,
    Path(confession_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<ApiResponse<PublicComment>>> {
    let (author_name, content) = req.checked()?;

    let mut conn = state.conn()?;
    ensure_confession_exists(&mut conn, confession_id)?;

    let new_comment = NewComment {
        id: Uuid::now_v7(),
        confession_id,
        user_id: user.map(|u| u.id),
        author_name,
        content,
        ip_address: meta.ip_address,
        device_info: meta.device_info,
    };
    let comment: Comment = diesel::insert_into(confession_comments::table)
        .values(&new_comment)
        .returning(Comment::as_returning())
        .get_result(&mut conn)?;

    state.publish(ChangeEvent::new(Collection::Comments, ChangeKind::Insert, comment.id).for_confession(confession_id));
    tracing::info!(confession_id = %confession_id, comment_id = %comment.id, "comment added");

    Ok(Json(ApiResponse::ok(comment.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(author: Option<&str>, content: &str) -> CreateCommentRequest {
        CreateCommentRequest { author_name: author.map(String::from), content: content.to_string() }
    }

    #[test]
    fn blank_content_is_rejected() {
        let err = req(None, "   \n").checked().unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyComment);
    }

    #[test]
    fn blank_author_defaults() {
        let (author, content) = req(Some("  "), " hi ").checked().unwrap();
        assert_eq!(author, "Anonymous");
        assert_eq!(content, "hi");
    }

    #[test]
    fn over_long_comment_fails_validation() {
        let err = req(Some("sam"), &"y".repeat(1001)).checked().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
