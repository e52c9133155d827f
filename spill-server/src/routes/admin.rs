use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spill_shared::errors::{AppError, AppResult, ErrorCode};
use spill_shared::middleware::AdminUser;
use spill_shared::types::{ApiResponse, ChangeEvent, ChangeKind, Collection, Deleted};

use crate::models::{Confession, Report};
use crate::routes::confessions::load_newest_first;
use crate::schema::{confession_reports, confessions};
use crate::AppState;

const IDENTIFIER_PREVIEW: usize = 8;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AdminReportView {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub confession_title: String,
    pub confession_author: String,
    pub reason: String,
    pub reporter: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `anon_ab12cd34ef` -> `anon_ab1...`
pub fn preview_identifier(identifier: &str) -> String {
    if identifier.chars().count() <= IDENTIFIER_PREVIEW {
        return identifier.to_string();
    }
    let head: String = identifier.chars().take(IDENTIFIER_PREVIEW).collect();
    format!("{head}...")
}

fn publish_confession_deleted(state: &AppState, id: Uuid) {
    state.publish(ChangeEvent::new(Collection::Confessions, ChangeKind::Delete, id));
}

pub async fn list_confessions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Vec<Confession>>>> {
    let mut conn = state.conn()?;
    Ok(Json(ApiResponse::ok(load_newest_first(&mut conn)?)))
}

pub async fn delete_confession(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    let mut conn = state.conn()?;
    let deleted = diesel::delete(confessions::table.find(id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::confession_not_found());
    }

    publish_confession_deleted(&state, id);
    tracing::info!(admin_id = %admin.id, confession_id = %id, "confession deleted");

    Ok(Json(ApiResponse::ok(Deleted { deleted })))
}

pub async fn bulk_delete_confessions(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<BulkDeleteRequest>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    if req.ids.is_empty() {
        return Err(AppError::new(ErrorCode::NothingSelected, "no confessions selected"));
    }

    let mut conn = state.conn()?;
    let removed: Vec<Uuid> = diesel::delete(confessions::table.filter(confessions::id.eq_any(&req.ids)))
        .returning(confessions::id)
        .get_results(&mut conn)?;

    for id in &removed {
        publish_confession_deleted(&state, *id);
    }
    tracing::info!(admin_id = %admin.id, requested = req.ids.len(), deleted = removed.len(), "bulk delete");

    Ok(Json(ApiResponse::ok(Deleted { deleted: removed.len() })))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Vec<AdminReportView>>>> {
    let mut conn = state.conn()?;
    let rows: Vec<(Report, String, String)> = confession_reports::table
        .inner_join(confessions::table)
        .order(confession_reports::created_at.desc())
        .select((Report::as_select(), confessions::title, confessions::author_name))
        .load(&mut conn)?;

    let reports = rows
        .into_iter()
        .map(|(r, title, author)| AdminReportView {
            id: r.id,
            confession_id: r.confession_id,
            confession_title: title,
            confession_author: author,
            reason: r.reason,
            reporter: r.reporter_identifier.as_deref().map(preview_identifier),
            ip_address: r.ip_address,
            device_info: r.device_info,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(reports)))
}

pub async fn dismiss_report(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    let mut conn = state.conn()?;
    let confession_id: Uuid = diesel::delete(confession_reports::table.find(id))
        .returning(confession_reports::confession_id)
        .get_result(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))?;

    state.publish(ChangeEvent::new(Collection::Reports, ChangeKind::Delete, id).for_confession(confession_id));
    tracing::info!(admin_id = %admin.id, report_id = %id, "report dismissed");

    Ok(Json(ApiResponse::ok(Deleted { deleted: 1 })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_shortened() {
        assert_eq!(preview_identifier("anon_k2j4h5g6f7d8s"), "anon_k2j...");
        assert_eq!(preview_identifier("anon_ab1"), "anon_ab1");
        assert_eq!(preview_identifier(""), "");
    }
}
