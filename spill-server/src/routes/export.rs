use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use diesel::prelude::*;

use spill_shared::errors::{AppError, AppResult};
use spill_shared::middleware::AdminUser;

use crate::export::{self, ReportExportRow};
use crate::models::Report;
use crate::routes::confessions::load_newest_first;
use crate::schema::{confession_reports, confessions};
use crate::services::analytics;
use crate::AppState;

fn csv_download(kind: &str, body: anyhow::Result<String>) -> AppResult<Response> {
    let body = body.map_err(|e| AppError::internal(format!("csv export failed: {e}")))?;
    let disposition = format!("attachment; filename=\"{}\"", export::file_name(kind, Utc::now()));
    tracing::info!(kind, bytes = body.len(), "csv export generated");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub async fn export_confessions(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let rows = load_newest_first(&mut conn)?;
    csv_download("confessions", export::confessions_csv(&rows))
}

pub async fn export_reports(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let rows: Vec<(Report, Option<String>)> = confession_reports::table
        .left_join(confessions::table)
        .order(confession_reports::created_at.desc())
        .select((Report::as_select(), confessions::title.nullable()))
        .load(&mut conn)?;

    let rows: Vec<ReportExportRow> = rows
        .into_iter()
        .map(|(r, title)| ReportExportRow {
            id: r.id,
            confession_id: r.confession_id,
            confession_title: title,
            reason: r.reason,
            created_at: r.created_at,
            ip_address: r.ip_address,
            device_info: r.device_info,
        })
        .collect();

    csv_download("reports", export::reports_csv(&rows))
}

pub async fn export_analytics(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let report = analytics::load(&mut conn, Utc::now())?;
    csv_download("analytics", export::analytics_csv(&report))
}
