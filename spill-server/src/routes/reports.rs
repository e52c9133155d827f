use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spill_shared::errors::{AppError, AppResult, ErrorCode};
use spill_shared::middleware::record_report_filed;
use spill_shared::types::{ApiResponse, ChangeEvent, ChangeKind, Collection};

use crate::device::ClientMeta;
use crate::identity::Voter;
use crate::models::NewReport;
use crate::routes::confessions::ensure_confession_exists;
use crate::schema::confession_reports;
use crate::AppState;

pub const MAX_REASON_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReportReceipt {
    pub id: Uuid,
    pub confession_id: Uuid,
}

pub fn checked_reason(raw: &str) -> AppResult<String> {
    let reason = raw.trim();
    if reason.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyReportReason, "please provide a reason for reporting"));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(AppError::Validation(format!("reason must be at most {MAX_REASON_LEN} characters")));
    }
    Ok(reason.to_string())
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    voter: Voter,
    meta: ClientMeta,
    Path(confession_id): Path<Uuid>,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<Response> {
    let reason = checked_reason(&req.reason)?;

    let mut conn = state.conn()?;
    ensure_confession_exists(&mut conn, confession_id)?;

    let new_report = NewReport {
        id: Uuid::now_v7(),
        confession_id,
        reason,
        reporter_identifier: Some(voter.identity.as_identifier()),
        ip_address: meta.ip_address,
        device_info: meta.device_info,
    };
    diesel::insert_into(confession_reports::table)
        .values(&new_report)
        .execute(&mut conn)?;

    record_report_filed();
    state.publish(ChangeEvent::new(Collection::Reports, ChangeKind::Insert, new_report.id).for_confession(confession_id));
    tracing::info!(confession_id = %confession_id, report_id = %new_report.id, "confession reported");

    Ok(voter.respond(ApiResponse::ok_with_message(
        ReportReceipt { id: new_report.id, confession_id },
        "thank you, the report will be reviewed",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_rules() {
        let blank = checked_reason("  ").unwrap_err();
        assert_eq!(blank.code(), ErrorCode::EmptyReportReason);
        assert_eq!(blank.to_string(), "please provide a reason for reporting");

        assert_eq!(checked_reason(" spam ").unwrap(), "spam");
        assert!(checked_reason(&"r".repeat(501)).is_err());
    }

    #[test]
    fn receipt_hands_new_reporter_identity_back() {
        use crate::identity::{VoterIdentity, IDENTITY_HEADER};

        let receipt = ReportReceipt { id: Uuid::new_v4(), confession_id: Uuid::new_v4() };
        let fresh = Voter {
            identity: VoterIdentity::Anonymous("anon_k3k3k3k3k3k3k".into()),
            issued: Some("anon_k3k3k3k3k3k3k".into()),
        };
        let response = fresh.respond(ApiResponse::ok(receipt));
        assert_eq!(response.headers()[&IDENTITY_HEADER], "anon_k3k3k3k3k3k3k");

        let returning = Voter { identity: VoterIdentity::Anonymous("anon_k3k3k3k3k3k3k".into()), issued: None };
        let receipt = ReportReceipt { id: Uuid::new_v4(), confession_id: Uuid::new_v4() };
        assert!(returning.respond(ApiResponse::ok(receipt)).headers().get(&IDENTITY_HEADER).is_none());
    }
}
