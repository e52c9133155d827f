use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use diesel::{Connection, PgConnection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spill_shared::errors::{AppError, AppResult, ErrorCode};
use spill_shared::middleware::record_vote;
use spill_shared::types::{ApiResponse, ChangeEvent, ChangeKind, Collection};

use crate::identity::Voter;
use crate::models::VoteKind;
use crate::ranking::votes::{aggregate, apply_vote, load_votes_for, state_for, VoteAction, VoteState, VoteTally};
use crate::routes::confessions::ensure_confession_exists;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub state: VoteState,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub voter_identity: String,
    pub identity_issued: bool,
}

impl VoteResponse {
    fn new(state: VoteState, tally: VoteTally, voter: &Voter) -> Self {
        Self {
            state,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score(),
            voter_identity: voter.identity.as_identifier(),
            identity_issued: voter.is_new(),
        }
    }
}

fn change_kind(action: VoteAction) -> ChangeKind {
    match action {
        VoteAction::Inserted => ChangeKind::Insert,
        VoteAction::Switched => ChangeKind::Update,
        VoteAction::Removed => ChangeKind::Delete,
    }
}

/// Toggle the caller's vote and return the fresh tally.
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    voter: Voter,
    Path(confession_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> AppResult<Response> {
    let kind: VoteKind = req
        .kind
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::InvalidVoteKind, e))?;

    let mut conn = state.conn()?;
    let conn: &mut PgConnection = &mut conn;
    ensure_confession_exists(conn, confession_id)?;

    let change = conn.transaction(|tx| apply_vote(tx, confession_id, &voter.identity, kind))?;

    let tally = aggregate(&load_votes_for(conn, confession_id)?, confession_id);

    record_vote(change.state.as_str());
    state.publish(
        ChangeEvent::new(Collection::Votes, change_kind(change.action), change.vote_id).for_confession(confession_id),
    );
    tracing::info!(
        confession_id = %confession_id,
        state = ?change.state,
        action = ?change.action,
        "vote applied"
    );

    Ok(voter.respond(ApiResponse::ok(VoteResponse::new(change.state, tally, &voter))))
}

pub async fn get_votes(
    State(state): State<Arc<AppState>>,
    voter: Voter,
    Path(confession_id): Path<Uuid>,
) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let conn: &mut PgConnection = &mut conn;
    ensure_confession_exists(conn, confession_id)?;

    let tally = aggregate(&load_votes_for(conn, confession_id)?, confession_id);
    let current = if voter.is_new() {
        VoteState::None
    } else {
        state_for(conn, confession_id, &voter.identity)?
    };

    Ok(voter.respond(ApiResponse::ok(VoteResponse::new(current, tally, &voter))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_change_kinds() {
        assert_eq!(change_kind(VoteAction::Inserted), ChangeKind::Insert);
        assert_eq!(change_kind(VoteAction::Switched), ChangeKind::Update);
        assert_eq!(change_kind(VoteAction::Removed), ChangeKind::Delete);
    }

    #[test]
    fn response_carries_identity() {
        let voter = Voter {
            identity: crate::identity::VoterIdentity::Anonymous("anon_ab12".into()),
            issued: None,
        };
        let resp = VoteResponse::new(VoteState::Down, VoteTally { upvotes: 0, downvotes: 1 }, &voter);
        let value = serde_json::to_value(resp).unwrap();
        assert_eq!(value["state"], "down");
        assert_eq!(value["score"], -1);
        assert_eq!(value["voter_identity"], "anon_ab12");
        assert_eq!(value["identity_issued"], false);
    }

    #[tokio::test]
    async fn issued_identity_matches_header_and_body() {
        use crate::identity::{generate_anonymous_id, VoterIdentity, IDENTITY_HEADER};

        let fresh = generate_anonymous_id();
        let voter = Voter { identity: VoterIdentity::Anonymous(fresh.clone()), issued: Some(fresh.clone()) };
        let body = ApiResponse::ok(VoteResponse::new(VoteState::Up, VoteTally { upvotes: 1, downvotes: 0 }, &voter));
        let response = voter.respond(body);

        assert_eq!(response.headers()[&IDENTITY_HEADER], fresh.as_str());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["data"]["voter_identity"], fresh.as_str());
        assert_eq!(value["data"]["identity_issued"], true);
    }
}
