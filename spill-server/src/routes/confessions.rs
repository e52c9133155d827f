use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use diesel::dsl::count_star;
use diesel::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use spill_shared::errors::{AppError, AppResult};
use spill_shared::middleware::{record_confession_created, OptionalAuthUser};
use spill_shared::types::{ApiResponse, ChangeEvent, ChangeKind, Collection};

use crate::device::ClientMeta;
use crate::identity::Voter;
use crate::models::{Confession, NewConfession, PublicConfession};
use crate::ranking::tags::{available_tags, filter_by_tags, normalize_tags, parse_tag_query, MAX_TAGS, MAX_TAG_LEN};
use crate::ranking::votes::{aggregate, load_all_votes, load_votes_for, state_for, tally_all, VoteState, VoteTally};
use crate::schema::{confession_comments, confessions};
use crate::AppState;

const SLUG_TITLE_MAX: usize = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConfessionRequest {
    #[serde(default)]
    #[validate(length(max = 50, message = "author name must be at most 50 characters"))]
    pub author_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "title must be between 1 and 100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "content must be between 1 and 2000 characters"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateConfessionRequest {
    fn trimmed(self) -> Self {
        Self {
            author_name: self.author_name.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            tags: self.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tags: Option<String>,
}

/// A confession with its counters, as returned by list and detail endpoints.
#[derive(Debug, Serialize)]
pub struct ConfessionView {
    #[serde(flatten)]
    pub confession: PublicConfession,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub comment_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_state: Option<VoteState>,
}

impl ConfessionView {
    pub fn new(confession: PublicConfession, tally: VoteTally, comment_count: i64) -> Self {
        Self {
            confession,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score(),
            comment_count,
            vote_state: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfessionList {
    pub confessions: Vec<ConfessionView>,
    pub available_tags: Vec<String>,
}

pub fn default_author_name() -> String {
    format!("Anonymous User #{}", rand::thread_rng().gen_range(0..10_000))
}

/// `my-title-3fa8c2d1`: kebab-cased title plus the last 8 hex digits of the id.
pub fn make_slug(title: &str, id: Uuid) -> String {
    let mut kebab = String::with_capacity(title.len());
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            kebab.push(ch);
        } else if !kebab.ends_with('-') && !kebab.is_empty() {
            kebab.push('-');
        }
    }
    let mut kebab: String = kebab.chars().take(SLUG_TITLE_MAX).collect();
    while kebab.ends_with('-') {
        kebab.pop();
    }
    if kebab.is_empty() {
        kebab.push_str("confession");
    }

    let hex = id.simple().to_string();
    format!("{kebab}-{}", &hex[hex.len() - 8..])
}

/// Normalised tag list, or a validation error if limits are exceeded.
pub fn validate_tags(raw: &[String]) -> AppResult<Vec<String>> {
    let tags = normalize_tags(raw);
    if tags.len() > MAX_TAGS {
        return Err(AppError::Validation(format!("at most {MAX_TAGS} tags are allowed")));
    }
    if let Some(long) = tags.iter().find(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(AppError::Validation(format!("tag '{long}' exceeds {MAX_TAG_LEN} characters")));
    }
    Ok(tags)
}

pub(crate) fn ensure_confession_exists(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let found = confessions::table
        .find(id)
        .select(confessions::id)
        .first::<Uuid>(conn)
        .optional()?;
    found.map(|_| ()).ok_or_else(AppError::confession_not_found)
}

pub(crate) fn comment_counts(conn: &mut PgConnection) -> QueryResult<HashMap<Uuid, i64>> {
    let rows = confession_comments::table
        .group_by(confession_comments::confession_id)
        .select((confession_comments::confession_id, count_star()))
        .load::<(Uuid, i64)>(conn)?;
    Ok(rows.into_iter().collect())
}

/// All confessions, newest first.
pub(crate) fn load_newest_first(conn: &mut PgConnection) -> QueryResult<Vec<Confession>> {
    confessions::table
        .order(confessions::created_at.desc())
        .select(Confession::as_select())
        .load(conn)
}

// --- Create ---

pub async fn create_confession(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    meta: ClientMeta,
    Json(req): Json<CreateConfessionRequest>,
) -> AppResult<Json<ApiResponse<ConfessionView>>> {
    let req = req.trimmed();
    req.validate()?;
    let tags = validate_tags(&req.tags)?;

    let id = Uuid::now_v7();
    let new_confession = NewConfession {
        id,
        user_id: user.map(|u| u.id),
        author_name: req.author_name.unwrap_or_else(default_author_name),
        slug: Some(make_slug(&req.title, id)),
        title: req.title,
        content: req.content,
        tags,
        ip_address: meta.ip_address,
        device_info: meta.device_info,
    };

    let mut conn = state.conn()?;
    let confession: Confession = diesel::insert_into(confessions::table)
        .values(&new_confession)
        .returning(Confession::as_returning())
        .get_result(&mut conn)?;

    record_confession_created();
    state.publish(ChangeEvent::new(Collection::Confessions, ChangeKind::Insert, confession.id));
    tracing::info!(confession_id = %confession.id, tags = ?confession.tags, "confession posted");

    Ok(Json(ApiResponse::ok(ConfessionView::new(confession.into(), VoteTally::default(), 0))))
}

// --- List ---

pub async fn list_confessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TagQuery>,
) -> AppResult<Json<ApiResponse<ConfessionList>>> {
    let selected = parse_tag_query(query.tags.as_deref());
    let mut conn = state.conn()?;

    let all: Vec<PublicConfession> = load_newest_first(&mut conn)?.into_iter().map(Into::into).collect();
    let votes = load_all_votes(&mut conn)?;
    let tallies = tally_all(&votes);
    let comments = comment_counts(&mut conn)?;

    let tags = available_tags(&all);
    let confessions = filter_by_tags(all, &selected)
        .into_iter()
        .map(|c| {
            let tally = tallies.get(&c.id).copied().unwrap_or_default();
            let count = comments.get(&c.id).copied().unwrap_or(0);
            ConfessionView::new(c, tally, count)
        })
        .collect();

    Ok(Json(ApiResponse::ok(ConfessionList { confessions, available_tags: tags })))
}

// --- Detail ---

fn detail_view(conn: &mut PgConnection, confession: Confession, voter: &Voter) -> AppResult<ConfessionView> {
    let votes = load_votes_for(conn, confession.id)?;
    let tally = aggregate(&votes, confession.id);
    let comment_count: i64 = confession_comments::table
        .filter(confession_comments::confession_id.eq(confession.id))
        .count()
        .get_result(conn)?;

    // A just-minted identity cannot have voted yet.
    let vote_state = if voter.is_new() {
        VoteState::None
    } else {
        state_for(conn, confession.id, &voter.identity)?
    };

    let mut view = ConfessionView::new(confession.into(), tally, comment_count);
    view.vote_state = Some(vote_state);
    Ok(view)
}

pub async fn get_confession(
    State(state): State<Arc<AppState>>,
    voter: Voter,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let confession = confessions::table
        .find(id)
        .select(Confession::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::confession_not_found)?;

    let view = detail_view(&mut conn, confession, &voter)?;
    Ok(voter.respond(ApiResponse::ok(view)))
}

pub async fn get_confession_by_slug(
    State(state): State<Arc<AppState>>,
    voter: Voter,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let mut conn = state.conn()?;
    let confession = confessions::table
        .filter(confessions::slug.eq(&slug))
        .select(Confession::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::confession_not_found)?;

    let view = detail_view(&mut conn, confession, &voter)?;
    Ok(voter.respond(ApiResponse::ok(view)))
}
