use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use spill_shared::errors::AppResult;
use spill_shared::types::ApiResponse;

use crate::models::PublicConfession;
use crate::ranking::tags::{available_tags, filter_by_tags, parse_tag_query};
use crate::ranking::trending::{medal, rank};
use crate::ranking::votes::{load_all_votes, tally_all};
use crate::routes::confessions::{comment_counts, load_newest_first, ConfessionView, TagQuery};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TrendingEntry {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medal: Option<u8>,
    #[serde(flatten)]
    pub view: ConfessionView,
}

#[derive(Debug, Serialize)]
pub struct TrendingList {
    pub confessions: Vec<TrendingEntry>,
    pub available_tags: Vec<String>,
}

/// All confessions by net score, optionally narrowed to a tag selection.
pub async fn get_trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TagQuery>,
) -> AppResult<Json<ApiResponse<TrendingList>>> {
    let selected = parse_tag_query(query.tags.as_deref());
    let mut conn = state.conn()?;

    let newest_first: Vec<PublicConfession> = load_newest_first(&mut conn)?.into_iter().map(Into::into).collect();
    let tallies = tally_all(&load_all_votes(&mut conn)?);
    let comments = comment_counts(&mut conn)?;

    let tags = available_tags(&newest_first);
    let ranked = filter_by_tags(rank(newest_first, &tallies), &selected);

    let confessions = ranked
        .into_iter()
        .enumerate()
        .map(|(i, scored)| {
            let position = i + 1;
            let count = comments.get(&scored.item.id).copied().unwrap_or(0);
            TrendingEntry {
                position,
                medal: medal(position),
                view: ConfessionView::new(scored.item, scored.tally, count),
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(TrendingList { confessions, available_tags: tags })))
}

pub async fn get_tags(State(state): State<Arc<AppState>>) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let mut conn = state.conn()?;
    let all = load_newest_first(&mut conn)?;
    Ok(Json(ApiResponse::ok(available_tags(&all))))
}
