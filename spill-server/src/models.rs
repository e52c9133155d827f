use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{accounts, confession_comments, confession_reports, confession_votes, confessions};

// --- Confession ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = confessions)]
pub struct Confession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub slug: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = confessions)]
pub struct NewConfession {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub slug: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

/// Confession as shown to the public: no network or device metadata.
#[derive(Debug, Serialize, Clone)]
pub struct PublicConfession {
    pub id: Uuid,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Confession> for PublicConfession {
    fn from(c: Confession) -> Self {
        Self {
            id: c.id,
            author_name: c.author_name,
            title: c.title,
            content: c.content,
            tags: c.tags,
            slug: c.slug,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// --- Vote ---

/// Direction of a vote. Stored as `upvote` / `downvote`, spoken as `up` / `down` over JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    #[serde(alias = "upvote")]
    Up,
    #[serde(alias = "downvote")]
    Down,
}

impl VoteKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            VoteKind::Up => "upvote",
            VoteKind::Down => "downvote",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "upvote" => Some(VoteKind::Up),
            "downvote" => Some(VoteKind::Down),
            _ => None,
        }
    }
}

impl std::str::FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "upvote" => Ok(VoteKind::Up),
            "down" | "downvote" => Ok(VoteKind::Down),
            other => Err(format!("unknown vote kind: {other}")),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = confession_votes)]
pub struct NewVote<'a> {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub user_id: Option<Uuid>,
    pub vote_identifier: Option<&'a str>,
    pub vote_type: &'static str,
}

// --- Comment ---

#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = confession_comments)]
pub struct Comment {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub content: String,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = confession_comments)]
pub struct NewComment {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub user_id: Option<Uuid>,
    pub author_name: String,
    pub content: String,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicComment {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            confession_id: c.confession_id,
            author_name: c.author_name,
            content: c.content,
            created_at: c.created_at,
        }
    }
}

// --- Report ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = confession_reports)]
pub struct Report {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub reason: String,
    pub reporter_identifier: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = confession_reports)]
pub struct NewReport {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub reason: String,
    pub reporter_identifier: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

// --- Account ---

#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
