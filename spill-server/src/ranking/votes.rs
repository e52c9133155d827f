use std::collections::HashMap;

use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::VoterIdentity;
use crate::models::{NewVote, VoteKind};
use crate::schema::confession_votes;

/// Vote held by one identity on one confession.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredVote {
    pub id: Uuid,
    pub kind: VoteKind,
}

/// Persistence needed by [`apply_vote`].
pub trait VoteStore {
    type Error;

    fn current_vote(&mut self, confession_id: Uuid, identity: &VoterIdentity) -> Result<Option<StoredVote>, Self::Error>;
    fn insert_vote(&mut self, confession_id: Uuid, identity: &VoterIdentity, kind: VoteKind) -> Result<Uuid, Self::Error>;
    fn update_vote(&mut self, vote_id: Uuid, kind: VoteKind) -> Result<(), Self::Error>;
    fn delete_vote(&mut self, vote_id: Uuid) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    Up,
    Down,
    None,
}

impl VoteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteState::Up => "up",
            VoteState::Down => "down",
            VoteState::None => "none",
        }
    }
}

impl From<Option<VoteKind>> for VoteState {
    fn from(kind: Option<VoteKind>) -> Self {
        match kind {
            Some(VoteKind::Up) => VoteState::Up,
            Some(VoteKind::Down) => VoteState::Down,
            None => VoteState::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Inserted,
    Switched,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub vote_id: Uuid,
    pub action: VoteAction,
    pub state: VoteState,
}

/// Toggle semantics: voting the same way twice retracts, voting the other way
/// flips the existing record, otherwise a new record is written.
pub fn apply_vote<S: VoteStore>(
    store: &mut S,
    confession_id: Uuid,
    identity: &VoterIdentity,
    requested: VoteKind,
) -> Result<VoteChange, S::Error> {
    match store.current_vote(confession_id, identity)? {
        Some(existing) if existing.kind == requested => {
            store.delete_vote(existing.id)?;
            Ok(VoteChange { vote_id: existing.id, action: VoteAction::Removed, state: VoteState::None })
        }
        Some(existing) => {
            store.update_vote(existing.id, requested)?;
            Ok(VoteChange { vote_id: existing.id, action: VoteAction::Switched, state: Some(requested).into() })
        }
        None => {
            let vote_id = store.insert_vote(confession_id, identity, requested)?;
            Ok(VoteChange { vote_id, action: VoteAction::Inserted, state: Some(requested).into() })
        }
    }
}

impl VoteStore for PgConnection {
    type Error = diesel::result::Error;

    fn current_vote(&mut self, confession_id: Uuid, identity: &VoterIdentity) -> Result<Option<StoredVote>, Self::Error> {
        let query = confession_votes::table
            .filter(confession_votes::confession_id.eq(confession_id))
            .into_boxed();
        let query = match identity {
            VoterIdentity::User(user_id) => query.filter(confession_votes::user_id.eq(*user_id)),
            VoterIdentity::Anonymous(anon) => query.filter(confession_votes::vote_identifier.eq(anon.as_str())),
        };

        let row = query
            .select((confession_votes::id, confession_votes::vote_type))
            .first::<(Uuid, String)>(self)
            .optional()?;

        row.map(|(id, vote_type)| {
            VoteKind::from_db(&vote_type)
                .map(|kind| StoredVote { id, kind })
                .ok_or_else(|| diesel::result::Error::DeserializationError(format!("unknown vote_type {vote_type:?}").into()))
        })
        .transpose()
    }

    fn insert_vote(&mut self, confession_id: Uuid, identity: &VoterIdentity, kind: VoteKind) -> Result<Uuid, Self::Error> {
        let (user_id, vote_identifier) = match identity {
            VoterIdentity::User(id) => (Some(*id), None),
            VoterIdentity::Anonymous(anon) => (None, Some(anon.as_str())),
        };
        let new_vote = NewVote {
            id: Uuid::now_v7(),
            confession_id,
            user_id,
            vote_identifier,
            vote_type: kind.as_db(),
        };
        diesel::insert_into(confession_votes::table)
            .values(&new_vote)
            .execute(self)?;
        Ok(new_vote.id)
    }

    fn update_vote(&mut self, vote_id: Uuid, kind: VoteKind) -> Result<(), Self::Error> {
        let affected = diesel::update(confession_votes::table.find(vote_id))
            .set(confession_votes::vote_type.eq(kind.as_db()))
            .execute(self)?;
        touched_one(affected)
    }

    fn delete_vote(&mut self, vote_id: Uuid) -> Result<(), Self::Error> {
        let affected = diesel::delete(confession_votes::table.find(vote_id)).execute(self)?;
        touched_one(affected)
    }
}

/// A vote read earlier in the transaction but gone by the time it is written
/// rolls the transaction back instead of reporting a change that never landed.
fn touched_one(affected: usize) -> QueryResult<()> {
    if affected == 0 {
        Err(diesel::result::Error::NotFound)
    } else {
        Ok(())
    }
}

/// Minimal projection of a vote row used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastVote {
    pub confession_id: Uuid,
    pub kind: VoteKind,
}

impl CastVote {
    /// Rows with an unrecognised `vote_type` are skipped.
    pub fn from_row((confession_id, vote_type): (Uuid, String)) -> Option<Self> {
        let kind = VoteKind::from_db(&vote_type);
        if kind.is_none() {
            tracing::warn!(confession_id = %confession_id, vote_type = %vote_type, "ignoring vote with unknown type");
        }
        kind.map(|kind| Self { confession_id, kind })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    fn add(&mut self, kind: VoteKind) {
        match kind {
            VoteKind::Up => self.upvotes += 1,
            VoteKind::Down => self.downvotes += 1,
        }
    }
}

pub fn aggregate<'a>(votes: impl IntoIterator<Item = &'a CastVote>, confession_id: Uuid) -> VoteTally {
    let mut tally = VoteTally::default();
    for vote in votes.into_iter().filter(|v| v.confession_id == confession_id) {
        tally.add(vote.kind);
    }
    tally
}

/// Tallies for every confession that has at least one vote.
pub fn tally_all<'a>(votes: impl IntoIterator<Item = &'a CastVote>) -> HashMap<Uuid, VoteTally> {
    let mut tallies: HashMap<Uuid, VoteTally> = HashMap::new();
    for vote in votes {
        tallies.entry(vote.confession_id).or_default().add(vote.kind);
    }
    tallies
}

pub fn load_votes_for(conn: &mut PgConnection, confession_id: Uuid) -> QueryResult<Vec<CastVote>> {
    let rows = confession_votes::table
        .filter(confession_votes::confession_id.eq(confession_id))
        .select((confession_votes::confession_id, confession_votes::vote_type))
        .load::<(Uuid, String)>(conn)?;
    Ok(rows.into_iter().filter_map(CastVote::from_row).collect())
}

pub fn load_all_votes(conn: &mut PgConnection) -> QueryResult<Vec<CastVote>> {
    let rows = confession_votes::table
        .select((confession_votes::confession_id, confession_votes::vote_type))
        .load::<(Uuid, String)>(conn)?;
    Ok(rows.into_iter().filter_map(CastVote::from_row).collect())
}

/// Current state of `identity` on a confession, without modifying anything.
pub fn state_for<S: VoteStore>(store: &mut S, confession_id: Uuid, identity: &VoterIdentity) -> Result<VoteState, S::Error> {
    Ok(store.current_vote(confession_id, identity)?.map(|v| v.kind).into())
}
