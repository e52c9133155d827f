use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tables whose row changes are pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Confessions,
    Votes,
    Comments,
    Reports,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Confessions,
        Collection::Votes,
        Collection::Comments,
        Collection::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Confessions => "confessions",
            Collection::Votes => "votes",
            Collection::Comments => "comments",
            Collection::Reports => "reports",
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "confessions" => Ok(Collection::Confessions),
            "votes" => Ok(Collection::Votes),
            "comments" => Ok(Collection::Comments),
            "reports" => Ok(Collection::Reports),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A committed row change.
///
/// Event name on the wire: `{table}.{action}`, e.g. `votes.update`.
/// `confession_id` is set for every change scoped to a single confession so
/// detail views can subscribe narrowly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub table: Collection,
    pub action: ChangeKind,
    pub record_id: Uuid,
    pub confession_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Collection, action: ChangeKind, record_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            table,
            action,
            record_id,
            confession_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_confession(mut self, confession_id: Uuid) -> Self {
        self.confession_id = Some(confession_id);
        self
    }

    pub fn event_name(&self) -> String {
        format!("{}.{}", self.table.as_str(), self.action.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_joins_collection_and_kind() {
        let ev = ChangeEvent::new(Collection::Votes, ChangeKind::Update, Uuid::new_v4());
        assert_eq!(ev.event_name(), "votes.update");
    }

    #[test]
    fn collection_round_trips_through_str() {
        for c in Collection::ALL {
            assert_eq!(c.as_str().parse::<Collection>().unwrap(), c);
        }
        assert!("accounts".parse::<Collection>().is_err());
    }
}
