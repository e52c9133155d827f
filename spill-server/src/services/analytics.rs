use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{confession_comments, confession_votes, confessions};

pub const TOP_AUTHOR_LIMIT: usize = 5;
pub const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize, PartialEq)]
pub struct AuthorCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyCount {
    /// e.g. `Oct 3`
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct VoteBucket {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Analytics {
    pub total_confessions: i64,
    pub total_comments: i64,
    pub total_votes: i64,
    pub confessions_today: i64,
    pub confessions_this_week: i64,
    pub top_authors: Vec<AuthorCount>,
    pub daily_stats: Vec<DailyCount>,
    pub vote_distribution: Vec<VoteBucket>,
}

impl Analytics {
    pub fn votes_of(&self, kind: &str) -> i64 {
        self.vote_distribution
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.count)
            .unwrap_or(0)
    }
}

/// Count occurrences keeping first-seen order, so later stable sorting breaks
/// ties by who appeared first.
fn count_in_order<I, S>(values: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, i64)> = Vec::new();
    for value in values {
        let value = value.into();
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts
}

pub fn top_authors<I, S>(names: I, limit: usize) -> Vec<AuthorCount>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts = count_in_order(names);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(name, count)| AuthorCount { name, count })
        .collect()
}

/// Per calendar day (UTC) in the order the timestamps arrive. Days without
/// confessions are absent.
pub fn daily_counts<'a>(timestamps: impl IntoIterator<Item = &'a DateTime<Utc>>) -> Vec<DailyCount> {
    count_in_order(timestamps.into_iter().map(|ts| ts.format("%b %-d").to_string()))
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

pub fn vote_distribution<I, S>(kinds: I) -> Vec<VoteBucket>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    count_in_order(kinds)
        .into_iter()
        .map(|(kind, count)| VoteBucket { kind, count })
        .collect()
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

pub fn load(conn: &mut PgConnection, now: DateTime<Utc>) -> QueryResult<Analytics> {
    let today = start_of_day(now);
    let week_ago = now - Duration::days(WINDOW_DAYS);

    let total_confessions: i64 = confessions::table.count().get_result(conn)?;
    let total_comments: i64 = confession_comments::table.count().get_result(conn)?;
    let total_votes: i64 = confession_votes::table.count().get_result(conn)?;

    let confessions_today: i64 = confessions::table
        .filter(confessions::created_at.ge(today))
        .count()
        .get_result(conn)?;
    let confessions_this_week: i64 = confessions::table
        .filter(confessions::created_at.ge(week_ago))
        .count()
        .get_result(conn)?;

    let authors: Vec<String> = confessions::table
        .order(confessions::created_at.asc())
        .select(confessions::author_name)
        .load(conn)?;

    let recent: Vec<DateTime<Utc>> = confessions::table
        .filter(confessions::created_at.ge(week_ago))
        .order(confessions::created_at.asc())
        .select(confessions::created_at)
        .load(conn)?;

    let kinds: Vec<String> = confession_votes::table
        .select(confession_votes::vote_type)
        .load(conn)?;

    Ok(Analytics {
        total_confessions,
        total_comments,
        total_votes,
        confessions_today,
        confessions_this_week,
        top_authors: top_authors(authors, TOP_AUTHOR_LIMIT),
        daily_stats: daily_counts(&recent),
        vote_distribution: vote_distribution(kinds),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn top_authors_limited_and_ties_keep_first_seen() {
        let names = ["bob", "amy", "cat", "amy", "dan", "eve", "fay", "bob", "amy"];
        let top = top_authors(names, 5);
        let flat: Vec<_> = top.iter().map(|a| (a.name.as_str(), a.count)).collect();
        assert_eq!(flat, [("amy", 3), ("bob", 2), ("cat", 1), ("dan", 1), ("eve", 1)]);
    }

    #[test]
    fn daily_counts_group_by_day() {
        let stamps = [
            Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 10, 1, 23, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 10, 3, 0, 1, 0).unwrap(),
        ];
        let days = daily_counts(&stamps);
        assert_eq!(
            days,
            vec![
                DailyCount { date: "Oct 1".into(), count: 2 },
                DailyCount { date: "Oct 3".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn distribution_and_lookup() {
        let dist = vote_distribution(["upvote", "downvote", "upvote"]);
        assert_eq!(dist[0], VoteBucket { kind: "upvote".into(), count: 2 });

        let analytics = Analytics {
            total_confessions: 0,
            total_comments: 0,
            total_votes: 3,
            confessions_today: 0,
            confessions_this_week: 0,
            top_authors: vec![],
            daily_stats: vec![],
            vote_distribution: dist,
        };
        assert_eq!(analytics.votes_of("downvote"), 1);
        assert_eq!(analytics.votes_of("sideways"), 0);
    }

    #[test]
    fn midnight_utc() {
        let now = Utc.with_ymd_and_hms(2024, 10, 16, 14, 30, 5).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 10, 16, 0, 0, 0).unwrap());
    }
}
