use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Confession;
use crate::services::analytics::Analytics;

const MISSING: &str = "N/A";

/// Report row joined with the title of the confession it targets.
#[derive(Debug, Clone)]
pub struct ReportExportRow {
    pub id: Uuid,
    pub confession_id: Uuid,
    pub confession_title: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(MISSING)
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn confessions_csv(rows: &[Confession]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["ID", "Author", "Title", "Content", "Tags", "Created At", "IP Address", "Device Info"])?;
    for c in rows {
        writer.write_record([
            c.id.to_string().as_str(),
            &c.author_name,
            &c.title,
            &c.content,
            &c.tags.join(", "),
            &timestamp(&c.created_at),
            or_missing(c.ip_address.as_deref()),
            or_missing(c.device_info.as_deref()),
        ])?;
    }
    finish(writer)
}

pub fn reports_csv(rows: &[ReportExportRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Report ID",
        "Confession ID",
        "Confession Title",
        "Reason",
        "Reported At",
        "IP Address",
        "Device Info",
    ])?;
    for r in rows {
        writer.write_record([
            r.id.to_string().as_str(),
            &r.confession_id.to_string(),
            or_missing(r.confession_title.as_deref()),
            &r.reason,
            &timestamp(&r.created_at),
            or_missing(r.ip_address.as_deref()),
            or_missing(r.device_info.as_deref()),
        ])?;
    }
    finish(writer)
}

pub fn analytics_csv(analytics: &Analytics) -> anyhow::Result<String> {
    let metrics = [
        ("Total Confessions", analytics.total_confessions),
        ("Confessions This Week", analytics.confessions_this_week),
        ("Confessions Today", analytics.confessions_today),
        ("Total Upvotes", analytics.votes_of("upvote")),
        ("Total Downvotes", analytics.votes_of("downvote")),
    ];

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Metric", "Value"])?;
    for (metric, value) in metrics {
        writer.write_record([metric, value.to_string().as_str()])?;
    }
    finish(writer)
}

/// Download name such as `confessions-1718000000000.csv`.
pub fn file_name(kind: &str, now: DateTime<Utc>) -> String {
    format!("{kind}-{}.csv", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analytics::VoteBucket;
    use chrono::TimeZone;

    fn confession() -> Confession {
        let at = Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap();
        Confession {
            id: Uuid::nil(),
            user_id: None,
            author_name: "Anonymous User #7".into(),
            title: "Office, \"secrets\"".into(),
            content: "line one\nline two".into(),
            tags: vec!["work".into(), "guilt".into()],
            slug: None,
            ip_address: None,
            device_info: Some("Chrome on Windows".into()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn confession_export_quotes_and_fills_missing() {
        let out = confessions_csv(&[confession()]).unwrap();
        let mut lines = out.splitn(2, '\n');
        assert_eq!(
            lines.next().unwrap(),
            "ID,Author,Title,Content,Tags,Created At,IP Address,Device Info"
        );
        let body = lines.next().unwrap();
        assert!(body.contains("\"Office, \"\"secrets\"\"\""));
        assert!(body.contains("\"work, guilt\""));
        assert!(body.contains("2024-05-04 12:00:00 UTC,N/A,Chrome on Windows"));
    }

    #[test]
    fn report_export_without_title() {
        let row = ReportExportRow {
            id: Uuid::nil(),
            confession_id: Uuid::nil(),
            confession_title: None,
            reason: "spam".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap(),
            ip_address: Some("203.0.113.9".into()),
            device_info: None,
        };
        let out = reports_csv(&[row]).unwrap();
        let second = out.lines().nth(1).unwrap();
        assert_eq!(
            second,
            "00000000-0000-0000-0000-000000000000,00000000-0000-0000-0000-000000000000,N/A,spam,2024-05-04 12:00:00 UTC,203.0.113.9,N/A"
        );
    }

    #[test]
    fn analytics_export_rows() {
        let analytics = Analytics {
            total_confessions: 12,
            total_comments: 4,
            total_votes: 9,
            confessions_today: 1,
            confessions_this_week: 5,
            top_authors: vec![],
            daily_stats: vec![],
            vote_distribution: vec![
                VoteBucket { kind: "upvote".into(), count: 7 },
                VoteBucket { kind: "downvote".into(), count: 2 },
            ],
        };
        let out = analytics_csv(&analytics).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "Metric,Value",
                "Total Confessions,12",
                "Confessions This Week,5",
                "Confessions Today,1",
                "Total Upvotes,7",
                "Total Downvotes,2",
            ]
        );
    }

    #[test]
    fn download_name() {
        let now = Utc.timestamp_millis_opt(1_718_000_000_123).unwrap();
        assert_eq!(file_name("reports", now), "reports-1718000000123.csv");
    }
}
