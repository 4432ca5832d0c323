//! The record snapshot mirrored from the source database.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a page has no title fragment.
pub const UNTITLED: &str = "Без названия";

/// A single database item, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    /// Open string set; mapped to an emoji by the formatter.
    pub status: Option<String>,
    pub tags: Vec<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub url: Option<String>,

    // Extended fields, filled when the database carries them.
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub executor: Option<String>,
    pub assigned_by: Option<String>,
    pub telegram_usernames: Vec<String>,
    pub project: Option<String>,
    pub last_edited_time: Option<DateTime<Utc>>,
}

impl Record {
    /// Minimal record with every optional field empty.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: None,
            tags: Vec::new(),
            created_time: None,
            url: None,
            description: None,
            deadline: None,
            executor: None,
            assigned_by: None,
            telegram_usernames: Vec::new(),
            project: None,
            last_edited_time: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created_time = Some(created);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// What happened to a record, as reported by a webhook notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    PropertiesUpdated,
    ContentUpdated,
    Updated,
}

impl ChangeKind {
    /// Map a Notion event type (`page.created`, ...) to a change kind.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "page.created" => Some(ChangeKind::Created),
            "page.properties_updated" => Some(ChangeKind::PropertiesUpdated),
            "page.content_updated" => Some(ChangeKind::ContentUpdated),
            "page.updated" => Some(ChangeKind::Updated),
            _ => None,
        }
    }
}

/// Parse a source timestamp.
///
/// Accepts RFC 3339 (`2025-09-25T14:30:00.000Z`), naive date-times which are
/// taken as UTC (`2025-09-25T14:30:00`), and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_millis() {
        let dt = parse_timestamp("2025-09-25T14:30:00.000Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 9, 25, 14, 30, 0).unwrap());
    }

    #[test]
    fn parses_offset_into_utc() {
        let dt = parse_timestamp("2025-09-25T17:30:00+03:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 9, 25, 14, 30, 0).unwrap());
    }

    #[test]
    fn parses_naive_as_utc() {
        let dt = parse_timestamp("2025-09-25T14:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 9, 25, 14, 30, 0).unwrap());
    }

    #[test]
    fn parses_bare_date() {
        let dt = parse_timestamp("2025-09-25").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 9, 25, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn change_kind_from_event_type() {
        assert_eq!(ChangeKind::from_event_type("page.created"), Some(ChangeKind::Created));
        assert_eq!(
            ChangeKind::from_event_type("page.properties_updated"),
            Some(ChangeKind::PropertiesUpdated)
        );
        assert_eq!(ChangeKind::from_event_type("page.deleted"), None);
        assert_eq!(ChangeKind::from_event_type("database.created"), None);
    }

    #[test]
    fn builder_sets_fields() {
        let record = Record::new("p1", "Demo")
            .with_status("Draft")
            .with_tags(["a", "b"])
            .with_url("https://notion.so/p1");
        assert_eq!(record.status.as_deref(), Some("Draft"));
        assert_eq!(record.tags, vec!["a", "b"]);
        assert!(record.created_time.is_none());
    }
}
