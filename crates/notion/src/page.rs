//! Notion page model and conversion into [`Record`].
//!
//! Only the property types the relay reads are modelled; every other
//! property type deserializes as [`PropertyValue::Other`] and is ignored.

use std::collections::HashMap;

use relay_core::config::PropertyNames;
use relay_core::record::{parse_timestamp, Record, UNTITLED};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

/// A page property, tagged by its Notion `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Select {
        select: Option<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    People {
        #[serde(default)]
        people: Vec<Person>,
    },
    Relation {
        #[serde(default)]
        relation: Vec<RelationRef>,
    },
    #[serde(other)]
    Other,
}

/// A page as returned by `pages.retrieve` and `databases.query`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

fn join_text(fragments: &[RichText]) -> String {
    fragments.iter().map(|t| t.plain_text.as_str()).collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Page {
    /// Text of the page's title property, if it has any.
    pub fn title(&self) -> Option<String> {
        self.properties.values().find_map(|p| match p {
            PropertyValue::Title { title } => non_empty(join_text(title)),
            _ => None,
        })
    }

    /// Status from either a `status` or a `select` property.
    pub fn status(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            PropertyValue::Status { status } | PropertyValue::Select { select: status } => {
                status.as_ref().and_then(|s| non_empty(s.name.clone()))
            }
            _ => None,
        }
    }

    pub fn multi_select(&self, name: &str) -> Vec<String> {
        match self.properties.get(name) {
            Some(PropertyValue::MultiSelect { multi_select }) => multi_select
                .iter()
                .filter_map(|o| non_empty(o.name.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn rich_text(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            PropertyValue::RichText { rich_text } => non_empty(join_text(rich_text)),
            _ => None,
        }
    }

    pub fn date_start(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            PropertyValue::Date { date } => date.as_ref()?.start.clone().and_then(non_empty),
            _ => None,
        }
    }

    /// Name of the first person in a `people` property.
    pub fn first_person(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            PropertyValue::People { people } => {
                people.iter().find_map(|p| p.name.clone().and_then(non_empty))
            }
            _ => None,
        }
    }

    /// Id of the first related page in a `relation` property.
    pub fn first_relation(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            PropertyValue::Relation { relation } => relation.first().map(|r| r.id.clone()),
            _ => None,
        }
    }

    /// Convert into a record snapshot. The project title is not resolved
    /// here; see [`Page::project_relation`].
    pub fn to_record(&self, names: &PropertyNames) -> Record {
        Record {
            id: self.id.clone(),
            title: self.title().unwrap_or_else(|| UNTITLED.to_string()),
            status: self.status(&names.status),
            tags: self.multi_select(&names.tags),
            created_time: self.created_time.as_deref().and_then(parse_timestamp),
            url: self.url.clone().and_then(non_empty),
            description: self.rich_text(&names.description),
            deadline: self.date_start(&names.deadline),
            executor: self.first_person(&names.executor),
            assigned_by: self.first_person(&names.assigned_by),
            telegram_usernames: self.multi_select(&names.telegram_usernames),
            project: None,
            last_edited_time: self.last_edited_time.as_deref().and_then(parse_timestamp),
        }
    }

    pub fn project_relation(&self, names: &PropertyNames) -> Option<String> {
        self.first_relation(&names.project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample_page() -> serde_json::Value {
        json!({
            "object": "page",
            "id": "2a1b-page",
            "created_time": "2025-09-25T14:30:00.000Z",
            "last_edited_time": "2025-09-26T08:00:00.000Z",
            "url": "https://www.notion.so/Demo-2a1b",
            "archived": false,
            "properties": {
                "Name": {"id": "title", "type": "title", "title": [
                    {"type": "text", "plain_text": "Demo "},
                    {"type": "text", "plain_text": "task"}
                ]},
                "Status": {"id": "s", "type": "status", "status": {"id": "1", "name": "In Progress", "color": "blue"}},
                "Tags": {"id": "t", "type": "multi_select", "multi_select": [{"name": "a"}, {"name": "b"}]},
                "Description": {"id": "d", "type": "rich_text", "rich_text": [{"plain_text": "Ship it"}]},
                "Deadline": {"id": "dl", "type": "date", "date": {"start": "2025-10-01", "end": null}},
                "Executor": {"id": "e", "type": "people", "people": [{"object": "user", "id": "u1", "name": "Aziz"}]},
                "Assigned By": {"id": "ab", "type": "people", "people": []},
                "Telegram Username": {"id": "tg", "type": "multi_select", "multi_select": [{"name": "@aziz"}]},
                "Projects (1)": {"id": "p", "type": "relation", "relation": [{"id": "proj-1"}], "has_more": false},
                "Score": {"id": "n", "type": "number", "number": 5}
            }
        })
    }

    #[test]
    fn parses_full_page_into_record() {
        let page: Page = serde_json::from_value(sample_page()).unwrap();
        let names = PropertyNames::default();
        let record = page.to_record(&names);

        assert_eq!(record.id, "2a1b-page");
        assert_eq!(record.title, "Demo task");
        assert_eq!(record.status.as_deref(), Some("In Progress"));
        assert_eq!(record.tags, vec!["a", "b"]);
        assert_eq!(
            record.created_time,
            Some(Utc.with_ymd_and_hms(2025, 9, 25, 14, 30, 0).unwrap())
        );
        assert_eq!(record.url.as_deref(), Some("https://www.notion.so/Demo-2a1b"));
        assert_eq!(record.description.as_deref(), Some("Ship it"));
        assert_eq!(record.deadline.as_deref(), Some("2025-10-01"));
        assert_eq!(record.executor.as_deref(), Some("Aziz"));
        assert!(record.assigned_by.is_none());
        assert_eq!(record.telegram_usernames, vec!["@aziz"]);
        assert!(record.project.is_none());
        assert_eq!(page.project_relation(&names).as_deref(), Some("proj-1"));
    }

    #[test]
    fn select_status_is_read_too() {
        let page: Page = serde_json::from_value(json!({
            "id": "p",
            "properties": {
                "Status": {"type": "select", "select": {"name": "Draft"}}
            }
        }))
        .unwrap();
        assert_eq!(page.status("Status").as_deref(), Some("Draft"));
    }

    #[test]
    fn missing_title_falls_back() {
        let page: Page = serde_json::from_value(json!({
            "id": "p",
            "properties": {
                "Name": {"type": "title", "title": []},
                "Status": {"type": "select", "select": null}
            }
        }))
        .unwrap();
        let record = page.to_record(&PropertyNames::default());
        assert_eq!(record.title, UNTITLED);
        assert!(record.status.is_none());
        assert!(record.tags.is_empty());
        assert!(record.created_time.is_none());
    }

    #[test]
    fn wrong_property_type_is_ignored() {
        let page: Page = serde_json::from_value(json!({
            "id": "p",
            "properties": {
                "Tags": {"type": "rich_text", "rich_text": [{"plain_text": "not tags"}]}
            }
        }))
        .unwrap();
        assert!(page.multi_select("Tags").is_empty());
    }

    #[test]
    fn custom_property_names() {
        let page: Page = serde_json::from_value(json!({
            "id": "p",
            "properties": {
                "Stage": {"type": "status", "status": {"name": "Review"}}
            }
        }))
        .unwrap();
        let names = PropertyNames {
            status: "Stage".to_string(),
            ..PropertyNames::default()
        };
        assert_eq!(page.to_record(&names).status.as_deref(), Some("Review"));
    }

    #[test]
    fn page_without_id_is_rejected() {
        let result: Result<Page, _> = serde_json::from_value(json!({"properties": {}}));
        assert!(result.is_err());
    }
}
