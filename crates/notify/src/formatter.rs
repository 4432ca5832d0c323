//! Renders source records into Telegram message text.
//!
//! Output is deterministic: the same record and the same status table always
//! produce the same string. Optional fields that are missing are left out.

use chrono::{DateTime, FixedOffset, Utc};
use relay_core::record::{parse_timestamp, ChangeKind, Record};

use crate::telegram::{escape_html, escape_markdown_v2};
use crate::traits::Notification;

/// Longest description shown in a change message, in characters.
const DESCRIPTION_LIMIT: usize = 200;

const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Known record statuses. Anything else is [`StatusKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
    Review,
    Published,
    Draft,
    New,
    Other,
}

/// Normalized status name → kind. Aliases cover the workspaces the relay
/// has been pointed at so far.
const STATUS_TABLE: &[(&str, StatusKind)] = &[
    ("not started", StatusKind::NotStarted),
    ("in progress", StatusKind::InProgress),
    ("completed", StatusKind::Completed),
    ("done", StatusKind::Completed),
    ("accepted", StatusKind::Completed),
    ("bajarildi", StatusKind::Completed),
    ("cancelled", StatusKind::Cancelled),
    ("canceled", StatusKind::Cancelled),
    ("on hold", StatusKind::OnHold),
    ("review", StatusKind::Review),
    ("published", StatusKind::Published),
    ("draft", StatusKind::Draft),
    ("new", StatusKind::New),
    ("yangi", StatusKind::New),
];

impl StatusKind {
    /// Classify a free-form status name.
    ///
    /// Matching ignores case, separators (`-`, `_`) and decorations such as a
    /// trailing emoji (`"Bajarildi ✅"` is `Completed`).
    pub fn classify(status: &str) -> Self {
        let normalized = normalize_status(status);
        STATUS_TABLE
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, kind)| *kind)
            .unwrap_or(StatusKind::Other)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            StatusKind::NotStarted => "⏳",
            StatusKind::InProgress => "🔄",
            StatusKind::Completed => "✅",
            StatusKind::Cancelled => "❌",
            StatusKind::OnHold => "⏸️",
            StatusKind::Review => "👀",
            StatusKind::Published => "🚀",
            StatusKind::Draft => "📝",
            StatusKind::New => "🆕",
            StatusKind::Other => "📌",
        }
    }
}

fn normalize_status(status: &str) -> String {
    let cleaned: String = status
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How the message text is marked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// Plain text, no parse mode.
    #[default]
    Plain,
    /// Telegram MarkdownV2; dynamic text is escaped.
    MarkdownV2,
    /// Telegram HTML; `&`, `<` and `>` are escaped.
    Html,
}

impl Markup {
    /// Pick the markup that matches a Telegram `parse_mode` setting.
    pub fn from_parse_mode(parse_mode: Option<&str>) -> Self {
        match parse_mode {
            Some(mode) if mode.trim().eq_ignore_ascii_case("markdownv2") => Markup::MarkdownV2,
            Some(mode) if mode.trim().eq_ignore_ascii_case("html") => Markup::Html,
            _ => Markup::Plain,
        }
    }
}

/// Formats records into message text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    markup: Markup,
}

impl Formatter {
    pub fn new(markup: Markup) -> Self {
        Self { markup }
    }

    pub fn markup(&self) -> Markup {
        self.markup
    }

    fn text(&self, raw: &str) -> String {
        match self.markup {
            Markup::Plain => raw.to_string(),
            Markup::MarkdownV2 => escape_markdown_v2(raw),
            Markup::Html => escape_html(raw),
        }
    }

    fn bold(&self, raw: &str) -> String {
        match self.markup {
            Markup::Plain => raw.to_string(),
            Markup::MarkdownV2 => format!("*{}*", escape_markdown_v2(raw)),
            Markup::Html => format!("<b>{}</b>", escape_html(raw)),
        }
    }

    fn italic(&self, raw: &str) -> String {
        match self.markup {
            Markup::Plain => raw.to_string(),
            Markup::MarkdownV2 => format!("_{}_", escape_markdown_v2(raw)),
            Markup::Html => format!("<i>{}</i>", escape_html(raw)),
        }
    }

    fn link(&self, url: &str) -> String {
        match self.markup {
            Markup::Plain => format!("🔗 Открыть в Notion: {url}"),
            Markup::MarkdownV2 => {
                // Inside (...) only `)` and `\` need escaping.
                let target = url.replace('\\', "\\\\").replace(')', "\\)");
                format!("🔗 [Открыть в Notion]({target})")
            }
            Markup::Html => {
                let target = escape_html(url).replace('"', "&quot;");
                format!("🔗 <a href=\"{target}\">Открыть в Notion</a>")
            }
        }
    }

    fn hashtags(&self, tags: &[String]) -> Option<String> {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                let tag = t.split_whitespace().collect::<Vec<_>>().join("_");
                self.text(&format!("#{tag}"))
            })
            .collect();
        if tags.is_empty() {
            None
        } else {
            Some(tags.join(" "))
        }
    }

    fn status_line(&self, status: &str) -> String {
        let emoji = StatusKind::classify(status).emoji();
        format!("{emoji} Статус: {}", self.italic(status))
    }

    /// Message for a record picked up by polling.
    pub fn format_record(&self, record: &Record) -> String {
        let mut parts = vec![format!("📝 {}", self.bold(&record.title))];

        if let Some(status) = non_empty(record.status.as_deref()) {
            parts.push(self.status_line(status));
        }
        if let Some(tags) = self.hashtags(&record.tags) {
            parts.push(format!("🏷️ {tags}"));
        }
        if let Some(created) = record.created_time {
            parts.push(format!("📅 {}", self.text(&format_date_time(created))));
        }
        if let Some(url) = non_empty(record.url.as_deref()) {
            parts.push(self.link(url));
        }

        parts.join("\n\n")
    }

    /// Message for a record reported by a webhook notification.
    pub fn format_change(&self, record: &Record, kind: ChangeKind) -> String {
        let header = match kind {
            ChangeKind::Created => "🆕 Новая задача",
            ChangeKind::PropertiesUpdated => "📝 Обновление задачи",
            ChangeKind::ContentUpdated | ChangeKind::Updated => "🔄 Изменение задачи",
        };

        let mut message = format!("{}\n📝 {}", self.bold(header), self.bold(&record.title));

        let mut details = Vec::new();
        if let Some(status) = non_empty(record.status.as_deref()) {
            details.push(self.status_line(status));
        }
        if let Some(project) = non_empty(record.project.as_deref()) {
            details.push(format!("📁 Проект: {}", self.text(project)));
        }
        if let Some(description) = non_empty(record.description.as_deref()) {
            details.push(format!(
                "📄 Описание: {}",
                self.text(&truncate(description, DESCRIPTION_LIMIT))
            ));
        }
        if let Some(executor) = non_empty(record.executor.as_deref()) {
            details.push(format!("👤 Исполнитель: {}", self.text(executor)));
        }
        if let Some(assigned_by) = non_empty(record.assigned_by.as_deref()) {
            details.push(format!("👨‍💼 Назначил: {}", self.text(assigned_by)));
        }
        if let Some(deadline) = non_empty(record.deadline.as_deref()) {
            details.push(format!("⏰ Дедлайн: {}", self.text(&format_deadline(deadline))));
        }
        if let Some(tags) = self.hashtags(&record.tags) {
            details.push(format!("🏷️ {tags}"));
        }
        if !record.telegram_usernames.is_empty() {
            details.push(format!(
                "📱 Telegram: {}",
                self.text(&record.telegram_usernames.join(" "))
            ));
        }
        if let Some(edited) = record.last_edited_time {
            details.push(format!("🕒 Изменено: {}", self.text(&format_date_time(edited))));
        }

        if !details.is_empty() {
            message.push_str("\n\n");
            message.push_str(&details.join("\n"));
        }
        if let Some(url) = non_empty(record.url.as_deref()) {
            message.push_str("\n\n");
            message.push_str(&self.link(url));
        }
        message
    }

    /// Ad hoc text, escaped for the configured markup.
    pub fn text_notification(&self, text: &str) -> Notification {
        Notification::text(self.text(text))
    }

    /// Notification for a polled record.
    pub fn record_notification(&self, record: &Record) -> Notification {
        Notification {
            subject: record.title.clone(),
            body: self.format_record(record),
            metadata: Default::default(),
        }
        .with_metadata("record_id", record.id.clone())
    }

    /// Notification for a webhook change.
    pub fn change_notification(&self, record: &Record, kind: ChangeKind) -> Notification {
        Notification {
            subject: record.title.clone(),
            body: self.format_change(record, kind),
            metadata: Default::default(),
        }
        .with_metadata("record_id", record.id.clone())
        .with_metadata("change", format!("{kind:?}"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn format_date_time(dt: DateTime<Utc>) -> String {
    dt.format(DATE_TIME_FORMAT).to_string()
}

/// Deadlines are either a bare date or a date-time; unparsable values are
/// shown as-is. A date-time with an offset keeps the wall-clock time it was
/// entered with.
fn format_deadline(raw: &str) -> String {
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(raw.trim()) {
        return dt.format(DATE_TIME_FORMAT).to_string();
    }
    match parse_timestamp(raw) {
        Some(dt) if raw.contains('T') => format_date_time(dt),
        Some(dt) => dt.format("%d.%m.%Y").to_string(),
        None => raw.to_string(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Record {
        Record::new("page-1", "Demo")
            .with_status("In Progress")
            .with_tags(["a", "b"])
            .with_created(parse_timestamp("2025-09-25T14:30:00").unwrap())
    }

    #[test]
    fn demo_record_contains_status_and_tags() {
        let message = Formatter::default().format_record(&demo());
        assert!(message.contains("🔄 Статус: In Progress"), "{message}");
        assert!(message.contains("#a #b"), "{message}");
        assert!(message.contains("📅 25.09.2025 14:30"), "{message}");
        assert!(message.starts_with("📝 Demo"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let formatter = Formatter::default();
        let record = demo().with_url("https://www.notion.so/Demo-1");
        assert_eq!(formatter.format_record(&record), formatter.format_record(&record.clone()));
        assert_eq!(
            formatter.format_change(&record, ChangeKind::Created),
            formatter.format_change(&record, ChangeKind::Created)
        );
    }

    #[test]
    fn missing_optional_fields_are_omitted() {
        let message = Formatter::default().format_record(&Record::new("p", "Bare"));
        assert_eq!(message, "📝 Bare");
    }

    #[test]
    fn plain_layout_separates_parts_with_blank_lines() {
        let record = demo().with_url("https://notion.so/x");
        let message = Formatter::default().format_record(&record);
        assert_eq!(
            message,
            "📝 Demo\n\n🔄 Статус: In Progress\n\n🏷️ #a #b\n\n📅 25.09.2025 14:30\n\n🔗 Открыть в Notion: https://notion.so/x"
        );
    }

    #[test]
    fn unknown_status_uses_fallback_emoji() {
        let record = Record::new("p", "T").with_status("Blocked by legal");
        let message = Formatter::default().format_record(&record);
        assert!(message.contains("📌 Статус: Blocked by legal"));
    }

    #[test]
    fn status_classification_is_lenient() {
        assert_eq!(StatusKind::classify("in progress"), StatusKind::InProgress);
        assert_eq!(StatusKind::classify("In-Progress"), StatusKind::InProgress);
        assert_eq!(StatusKind::classify("  DONE "), StatusKind::Completed);
        assert_eq!(StatusKind::classify("Bajarildi ✅"), StatusKind::Completed);
        assert_eq!(StatusKind::classify("Yangi 🆕"), StatusKind::New);
        assert_eq!(StatusKind::classify("On Hold"), StatusKind::OnHold);
        assert_eq!(StatusKind::classify(""), StatusKind::Other);
        assert_eq!(StatusKind::Other.emoji(), "📌");
    }

    #[test]
    fn tags_with_spaces_become_single_hashtags() {
        let record = Record::new("p", "T").with_tags(["needs review", " ", "ops"]);
        let message = Formatter::default().format_record(&record);
        assert!(message.contains("🏷️ #needs_review #ops"));
    }

    #[test]
    fn markdown_v2_escapes_dynamic_text() {
        let record = Record::new("p", "Fix bug #12 (urgent)!")
            .with_status("In Progress")
            .with_tags(["a-b"])
            .with_url("https://notion.so/page(1)");
        let message = Formatter::new(Markup::MarkdownV2).format_record(&record);
        assert!(message.contains(r"📝 *Fix bug \#12 \(urgent\)\!*"), "{message}");
        assert!(message.contains(r"🔄 Статус: _In Progress_"), "{message}");
        assert!(message.contains(r"\#a\-b"), "{message}");
        assert!(message.contains(r"[Открыть в Notion](https://notion.so/page(1\))"), "{message}");
    }

    #[test]
    fn markup_from_parse_mode() {
        assert_eq!(Markup::from_parse_mode(Some("MarkdownV2")), Markup::MarkdownV2);
        assert_eq!(Markup::from_parse_mode(Some("HTML")), Markup::Html);
        assert_eq!(Markup::from_parse_mode(Some("html")), Markup::Html);
        assert_eq!(Markup::from_parse_mode(None), Markup::Plain);
    }

    #[test]
    fn change_message_has_header_and_details() {
        let mut record = demo().with_url("https://notion.so/x");
        record.project = Some("Website".to_string());
        record.executor = Some("Aziz".to_string());
        record.deadline = Some("2025-10-01".to_string());
        record.telegram_usernames = vec!["@aziz".to_string(), "@dina".to_string()];

        let message = Formatter::default().format_change(&record, ChangeKind::Created);
        assert!(message.starts_with("🆕 Новая задача\n📝 Demo"), "{message}");
        assert!(message.contains("🔄 Статус: In Progress"));
        assert!(message.contains("📁 Проект: Website"));
        assert!(message.contains("👤 Исполнитель: Aziz"));
        assert!(message.contains("⏰ Дедлайн: 01.10.2025"));
        assert!(message.contains("📱 Telegram: @aziz @dina"));
        assert!(message.ends_with("🔗 Открыть в Notion: https://notion.so/x"));
    }

    #[test]
    fn change_headers_per_kind() {
        let record = Record::new("p", "T");
        let f = Formatter::default();
        assert!(f.format_change(&record, ChangeKind::PropertiesUpdated).starts_with("📝 Обновление задачи"));
        assert!(f.format_change(&record, ChangeKind::Updated).starts_with("🔄 Изменение задачи"));
        assert_eq!(f.format_change(&record, ChangeKind::ContentUpdated), "🔄 Изменение задачи\n📝 T");
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let mut record = Record::new("p", "T");
        record.description = Some("я".repeat(250));
        let message = Formatter::default().format_change(&record, ChangeKind::Updated);
        let expected = format!("📄 Описание: {}...", "я".repeat(200));
        assert!(message.contains(&expected));
    }

    #[test]
    fn deadline_with_time_and_garbage() {
        assert_eq!(format_deadline("2025-10-01T09:15:00.000+00:00"), "01.10.2025 09:15");
        assert_eq!(format_deadline("someday"), "someday");
    }

    #[test]
    fn deadline_keeps_its_own_offset() {
        assert_eq!(format_deadline("2025-10-01T09:15:00+05:00"), "01.10.2025 09:15");
        assert_eq!(format_deadline("2025-10-01T09:15:00.000-03:00"), "01.10.2025 09:15");
    }

    #[test]
    fn html_escapes_dynamic_text() {
        let mut record = Record::new("p", "R&D <draft>")
            .with_status("In Progress")
            .with_url("https://notion.so/a?b=1&c=\"2\"");
        record.description = Some("x < y && y > z".to_string());
        let f = Formatter::new(Markup::Html);

        let message = f.format_record(&record);
        assert!(message.starts_with("📝 <b>R&amp;D &lt;draft&gt;</b>"), "{message}");
        assert!(message.contains("🔄 Статус: <i>In Progress</i>"), "{message}");
        assert!(
            message.ends_with(r#"<a href="https://notion.so/a?b=1&amp;c=&quot;2&quot;">Открыть в Notion</a>"#),
            "{message}"
        );

        let change = f.format_change(&record, ChangeKind::Updated);
        assert!(change.contains("📄 Описание: x &lt; y &amp;&amp; y &gt; z"), "{change}");
        assert!(!change.contains("<draft>"));
    }

    #[test]
    fn ad_hoc_text_is_escaped_per_markup() {
        let text = "🧪 Тест notion-relay. (ok) <b>";
        assert_eq!(Formatter::default().text_notification(text).body, text);
        assert_eq!(
            Formatter::new(Markup::MarkdownV2).text_notification("a-b.").body,
            r"a\-b\."
        );
        assert_eq!(
            Formatter::new(Markup::Html).text_notification("<b> & co").body,
            "&lt;b&gt; &amp; co"
        );
    }

    #[test]
    fn notifications_carry_record_id() {
        let f = Formatter::default();
        let n = f.record_notification(&demo());
        assert_eq!(n.record_id(), Some("page-1"));
        assert_eq!(n.subject, "Demo");

        let n = f.change_notification(&demo(), ChangeKind::Created);
        assert_eq!(n.metadata.get("change").map(String::as_str), Some("Created"));
    }
}
