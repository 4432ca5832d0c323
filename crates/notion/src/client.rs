//! Notion REST client: database queries, page retrieval and connectivity checks.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use relay_core::config::{NotionConfig, PropertyNames};
use relay_core::Record;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::page::{Page, RichText};

const PAGE_SIZE: u32 = 100;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Which pages a database query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFilter {
    All,
    /// Pages created on or after the given (UTC) day.
    CreatedOnOrAfter(NaiveDate),
}

/// Read access to the record source.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// All records matching `filter`, oldest first.
    async fn query(&self, filter: QueryFilter) -> Result<Vec<Record>, SourceError>;

    /// One record by page id, with its project title resolved.
    async fn fetch_record(&self, page_id: &str) -> Result<Record, SourceError>;

    /// Check credentials and database access. Returns the database title.
    async fn ping(&self) -> Result<String, SourceError>;
}

/// Body of a `databases/{id}/query` request.
pub fn query_body(filter: QueryFilter, cursor: Option<&str>) -> Value {
    let mut body = json!({
        "page_size": PAGE_SIZE,
        "sorts": [{"timestamp": "created_time", "direction": "ascending"}],
    });
    if let QueryFilter::CreatedOnOrAfter(day) = filter {
        body["filter"] = json!({
            "timestamp": "created_time",
            "created_time": {"on_or_after": day.format("%Y-%m-%d").to_string()},
        });
    }
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for the Notion API.
pub struct NotionClient {
    api_base: String,
    token: String,
    version: String,
    database_id: Option<String>,
    properties: PropertyNames,
    client: reqwest::Client,
}

impl NotionClient {
    pub fn new(
        api_base: &str,
        token: &str,
        version: &str,
        database_id: Option<String>,
        properties: PropertyNames,
    ) -> Result<Self, SourceError> {
        if token.trim().is_empty() {
            return Err(SourceError::Config("Notion token is empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            version: version.to_string(),
            database_id: database_id.filter(|id| !id.trim().is_empty()),
            properties,
            client,
        })
    }

    pub fn from_config(config: &NotionConfig) -> Result<Self, SourceError> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| SourceError::Config("NOTION_TOKEN is not set".to_string()))?;
        Self::new(
            &config.api_base,
            token,
            &config.version,
            config.database_id.clone(),
            config.properties.clone(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    fn database_id(&self) -> Result<&str, SourceError> {
        self.database_id
            .as_deref()
            .ok_or_else(|| SourceError::Config("NOTION_DATABASE_ID is not set".to_string()))
    }

    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
    }

    pub(crate) async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, SourceError> {
        let resp = req.send().await?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = resp.text().await?;
        check_response(status, retry_after, &text)
    }

    async fn get_page(&self, page_id: &str) -> Result<Page, SourceError> {
        let value = self
            .send(self.request(reqwest::Method::GET, &format!("pages/{page_id}")))
            .await?;
        serde_json::from_value(value).map_err(|e| SourceError::Parse(format!("page {page_id}: {e}")))
    }

    /// Title of a related project page, or a placeholder naming its id.
    async fn project_title(&self, project_id: &str) -> String {
        match self.get_page(project_id).await {
            Ok(page) => page
                .title()
                .unwrap_or_else(|| format!("Project (ID: {project_id})")),
            Err(e) => {
                warn!(project_id, error = %e, "could not resolve project title");
                format!("Project (ID: {project_id})")
            }
        }
    }
}

/// Map a Notion HTTP response to a JSON value or a typed error.
pub(crate) fn check_response(
    status: StatusCode,
    retry_after: Option<u64>,
    text: &str,
) -> Result<Value, SourceError> {
    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(text)
            .map_err(|e| SourceError::Parse(format!("invalid JSON: {e}")));
    }
    let body: ApiErrorBody = serde_json::from_str(text).unwrap_or(ApiErrorBody {
        code: String::new(),
        message: text.chars().take(200).collect(),
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized(body.message)),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(body.message)),
        StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(1),
        }),
        _ => Err(SourceError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        }),
    }
}

#[async_trait]
impl SourceClient for NotionClient {
    async fn query(&self, filter: QueryFilter) -> Result<Vec<Record>, SourceError> {
        let database_id = self.database_id()?;
        let path = format!("databases/{database_id}/query");
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = query_body(filter, cursor.as_deref());
            let value = self
                .send(self.request(reqwest::Method::POST, &path).json(&body))
                .await?;
            let page: QueryResponse = serde_json::from_value(value)
                .map_err(|e| SourceError::Parse(format!("query response: {e}")))?;

            for raw in page.results {
                match serde_json::from_value::<Page>(raw) {
                    Ok(p) => records.push(p.to_record(&self.properties)),
                    Err(e) => warn!(error = %e, "skipping unparsable page"),
                }
            }

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = records.len(), ?filter, "database query complete");
        Ok(records)
    }

    async fn fetch_record(&self, page_id: &str) -> Result<Record, SourceError> {
        let page = self.get_page(page_id).await?;
        let mut record = page.to_record(&self.properties);
        if let Some(project_id) = page.project_relation(&self.properties) {
            record.project = Some(self.project_title(&project_id).await);
        }
        Ok(record)
    }

    async fn ping(&self) -> Result<String, SourceError> {
        let database_id = self.database_id()?;
        let value = self
            .send(self.request(reqwest::Method::GET, &format!("databases/{database_id}")))
            .await?;
        let title: Vec<RichText> =
            serde_json::from_value(value.get("title").cloned().unwrap_or(Value::Null))
                .unwrap_or_default();
        let title: String = title.iter().map(|t| t.plain_text.as_str()).collect();
        Ok(if title.is_empty() {
            database_id.to_string()
        } else {
            title
        })
    }
}
