//! Notion API client.
//!
//! One client covers both sides of the flow: reading pending day
//! descriptions out of the source database and writing calendar pages into
//! the tasks database.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::calendar_event::{CalendarEvent, EventTimes, HourConvention};
use crate::tasks::schedule_loop::{EventSink, TaskSource};

pub const NOTION_API_VERSION: &str = "2022-06-28";
pub const NOTION_BASE_URL: &str = "https://api.notion.com/v1";

// Checkbox properties on the source database.
const READY_PROPERTY: &str = "Send to Calendar";
const PROCESSED_PROPERTY: &str = "Processed";

pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    day_db_id: String,
    tasks_db_id: String,
    hour_convention: HourConvention,
}

impl NotionClient {
    pub fn new(
        api_key: &str,
        day_db_id: String,
        tasks_db_id: String,
        hour_convention: HourConvention,
        timeout: Duration,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).unwrap(),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Notion-Version",
            HeaderValue::from_static(NOTION_API_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap();

        NotionClient {
            client,
            base_url: NOTION_BASE_URL.to_string(),
            day_db_id,
            tasks_db_id,
            hour_convention,
        }
    }

    /// Page ids of entries flagged ready for scheduling and not yet
    /// processed.
    pub async fn query_pending(
        &self,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/databases/{}/query", self.base_url, self.day_db_id);
        let body = json!({
            "filter": {
                "and": [
                    { "property": READY_PROPERTY, "checkbox": { "equals": true } },
                    { "property": PROCESSED_PROPERTY, "checkbox": { "equals": false } }
                ]
            }
        });
        let response = self.post_json(&url, &body).await?;

        let mut page_ids = Vec::new();
        if let Some(results) = response.get("results").and_then(|r| r.as_array()) {
            for page in results {
                if let Some(id) = page.get("id").and_then(|id| id.as_str()) {
                    page_ids.push(id.to_string());
                }
            }
        }
        Ok(page_ids)
    }

    /// Paragraph text of a page, joined with newlines.
    pub async fn read_page_text(
        &self,
        page_id: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/blocks/{}/children", self.base_url, page_id);
        let response = self.get_json(&url).await?;
        Ok(extract_paragraph_text(&response))
    }

    /// Create one calendar page. All-day events get a date-only range;
    /// everything else gets full timestamps under the configured hour
    /// convention.
    pub async fn create_calendar_page(
        &self,
        event: &CalendarEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/pages", self.base_url);
        let date = match event.resolve_times(self.hour_convention) {
            EventTimes::AllDay { date } => {
                let day = date.format("%Y-%m-%d").to_string();
                json!({ "start": day, "end": day })
            }
            EventTimes::Timed { start, end } => json!({
                "start": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "end": end.format("%Y-%m-%dT%H:%M:%S").to_string(),
            }),
        };
        let body = json!({
            "parent": { "database_id": self.tasks_db_id },
            "properties": {
                "Name": { "title": [{ "text": { "content": event.title.as_str() } }] },
                "Date": { "date": date }
            }
        });
        self.post_json(&url, &body).await?;
        Ok(())
    }

    /// Set the Processed checkbox. Safe to repeat.
    pub async fn set_processed(
        &self,
        page_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let body = json!({
            "properties": { PROCESSED_PROPERTY: { "checkbox": true } }
        });
        self.patch_json(&url, &body).await?;
        Ok(())
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.post(url).json(body).send().await?;
        Self::into_json(url, response).await
    }

    async fn patch_json(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.patch(url).json(body).send().await?;
        Self::into_json(url, response).await
    }

    async fn get_json(
        &self,
        url: &str,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.get(url).send().await?;
        Self::into_json(url, response).await
    }

    async fn into_json(
        url: &str,
        response: reqwest::Response,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let status = response.status();
        let text = response.text().await?; // read the body once

        if !status.is_success() {
            tracing::error!("Notion request to {} failed with status {}: {}", url, status, text);
            return Err(format!("Request failed with status {}", status).into());
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;
        Ok(parsed)
    }
}

#[async_trait]
impl TaskSource for NotionClient {
    async fn fetch_pending(&self) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        self.query_pending().await
    }

    async fn read_content(
        &self,
        page_id: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.read_page_text(page_id).await
    }

    async fn mark_processed(
        &self,
        page_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_processed(page_id).await
    }
}

#[async_trait]
impl EventSink for NotionClient {
    async fn create_event(
        &self,
        event: &CalendarEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.create_calendar_page(event).await
    }
}

/// Pull the plain text out of every paragraph block in a block-children
/// response.
pub fn extract_paragraph_text(blocks_response: &Value) -> String {
    let mut lines = Vec::new();
    if let Some(results) = blocks_response.get("results").and_then(|r| r.as_array()) {
        for block in results {
            if block.get("type").and_then(|t| t.as_str()) != Some("paragraph") {
                continue;
            }
            if let Some(rich_text) = block
                .get("paragraph")
                .and_then(|p| p.get("rich_text"))
                .and_then(|r| r.as_array())
            {
                for fragment in rich_text {
                    if let Some(text) = fragment.get("plain_text").and_then(|t| t.as_str()) {
                        lines.push(text.to_string());
                    }
                }
            }
        }
    }
    lines.join("\n")
}
