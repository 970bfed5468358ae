use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

use crate::clients::gemini_client;
use crate::models::calendar_event::EventFormat;

/// Seam in front of the completion API so the polling loop and the tests
/// never touch the network client directly.
#[async_trait]
pub trait ScheduleModel: Send + Sync {
    async fn generate_schedule(
        &self,
        user_text: &str,
        today: NaiveDate,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct GeminiService {
    api_key: String,
    model: String,
    format: EventFormat,
    timeout: Duration,
}

impl GeminiService {
    pub fn new(api_key: String, model: String, format: EventFormat, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            format,
            timeout,
        }
    }
}

#[async_trait]
impl ScheduleModel for GeminiService {
    async fn generate_schedule(
        &self,
        user_text: &str,
        today: NaiveDate,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        gemini_client::generate_schedule_text(
            user_text,
            today,
            self.format,
            &self.api_key,
            &self.model,
            self.timeout,
        )
        .await
    }
}
