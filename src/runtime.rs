use crate::clients::notion_client::NotionClient;
use crate::config::Settings;
use crate::service::gemini_service::GeminiService;
use crate::tasks::schedule_loop;

/// Wire the clients together and run the polling loop forever.
pub async fn run_service(settings: Settings) {
    let notion = NotionClient::new(
        &settings.notion_api_key,
        settings.day_db_id.clone(),
        settings.tasks_db_id.clone(),
        settings.hour_convention,
        settings.request_timeout,
    );
    let gemini = GeminiService::new(
        settings.gemini_api_key.clone(),
        settings.gemini_model.clone(),
        settings.event_format,
        settings.request_timeout,
    );

    tracing::info!(
        "Starting schedule polling loop, interval {:?}, timezone {}",
        settings.poll_interval,
        settings.timezone
    );
    schedule_loop::run_schedule_loop(
        &notion,
        &gemini,
        &notion,
        settings.event_format,
        settings.timezone,
        settings.poll_interval,
    )
    .await;
}
