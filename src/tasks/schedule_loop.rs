use async_trait::async_trait;
use chrono_tz::Tz;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::calendar_event::{find_overlaps, CalendarEvent, EventFormat};
use crate::service::gemini_service::ScheduleModel;
use crate::service::schedule_parser::{parse_schedule, MalformedOutput, ParseOptions};

/// Store holding the entries waiting to be scheduled.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_pending(&self) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;
    async fn read_content(
        &self,
        page_id: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
    async fn mark_processed(
        &self,
        page_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Calendar the validated events are written into.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn create_event(
        &self,
        event: &CalendarEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub entries_processed: usize,
    pub entries_skipped: usize,
    pub events_created: usize,
}

pub async fn run_schedule_loop<S, M, K>(
    source: &S,
    model: &M,
    sink: &K,
    format: EventFormat,
    timezone: Tz,
    interval: Duration,
) where
    S: TaskSource,
    M: ScheduleModel,
    K: EventSink,
{
    loop {
        sleep(interval).await;
        let today = chrono::Utc::now().with_timezone(&timezone).date_naive();
        let options = ParseOptions { format, today };
        match schedule_tick(source, model, sink, &options).await {
            Ok(summary) => {
                if summary.entries_processed > 0 || summary.entries_skipped > 0 {
                    tracing::info!(
                        "Cycle finished: {} processed, {} skipped, {} events created",
                        summary.entries_processed,
                        summary.entries_skipped,
                        summary.events_created
                    );
                }
            }
            Err(err) => tracing::error!("Polling cycle failed: {}", err),
        }
    }
}

/// One polling cycle. An entry that fails anywhere along the way is logged
/// and left unprocessed so the next cycle retries it; the other entries in
/// the batch still run.
pub async fn schedule_tick<S, M, K>(
    source: &S,
    model: &M,
    sink: &K,
    options: &ParseOptions,
) -> Result<TickSummary, Box<dyn std::error::Error + Send + Sync>>
where
    S: TaskSource + ?Sized,
    M: ScheduleModel + ?Sized,
    K: EventSink + ?Sized,
{
    let pending = source.fetch_pending().await?;
    let mut summary = TickSummary::default();

    for page_id in pending {
        match process_entry(source, model, sink, options, &page_id).await {
            Ok(created) => {
                summary.entries_processed += 1;
                summary.events_created += created;
            }
            Err(err) => {
                tracing::warn!("Entry {} left unprocessed: {}", page_id, err);
                summary.entries_skipped += 1;
            }
        }
    }
    Ok(summary)
}

async fn process_entry<S, M, K>(
    source: &S,
    model: &M,
    sink: &K,
    options: &ParseOptions,
    page_id: &str,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>
where
    S: TaskSource + ?Sized,
    M: ScheduleModel + ?Sized,
    K: EventSink + ?Sized,
{
    let text = source.read_content(page_id).await?;
    tracing::debug!("Entry {} content: {}", page_id, text);

    let reply = model.generate_schedule(&text, options.today).await?;
    let schedule = parse_schedule(&reply, options)?;

    for rejected in &schedule.rejected {
        tracing::warn!("Entry {}: {}", page_id, rejected);
    }
    // A reply where nothing validated is a malformed reply, not an empty day.
    if schedule.events.is_empty() && !schedule.rejected.is_empty() {
        return Err(Box::new(MalformedOutput::NoValidEvents));
    }

    for (first, second) in find_overlaps(&schedule.events) {
        tracing::warn!(
            "Entry {}: events \"{}\" and \"{}\" overlap",
            page_id,
            schedule.events[first].title,
            schedule.events[second].title
        );
    }

    // No rollback: events created before a failure stay created, and the
    // entry is retried whole on the next cycle.
    let mut created = 0;
    for event in &schedule.events {
        sink.create_event(event).await?;
        created += 1;
    }

    source.mark_processed(page_id).await?;
    Ok(created)
}
