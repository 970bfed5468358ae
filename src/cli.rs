use clap::{Parser, Subcommand};
use inquire::Text;

use crate::clients::notion_client::NotionClient;
use crate::config::Settings;
use crate::models::calendar_event::EventTimes;
use crate::service::gemini_service::{GeminiService, ScheduleModel};
use crate::service::schedule_parser::{parse_schedule, render_schedule, ParseOptions};
use crate::tasks::schedule_loop::schedule_tick;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a day interactively and preview the parsed schedule without
    /// writing anything.
    Preview {},
    /// Run a single polling cycle against Notion and exit.
    Once {},
}

pub async fn cli(settings: Settings) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Preview {} => {
            if let Err(e) = preview_schedule(&settings).await {
                println!("Failed to preview schedule: {}", e);
            }
        }
        Commands::Once {} => {
            if let Err(e) = run_once(&settings).await {
                println!("Failed to run polling cycle: {}", e);
            }
        }
    }
}

async fn preview_schedule(settings: &Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let user_text = Text::new("Describe your day.").prompt()?;

    let gemini = GeminiService::new(
        settings.gemini_api_key.clone(),
        settings.gemini_model.clone(),
        settings.event_format,
        settings.request_timeout,
    );
    let today = chrono::Utc::now()
        .with_timezone(&settings.timezone)
        .date_naive();
    let reply = gemini.generate_schedule(&user_text, today).await?;

    let options = ParseOptions {
        format: settings.event_format,
        today,
    };
    let schedule = parse_schedule(&reply, &options)?;

    for rejected in &schedule.rejected {
        println!("Rejected: {}", rejected);
    }
    for event in &schedule.events {
        match event.resolve_times(settings.hour_convention) {
            EventTimes::AllDay { date } => {
                println!("{}  all day      {}", date, event.title);
            }
            EventTimes::Timed { start, end } => {
                println!(
                    "{}  {}-{}  {}",
                    start.format("%Y-%m-%d"),
                    start.format("%H:%M"),
                    end.format("%H:%M"),
                    event.title
                );
            }
        }
    }
    println!(
        "\nTransport form: {}",
        render_schedule(&schedule.events, settings.event_format)
    );
    Ok(())
}

async fn run_once(settings: &Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
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
    let today = chrono::Utc::now()
        .with_timezone(&settings.timezone)
        .date_naive();
    let options = ParseOptions {
        format: settings.event_format,
        today,
    };

    let summary = schedule_tick(&notion, &gemini, &notion, &options).await?;
    println!(
        "Processed {} entries ({} skipped), created {} events",
        summary.entries_processed, summary.entries_skipped, summary.events_created
    );
    Ok(())
}
