use chrono::NaiveDate;
use reqwest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::calendar_event::EventFormat;

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const SCHEDULER_PROMPT: &str = r#"You are an expert in personal time management and calendar planning. You will receive a free-form description of your client's ideal day and must translate it into a conflict-free, realistic schedule. Follow these guidelines exactly:

1. Fixed-time events
   - Treat any explicit time reference ("band practice from 1-3 PM", "flight at 08:30") as immovable.
   - Recognize implied fixed events ("lunch at noon", "my class starts at 9") and block them accordingly.

2. Flexible tasks
   - Tasks without a stated duration default to 1 hour.
   - Respect explicit durations exactly ("for 30 minutes", "two hours").
   - Vague requests ("a bit of reading") get a minimum of 30 minutes.

3. Prioritization
   - Use priority cues ("I need to finish my homework" vs "I'd like to go for a run") to place higher-priority items earlier in the day.
   - If more work is requested than realistically fits, schedule as many high-priority items as possible, then stop. Do not overfill the day.
   - If a high-priority task cannot fit at all, place it at the very end of the day with "(unscheduled)" appended to its name.

4. No overlaps
   - Never schedule two things at once.
   - When two blocks would touch (8-9AM followed by 9-10AM), end the first one ten minutes early (8-8:50AM) and leave the gap unscheduled. Do not emit a block for the gap itself.
   - Merge adjacent blocks of the same activity instead of letting them collide.
   - Insert one longer break of 45-60 minutes for a meal around midday, shifted earlier or later around existing events.

5. Preferences and constraints
   - Honor stated productivity patterns ("more productive in the morning", "exercise before breakfast").
   - Honor no-meeting windows ("nothing before 9 AM", "I'm off after 6 PM").

6. Times and dates
   - Use a 24-hour clock for every time value.
   - The current date is provided below in year-month-day form. If the user does not name a day, assume the current day.
   - Resolve relative phrases against the current date: "tomorrow" is 1 day out, "in a fortnight" is 14, "next week" with no weekday is 7 days out, and "next Friday" is the Friday of the following week.
   - An event on a named day with no time ("I have a marathon on August 25th") is a full-day event from 00:00 to 23:59.
   - An event with a time range ("marathon on August 25th from 4-8pm") uses exactly that range.

7. Output format
   - Reply with ONLY the array of events described below, one entry per block.
   - Do not add explanatory text, questions, clarifications, or markdown fences."#;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    parts: Vec<Part>,
}

fn output_shape(format: EventFormat) -> &'static str {
    match format {
        EventFormat::Dated => {
            "[[\"name_of_event\", year, month, day, startHour, startMinute, endHour, endMinute], ...]"
        }
        EventFormat::TimeOnly => {
            "[[\"name_of_event\", startHour, startMinute, endHour, endMinute], ...]"
        }
    }
}

pub fn compose_prompt(user_text: &str, today: NaiveDate, format: EventFormat) -> String {
    format!(
        "{}\nThe array shape is: {}\nThe current date is {}\nUser: {}",
        SCHEDULER_PROMPT,
        output_shape(format),
        today.format("%Y-%m-%d"),
        user_text
    )
}

pub async fn generate_schedule_text(
    user_text: &str,
    today: NaiveDate,
    format: EventFormat,
    api_key: &str,
    model: &str,
    timeout: Duration,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let request = GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: compose_prompt(user_text, today, format),
            }],
        }],
    };

    let url = format!("{}/{}:generateContent", GEMINI_API_BASE_URL, model);
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?; // read the body once

    if !status.is_success() {
        tracing::error!("Gemini request failed with status {}: {}", status, text);
        return Err(format!("Request failed with status {}", status).into());
    }

    let parsed: GenerateContentResponse = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;

    match parsed
        .candidates
        .first()
        .and_then(|candidate| candidate.content.parts.first())
    {
        Some(part) => Ok(part.text.clone()),
        None => {
            tracing::warn!("No candidates in Gemini response. Raw body: {}", text);
            Err("No response from Gemini".to_string().into())
        }
    }
}
