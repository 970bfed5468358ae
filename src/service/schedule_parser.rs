//! Turns a raw model reply into validated calendar events.
//!
//! The model is asked for a bare array literal, but replies routinely arrive
//! wrapped in markdown fences, padded with prose, or carrying zero-padded
//! numbers. The cleanup steps here mirror that reality: strip fences, cut
//! out the first-to-last bracketed span, normalize the numbers, then read
//! the text with a small literal reader that only knows arrays, quoted
//! strings, and integers. Nothing in the reply is ever evaluated as code.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use thiserror::Error;

use crate::models::calendar_event::{CalendarEvent, EventFormat};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedOutput {
    #[error("no array found in model output")]
    NoArray,
    #[error("model output is not an array of events")]
    NotAnArray,
    #[error("invalid literal at offset {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("every event in the reply failed validation")]
    NoValidEvents,
    #[error("event {index} rejected: {reason}")]
    Element { index: usize, reason: String },
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub format: EventFormat,
    /// Date assigned to `TimeOnly` events. Supplied by the caller so the
    /// parser never reads the system clock.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub events: Vec<CalendarEvent>,
    /// Per-element failures. The siblings that did validate are kept in
    /// `events`; a bad element never discards the rest of the reply.
    pub rejected: Vec<MalformedOutput>,
}

/// Parse a model reply into a schedule.
///
/// Whole-input failures (no array present, unreadable literal) come back as
/// `Err`; element-level failures land in `ParsedSchedule::rejected` with the
/// offending index.
pub fn parse_schedule(raw: &str, options: &ParseOptions) -> Result<ParsedSchedule, MalformedOutput> {
    let text = strip_fences(raw);
    let array_text = extract_array(&text)?;
    let array_text = strip_leading_zeros(&array_text);

    let Literal::List(elements) = read_literal(&array_text)? else {
        return Err(MalformedOutput::NotAnArray);
    };

    let mut schedule = ParsedSchedule::default();
    for (index, element) in elements.iter().enumerate() {
        match build_event(index, element, options) {
            Ok(event) => schedule.events.push(event),
            Err(err) => schedule.rejected.push(err),
        }
    }
    Ok(schedule)
}

/// Canonical transport form of a schedule. Feeding the result back through
/// `parse_schedule` with the same options yields the same events.
pub fn render_schedule(events: &[CalendarEvent], format: EventFormat) -> String {
    let mut out = String::from("[");
    for (index, event) in events.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        match format {
            EventFormat::Dated => out.push_str(&format!(
                "[{}, {}, {}, {}, {}, {}, {}, {}]",
                quote(&event.title),
                event.date.year(),
                event.date.month(),
                event.date.day(),
                event.start_hour,
                event.start_minute,
                event.end_hour,
                event.end_minute
            )),
            EventFormat::TimeOnly => out.push_str(&format!(
                "[{}, {}, {}, {}, {}]",
                quote(&event.title),
                event.start_hour,
                event.start_minute,
                event.end_hour,
                event.end_minute
            )),
        }
    }
    out.push(']');
    out
}

fn quote(title: &str) -> String {
    let mut quoted = String::from("\"");
    for ch in title.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn strip_fences(raw: &str) -> String {
    let fence = Regex::new(r"```[A-Za-z0-9_-]*").unwrap();
    fence.replace_all(raw, "").into_owned()
}

// First '[' to last ']' across the whole text, so stray prose around the
// array is tolerated.
fn extract_array(text: &str) -> Result<String, MalformedOutput> {
    let array = Regex::new(r"(?s)\[.*\]").unwrap();
    match array.find(text) {
        Some(found) => Ok(found.as_str().to_string()),
        None => Err(MalformedOutput::NoArray),
    }
}

// 09 -> 9 for integers that follow '[' or ','. The literal grammar itself
// accepts the padded form too; this keeps the extracted text canonical.
fn strip_leading_zeros(text: &str) -> String {
    let padded = Regex::new(r"([\[,]\s*)0+(\d)").unwrap();
    padded.replace_all(text, "${1}${2}").into_owned()
}

fn build_event(
    index: usize,
    element: &Literal,
    options: &ParseOptions,
) -> Result<CalendarEvent, MalformedOutput> {
    let reject = |reason: String| MalformedOutput::Element { index, reason };

    let Literal::List(fields) = element else {
        return Err(reject("not an array".to_string()));
    };
    let expected = options.format.element_count();
    if fields.len() != expected {
        return Err(reject(format!(
            "expected {} elements, found {}",
            expected,
            fields.len()
        )));
    }

    let title = match &fields[0] {
        Literal::Str(title) if !title.trim().is_empty() => title.clone(),
        Literal::Str(_) => return Err(reject("empty title".to_string())),
        _ => return Err(reject("title must be a string".to_string())),
    };

    let mut numbers = Vec::with_capacity(fields.len() - 1);
    for (offset, field) in fields[1..].iter().enumerate() {
        match field {
            Literal::Int(value) => numbers.push(*value),
            _ => return Err(reject(format!("field {} must be an integer", offset + 1))),
        }
    }

    let (date, raw_clock) = match options.format {
        EventFormat::Dated => {
            let date = date_from(numbers[0], numbers[1], numbers[2]).ok_or_else(|| {
                reject(format!(
                    "invalid calendar date {}-{}-{}",
                    numbers[0], numbers[1], numbers[2]
                ))
            })?;
            (date, &numbers[3..7])
        }
        EventFormat::TimeOnly => (options.today, &numbers[0..4]),
    };

    let (start_hour, start_minute) = clock_from(raw_clock[0], raw_clock[1]).ok_or_else(|| {
        reject(format!(
            "start time {}:{} out of range",
            raw_clock[0], raw_clock[1]
        ))
    })?;
    let (end_hour, end_minute) = clock_from(raw_clock[2], raw_clock[3]).ok_or_else(|| {
        reject(format!(
            "end time {}:{} out of range",
            raw_clock[2], raw_clock[3]
        ))
    })?;

    // An end of exactly 00:00 reads as midnight at the end of the day, so an
    // evening block like 22:00-00:00 passes the ordering check.
    let end_key = if end_hour == 0 && end_minute == 0 {
        (24, 0)
    } else {
        (end_hour, end_minute)
    };
    if (start_hour, start_minute) > end_key {
        return Err(reject(format!(
            "start {:02}:{:02} is after end {:02}:{:02}",
            start_hour, start_minute, end_hour, end_minute
        )));
    }

    Ok(CalendarEvent {
        title,
        date,
        start_hour,
        start_minute,
        end_hour,
        end_minute,
    })
}

fn date_from(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    let month = u32::try_from(month).ok()?;
    let day = u32::try_from(day).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn clock_from(hour: i64, minute: i64) -> Option<(u32, u32)> {
    let hour = u32::try_from(hour).ok().filter(|h| *h <= 23)?;
    let minute = u32::try_from(minute).ok().filter(|m| *m <= 59)?;
    Some((hour, minute))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Int(i64),
    Str(String),
    List(Vec<Literal>),
}

fn read_literal(text: &str) -> Result<Literal, MalformedOutput> {
    let mut reader = Reader::new(text);
    let value = reader.read_value()?;
    reader.skip_whitespace();
    if reader.peek().is_some() {
        return Err(reader.error("trailing characters after array"));
    }
    Ok(value)
}

// Recursive-descent reader for the literal grammar: arrays, single- or
// double-quoted strings, integers. This is the whole grammar; anything else
// in the text is a syntax error rather than something to execute.
struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> MalformedOutput {
        MalformedOutput::Syntax {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_value(&mut self) -> Result<Literal, MalformedOutput> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => self.read_list(),
            Some('"') | Some('\'') => self.read_string(),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.read_int(),
            Some(_) => Err(self.error("expected '[', a quoted string, or an integer")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn read_list(&mut self) -> Result<Literal, MalformedOutput> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Literal::List(items));
                }
                None => return Err(self.error("unterminated array")),
                _ => {}
            }
            items.push(self.read_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(']') => {
                    self.pos += 1;
                    return Ok(Literal::List(items));
                }
                _ => return Err(self.error("expected ',' or ']' after array element")),
            }
        }
    }

    fn read_string(&mut self) -> Result<Literal, MalformedOutput> {
        let quote = self.chars[self.pos];
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(ch @ ('\\' | '\'' | '"')) => out.push(ch),
                        _ => return Err(self.error("unsupported escape sequence")),
                    }
                    self.pos += 1;
                }
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(Literal::Str(out));
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
            }
        }
    }

    fn read_int(&mut self) -> Result<Literal, MalformedOutput> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| MalformedOutput::Syntax {
                position: start,
                message: format!("invalid integer `{}`", text),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_arrays_of_strings_and_integers() {
        let literal = read_literal(r#"[["Lunch", 12, 0], [7, -3]]"#).unwrap();
        assert_eq!(
            literal,
            Literal::List(vec![
                Literal::List(vec![
                    Literal::Str("Lunch".to_string()),
                    Literal::Int(12),
                    Literal::Int(0),
                ]),
                Literal::List(vec![Literal::Int(7), Literal::Int(-3)]),
            ])
        );
    }

    #[test]
    fn reads_single_quoted_strings_and_escapes() {
        let literal = read_literal(r#"['Bob\'s party', "say \"hi\""]"#).unwrap();
        assert_eq!(
            literal,
            Literal::List(vec![
                Literal::Str("Bob's party".to_string()),
                Literal::Str("say \"hi\"".to_string()),
            ])
        );
    }

    #[test]
    fn tolerates_trailing_commas_and_newlines() {
        let literal = read_literal("[\n  [1, 2],\n  [3, 4],\n]").unwrap();
        assert_eq!(
            literal,
            Literal::List(vec![
                Literal::List(vec![Literal::Int(1), Literal::Int(2)]),
                Literal::List(vec![Literal::Int(3), Literal::Int(4)]),
            ])
        );
    }

    #[test]
    fn rejects_anything_outside_the_grammar() {
        assert!(matches!(
            read_literal("[__import__, 1]"),
            Err(MalformedOutput::Syntax { .. })
        ));
        assert!(matches!(
            read_literal("[1, 2"),
            Err(MalformedOutput::Syntax { .. })
        ));
        assert!(matches!(
            read_literal("['unterminated]"),
            Err(MalformedOutput::Syntax { .. })
        ));
    }

    #[test]
    fn leading_zero_cleanup_leaves_strings_and_bare_zero_alone() {
        assert_eq!(strip_leading_zeros("[09, 00, 0]"), "[9, 0, 0]");
        assert_eq!(strip_leading_zeros("[010]"), "[10]");
        assert_eq!(strip_leading_zeros("[\"Room 09\"]"), "[\"Room 09\"]");
    }

    #[test]
    fn fence_markers_are_removed_with_and_without_language_tag() {
        assert_eq!(strip_fences("```json\n[1]\n```"), "\n[1]\n");
        assert_eq!(strip_fences("```\n[1]\n```"), "\n[1]\n");
    }
}
