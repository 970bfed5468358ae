use chrono::NaiveDate;

use plannerBot::models::calendar_event::{
    find_overlaps, CalendarEvent, EventFormat, EventTimes, HourConvention,
};
use plannerBot::service::schedule_parser::{
    parse_schedule, render_schedule, MalformedOutput, ParseOptions,
};

fn dated_options() -> ParseOptions {
    ParseOptions {
        format: EventFormat::Dated,
        today: NaiveDate::from_ymd_opt(2025, 7, 8).unwrap(),
    }
}

fn time_only_options() -> ParseOptions {
    ParseOptions {
        format: EventFormat::TimeOnly,
        today: NaiveDate::from_ymd_opt(2025, 7, 8).unwrap(),
    }
}

#[test]
fn parses_one_event_per_top_level_element() {
    let reply = r#"[["School", 2025, 7, 8, 13, 0, 14, 50], ["Homework", 2025, 7, 8, 15, 0, 16, 0]]"#;
    let schedule = parse_schedule(reply, &dated_options()).unwrap();

    assert_eq!(schedule.events.len(), 2);
    assert!(schedule.rejected.is_empty());
    assert_eq!(schedule.events[0].title, "School");
    assert_eq!(
        schedule.events[0].date,
        NaiveDate::from_ymd_opt(2025, 7, 8).unwrap()
    );
    assert_eq!(schedule.events[0].start_hour, 13);
    assert_eq!(schedule.events[1].end_minute, 0);
}

#[test]
fn leading_zeros_parse_like_plain_numbers() {
    let padded = r#"[["A", 2025, 7, 8, 09, 00, 10, 00]]"#;
    let plain = r#"[["A", 2025, 7, 8, 9, 0, 10, 0]]"#;

    let from_padded = parse_schedule(padded, &dated_options()).unwrap();
    let from_plain = parse_schedule(plain, &dated_options()).unwrap();
    assert_eq!(from_padded, from_plain);
}

#[test]
fn fenced_output_parses_like_the_bare_array() {
    let bare = r#"[["Gym", 2025, 7, 8, 17, 0, 18, 0]]"#;
    let fenced = format!("```\n{}\n```", bare);
    let fenced_with_tag = format!("```json\n{}\n```", bare);

    let expected = parse_schedule(bare, &dated_options()).unwrap();
    assert_eq!(parse_schedule(&fenced, &dated_options()).unwrap(), expected);
    assert_eq!(
        parse_schedule(&fenced_with_tag, &dated_options()).unwrap(),
        expected
    );
}

#[test]
fn surrounding_prose_is_tolerated() {
    let reply = "Here is your schedule:\n[[\"Gym\", 2025, 7, 8, 17, 0, 18, 0]]\nEnjoy your day!";
    let schedule = parse_schedule(reply, &dated_options()).unwrap();
    assert_eq!(schedule.events.len(), 1);
    assert_eq!(schedule.events[0].title, "Gym");
}

#[test]
fn single_quoted_titles_are_accepted() {
    let reply = "[['Band practice', 2025, 7, 8, 13, 0, 15, 0]]";
    let schedule = parse_schedule(reply, &dated_options()).unwrap();
    assert_eq!(schedule.events[0].title, "Band practice");
}

#[test]
fn all_day_sentinel_produces_a_date_only_record() {
    let reply = r#"[["Conference", 2025, 8, 25, 0, 0, 23, 59]]"#;
    let schedule = parse_schedule(reply, &dated_options()).unwrap();

    let event = &schedule.events[0];
    assert!(event.is_all_day());
    assert_eq!(
        event.resolve_times(HourConvention::OneBased),
        EventTimes::AllDay {
            date: NaiveDate::from_ymd_opt(2025, 8, 25).unwrap()
        }
    );
}

#[test]
fn one_based_convention_remaps_hour_zero_then_decrements() {
    // 0 -> 24, then -1; every other hour just decrements.
    assert_eq!(HourConvention::OneBased.apply(0), 23);
    assert_eq!(HourConvention::OneBased.apply(9), 8);
    assert_eq!(HourConvention::OneBased.apply(23), 22);
    assert_eq!(HourConvention::Standard.apply(0), 0);
    assert_eq!(HourConvention::Standard.apply(9), 9);
}

#[test]
fn resolve_times_applies_the_convention_only_at_the_boundary() {
    let reply = r#"[["Late shift", 2025, 7, 8, 22, 0, 0, 0]]"#;
    let schedule = parse_schedule(reply, &dated_options()).unwrap();
    let event = &schedule.events[0];

    // Raw tuple values are stored untouched.
    assert_eq!(event.start_hour, 22);
    assert_eq!(event.end_hour, 0);

    let EventTimes::Timed { start, end } = event.resolve_times(HourConvention::OneBased) else {
        panic!("expected a timed event");
    };
    assert_eq!(start.format("%H:%M").to_string(), "21:00");
    assert_eq!(end.format("%H:%M").to_string(), "23:00");

    let EventTimes::Timed { start, .. } = event.resolve_times(HourConvention::Standard) else {
        panic!("expected a timed event");
    };
    assert_eq!(start.format("%H:%M").to_string(), "22:00");
}

#[test]
fn input_without_brackets_is_malformed_not_fatal() {
    let result = parse_schedule("no brackets here", &dated_options());
    assert_eq!(result, Err(MalformedOutput::NoArray));
}

#[test]
fn wrong_length_element_is_rejected_without_discarding_siblings() {
    let reply = r#"[["Good", 2025, 7, 8, 9, 0, 10, 0], ["Bad", 9, 0], ["Also good", 2025, 7, 8, 11, 0, 12, 0]]"#;
    let schedule = parse_schedule(reply, &dated_options()).unwrap();

    assert_eq!(schedule.events.len(), 2);
    assert_eq!(schedule.events[0].title, "Good");
    assert_eq!(schedule.events[1].title, "Also good");
    assert_eq!(schedule.rejected.len(), 1);
    assert!(matches!(
        schedule.rejected[0],
        MalformedOutput::Element { index: 1, .. }
    ));
}

#[test]
fn time_only_mode_accepts_five_element_tuples() {
    let reply = r#"[["Gym", 9, 0, 10, 30]]"#;
    let options = time_only_options();
    let schedule = parse_schedule(reply, &options).unwrap();

    assert_eq!(schedule.events.len(), 1);
    assert_eq!(schedule.events[0].date, options.today);
    assert_eq!(schedule.events[0].end_minute, 30);
}

#[test]
fn each_mode_rejects_the_other_tuple_length() {
    let five = r#"[["Gym", 9, 0, 10, 30]]"#;
    let eight = r#"[["Gym", 2025, 7, 8, 9, 0, 10, 30]]"#;

    let in_dated = parse_schedule(five, &dated_options()).unwrap();
    assert!(in_dated.events.is_empty());
    assert_eq!(in_dated.rejected.len(), 1);

    let in_time_only = parse_schedule(eight, &time_only_options()).unwrap();
    assert!(in_time_only.events.is_empty());
    assert_eq!(in_time_only.rejected.len(), 1);
}

#[test]
fn bad_types_and_bad_ranges_are_rejected_individually() {
    let reply = r#"[[42, 2025, 7, 8, 9, 0, 10, 0], ["X", 2025, 13, 40, 9, 0, 10, 0], ["Y", 2025, 7, 8, 25, 0, 26, 0], ["Z", 2025, 7, 8, 14, 0, 13, 0]]"#;
    let schedule = parse_schedule(reply, &dated_options()).unwrap();

    assert!(schedule.events.is_empty());
    assert_eq!(schedule.rejected.len(), 4);
}

#[test]
fn reparsing_the_rendered_schedule_is_identical() {
    let reply = "Sure!\n```json\n[['Breakfast', 2025, 7, 8, 08, 00, 8, 30], [\"Marathon\", 2025, 8, 25, 0, 0, 23, 59]]\n```";
    let options = dated_options();
    let first = parse_schedule(reply, &options).unwrap();

    let rendered = render_schedule(&first.events, options.format);
    let second = parse_schedule(&rendered, &options).unwrap();
    assert_eq!(first.events, second.events);
    assert!(second.rejected.is_empty());
}

#[test]
fn reparsing_rendered_time_only_schedules_is_identical() {
    let options = time_only_options();
    let first = parse_schedule(r#"[["Call with \"the team\"", 9, 0, 9, 45]]"#, &options).unwrap();

    let rendered = render_schedule(&first.events, options.format);
    let second = parse_schedule(&rendered, &options).unwrap();
    assert_eq!(first.events, second.events);
}

#[test]
fn overlapping_events_are_reported_in_pairs() {
    fn event(title: &str, sh: u32, sm: u32, eh: u32, em: u32) -> CalendarEvent {
        CalendarEvent {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 7, 8).unwrap(),
            start_hour: sh,
            start_minute: sm,
            end_hour: eh,
            end_minute: em,
        }
    }

    let events = vec![
        event("School", 13, 0, 14, 50),
        event("Band", 14, 0, 16, 0),
        event("Dinner", 18, 0, 19, 0),
    ];
    assert_eq!(find_overlaps(&events), vec![(0, 1)]);

    // Back-to-back blocks do not overlap.
    let adjacent = vec![event("A", 9, 0, 10, 0), event("B", 10, 0, 11, 0)];
    assert!(find_overlaps(&adjacent).is_empty());

    // All-day banners are not treated as blocks.
    let with_banner = vec![event("Conference", 0, 0, 23, 59), event("Lunch", 12, 0, 13, 0)];
    assert!(find_overlaps(&with_banner).is_empty());
}
