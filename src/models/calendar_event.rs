use chrono::{NaiveDate, NaiveDateTime};

/// Tuple layout the model is instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// `[title, year, month, day, startHour, startMinute, endHour, endMinute]`
    Dated,
    /// `[title, startHour, startMinute, endHour, endMinute]`, dated to the
    /// processing day.
    TimeOnly,
}

impl EventFormat {
    pub fn element_count(&self) -> usize {
        match self {
            EventFormat::Dated => 8,
            EventFormat::TimeOnly => 5,
        }
    }
}

/// Hour numbering used by the persistence target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourConvention {
    /// Hours are written exactly as parsed (0-23).
    Standard,
    /// The target numbers a day as hours 1-24: an hour of exactly 0 is
    /// remapped to 24 first, then every hour is decremented by one.
    OneBased,
}

impl HourConvention {
    pub fn apply(&self, hour: u32) -> u32 {
        match self {
            HourConvention::Standard => hour,
            HourConvention::OneBased => {
                let hour = if hour == 0 { 24 } else { hour };
                hour - 1
            }
        }
    }
}

/// One scheduled block as parsed from the model reply. Hour and minute
/// fields hold the raw tuple values; any convention remap happens only in
/// `resolve_times`, on the way to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub date: NaiveDate,
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

/// Wall-clock form of an event, ready for the calendar record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTimes {
    AllDay { date: NaiveDate },
    Timed { start: NaiveDateTime, end: NaiveDateTime },
}

impl CalendarEvent {
    /// The 00:00-23:59 sentinel marks a full-day block.
    pub fn is_all_day(&self) -> bool {
        self.start_hour == 0
            && self.start_minute == 0
            && self.end_hour == 23
            && self.end_minute == 59
    }

    /// Resolve the raw tuple times into timestamps under the given
    /// persistence convention. All-day events carry no time component.
    pub fn resolve_times(&self, convention: HourConvention) -> EventTimes {
        if self.is_all_day() {
            return EventTimes::AllDay { date: self.date };
        }
        let start = self
            .date
            .and_hms_opt(convention.apply(self.start_hour), self.start_minute, 0)
            .unwrap();
        let end = self
            .date
            .and_hms_opt(convention.apply(self.end_hour), self.end_minute, 0)
            .unwrap();
        EventTimes::Timed { start, end }
    }

    pub fn overlaps(&self, other: &CalendarEvent) -> bool {
        if self.date != other.date || self.is_all_day() || other.is_all_day() {
            return false;
        }
        self.start_key() < other.end_key() && other.start_key() < self.end_key()
    }

    fn start_key(&self) -> (u32, u32) {
        (self.start_hour, self.start_minute)
    }

    // An end of exactly 00:00 reads as midnight at the end of the day.
    fn end_key(&self) -> (u32, u32) {
        if self.end_hour == 0 && self.end_minute == 0 {
            (24, 0)
        } else {
            (self.end_hour, self.end_minute)
        }
    }
}

/// Index pairs of events that occupy overlapping time on the same date.
/// The model is responsible for avoiding collisions; this only surfaces the
/// ones it missed so they can be logged.
pub fn find_overlaps(events: &[CalendarEvent]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for first in 0..events.len() {
        for second in first + 1..events.len() {
            if events[first].overlaps(&events[second]) {
                pairs.push((first, second));
            }
        }
    }
    pairs
}
