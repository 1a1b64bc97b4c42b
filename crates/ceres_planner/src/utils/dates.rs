use jiff::{
    ToSpan,
    civil::{Date, Weekday},
};

/// Number of calendar days from `from` to `to`, negative when `to` is earlier.
pub fn days_between(from: Date, to: Date) -> i32 {
    to.since(from).map(|span| span.get_days()).unwrap_or(0)
}

pub fn add_days(date: Date, days: i32) -> Date {
    date.saturating_add(days.days())
}

/// Inclusive iterator over `[start, end]`.
pub fn date_range(start: Date, end: Date) -> impl Iterator<Item = Date> {
    let len = days_between(start, end).max(-1) + 1;
    (0..len).map(move |offset| add_days(start, offset))
}

pub fn is_weekday(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}
