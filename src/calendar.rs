use chrono::Month;

/// The fixed twelve-month calendar in order.
pub const CALENDAR: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Resolves a month cell against the calendar. Matching is exact on the English
/// name ("January"), so "january" or " January" are not recognized.
pub fn month_from_name(name: &str) -> Option<Month> {
    CALENDAR.iter().copied().find(|m| m.name() == name)
}

/// Returns the 0-based position of the month in the calendar (January = 0).
pub fn month_index(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

pub fn month_name(month: Month) -> &'static str {
    month.name()
}

/// Months walking backwards from the one before `month`, wrapping around the year.
///
/// # Examples
/// - March: February, January, December, ..., April
pub fn preceding_months(month: Month) -> impl Iterator<Item = Month> {
    let start = month_index(month);
    (1..12).map(move |offset| CALENDAR[(start + 12 - offset) % 12])
}
