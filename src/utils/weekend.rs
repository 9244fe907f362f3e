use chrono::{Datelike, Days, NaiveDate};

/// Friday-through-Sunday window for the week containing `today`.
///
/// On a Friday the window starts today; on Saturday or Sunday it rolls to
/// the following weekend.
#[must_use]
pub fn weekend_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_to_friday = (11 - today.weekday().num_days_from_monday()) % 7;
    let friday = today + Days::new(u64::from(days_to_friday));
    let sunday = friday + Days::new(2);
    (friday, sunday)
}
