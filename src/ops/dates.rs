use chrono::{Local, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::model::config::Config;

/// Parse a user-supplied due date against today's date.
pub fn parse_due_date(input: &str, config: &Config) -> Result<NaiveDate> {
    parse_date_on(input, config, Local::now().date_naive())
}

/// Parse `input` with the configured formats (first match wins) and check it
/// falls within `date_max_years_past` / `date_max_years_future` of `today`.
pub fn parse_date_on(input: &str, config: &Config, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let date = config
        .date_formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            Error::validation(format!(
                "invalid date format '{}'; accepted formats: {}",
                input,
                config.date_formats.join(", ")
            ))
        })?;

    let earliest = config
        .date_max_years_past
        .checked_mul(12)
        .and_then(|months| today.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN);
    let latest = config
        .date_max_years_future
        .checked_mul(12)
        .and_then(|months| today.checked_add_months(Months::new(months)))
        .unwrap_or(NaiveDate::MAX);
    if date < earliest || date > latest {
        return Err(Error::validation(format!(
            "date {} out of range: must be between {} and {}",
            date, earliest, latest
        )));
    }
    Ok(date)
}
