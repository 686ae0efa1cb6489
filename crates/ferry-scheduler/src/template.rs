//! Path templating.

use chrono::{DateTime, TimeZone};
use ferry_config::DATE_FOLDER_PLACEHOLDER;

/// `yyyyMMdd` of `now` in its own timezone.
pub fn date_folder<Z: TimeZone>(now: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    now.format("%Y%m%d").to_string()
}

/// Replace every `{date_folder}` in `template`.
pub fn render<Z: TimeZone>(template: &str, now: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    template.replace(DATE_FOLDER_PLACEHOLDER, &date_folder(now))
}
