//! Latest-folder discovery.

use chrono::NaiveDate;

/// Index object at the bucket root naming the latest weekly extract.
pub const WEEKLY_INDEX: &str = "weekly";

const FOLDER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Extract the folder name from the content of the weekly index object.
///
/// The index holds a path such as `2024-01-05/weekly.zip`; only its first
/// segment is used.
pub fn latest_folder_from_index(content: &str) -> Option<String> {
    let folder = content.trim().split('/').next()?.trim();
    (!folder.is_empty()).then(|| folder.to_string())
}

/// Pick the most recent folder whose name parses as a `YYYY-MM-DD` date.
///
/// Names that are not dates are ignored.
pub fn latest_dated_folder<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let trimmed = name.trim_end_matches('/');
            NaiveDate::parse_from_str(trimmed, FOLDER_DATE_FORMAT)
                .ok()
                .map(|date| (date, trimmed))
        })
        .max_by_key(|(date, _)| *date)
        .map(|(_, name)| name.to_string())
}
