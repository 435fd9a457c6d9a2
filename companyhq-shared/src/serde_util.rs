/// Serde and parsing helpers for request payloads
///
/// Partial updates need to tell "field absent" apart from "field set to
/// null". Fields typed `Option<Option<T>>` and annotated with
/// `#[serde(default, deserialize_with = "double_option")]` deserialize as:
///
/// - absent      → `None`
/// - `null`      → `Some(None)`
/// - a value     → `Some(Some(value))`
///
/// # Example
///
/// ```
/// use companyhq_shared::serde_util::double_option;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Patch {
///     #[serde(default, deserialize_with = "double_option")]
///     folder: Option<Option<String>>,
/// }
///
/// let absent: Patch = serde_json::from_str("{}").unwrap();
/// assert!(absent.folder.is_none());
///
/// let cleared: Patch = serde_json::from_str(r#"{"folder": null}"#).unwrap();
/// assert_eq!(cleared.folder, Some(None));
/// ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// Deserializes a present field (including `null`) into `Some(..)`
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses a client-supplied timestamp into UTC
///
/// Accepts RFC 3339 (`2025-03-01T09:30:00Z`, `2025-03-01T09:30:00+02:00`),
/// naive ISO date-times which are taken as UTC (`2025-03-01T09:30:00`,
/// `2025-03-01T09:30`) and bare dates (`2025-03-01`, midnight UTC).
///
/// Returns `None` when the input matches none of these forms.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let midnight = parse_date(input)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Parses a `YYYY-MM-DD` calendar date
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}
