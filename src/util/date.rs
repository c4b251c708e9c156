/* Copyright © 2024-2025 Adam Train <adam@adamtrain.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{anyhow, bail, Error};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a point in time out of a document field. Documents written by the
/// web client carry several shapes for the same thing, so all of these are
/// accepted:
///
/// - RFC 3339 strings ("2024-11-15T10:00:00Z")
/// - plain dates ("2024-11-15"), taken as midnight UTC
/// - integer epoch milliseconds
/// - timestamp objects, either `{seconds, nanoseconds}` or the admin SDK's
///   `{_seconds, _nanoseconds}`
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, Error> {
	match value {
		Value::String(s) => parse_timestamp_str(s),
		Value::Number(n) => {
			let millis = n
				.as_i64()
				.ok_or_else(|| anyhow!("timestamp must be whole ms: {}", n))?;
			Utc.timestamp_millis_opt(millis)
				.single()
				.ok_or_else(|| anyhow!("timestamp out of range: {}", n))
		},
		Value::Object(map) => {
			let seconds = map
				.get("seconds")
				.or_else(|| map.get("_seconds"))
				.and_then(Value::as_i64)
				.ok_or_else(|| anyhow!("timestamp object has no seconds"))?;
			let nanos = map
				.get("nanoseconds")
				.or_else(|| map.get("_nanoseconds"))
				.and_then(Value::as_u64)
				.unwrap_or(0);
			let nanos = u32::try_from(nanos)
				.map_err(|_| anyhow!("nanoseconds out of range: {}", nanos))?;

			Utc.timestamp_opt(seconds, nanos)
				.single()
				.ok_or_else(|| anyhow!("timestamp out of range: {}", seconds))
		},
		other => bail!("unsupported timestamp value: {}", other),
	}
}

pub fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, Error> {
	let s = s.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Ok(dt.with_timezone(&Utc));
	}

	let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
		.map_err(|_| anyhow!("Unrecognized date: {}", s))?;
	date.and_hms_opt(0, 0, 0)
		.map(|dt| dt.and_utc())
		.ok_or_else(|| anyhow!("Unrecognized date: {}", s))
}

/// Rejects strftime strings chrono cannot render. Formatting with one of
/// those fails at print time, so they are caught when the config is read.
pub fn check_date_format(format: &str) -> Result<(), Error> {
	if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
		bail!("Invalid date format: {:?}", format);
	}
	Ok(())
}

/// `format` must have passed `check_date_format`.
pub fn format_date(ts: &DateTime<Utc>, format: &str) -> String {
	ts.format(format).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
	}

	#[test]
	fn test_plain_date() {
		let ts = parse_timestamp(&json!("2024-11-15")).unwrap();
		assert_eq!(ts, ymd(2024, 11, 15));
	}

	#[test]
	fn test_rfc3339_with_offset() {
		let ts = parse_timestamp(&json!("2024-11-15T02:00:00+02:00")).unwrap();
		assert_eq!(ts, ymd(2024, 11, 15));
	}

	#[test]
	fn test_epoch_millis() {
		let ts = parse_timestamp(&json!(1731628800000i64)).unwrap();
		assert_eq!(ts, ymd(2024, 11, 15));
	}

	#[test]
	fn test_timestamp_objects() {
		let client = json!({"seconds": 1731628800, "nanoseconds": 0});
		let admin = json!({"_seconds": 1731628800, "_nanoseconds": 500});
		assert_eq!(parse_timestamp(&client).unwrap(), ymd(2024, 11, 15));
		assert!(parse_timestamp(&admin).unwrap() > ymd(2024, 11, 15));
	}

	#[test]
	fn test_rejects_other_shapes() {
		assert!(parse_timestamp(&json!(null)).is_err());
		assert!(parse_timestamp(&json!(true)).is_err());
		assert!(parse_timestamp(&json!(1.5)).is_err());
		assert!(parse_timestamp(&json!("15/11/2024")).is_err());
		assert!(parse_timestamp(&json!("2024-02-30")).is_err());
		assert!(parse_timestamp(&json!({"nanoseconds": 3})).is_err());
		assert!(parse_timestamp(&json!({
			"seconds": 1731628800,
			"nanoseconds": 4294967296u64,
		}))
		.is_err());
	}

	#[test]
	fn test_format_date() {
		assert_eq!(
			format_date(&ymd(2024, 1, 5), DEFAULT_DATE_FORMAT),
			"2024-01-05"
		);
		assert_eq!(format_date(&ymd(2024, 1, 5), "%b %-d, %Y"), "Jan 5, 2024");
	}

	#[test]
	fn test_check_date_format() {
		assert!(check_date_format(DEFAULT_DATE_FORMAT).is_ok());
		assert!(check_date_format("%b %-d, %Y").is_ok());
		assert!(check_date_format("on %A").is_ok());
		assert!(check_date_format("%Q").is_err());
		assert!(check_date_format("%Y-%").is_err());
	}
}
