/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
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
use crate::model::document::Document;
use crate::util::money::Money;
use anyhow::{bail, Error};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct Donation {
	pub id: String,
	pub project_id: String,

	/// Always positive once parsed
	pub amount: Money,

	/// Creation time; earlier donations are consumed first
	pub timestamp: DateTime<Utc>,

	pub donor_name: Option<String>,
	pub status: Option<String>,
}

impl Donation {
	pub fn new(
		id: &str,
		project_id: &str,
		amount: Money,
		timestamp: DateTime<Utc>,
	) -> Self {
		Self {
			id: id.to_string(),
			project_id: project_id.to_string(),
			amount,
			timestamp,
			donor_name: None,
			status: None,
		}
	}

	/// Parses a donation document. Zero and negative amounts are rejected
	/// here rather than being fed to the engine.
	pub fn from_document(doc: &Document) -> Result<Self, Error> {
		let fields = doc.fields();

		let amount = fields.required_money("amount")?;
		if amount.is_zero() {
			bail!("amount is zero");
		}
		if amount.is_negative() {
			bail!("amount must be positive, got {}", amount);
		}

		Ok(Self {
			id: doc.id.clone(),
			project_id: fields.required_string("projectId")?,
			amount,
			timestamp: fields.required_timestamp("timestamp")?,
			donor_name: fields.string("donorName")?,
			status: fields.string("status")?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn doc(value: serde_json::Value) -> Document {
		Document::from_value(value).unwrap()
	}

	#[test]
	fn test_from_document() {
		let d = Donation::from_document(&doc(json!({
			"id": "d1",
			"projectId": "p1",
			"amount": 60,
			"timestamp": {"seconds": 1704067200, "nanoseconds": 0},
			"donorName": "Ada",
			"status": "completed",
		})))
		.unwrap();

		assert_eq!(d.amount, 60);
		assert_eq!(d.project_id, "p1");
		assert_eq!(d.donor_name.as_deref(), Some("Ada"));
		assert_eq!(d.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
	}

	#[test]
	fn test_amount_range() {
		let amount = |value: serde_json::Value| {
			Donation::from_document(&doc(json!({
				"id": "d1",
				"projectId": "p1",
				"amount": value,
				"timestamp": "2024-01-01",
			})))
		};

		assert!(amount(json!(1e25)).is_err());
		assert!(amount(json!("1e-19")).is_err());
		assert_eq!(
			amount(json!(0.30000000000000004)).unwrap().amount,
			Money::from_str("0.30000000000000004").unwrap()
		);
	}

	#[test]
	fn test_rejects_non_positive_amounts() {
		for amount in [json!(0), json!(-10), json!("-0.01")] {
			let d = Donation::from_document(&doc(json!({
				"id": "d1",
				"projectId": "p1",
				"amount": amount,
				"timestamp": "2024-01-01",
			})));
			assert!(d.is_err());
		}
	}

	#[test]
	fn test_requires_timestamp_and_project() {
		let no_ts = doc(json!({"id": "d1", "projectId": "p1", "amount": 5}));
		let no_project =
			doc(json!({"id": "d1", "amount": 5, "timestamp": "2024-01-01"}));
		assert!(Donation::from_document(&no_ts).is_err());
		assert!(Donation::from_document(&no_project).is_err());
	}
}
