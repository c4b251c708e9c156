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
use crate::util::date::parse_timestamp;
use crate::util::money::Money;
use anyhow::{anyhow, bail, Error};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A schemaless record as stored by the web application: an identifier and
/// a bag of loosely typed fields. Everything the engine consumes is parsed
/// out of these through `Fields`, which refuses to guess when a value has
/// the wrong shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
	pub id: String,
	pub fields: Map<String, Value>,
}

impl Document {
	pub fn new(id: &str, fields: Map<String, Value>) -> Self {
		Self {
			id: id.to_string(),
			fields,
		}
	}

	/// Builds a document from a JSON object carrying its own "id" field, as
	/// in snapshot files.
	pub fn from_value(value: Value) -> Result<Self, Error> {
		let Value::Object(mut fields) = value else {
			bail!("document must be a JSON object");
		};

		let id = match fields.remove("id") {
			Some(Value::String(s)) if !s.is_empty() => s,
			Some(Value::Number(n)) => n.to_string(),
			_ => bail!("document has no id"),
		};

		Ok(Self { id, fields })
	}

	/// Inverse of from_value.
	pub fn to_value(&self) -> Value {
		let mut out = Map::new();
		out.insert("id".to_string(), Value::String(self.id.clone()));
		out.extend(self.fields.clone());
		Value::Object(out)
	}

	pub fn fields(&self) -> Fields<'_> {
		Fields::new(&self.fields)
	}
}

/// Typed, read-only accessors over a JSON object. Missing and null values
/// both read as absent; present values of the wrong type are errors.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
	map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
	pub fn new(map: &'a Map<String, Value>) -> Self {
		Self { map }
	}

	fn get(&self, key: &str) -> Option<&'a Value> {
		match self.map.get(key) {
			None | Some(Value::Null) => None,
			Some(v) => Some(v),
		}
	}

	pub fn string(&self, key: &str) -> Result<Option<String>, Error> {
		match self.get(key) {
			None => Ok(None),
			Some(Value::String(s)) => Ok(Some(s.clone())),
			Some(Value::Number(n)) => Ok(Some(n.to_string())),
			Some(other) => bail!("{} must be a string, got {}", key, other),
		}
	}

	pub fn required_string(&self, key: &str) -> Result<String, Error> {
		self.string(key)?
			.filter(|s| !s.is_empty())
			.ok_or_else(|| anyhow!("missing {}", key))
	}

	/// Reads a number from either a JSON number or numeric text, exactly.
	/// Values outside what `Money::in_range` allows are rejected.
	pub fn money(&self, key: &str) -> Result<Option<Money>, Error> {
		let parsed = match self.get(key) {
			None => return Ok(None),
			Some(Value::Number(n)) => Money::from_str(&n.to_string()),
			Some(Value::String(s)) => Money::from_str(s),
			Some(other) => bail!("{} must be a number, got {}", key, other),
		};

		parsed
			.and_then(Money::in_range)
			.map(Some)
			.map_err(|e| anyhow!("{} is not a valid amount: {}", key, e))
	}

	pub fn required_money(&self, key: &str) -> Result<Money, Error> {
		self.money(key)?.ok_or_else(|| anyhow!("missing {}", key))
	}

	pub fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, Error> {
		match self.get(key) {
			None => Ok(None),
			Some(v) => parse_timestamp(v)
				.map(Some)
				.map_err(|e| anyhow!("{}: {}", key, e)),
		}
	}

	pub fn required_timestamp(&self, key: &str) -> Result<DateTime<Utc>, Error> {
		self.timestamp(key)?.ok_or_else(|| anyhow!("missing {}", key))
	}

	/// Returns the objects in an array field. Absent arrays are empty.
	pub fn objects(
		&self,
		key: &str,
	) -> Result<Vec<&'a Map<String, Value>>, Error> {
		match self.get(key) {
			None => Ok(vec![]),
			Some(Value::Array(items)) => items
				.iter()
				.enumerate()
				.map(|(i, item)| match item {
					Value::Object(map) => Ok(map),
					_ => Err(anyhow!("{}[{}] must be an object", key, i)),
				})
				.collect(),
			Some(other) => bail!("{} must be an array, got {}", key, other),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn fields(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("not an object"),
		}
	}

	#[test]
	fn test_from_value_takes_id() {
		let doc =
			Document::from_value(json!({"id": "d1", "amount": 5})).unwrap();
		assert_eq!(doc.id, "d1");
		assert!(!doc.fields.contains_key("id"));
		assert_eq!(doc.to_value(), json!({"id": "d1", "amount": 5}));
	}

	#[test]
	fn test_from_value_numeric_id() {
		let doc = Document::from_value(json!({"id": 7})).unwrap();
		assert_eq!(doc.id, "7");
	}

	#[test]
	fn test_from_value_requires_id() {
		assert!(Document::from_value(json!({"amount": 5})).is_err());
		assert!(Document::from_value(json!({"id": ""})).is_err());
		assert!(Document::from_value(json!([1, 2])).is_err());
	}

	#[test]
	fn test_null_reads_as_absent() {
		let map = fields(json!({"totalCost": null, "name": null}));
		let f = Fields::new(&map);
		assert_eq!(f.money("totalCost").unwrap(), None);
		assert_eq!(f.string("name").unwrap(), None);
		assert!(f.required_string("name").is_err());
	}

	#[test]
	fn test_money_from_number_and_text() {
		let map = fields(json!({"a": 12.5, "b": "40", "c": true, "d": "x"}));
		let f = Fields::new(&map);
		assert_eq!(f.required_money("a").unwrap(), Money::from_frac(25, 2).unwrap());
		assert_eq!(f.required_money("b").unwrap(), 40);
		assert!(f.money("c").is_err());
		assert!(f.money("d").is_err());
	}

	#[test]
	fn test_money_out_of_range() {
		let map = fields(json!({
			"noisy": 0.30000000000000004,
			"big": 1e25,
			"tiny": "1e-19",
			"max": 1e15,
		}));
		let f = Fields::new(&map);
		assert_eq!(
			f.required_money("noisy").unwrap(),
			Money::from_str("0.30000000000000004").unwrap()
		);
		assert!(f.money("big").is_err());
		assert!(f.money("tiny").is_err());
		assert_eq!(f.required_money("max").unwrap(), 10i128.pow(15));
	}

	#[test]
	fn test_objects() {
		let map = fields(json!({"xs": [{"a": 1}, {"b": 2}], "bad": [1]}));
		let f = Fields::new(&map);
		assert_eq!(f.objects("xs").unwrap().len(), 2);
		assert!(f.objects("missing").unwrap().is_empty());
		assert!(f.objects("bad").is_err());
	}
}
