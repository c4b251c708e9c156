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
use crate::model::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

// -------------
// -- SENDING --
// -------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
	pub structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
pub struct StructuredQuery {
	pub from: Vec<CollectionSelector>,

	#[serde(rename = "where")]
	pub filter: Filter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
	pub collection_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
	pub field_filter: FieldFilter,
}

#[derive(Debug, Serialize)]
pub struct FieldFilter {
	pub field: FieldReference,
	pub op: String,
	pub value: StringValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
	pub field_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringValue {
	pub string_value: String,
}

impl RunQueryRequest {
	/// Every document in the collection whose string field equals value.
	pub fn field_equals(collection: &str, field: &str, value: &str) -> Self {
		Self {
			structured_query: StructuredQuery {
				from: vec![CollectionSelector {
					collection_id: collection.to_string(),
				}],
				filter: Filter {
					field_filter: FieldFilter {
						field: FieldReference {
							field_path: field.to_string(),
						},
						op: "EQUAL".to_string(),
						value: StringValue {
							string_value: value.to_string(),
						},
					},
				},
			},
		}
	}
}

// ---------------
// -- RECEIVING --
// ---------------

/// One element of a runQuery response. Elements that only report progress
/// carry no document.
#[derive(Debug, Deserialize)]
pub struct RunQueryResponse {
	pub document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
pub struct FirestoreDocument {
	/// Full resource name; the document id is the last path segment
	pub name: String,

	#[serde(default)]
	pub fields: BTreeMap<String, FirestoreValue>,
}

/// A typed Firestore value as it appears on the REST wire, e.g.
/// `{"integerValue": "120"}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
	NullValue(()),
	BooleanValue(bool),
	/// int64 values are sent as strings
	IntegerValue(String),
	DoubleValue(f64),
	TimestampValue(String),
	StringValue(String),
	BytesValue(String),
	ReferenceValue(String),
	GeoPointValue(GeoPoint),
	ArrayValue(ArrayValue),
	MapValue(MapValue),
}

#[derive(Debug, Deserialize)]
pub struct GeoPoint {
	#[serde(default)]
	pub latitude: f64,
	#[serde(default)]
	pub longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArrayValue {
	#[serde(default)]
	pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MapValue {
	#[serde(default)]
	pub fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreValue {
	/// Flattens the typed wire value into the plain JSON shape documents
	/// have everywhere else in the program.
	pub fn into_json(self) -> Value {
		match self {
			FirestoreValue::NullValue(()) => Value::Null,
			FirestoreValue::BooleanValue(b) => Value::Bool(b),
			FirestoreValue::IntegerValue(s) => match s.parse::<i64>() {
				Ok(i) => Value::Number(i.into()),
				Err(_) => Value::String(s),
			},
			FirestoreValue::DoubleValue(f) => {
				Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
			},
			FirestoreValue::TimestampValue(s)
			| FirestoreValue::StringValue(s)
			| FirestoreValue::BytesValue(s)
			| FirestoreValue::ReferenceValue(s) => Value::String(s),
			FirestoreValue::GeoPointValue(p) => {
				let mut map = Map::new();
				map.insert("latitude".into(), float(p.latitude));
				map.insert("longitude".into(), float(p.longitude));
				Value::Object(map)
			},
			FirestoreValue::ArrayValue(a) => Value::Array(
				a.values.into_iter().map(FirestoreValue::into_json).collect(),
			),
			FirestoreValue::MapValue(m) => Value::Object(fields_to_json(m.fields)),
		}
	}
}

fn float(f: f64) -> Value {
	Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn fields_to_json(fields: BTreeMap<String, FirestoreValue>) -> Map<String, Value> {
	fields.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

impl FirestoreDocument {
	pub fn id(&self) -> &str {
		self.name.rsplit('/').next().unwrap_or(&self.name)
	}

	pub fn into_document(self) -> Document {
		let id = self.id().to_string();
		Document::new(&id, fields_to_json(self.fields))
	}
}
