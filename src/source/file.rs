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
use crate::config::filesystem::Filesystem;
use crate::model::document::Document;
use crate::source::DataSource;
use anyhow::{anyhow, bail, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk layout of a snapshot: two flat collections, each document
/// carrying its own id. Written by the fetch command and read back by
/// FileSource.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Snapshot {
	#[serde(default)]
	pub projects: Vec<Value>,
	#[serde(default)]
	pub donations: Vec<Value>,
}

impl Snapshot {
	pub fn new(project: &Document, donations: &[Document]) -> Self {
		Self {
			projects: vec![project.to_value()],
			donations: donations.iter().map(Document::to_value).collect(),
		}
	}

	pub fn save(&self, fs: &Filesystem, file_path: &str) -> Result<(), Error> {
		let mut out = serde_json::to_string_pretty(self)?;
		out.push('\n');
		fs.write(file_path, &out)
	}
}

/// Serves documents from a snapshot file held in memory.
#[derive(Debug)]
pub struct FileSource {
	projects: Vec<Document>,
	donations: Vec<Document>,
}

impl FileSource {
	pub fn open(fs: &Filesystem, file_path: &str) -> Result<Self, Error> {
		let content = fs.read(file_path)?;
		let value: Value = serde_json::from_str(&content)
			.map_err(|e| anyhow!("failed to parse {}: {}", file_path, e))?;
		Self::from_json(&value)
	}

	pub fn from_json(value: &Value) -> Result<Self, Error> {
		let snapshot = Snapshot::deserialize(value)
			.map_err(|e| anyhow!("invalid snapshot: {}", e))?;

		Ok(Self {
			projects: to_documents("projects", snapshot.projects)?,
			donations: to_documents("donations", snapshot.donations)?,
		})
	}

	pub fn project_ids(&self) -> Vec<&str> {
		self.projects.iter().map(|p| p.id.as_str()).collect()
	}

	/// The only project in the file. Commands that take an optional project
	/// id fall back to this.
	pub fn sole_project_id(&self) -> Result<String, Error> {
		match self.project_ids().as_slice() {
			[only] => Ok(only.to_string()),
			[] => bail!("No projects in file"),
			ids => bail!(
				"File holds {} projects; please specify one of: {}",
				ids.len(),
				ids.join(", ")
			),
		}
	}
}

fn to_documents(
	collection: &str,
	values: Vec<Value>,
) -> Result<Vec<Document>, Error> {
	values
		.into_iter()
		.enumerate()
		.map(|(i, v)| {
			Document::from_value(v)
				.map_err(|e| anyhow!("{}[{}]: {}", collection, i, e))
		})
		.collect()
}

impl DataSource for FileSource {
	fn project(&self, project_id: &str) -> Result<Option<Document>, Error> {
		Ok(self.projects.iter().find(|p| p.id == project_id).cloned())
	}

	/// Donations are matched on their projectId field. Documents with a
	/// malformed projectId are passed along so the loader can report them.
	fn donations(&self, project_id: &str) -> Result<Vec<Document>, Error> {
		Ok(self
			.donations
			.iter()
			.filter(|d| match d.fields().string("projectId") {
				Ok(Some(id)) => id == project_id,
				Ok(None) => false,
				Err(_) => true,
			})
			.cloned()
			.collect())
	}

	fn donation(&self, donation_id: &str) -> Result<Option<Document>, Error> {
		Ok(self.donations.iter().find(|d| d.id == donation_id).cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_lookup() {
		let source = FileSource::from_json(&json!({
			"projects": [{"id": "p1"}, {"id": "p2"}],
			"donations": [
				{"id": "d1", "projectId": "p1"},
				{"id": "d2", "projectId": "p2"},
				{"id": "d3", "projectId": "p1"},
			],
		}))
		.unwrap();

		assert!(source.project("p2").unwrap().is_some());
		assert!(source.project("p3").unwrap().is_none());
		let ids: Vec<_> = source
			.donations("p1")
			.unwrap()
			.into_iter()
			.map(|d| d.id)
			.collect();
		assert_eq!(ids, vec!["d1", "d3"]);
		assert_eq!(source.donation("d2").unwrap().unwrap().id, "d2");
		assert!(source.sole_project_id().is_err());
	}

	#[test]
	fn test_sole_project() {
		let source =
			FileSource::from_json(&json!({"projects": [{"id": "p1"}]})).unwrap();
		assert_eq!(source.sole_project_id().unwrap(), "p1");

		let empty = FileSource::from_json(&json!({})).unwrap();
		assert!(empty.sole_project_id().is_err());
	}

	#[test]
	fn test_documents_need_ids() {
		let result = FileSource::from_json(&json!({
			"projects": [{"name": "nameless"}],
		}));
		assert!(result.is_err());
	}

	#[test]
	fn test_snapshot_roundtrips_through_source() {
		let project = Document::from_value(json!({"id": "p1", "name": "x"})).unwrap();
		let donation = Document::from_value(
			json!({"id": "d1", "projectId": "p1", "amount": 5}),
		)
		.unwrap();

		let snapshot = Snapshot::new(&project, &[donation.clone()]);
		let value = serde_json::to_value(&snapshot).unwrap();
		let source = FileSource::from_json(&value).unwrap();

		assert_eq!(source.project("p1").unwrap(), Some(project));
		assert_eq!(source.donations("p1").unwrap(), vec![donation]);
	}
}
