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
use crate::model::donation::Donation;
use crate::model::project::Project;
use crate::source::DataSource;
use anyhow::{anyhow, Error};
use std::collections::HashSet;
use std::thread;
use tracing::{debug, warn};

/// A project and its donations, validated and ready for the engine.
#[derive(Debug)]
pub struct Loaded {
	pub project: Project,
	pub donations: Vec<Donation>,
}

/// Reads a project and all of its donations. The two reads do not depend
/// on each other, so the donations are fetched on a second thread while the
/// project is fetched on this one; both must succeed before anything is
/// returned. Returns None when the project does not exist.
pub fn load(
	source: &dyn DataSource,
	project_id: &str,
) -> Result<Option<Loaded>, Error> {
	let (project_doc, donation_docs) = thread::scope(|s| {
		let donations = s.spawn(|| source.donations(project_id));
		let project = source.project(project_id);
		(project, donations.join())
	});

	let donation_docs =
		donation_docs.map_err(|_| anyhow!("donation fetch panicked"))??;

	let Some(project_doc) = project_doc? else {
		debug!(project = %project_id, "project not found");
		return Ok(None);
	};

	let project = Project::from_document(&project_doc)?;
	let donations = validate_donations(&project.id, donation_docs);

	debug!(
		project = %project.id,
		tasks = project.tasks.len(),
		donations = donations.len(),
		"loaded"
	);

	Ok(Some(Loaded { project, donations }))
}

/// Looks up which project a donation belongs to.
pub fn project_of_donation(
	source: &dyn DataSource,
	donation_id: &str,
) -> Result<Option<String>, Error> {
	let Some(doc) = source.donation(donation_id)? else {
		return Ok(None);
	};
	doc.fields().string("projectId")
}

/// Parses donation documents, keeping only well-formed donations that
/// belong to the project. The first of any duplicated ids wins.
fn validate_donations(project_id: &str, docs: Vec<Document>) -> Vec<Donation> {
	let mut seen = HashSet::new();
	let mut out = vec![];

	for doc in docs {
		let donation = match Donation::from_document(&doc) {
			Ok(d) => d,
			Err(e) => {
				warn!(donation = %doc.id, "skipping donation: {}", e);
				continue;
			},
		};

		if donation.project_id != project_id {
			warn!(
				donation = %donation.id,
				project = %donation.project_id,
				"skipping donation for another project"
			);
			continue;
		}

		if !seen.insert(donation.id.clone()) {
			warn!(donation = %donation.id, "skipping duplicate donation id");
			continue;
		}

		out.push(donation);
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::file::FileSource;
	use anyhow::bail;
	use serde_json::json;

	fn source() -> FileSource {
		FileSource::from_json(&json!({
			"projects": [
				{"id": "p1", "name": "Clean Water", "tasks": [
					{"id": "t1", "startDate": "2024-01-01",
						"resources": [{"totalCost": 100}]},
				]},
			],
			"donations": [
				{"id": "d1", "projectId": "p1", "amount": 60,
					"timestamp": "2024-01-01"},
				{"id": "d2", "projectId": "p1", "amount": -5,
					"timestamp": "2024-01-02"},
				{"id": "d3", "projectId": "p2", "amount": 5,
					"timestamp": "2024-01-02"},
				{"id": "d4", "projectId": "p1", "amount": 10},
				{"id": "d1", "projectId": "p1", "amount": 99,
					"timestamp": "2024-01-03"},
			],
		}))
		.unwrap()
	}

	#[test]
	fn test_load_validates_donations() {
		let loaded = load(&source(), "p1").unwrap().unwrap();
		assert_eq!(loaded.project.name, "Clean Water");
		assert_eq!(loaded.donations.len(), 1);
		assert_eq!(loaded.donations[0].amount, 60);
	}

	#[test]
	fn test_missing_project() {
		assert!(load(&source(), "nope").unwrap().is_none());
	}

	#[test]
	fn test_project_of_donation() {
		let s = source();
		assert_eq!(project_of_donation(&s, "d3").unwrap().as_deref(), Some("p2"));
		assert_eq!(project_of_donation(&s, "zzz").unwrap(), None);
	}

	struct FailingDonations;

	impl DataSource for FailingDonations {
		fn project(&self, project_id: &str) -> Result<Option<Document>, Error> {
			Ok(Some(Document::new(project_id, Default::default())))
		}

		fn donations(&self, _: &str) -> Result<Vec<Document>, Error> {
			bail!("network down")
		}

		fn donation(&self, _: &str) -> Result<Option<Document>, Error> {
			Ok(None)
		}
	}

	#[test]
	fn test_fetch_failure_fails_the_load() {
		let err = load(&FailingDonations, "p1").unwrap_err();
		assert!(err.to_string().contains("network down"));
	}
}
