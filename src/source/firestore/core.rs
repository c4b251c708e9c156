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
use crate::config::config_file::Firestore;
use crate::model::document::Document;
use crate::source::firestore::models::{
	FirestoreDocument, RunQueryRequest, RunQueryResponse,
};
use crate::source::http::Client;
use crate::source::DataSource;
use anyhow::{anyhow, bail, Error};
use tracing::debug;

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";
const PROJECTS_COLLECTION: &str = "projects";
const DONATIONS_COLLECTION: &str = "donations";

/// Reads project and donation documents straight from Firestore over its
/// REST API. Read-only.
pub struct FirestoreSource {
	http: Client,

	/// "projects/{gcp}/databases/{db}/documents"
	documents_path: String,

	projects_collection: String,
	donations_collection: String,
}

impl FirestoreSource {
	pub fn new(config: Firestore) -> Result<Self, Error> {
		let Some(gcp_project) = config.project_id else {
			bail!("no firestore project_id in config");
		};

		let database = config.database.unwrap_or(DEFAULT_DATABASE.to_owned());
		let api_url = config.api_url.unwrap_or(FIRESTORE_API_URL.to_owned());

		Ok(Self {
			http: Client::new(&api_url, config.api_key),
			documents_path: format!(
				"projects/{}/databases/{}/documents",
				gcp_project, database
			),
			projects_collection: config
				.projects_collection
				.unwrap_or(PROJECTS_COLLECTION.to_owned()),
			donations_collection: config
				.donations_collection
				.unwrap_or(DONATIONS_COLLECTION.to_owned()),
		})
	}

	fn get_document(
		&self,
		collection: &str,
		id: &str,
	) -> Result<Option<Document>, Error> {
		check_id(id)?;

		let endpoint = format!("{}/{}/{}", self.documents_path, collection, id);
		let doc: Option<FirestoreDocument> = self.http.get(&endpoint)?;
		Ok(doc.map(FirestoreDocument::into_document))
	}
}

/// Ids are spliced into the request URL unescaped, so anything that would
/// change which URL is requested is refused.
fn check_id(id: &str) -> Result<(), Error> {
	if id.is_empty()
		|| id == "."
		|| id == ".."
		|| id.contains(['/', '?', '#', '%'])
	{
		bail!("invalid document id: {:?}", id);
	}
	Ok(())
}

impl DataSource for FirestoreSource {
	fn project(&self, project_id: &str) -> Result<Option<Document>, Error> {
		self.get_document(&self.projects_collection, project_id)
	}

	fn donations(&self, project_id: &str) -> Result<Vec<Document>, Error> {
		let endpoint = format!("{}:runQuery", self.documents_path);
		let request = RunQueryRequest::field_equals(
			&self.donations_collection,
			"projectId",
			project_id,
		);

		let response: Vec<RunQueryResponse> = self
			.http
			.post(&endpoint, &request)
			.map_err(|e| anyhow!("donation query failed: {}", e))?;

		let docs: Vec<Document> = response
			.into_iter()
			.filter_map(|r| r.document)
			.map(FirestoreDocument::into_document)
			.collect();

		debug!(project = %project_id, count = docs.len(), "fetched donations");
		Ok(docs)
	}

	fn donation(&self, donation_id: &str) -> Result<Option<Document>, Error> {
		self.get_document(&self.donations_collection, donation_id)
	}
}
