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
pub mod file;
pub mod firestore;
pub mod http;
pub mod loader;

use crate::model::document::Document;
use anyhow::Error;

/// Where project and donation documents come from. Implementations only
/// fetch raw documents; validation into typed records happens in the
/// loader, so every source gets the same treatment of malformed data.
///
/// Must be Sync because the loader reads projects and donations from two
/// threads at once.
pub trait DataSource: Sync {
	/// The project document, or None if there is no such project.
	fn project(&self, project_id: &str) -> Result<Option<Document>, Error>;

	/// Every donation document for the project, whatever its status.
	fn donations(&self, project_id: &str) -> Result<Vec<Document>, Error>;

	/// A single donation document, or None if there is no such donation.
	fn donation(&self, donation_id: &str) -> Result<Option<Document>, Error>;
}
