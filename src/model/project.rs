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
use crate::model::task::Task;
use anyhow::Error;
use std::collections::HashSet;
use tracing::warn;

/// A fundable project and its tasks, in the order they were stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Project {
	pub id: String,
	pub name: String,
	pub tasks: Vec<Task>,
}

impl Project {
	pub fn new(id: &str, name: &str, tasks: Vec<Task>) -> Self {
		Self {
			id: id.to_string(),
			name: name.to_string(),
			tasks,
		}
	}

	/// Parses a project document. Tasks that fail validation, or that reuse
	/// an id already seen, are skipped with a warning: allocations are keyed
	/// by task id, so a duplicate would silently merge two tasks' funding.
	pub fn from_document(doc: &Document) -> Result<Self, Error> {
		let fields = doc.fields();
		let name = fields.string("name")?.unwrap_or_else(|| doc.id.clone());

		let mut seen = HashSet::new();
		let mut tasks = vec![];

		for (i, map) in fields.objects("tasks")?.into_iter().enumerate() {
			let task = match Task::from_fields(map) {
				Ok(task) => task,
				Err(e) => {
					warn!(project = %doc.id, task = i, "skipping task: {}", e);
					continue;
				},
			};

			if !seen.insert(task.id.clone()) {
				warn!(project = %doc.id, task = %task.id, "skipping duplicate task id");
				continue;
			}

			tasks.push(task);
		}

		Ok(Self {
			id: doc.id.clone(),
			name,
			tasks,
		})
	}
}
