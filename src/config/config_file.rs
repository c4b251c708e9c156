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
use crate::util::date::check_date_format;
use anyhow::Error;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	pub display: Option<Display>,
	pub sources: Option<Sources>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Display {
	/// Label printed after amounts, e.g. "USD"
	pub currency: Option<String>,
	/// chrono strftime format for task and donation dates
	pub date_format: Option<String>,
	/// Decimal places for amounts; the -p flag wins over this
	pub precision: Option<u32>,
}

impl Config {
	/// Checks what serde cannot, so bad settings fail at startup rather
	/// than halfway through a report.
	pub fn validate(&self) -> Result<(), Error> {
		if let Some(format) =
			self.display.as_ref().and_then(|d| d.date_format.as_deref())
		{
			check_date_format(format)?;
		}
		Ok(())
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct Sources {
	pub firestore: Option<Firestore>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Firestore {
	/// The Google Cloud project hosting the database
	pub project_id: Option<String>,
	/// Defaults to "(default)"
	pub database: Option<String>,

	pub api_key: Option<String>,
	pub api_key_cmd: Option<String>,
	pub api_url: Option<String>,

	pub projects_collection: Option<String>,
	pub donations_collection: Option<String>,
}
