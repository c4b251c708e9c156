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
use crate::allocation::engine::{allocate, AllocationMap};
use crate::model::donation::Donation;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::util::date::format_date;
use crate::util::money::Money;
use serde::Serialize;
use std::collections::HashMap;

/// One task's share of a single donation, ready for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationData {
	pub task_id: String,
	pub task_name: String,
	pub start_date: String,
	pub end_date: String,
	pub contributed_amount: Money,
	pub total_cost: Money,
	pub completion_percentage: i64,
}

/// Everything shown when a single donation is opened.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationView {
	pub donation_id: String,
	pub project_id: String,
	pub project_name: String,
	pub amount: Money,
	pub donated_on: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub donor_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	pub allocations: Vec<AllocationData>,
}

/// `contributed / total × 100`, rounded to a whole percent with ties going
/// up. A task that costs nothing needs no funding, so it reads as 100%.
pub fn completion_percentage(contributed: Money, total: Money) -> i64 {
	if !total.is_positive() {
		return 100;
	}
	(contributed / total * 100).round_half_away() as i64
}

/// Picks out the allocations made by one donation, in funding priority
/// order. Returns an empty list when the donation funded nothing (for
/// example, every task was already covered when it arrived).
pub fn project_donation(
	map: &AllocationMap,
	tasks: &[Task],
	donation_id: &str,
	date_format: &str,
) -> Vec<AllocationData> {
	let by_id: HashMap<&str, &Task> =
		tasks.iter().map(|t| (t.id.as_str(), t)).collect();

	map.for_donation(donation_id)
		.filter_map(|a| {
			let task = by_id.get(a.task_id.as_str())?;
			let total_cost = task.total_cost();

			Some(AllocationData {
				task_id: task.id.clone(),
				task_name: task.name.clone(),
				start_date: format_date(&task.start_date, date_format),
				end_date: task
					.end_date
					.map(|d| format_date(&d, date_format))
					.unwrap_or_default(),
				contributed_amount: a.amount,
				total_cost,
				completion_percentage: completion_percentage(
					a.amount, total_cost,
				),
			})
		})
		.collect()
}

/// Runs the full allocation for a project and projects it for one of its
/// donations. Returns None when the donation is not among the project's
/// donations, in which case the engine is never run.
pub fn view_donation(
	project: &Project,
	donations: &[Donation],
	donation_id: &str,
	date_format: &str,
) -> Option<DonationView> {
	let donation = donations.iter().find(|d| d.id == donation_id)?;

	let map = allocate(&project.tasks, donations);

	Some(DonationView {
		donation_id: donation.id.clone(),
		project_id: project.id.clone(),
		project_name: project.name.clone(),
		amount: donation.amount,
		donated_on: format_date(&donation.timestamp, date_format),
		donor_name: donation.donor_name.clone(),
		status: donation.status.clone(),
		allocations: project_donation(
			&map,
			&project.tasks,
			donation_id,
			date_format,
		),
	})
}
