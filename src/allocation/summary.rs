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
use crate::allocation::engine::{consumption_order, funding_order, AllocationMap};
use crate::allocation::projector::completion_percentage;
use crate::model::donation::Donation;
use crate::model::project::Project;
use crate::util::date::format_date;
use crate::util::money::Money;
use serde::Serialize;

/// Project-wide funding state after every donation has been poured.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
	pub project_id: String,
	pub project_name: String,

	pub tasks: Vec<TaskFunding>,
	pub donations: Vec<DonationBalance>,

	pub total_cost: Money,
	pub total_donated: Money,
	pub total_allocated: Money,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFunding {
	pub task_id: String,
	pub task_name: String,
	pub start_date: String,
	pub end_date: String,
	pub total_cost: Money,
	pub funded: Money,
	pub remaining: Money,
	pub completion_percentage: i64,
	/// Number of distinct donations that contributed
	pub donors: usize,
}

/// How much of one donation went to tasks. Anything unallocated arrived
/// after every task was covered; it is reported here and nowhere else.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationBalance {
	pub donation_id: String,
	pub donated_on: String,
	pub amount: Money,
	pub allocated: Money,
	pub unallocated: Money,
}

impl FundingSummary {
	/// Tasks come out in funding order and donations in consumption order.
	pub fn new(
		project: &Project,
		donations: &[Donation],
		map: &AllocationMap,
		date_format: &str,
	) -> Self {
		let tasks: Vec<TaskFunding> = funding_order(&project.tasks)
			.into_iter()
			.map(|task| {
				let total_cost = task.total_cost();
				let funded = map.funded(&task.id);

				TaskFunding {
					task_id: task.id.clone(),
					task_name: task.name.clone(),
					start_date: format_date(&task.start_date, date_format),
					end_date: task
						.end_date
						.map(|d| format_date(&d, date_format))
						.unwrap_or_default(),
					total_cost,
					funded,
					remaining: total_cost - funded,
					completion_percentage: completion_percentage(
						funded, total_cost,
					),
					donors: map.for_task(&task.id).count(),
				}
			})
			.collect();

		let donations: Vec<DonationBalance> = consumption_order(donations)
			.into_iter()
			.map(|d| {
				let allocated = map.allocated_from(&d.id);
				DonationBalance {
					donation_id: d.id.clone(),
					donated_on: format_date(&d.timestamp, date_format),
					amount: d.amount,
					allocated,
					unallocated: d.amount - allocated,
				}
			})
			.collect();

		Self {
			project_id: project.id.clone(),
			project_name: project.name.clone(),
			total_cost: tasks.iter().map(|t| t.total_cost).sum(),
			total_donated: donations.iter().map(|d| d.amount).sum(),
			total_allocated: donations.iter().map(|d| d.allocated).sum(),
			tasks,
			donations,
		}
	}

	pub fn total_unallocated(&self) -> Money {
		self.donations.iter().map(|d| d.unallocated).sum()
	}
}
