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
use crate::allocation::engine::AllocationMap;
use crate::allocation::projector::DonationView;
use crate::allocation::summary::FundingSummary;
use crate::model::donation::Donation;
use crate::model::project::Project;
use crate::reports::table::Table;
use crate::util::date::format_date;
use crate::util::money::Money;
use anyhow::Error;
use serde::Serialize;
use std::collections::HashMap;

pub const NO_ALLOCATION_DATA: &str = "No allocation data available yet";

const PROGRESS_WIDTH: usize = 10;

/// Renders allocation results as text tables. Every amount is rounded to
/// the same number of decimal places and optionally labelled with a
/// currency.
pub struct AllocationReporter {
	precision: u32,
	currency: Option<String>,
	date_format: String,
}

impl AllocationReporter {
	pub fn new(
		precision: u32,
		currency: Option<String>,
		date_format: &str,
	) -> Self {
		Self {
			precision,
			currency,
			date_format: date_format.to_string(),
		}
	}

	fn amount(&self, value: Money) -> String {
		let rendered = format!("{:.*}", self.precision as usize, value);
		match &self.currency {
			Some(c) => format!("{} {}", rendered, c),
			None => rendered,
		}
	}

	/// The per-task breakdown of a single donation.
	pub fn donation_view(&self, view: &DonationView) -> String {
		if view.allocations.is_empty() {
			return format!("{}\n", NO_ALLOCATION_DATA);
		}

		let mut out = format!("Donation {}", view.donation_id);
		if let Some(donor) = &view.donor_name {
			out.push_str(&format!(" from {}", donor));
		}
		out.push_str(&format!(
			" to {}: {} on {}",
			view.project_name,
			self.amount(view.amount),
			view.donated_on
		));
		if let Some(status) = &view.status {
			out.push_str(&format!(" ({})", status));
		}
		out.push('\n');

		let mut table = Table::new(7);
		table.right_align(vec![3, 4, 5]);
		table.add_header(vec![
			"Task",
			"Start",
			"End",
			"Contributed",
			"Total Cost",
			"Complete",
			"Progress",
		]);
		table.add_separator();

		for a in &view.allocations {
			table.add_row(vec![
				&a.task_name,
				&a.start_date,
				&a.end_date,
				&self.amount(a.contributed_amount),
				&self.amount(a.total_cost),
				&format!("{}%", a.completion_percentage),
				&progress_bar(a.completion_percentage),
			]);
		}

		let total: Money =
			view.allocations.iter().map(|a| a.contributed_amount).sum();
		table.add_partial_separator(vec![3]);
		table.add_row(vec!["", "", "", &self.amount(total)]);

		out.push_str(&table.render());
		out
	}

	/// Every (donation, task) contribution in the order it was made.
	pub fn allocation_map(
		&self,
		project: &Project,
		donations: &[Donation],
		map: &AllocationMap,
	) -> String {
		if map.is_empty() {
			return format!("{}\n", NO_ALLOCATION_DATA);
		}

		let task_names: HashMap<&str, &str> = project
			.tasks
			.iter()
			.map(|t| (t.id.as_str(), t.name.as_str()))
			.collect();
		let donated_on: HashMap<&str, String> = donations
			.iter()
			.map(|d| {
				(d.id.as_str(), format_date(&d.timestamp, &self.date_format))
			})
			.collect();

		let mut out =
			format!("Allocations for {} ({})\n", project.name, project.id);

		let mut table = Table::new(4);
		table.right_align(vec![3]);
		table.add_header(vec!["Donation", "Donated", "Task", "Amount"]);
		table.add_separator();

		let mut total = Money::zero();
		for a in map.iter() {
			total += a.amount;
			table.add_row(vec![
				&a.donation_id,
				donated_on
					.get(a.donation_id.as_str())
					.map_or("", String::as_str),
				task_names
					.get(a.task_id.as_str())
					.copied()
					.unwrap_or(&a.task_id),
				&self.amount(a.amount),
			]);
		}

		table.add_partial_separator(vec![3]);
		table.add_row(vec!["", "", "", &self.amount(total)]);

		out.push_str(&table.render());
		out
	}

	/// Task funding state followed by how much of each donation was used.
	pub fn funding_summary(&self, summary: &FundingSummary) -> String {
		let mut out = format!(
			"Funding for {} ({})\n",
			summary.project_name, summary.project_id
		);

		if summary.tasks.is_empty() {
			out.push_str("\nNo tasks\n");
		} else {
			let mut table = Table::new(8);
			table.right_align(vec![3, 4, 5, 6, 7]);
			table.add_header(vec![
				"Task",
				"Start",
				"End",
				"Total Cost",
				"Funded",
				"Remaining",
				"Complete",
				"Donations",
			]);
			table.add_separator();

			for t in &summary.tasks {
				table.add_row(vec![
					&t.task_name,
					&t.start_date,
					&t.end_date,
					&self.amount(t.total_cost),
					&self.amount(t.funded),
					&self.amount(t.remaining),
					&format!("{}%", t.completion_percentage),
					&t.donors.to_string(),
				]);
			}

			let remaining: Money =
				summary.tasks.iter().map(|t| t.remaining).sum();
			table.add_partial_separator(vec![3, 4, 5]);
			table.add_row(vec![
				"",
				"",
				"",
				&self.amount(summary.total_cost),
				&self.amount(summary.total_allocated),
				&self.amount(remaining),
			]);
			out.push_str(&table.render());
		}

		if summary.donations.is_empty() {
			out.push_str("\nNo donations\n");
			return out;
		}

		let mut table = Table::new(5);
		table.right_align(vec![2, 3, 4]);
		table.add_header(vec![
			"Donation",
			"Donated",
			"Amount",
			"Allocated",
			"Unallocated",
		]);
		table.add_separator();

		for d in &summary.donations {
			table.add_row(vec![
				&d.donation_id,
				&d.donated_on,
				&self.amount(d.amount),
				&self.amount(d.allocated),
				&self.amount(d.unallocated),
			]);
		}

		table.add_partial_separator(vec![2, 3, 4]);
		table.add_row(vec![
			"",
			"",
			&self.amount(summary.total_donated),
			&self.amount(summary.total_allocated),
			&self.amount(summary.total_unallocated()),
		]);
		out.push_str(&table.render());
		out
	}
}

/// Pretty JSON for any report payload, with a trailing newline.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, Error> {
	let mut out = serde_json::to_string_pretty(value)?;
	out.push('\n');
	Ok(out)
}

/// e.g. `[####------]` for 40%
fn progress_bar(percentage: i64) -> String {
	let filled = (percentage.clamp(0, 100) as usize * PROGRESS_WIDTH) / 100;
	format!(
		"[{}{}]",
		"#".repeat(filled),
		"-".repeat(PROGRESS_WIDTH - filled)
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::allocation::engine::allocate;
	use crate::allocation::projector::view_donation;
	use crate::model::task::{Resource, Task};
	use crate::util::date::DEFAULT_DATE_FORMAT;
	use chrono::{DateTime, TimeZone, Utc};

	fn day(d: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
	}

	fn task(id: &str, name: &str, start: u32, cost: i128) -> Task {
		let mut t = Task::new(id, name, day(start));
		t.end_date = Some(day(start + 3));
		t.resources.push(Resource::total(Money::from_i128(cost)));
		t
	}

	fn project() -> Project {
		Project::new(
			"p1",
			"Clean Water",
			vec![task("t1", "Well", 1, 100), task("t2", "Pipes", 5, 50)],
		)
	}

	fn reporter() -> AllocationReporter {
		AllocationReporter::new(2, None, DEFAULT_DATE_FORMAT)
	}

	#[test]
	fn test_progress_bar() {
		assert_eq!(progress_bar(0), "[----------]");
		assert_eq!(progress_bar(40), "[####------]");
		assert_eq!(progress_bar(67), "[######----]");
		assert_eq!(progress_bar(100), "[##########]");
		assert_eq!(progress_bar(250), "[##########]");
	}

	#[test]
	fn test_amount_with_currency() {
		let r =
			AllocationReporter::new(2, Some("USD".into()), DEFAULT_DATE_FORMAT);
		assert_eq!(r.amount(Money::from_i128(1500)), "1,500.00 USD");

		let r = AllocationReporter::new(0, None, DEFAULT_DATE_FORMAT);
		assert_eq!(r.amount(Money::from_str("2.5").unwrap()), "2");
	}

	#[test]
	fn test_donation_view() {
		let donations =
			vec![Donation::new("d1", "p1", Money::from_i128(120), day(2))];
		let view =
			view_donation(&project(), &donations, "d1", DEFAULT_DATE_FORMAT)
				.unwrap();

		let expected = "Donation d1 to Clean Water: 120.00 on 2024-01-02

Task  |   Start    |    End     | Contributed | Total Cost | Complete |   Progress
------------------------------------------------------------------------------------
Well    2024-01-01   2024-01-04        100.00       100.00       100%   [##########]
Pipes   2024-01-05   2024-01-08         20.00        50.00        40%   [####------]
                                  -----------
                                       120.00
";
		assert_eq!(reporter().donation_view(&view), expected);
	}

	#[test]
	fn test_empty_donation_view() {
		let project = Project::new("p1", "Free", vec![]);
		let donations =
			vec![Donation::new("d1", "p1", Money::from_i128(10), day(2))];
		let view =
			view_donation(&project, &donations, "d1", DEFAULT_DATE_FORMAT)
				.unwrap();

		assert_eq!(
			reporter().donation_view(&view),
			"No allocation data available yet\n"
		);
	}

	#[test]
	fn test_allocation_map() {
		let project = project();
		let donations = vec![
			Donation::new("A", "p1", Money::from_i128(60), day(1)),
			Donation::new("B", "p1", Money::from_i128(80), day(3)),
		];
		let map = allocate(&project.tasks, &donations);

		let expected = "Allocations for Clean Water (p1)

Donation |  Donated   | Task  | Amount
--------------------------------------
A          2024-01-01   Well     60.00
B          2024-01-03   Well     40.00
B          2024-01-03   Pipes    40.00
                                ------
                                140.00
";
		assert_eq!(
			reporter().allocation_map(&project, &donations, &map),
			expected
		);
	}

	#[test]
	fn test_json_amounts_are_exact_strings() {
		let donations =
			vec![Donation::new("d1", "p1", Money::from_i128(120), day(2))];
		let view =
			view_donation(&project(), &donations, "d1", DEFAULT_DATE_FORMAT)
				.unwrap();
		let value: serde_json::Value =
			serde_json::from_str(&to_json(&view).unwrap()).unwrap();

		assert_eq!(value["allocations"][1]["taskName"], "Pipes");
		assert_eq!(value["allocations"][1]["contributedAmount"], "20");
		assert_eq!(value["allocations"][1]["completionPercentage"], 40);
	}
}
