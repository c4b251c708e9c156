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
use crate::model::donation::Donation;
use crate::model::task::Task;
use crate::util::money::Money;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// The portion of one donation consumed by one task.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
	pub donation_id: String,
	pub task_id: String,
	pub amount: Money,
}

/// Every (donation, task) pair that received a non-zero contribution,
/// in the order the contributions were made. Since donations are consumed
/// one at a time in timestamp order and each walks tasks in start date
/// order, the entries for any one donation come out in funding priority
/// order.
#[derive(Debug, Default, PartialEq)]
pub struct AllocationMap {
	entries: Vec<Allocation>,
	index: HashMap<(String, String), usize>,
}

impl AllocationMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a contribution, adding to any existing entry for the pair.
	fn add(&mut self, donation_id: &str, task_id: &str, amount: Money) {
		let key = (donation_id.to_string(), task_id.to_string());
		match self.index.get(&key) {
			Some(&i) => self.entries[i].amount += amount,
			None => {
				self.index.insert(key, self.entries.len());
				self.entries.push(Allocation {
					donation_id: donation_id.to_string(),
					task_id: task_id.to_string(),
					amount,
				});
			},
		}
	}

	pub fn get(&self, donation_id: &str, task_id: &str) -> Option<Money> {
		self.index
			.get(&(donation_id.to_string(), task_id.to_string()))
			.map(|&i| self.entries[i].amount)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
		self.entries.iter()
	}

	pub fn for_donation<'a>(
		&'a self,
		donation_id: &'a str,
	) -> impl Iterator<Item = &'a Allocation> {
		self.entries
			.iter()
			.filter(move |a| a.donation_id == donation_id)
	}

	pub fn for_task<'a>(
		&'a self,
		task_id: &'a str,
	) -> impl Iterator<Item = &'a Allocation> {
		self.entries.iter().filter(move |a| a.task_id == task_id)
	}

	/// Total received by a task across all donations.
	pub fn funded(&self, task_id: &str) -> Money {
		self.for_task(task_id).map(|a| a.amount).sum()
	}

	/// Total handed out by a donation across all tasks.
	pub fn allocated_from(&self, donation_id: &str) -> Money {
		self.for_donation(donation_id).map(|a| a.amount).sum()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Tasks in the order they are funded: earliest start date first, ties kept
/// in stored order.
pub fn funding_order(tasks: &[Task]) -> Vec<&Task> {
	let mut ordered: Vec<&Task> = tasks.iter().collect();
	// sort_by_key is stable, which is what breaks ties by stored order
	ordered.sort_by_key(|t| t.start_date);
	ordered
}

/// Donations in the order they are consumed: earliest timestamp first,
/// ties kept in stored order.
pub fn consumption_order(donations: &[Donation]) -> Vec<&Donation> {
	let mut ordered: Vec<&Donation> = donations.iter().collect();
	ordered.sort_by_key(|d| d.timestamp);
	ordered
}

/// Working state for one allocation run: each task in funding order with
/// the part of its cost that no donation has covered yet. Lives only for
/// the duration of `allocate`.
struct Waterfall<'a> {
	remaining: Vec<(&'a Task, Money)>,
}

impl<'a> Waterfall<'a> {
	fn new(tasks: &'a [Task]) -> Self {
		Self {
			remaining: funding_order(tasks)
				.into_iter()
				.map(|t| (t, t.total_cost()))
				.collect(),
		}
	}

	/// Pours one donation down the task list, filling each task before
	/// moving to the next. Whatever is left once every task is covered is
	/// not recorded anywhere.
	fn pour(&mut self, donation: &Donation, map: &mut AllocationMap) {
		let mut remaining_donation = donation.amount;

		for (task, remaining_cost) in self.remaining.iter_mut() {
			if !remaining_donation.is_positive() {
				break;
			}

			// Zero-cost and already-covered tasks take nothing
			if !remaining_cost.is_positive() {
				continue;
			}

			let alloc = (*remaining_cost).min(remaining_donation);
			*remaining_cost -= alloc;
			remaining_donation -= alloc;

			debug!(
				donation = %donation.id,
				task = %task.id,
				amount = %alloc,
				"allocated"
			);
			map.add(&donation.id, &task.id, alloc);
		}

		if remaining_donation.is_positive() {
			debug!(
				donation = %donation.id,
				surplus = %remaining_donation,
				"all tasks funded; surplus left unallocated"
			);
		}
	}
}

/// Distributes every donation across the project's tasks, first-in
/// first-out on both sides: donations are consumed in timestamp order, and
/// each one funds tasks in start date order until it runs out. A task never
/// receives more than its total cost and a donation never gives more than
/// its amount.
///
/// Pure: the same tasks and donations always produce the same map.
pub fn allocate(tasks: &[Task], donations: &[Donation]) -> AllocationMap {
	let mut waterfall = Waterfall::new(tasks);
	let mut map = AllocationMap::new();

	for donation in consumption_order(donations) {
		waterfall.pour(donation, &mut map);
	}

	map
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::task::Resource;
	use crate::util::money::MAX_AMOUNT;
	use chrono::{DateTime, TimeZone, Utc};

	fn day(d: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
	}

	fn m(v: i128) -> Money {
		Money::from_i128(v)
	}

	fn task(id: &str, start: u32, cost: i128) -> Task {
		costing(id, start, m(cost))
	}

	fn costing(id: &str, start: u32, cost: Money) -> Task {
		let mut t = Task::new(id, id, day(start));
		if cost.is_positive() {
			t.resources.push(Resource::total(cost));
		}
		t
	}

	/// Turns a small generated integer into whole units, cents, a value
	/// carrying binary float noise, or something near the largest amount a
	/// document may hold.
	fn shaped(base: i128, shape: i128) -> Money {
		match shape % 4 {
			0 => m(base),
			1 => Money::from_frac(base, 100).unwrap(),
			2 => m(base) + Money::from_frac(base * 4, 10i128.pow(17)).unwrap(),
			_ => m(base * 10i128.pow(13)),
		}
	}

	fn donation(id: &str, ts: u32, amount: i128) -> Donation {
		Donation::new(id, "p1", m(amount), day(ts))
	}

	#[test]
	fn test_single_donation_spills_into_next_task() {
		let tasks = vec![task("t1", 1, 100), task("t2", 5, 50)];
		let map = allocate(&tasks, &[donation("d1", 2, 120)]);

		assert_eq!(map.get("d1", "t1"), Some(m(100)));
		assert_eq!(map.get("d1", "t2"), Some(m(20)));
		assert_eq!(map.len(), 2);
	}

	#[test]
	fn test_two_donations_share_a_task() {
		let tasks = vec![task("t1", 1, 100), task("t2", 5, 50)];
		let donations = vec![donation("A", 1, 60), donation("B", 3, 80)];
		let map = allocate(&tasks, &donations);

		let entries: Vec<_> = map
			.iter()
			.map(|a| (a.donation_id.as_str(), a.task_id.as_str(), a.amount))
			.collect();
		assert_eq!(
			entries,
			vec![("A", "t1", m(60)), ("B", "t1", m(40)), ("B", "t2", m(40))]
		);
	}

	#[test]
	fn test_surplus_is_dropped() {
		let tasks = vec![task("t1", 1, 50)];
		let map = allocate(&tasks, &[donation("d1", 1, 80)]);

		assert_eq!(map.get("d1", "t1"), Some(m(50)));
		assert_eq!(map.len(), 1);
		assert_eq!(map.allocated_from("d1"), m(50));
	}

	#[test]
	fn test_late_donation_after_full_funding_gets_nothing() {
		let tasks = vec![task("t1", 1, 50)];
		let donations = vec![donation("d1", 1, 50), donation("d2", 2, 10)];
		let map = allocate(&tasks, &donations);

		assert_eq!(map.for_donation("d2").count(), 0);
	}

	#[test]
	fn test_funding_follows_start_date_not_stored_order() {
		let tasks = vec![task("late", 9, 30), task("early", 1, 30)];
		let map = allocate(&tasks, &[donation("d1", 1, 40)]);

		assert_eq!(map.get("d1", "early"), Some(m(30)));
		assert_eq!(map.get("d1", "late"), Some(m(10)));
		let order: Vec<_> =
			map.for_donation("d1").map(|a| a.task_id.as_str()).collect();
		assert_eq!(order, vec!["early", "late"]);
	}

	#[test]
	fn test_start_date_ties_keep_stored_order() {
		let tasks = vec![task("b", 3, 10), task("a", 3, 10)];
		let map = allocate(&tasks, &[donation("d1", 1, 15)]);

		assert_eq!(map.get("d1", "b"), Some(m(10)));
		assert_eq!(map.get("d1", "a"), Some(m(5)));
	}

	#[test]
	fn test_donations_consumed_by_timestamp_not_stored_order() {
		let tasks = vec![task("t1", 1, 100), task("t2", 2, 100)];
		let donations = vec![donation("newer", 5, 100), donation("older", 2, 50)];
		let map = allocate(&tasks, &donations);

		assert_eq!(map.get("older", "t1"), Some(m(50)));
		assert_eq!(map.get("newer", "t1"), Some(m(50)));
		assert_eq!(map.get("newer", "t2"), Some(m(50)));
	}

	#[test]
	fn test_donation_timestamp_ties_keep_stored_order() {
		let tasks = vec![task("t1", 1, 10)];
		let donations = vec![donation("x", 2, 10), donation("y", 2, 10)];
		let map = allocate(&tasks, &donations);

		assert_eq!(map.get("x", "t1"), Some(m(10)));
		assert_eq!(map.get("y", "t1"), None);
	}

	#[test]
	fn test_zero_cost_task_is_skipped() {
		let tasks = vec![task("free", 1, 0), task("t2", 2, 10)];
		let map = allocate(&tasks, &[donation("d1", 1, 10)]);

		assert_eq!(map.get("d1", "free"), None);
		assert_eq!(map.get("d1", "t2"), Some(m(10)));
	}

	#[test]
	fn test_non_positive_amounts_allocate_nothing() {
		let tasks = vec![task("t1", 1, 10)];
		let donations = vec![donation("zero", 1, 0), donation("neg", 2, -5)];
		let map = allocate(&tasks, &donations);

		assert!(map.is_empty());
	}

	#[test]
	fn test_no_tasks_or_no_donations() {
		assert!(allocate(&[], &[donation("d1", 1, 10)]).is_empty());
		assert!(allocate(&[task("t1", 1, 10)], &[]).is_empty());
	}

	#[test]
	fn test_fractional_amounts_stay_exact() {
		let mut t1 = Task::new("t1", "t1", day(1));
		t1.resources
			.push(Resource::total(Money::from_str("33.33").unwrap()));
		let tasks = vec![t1, task("t2", 2, 10)];
		let donations = vec![
			Donation::new("d1", "p1", Money::from_str("0.1").unwrap(), day(1)),
			Donation::new("d2", "p1", Money::from_str("33.22").unwrap(), day(2)),
			Donation::new("d3", "p1", Money::from_str("0.5").unwrap(), day(3)),
		];
		let map = allocate(&tasks, &donations);

		assert_eq!(map.funded("t1"), Money::from_str("33.33").unwrap());
		assert_eq!(map.get("d3", "t1"), Some(Money::from_str("0.01").unwrap()));
		assert_eq!(map.get("d3", "t2"), Some(Money::from_str("0.49").unwrap()));
	}

	#[test]
	fn test_float_noise_cost_against_largest_donation() {
		let noisy = Money::from_str("0.30000000000000004").unwrap();
		let tasks = vec![costing("t1", 1, noisy), task("t2", 2, 10)];
		let donations =
			vec![Donation::new("d1", "p1", m(MAX_AMOUNT), day(1))];
		let map = allocate(&tasks, &donations);

		assert_eq!(map.get("d1", "t1"), Some(noisy));
		assert_eq!(map.get("d1", "t2"), Some(m(10)));
		assert_eq!(map.allocated_from("d1"), noisy + m(10));
	}

	#[test]
	fn test_accumulates_repeated_pairs() {
		let mut map = AllocationMap::new();
		map.add("d1", "t1", m(5));
		map.add("d1", "t1", m(7));
		assert_eq!(map.get("d1", "t1"), Some(m(12)));
		assert_eq!(map.len(), 1);
	}

	#[test]
	fn test_is_deterministic() {
		let tasks = vec![task("t1", 3, 70), task("t2", 1, 20), task("t3", 2, 45)];
		let donations = vec![
			donation("a", 4, 33),
			donation("b", 1, 12),
			donation("c", 2, 80),
		];
		assert_eq!(allocate(&tasks, &donations), allocate(&tasks, &donations));
	}

	/// Checks conservation and ordering over a spread of generated inputs.
	#[test]
	fn test_invariants_hold_across_inputs() {
		for seed in 0..40i128 {
			let tasks: Vec<Task> = (0..5)
				.map(|i| {
					let cost = shaped((seed * 7 + i * 13) % 60, seed + i);
					let start = ((seed + i * 5) % 9 + 1) as u32;
					costing(&format!("t{}", i), start, cost)
				})
				.collect();
			let donations: Vec<Donation> = (0..4)
				.map(|i| {
					let amount = shaped((seed * 11 + i * 17) % 70 + 1, seed / 2 + i);
					let ts = ((seed * 3 + i) % 20 + 1) as u32;
					Donation::new(&format!("d{}", i), "p1", amount, day(ts))
				})
				.collect();

			let map = allocate(&tasks, &donations);

			for t in &tasks {
				assert!(map.funded(&t.id) <= t.total_cost());
			}
			for d in &donations {
				assert!(map.allocated_from(&d.id) <= d.amount);
			}

			// no task is funded while an earlier one is still short
			let ordered = funding_order(&tasks);
			for (i, later) in ordered.iter().enumerate() {
				if map.funded(&later.id).is_zero() {
					continue;
				}
				for earlier in &ordered[..i] {
					assert_eq!(map.funded(&earlier.id), earlier.total_cost());
				}
			}

			// everything donated is used until every task is covered
			let total_cost: Money = tasks.iter().map(Task::total_cost).sum();
			let total_donated: Money = donations.iter().map(|d| d.amount).sum();
			let total_allocated: Money = map.iter().map(|a| a.amount).sum();
			assert_eq!(total_allocated, total_cost.min(total_donated));
		}
	}
}
