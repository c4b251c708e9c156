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
use crate::model::document::Fields;
use crate::util::money::Money;
use anyhow::{anyhow, bail, Error};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

/// A unit of work inside a project. Tasks are funded in order of their
/// start date, and a task is fully funded once donations cover the sum of
/// its resource costs.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
	pub id: String,
	pub name: String,

	pub start_date: DateTime<Utc>,
	/// Display only; plays no part in funding order
	pub end_date: Option<DateTime<Utc>>,

	pub resources: Vec<Resource>,
}

/// A costed line item attached to a task.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
	pub name: Option<String>,
	pub cost: ResourceCost,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResourceCost {
	/// An explicit total, which wins over any per-day figures present
	Total(Money),

	PerDay {
		daily_cost: Money,
		quantity: Money,
		duration: Money,
	},
}

impl Resource {
	pub fn total(amount: Money) -> Self {
		Self {
			name: None,
			cost: ResourceCost::Total(amount),
		}
	}

	pub fn per_day(daily_cost: Money, quantity: Money, duration: Money) -> Self {
		Self {
			name: None,
			cost: ResourceCost::PerDay {
				daily_cost,
				quantity,
				duration,
			},
		}
	}

	pub fn cost(&self) -> Money {
		match &self.cost {
			ResourceCost::Total(amount) => *amount,
			ResourceCost::PerDay {
				daily_cost,
				quantity,
				duration,
			} => *daily_cost * *quantity * *duration,
		}
	}

	/// The cost, or None when the per-day product does not fit.
	pub fn checked_cost(&self) -> Option<Money> {
		match &self.cost {
			ResourceCost::Total(amount) => Some(*amount),
			ResourceCost::PerDay {
				daily_cost,
				quantity,
				duration,
			} => daily_cost.checked_mul(*quantity)?.checked_mul(*duration),
		}
	}

	/// Parses a resource line item. An explicit totalCost is used when
	/// present; otherwise all of dailyCost, quantity and duration must be.
	/// Negative costs are rejected so a task's total can never go below
	/// zero, and so are costs outside `Money::in_range`.
	pub fn from_fields(fields: Fields) -> Result<Self, Error> {
		let mut out = match fields.money("totalCost")? {
			Some(total) => Self::total(total),
			None => Self::per_day(
				fields.required_money("dailyCost")?,
				fields.required_money("quantity")?,
				fields.required_money("duration")?,
			),
		};
		out.name = fields.string("name")?;
		let label = out.name.as_deref().unwrap_or("resource");

		let cost = out
			.checked_cost()
			.ok_or_else(|| anyhow!("{} cost is too large to represent", label))?
			.in_range()
			.map_err(|e| anyhow!("{} cost is out of range: {}", label, e))?;
		if cost.is_negative() {
			bail!("{} has negative cost {}", label, cost);
		}

		Ok(out)
	}
}

impl Task {
	pub fn new(id: &str, name: &str, start_date: DateTime<Utc>) -> Self {
		Self {
			id: id.to_string(),
			name: name.to_string(),
			start_date,
			end_date: None,
			resources: vec![],
		}
	}

	/// The sum of all resource costs. Zero for a task with no resources,
	/// which the allocation engine treats as already funded.
	pub fn total_cost(&self) -> Money {
		self.resources.iter().map(Resource::cost).sum()
	}

	/// Parses a task embedded in a project document. A task without an id
	/// or a start date cannot be placed in funding order and is an error;
	/// malformed resources are dropped with a warning instead, so one bad
	/// line item doesn't hide the whole task.
	pub fn from_fields(map: &Map<String, Value>) -> Result<Self, Error> {
		let fields = Fields::new(map);

		let id = fields.required_string("id")?;
		let name = fields.string("name")?.unwrap_or_else(|| id.clone());
		let start_date = fields.required_timestamp("startDate")?;
		let end_date = fields.timestamp("endDate")?;

		let mut resources: Vec<Resource> = vec![];
		for (i, resource) in fields.objects("resources")?.into_iter().enumerate()
		{
			match Resource::from_fields(Fields::new(resource)) {
				Ok(r) => resources.push(r),
				Err(e) => {
					warn!(task = %id, resource = i, "dropping resource: {}", e)
				},
			}
		}

		resources
			.iter()
			.try_fold(Money::zero(), |acc, r| acc.checked_add(r.cost()))
			.ok_or_else(|| anyhow!("total cost does not fit"))?
			.in_range()
			.map_err(|e| anyhow!("total cost is out of range: {}", e))?;

		Ok(Self {
			id,
			name,
			start_date,
			end_date,
			resources,
		})
	}
}
