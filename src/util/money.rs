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
use anyhow::{anyhow, bail, Error};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Most decimal places Display will ever write.
const MAX_RENDER_PRECISION: u32 = 10;

/// Largest magnitude a document may carry, a quadrillion.
pub const MAX_AMOUNT: i128 = 1_000_000_000_000_000;

/// Most decimal places a document may carry. Enough for the noise on a
/// binary float such as 0.30000000000000004.
pub const MAX_DECIMALS: u32 = 18;

/// An exact monetary value, stored as a reduced fraction of i128s. Donation
/// amounts and resource costs arrive as decimal text, and line items are
/// multiplied together (daily cost by quantity by duration), so floating
/// point would leak rounding error into the funding waterfall.
///
/// The denominator is always positive; the sign lives on the numerator.
#[derive(Clone, Copy, Debug)]
pub struct Money {
	numerator: i128,
	denominator: i128,

	/// Decimal places to render. Has no effect on the underlying fraction.
	render_precision: u32,
}

impl Money {
	pub fn zero() -> Self {
		Self {
			numerator: 0,
			denominator: 1,
			render_precision: 0,
		}
	}

	pub fn from_i128(value: i128) -> Self {
		Self {
			numerator: value,
			denominator: 1,
			render_precision: 0,
		}
	}

	pub fn from_frac(numerator: i128, denominator: i128) -> Result<Self, Error> {
		if denominator == 0 {
			bail!("Denominator cannot be zero");
		}

		let sign = if denominator < 0 { -1 } else { 1 };
		let (Some(numerator), Some(denominator)) =
			(numerator.checked_mul(sign), denominator.checked_mul(sign))
		else {
			bail!("Fraction out of range: {}/{}", numerator, denominator);
		};

		let mut out = Self {
			numerator,
			denominator,
			render_precision: 0,
		};
		out.reduce();
		Ok(out)
	}

	/// Parses decimal text such as "120", "-4.50" or "1.5e3". Render
	/// precision follows the number of decimals that were written.
	pub fn from_str(input: &str) -> Result<Self, Error> {
		let input = input.trim();
		if input.is_empty() {
			bail!("Empty amount");
		}

		let (mantissa, exponent) = match input.find(['e', 'E']) {
			Some(i) => (&input[..i], input[i + 1..].parse::<i32>()?),
			None => (input, 0),
		};

		let is_negative = mantissa.starts_with('-');
		let unsigned = mantissa.trim_start_matches(['-', '+']);

		let (whole, decimals) = match unsigned.split_once('.') {
			Some((w, d)) => (w, d),
			None => (unsigned, ""),
		};

		if whole.is_empty() && decimals.is_empty() {
			bail!("Invalid amount: {}", input);
		}
		if !whole.chars().chain(decimals.chars()).all(|c| c.is_ascii_digit())
		{
			bail!("Invalid amount: {}", input);
		}

		let digits = format!("{}{}", whole, decimals);
		let mut numerator = digits
			.parse::<i128>()
			.map_err(|e| anyhow!("Invalid amount {}: {}", input, e))?;
		let mut scale = decimals.len() as i32 - exponent;

		if !(-30..=30).contains(&scale) {
			bail!("Amount out of range: {}", input);
		}
		if scale < 0 {
			numerator = numerator
				.checked_mul(10i128.pow(scale.unsigned_abs()))
				.ok_or_else(|| anyhow!("Amount out of range: {}", input))?;
			scale = 0;
		}

		let mut out = Self::from_frac(numerator, 10i128.pow(scale as u32))?;
		if is_negative {
			out = -out;
		}
		out.render_precision = scale as u32;
		Ok(out)
	}

	pub fn is_zero(&self) -> bool {
		self.numerator == 0
	}

	pub fn is_positive(&self) -> bool {
		self.numerator > 0
	}

	pub fn is_negative(&self) -> bool {
		self.numerator < 0
	}

	/// Accepts only values with at most MAX_DECIMALS decimal places and a
	/// magnitude of at most MAX_AMOUNT. Every such value has a denominator
	/// dividing 10^MAX_DECIMALS, and so do their sums and differences, which
	/// keeps the funding arithmetic far inside i128.
	pub fn in_range(self) -> Result<Self, Error> {
		if 10i128.pow(MAX_DECIMALS) % self.denominator != 0 {
			bail!("more than {} decimal places", MAX_DECIMALS);
		}
		// the denominator is at most 10^18 here, so this cannot overflow
		if self.numerator.unsigned_abs() > (MAX_AMOUNT * self.denominator) as u128
		{
			bail!("{} is larger than {}", self.to_plain_string(), MAX_AMOUNT);
		}
		Ok(self)
	}

	pub fn checked_add(self, rhs: Self) -> Option<Self> {
		let gcd = Self::gcd(self.denominator as u128, rhs.denominator as u128)
			as i128;
		let lcm = (self.denominator / gcd).checked_mul(rhs.denominator)?;
		let left = self.numerator.checked_mul(lcm / self.denominator)?;
		let right = rhs.numerator.checked_mul(lcm / rhs.denominator)?;

		let mut out = Self {
			numerator: left.checked_add(right)?,
			denominator: lcm,
			render_precision: self.render_precision.max(rhs.render_precision),
		};
		out.reduce();
		Some(out)
	}

	pub fn checked_sub(self, rhs: Self) -> Option<Self> {
		self.checked_add(rhs.checked_neg()?)
	}

	pub fn checked_neg(self) -> Option<Self> {
		Some(Self {
			numerator: self.numerator.checked_neg()?,
			..self
		})
	}

	pub fn checked_mul(self, rhs: Self) -> Option<Self> {
		// cross-reduce first to keep the products small
		let g1 = Self::gcd(self.numerator.unsigned_abs(), rhs.denominator as u128)
			as i128;
		let g2 = Self::gcd(rhs.numerator.unsigned_abs(), self.denominator as u128)
			as i128;

		let mut out = Self {
			numerator: (self.numerator / g1).checked_mul(rhs.numerator / g2)?,
			denominator: (self.denominator / g2)
				.checked_mul(rhs.denominator / g1)?,
			render_precision: self.render_precision.max(rhs.render_precision),
		};
		out.reduce();
		Some(out)
	}

	/// None for a zero divisor as well as on overflow.
	pub fn checked_div(self, rhs: Self) -> Option<Self> {
		if rhs.numerator == 0 {
			return None;
		}

		let sign = if rhs.numerator < 0 { -1 } else { 1 };
		let recip = Self {
			numerator: rhs.denominator.checked_mul(sign)?,
			denominator: rhs.numerator.checked_mul(sign)?,
			render_precision: rhs.render_precision,
		};
		self.checked_mul(recip)
	}

	/// Returns the value rounded to the given number of decimal places with
	/// banker's rounding (ties to even). Render precision is set to match.
	///
	/// Panics if the rounded value no longer fits, which takes a magnitude
	/// above 10^28 at ten places.
	pub fn rounded(&self, decimal_places: u32) -> Self {
		let decimal_places = decimal_places.min(MAX_RENDER_PRECISION);
		let scale = 10i128.pow(decimal_places);
		let denominator = self.denominator as u128;

		let whole = self.numerator.div_euclid(self.denominator);
		let mut remainder = self.numerator.rem_euclid(self.denominator) as u128;
		let mut fraction: i128 = 0;
		for _ in 0..decimal_places {
			let (digit, rest) = Self::next_digit(remainder, denominator);
			fraction = fraction * 10 + digit as i128;
			remainder = rest;
		}

		let is_odd = match decimal_places {
			0 => whole % 2 != 0,
			_ => fraction % 2 != 0,
		};
		// remainder < denominator, so comparing against the difference
		// stands in for doubling it
		let fraction = match remainder.cmp(&(denominator - remainder)) {
			Ordering::Greater => fraction + 1,
			Ordering::Equal if is_odd => fraction + 1,
			_ => fraction,
		};

		let numerator = whole
			.checked_mul(scale)
			.and_then(|w| w.checked_add(fraction))
			.unwrap_or_else(|| overflow("rounding"));

		let mut out = Self {
			numerator,
			denominator: scale,
			render_precision: decimal_places,
		};
		out.reduce();
		out
	}

	/// Rounds to the nearest integer, ties away from zero.
	pub fn round_half_away(&self) -> i128 {
		let denominator = self.denominator as u128;
		let quotient = self.numerator.unsigned_abs() / denominator;
		let remainder = self.numerator.unsigned_abs() % denominator;
		let magnitude = match remainder >= denominator - remainder {
			true => quotient + 1,
			false => quotient,
		};
		let magnitude = magnitude as i128;

		if self.numerator < 0 {
			-magnitude
		} else {
			magnitude
		}
	}

	/// Renders without thousands separators, for machine-readable output.
	pub fn to_plain_string(&self) -> String {
		self.render(false)
	}

	fn render(&self, group_thousands: bool) -> String {
		let precision = self.render_precision.min(MAX_RENDER_PRECISION);
		let magnitude = self.numerator.unsigned_abs();
		let denominator = self.denominator as u128;

		let integer_part = magnitude / denominator;
		let mut remainder = magnitude % denominator;

		let mut fraction = String::new();
		for _ in 0..precision {
			let (digit, rest) = Self::next_digit(remainder, denominator);
			remainder = rest;
			fraction.push(char::from_digit(digit, 10).unwrap_or('0'));
		}

		let mut int_str = integer_part.to_string();
		if group_thousands {
			let mut i = int_str.len() as isize - 3;
			while i > 0 {
				int_str.insert(i as usize, ',');
				i -= 3;
			}
		}

		let sign = if self.numerator < 0 { "-" } else { "" };
		if fraction.is_empty() {
			format!("{}{}", sign, int_str)
		} else {
			format!("{}{}.{}", sign, int_str, fraction)
		}
	}

	/// Keeps numerator and denominator coprime so chained arithmetic over
	/// many line items does not overflow.
	fn reduce(&mut self) {
		let gcd = Self::gcd(self.numerator.unsigned_abs(), self.denominator as u128);
		if gcd > 1 {
			self.numerator /= gcd as i128;
			self.denominator /= gcd as i128;
		}
	}

	fn gcd(mut a: u128, mut b: u128) -> u128 {
		while b != 0 {
			let temp = b;
			b = a % b;
			a = temp;
		}
		a.max(1)
	}

	/// One step of long division: the next decimal digit of
	/// remainder / denominator and the remainder after it. Ten times the
	/// remainder is built up modulo the denominator, so nothing larger than
	/// twice the denominator is ever formed.
	fn next_digit(remainder: u128, denominator: u128) -> (u32, u128) {
		let mut digit = 0;
		let mut acc = 0u128;
		for _ in 0..10 {
			acc += remainder;
			if acc >= denominator {
				acc -= denominator;
				digit += 1;
			}
		}
		(digit, acc)
	}

	/// Orders a/b against c/d, with b and d positive, by comparing whole
	/// parts and then the reciprocals of the remainders. Used when
	/// cross-multiplying would overflow.
	fn cmp_fractions(a: i128, b: i128, c: i128, d: i128) -> Ordering {
		let (q1, r1) = (a.div_euclid(b), a.rem_euclid(b));
		let (q2, r2) = (c.div_euclid(d), c.rem_euclid(d));
		if q1 != q2 {
			return q1.cmp(&q2);
		}

		match (r1, r2) {
			(0, 0) => Ordering::Equal,
			(0, _) => Ordering::Less,
			(_, 0) => Ordering::Greater,
			// the larger of two proper fractions has the smaller reciprocal
			_ => Self::cmp_fractions(d, r2, b, r1),
		}
	}
}

fn overflow(operation: &str) -> ! {
	panic!("Money overflow in {}", operation)
}

impl Default for Money {
	fn default() -> Self {
		Self::zero()
	}
}

impl fmt::Display for Money {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match f.precision() {
			Some(p) => {
				let p = (p as u32).min(MAX_RENDER_PRECISION);
				write!(f, "{}", self.rounded(p).render(true))
			},
			None => write!(f, "{}", self.render(true)),
		}
	}
}

impl Serialize for Money {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_plain_string())
	}
}

// ----------------
// -- ARITHMETIC --
// ----------------

// The operators panic on overflow rather than wrapping. Values that passed
// `in_range` never get near it; use the checked methods on anything else.

impl Add for Money {
	type Output = Self;

	fn add(self, rhs: Self) -> Self::Output {
		self.checked_add(rhs).unwrap_or_else(|| overflow("addition"))
	}
}

impl AddAssign for Money {
	fn add_assign(&mut self, rhs: Self) {
		*self = *self + rhs;
	}
}

impl Sub for Money {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self::Output {
		self.checked_sub(rhs).unwrap_or_else(|| overflow("subtraction"))
	}
}

impl SubAssign for Money {
	fn sub_assign(&mut self, rhs: Self) {
		*self = *self - rhs;
	}
}

impl Mul for Money {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self::Output {
		self.checked_mul(rhs)
			.unwrap_or_else(|| overflow("multiplication"))
	}
}

impl Mul<i128> for Money {
	type Output = Self;

	fn mul(self, rhs: i128) -> Self::Output {
		self * Money::from_i128(rhs)
	}
}

/// Panics on a zero divisor, like integer division.
impl Div for Money {
	type Output = Self;

	fn div(self, rhs: Self) -> Self::Output {
		if rhs.numerator == 0 {
			panic!("Attempt to divide by zero");
		}
		self.checked_div(rhs).unwrap_or_else(|| overflow("division"))
	}
}

impl Neg for Money {
	type Output = Self;

	fn neg(self) -> Self::Output {
		self.checked_neg().unwrap_or_else(|| overflow("negation"))
	}
}

impl Sum for Money {
	fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
		iter.fold(Money::zero(), |acc, m| acc + m)
	}
}

impl<'a> Sum<&'a Money> for Money {
	fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
		iter.fold(Money::zero(), |acc, m| acc + *m)
	}
}

// ----------------
// -- COMPARISON --
// ----------------

impl PartialEq for Money {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Money {}

impl PartialEq<i128> for Money {
	fn eq(&self, other: &i128) -> bool {
		*self == Money::from_i128(*other)
	}
}

impl PartialOrd for Money {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialOrd<i128> for Money {
	fn partial_cmp(&self, other: &i128) -> Option<Ordering> {
		Some(self.cmp(&Money::from_i128(*other)))
	}
}

impl Ord for Money {
	fn cmp(&self, other: &Self) -> Ordering {
		// denominators are positive, so cross-multiplying keeps the order
		match (
			self.numerator.checked_mul(other.denominator),
			other.numerator.checked_mul(self.denominator),
		) {
			(Some(left), Some(right)) => left.cmp(&right),
			_ => Self::cmp_fractions(
				self.numerator,
				self.denominator,
				other.numerator,
				other.denominator,
			),
		}
	}
}
