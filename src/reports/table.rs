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

const COLUMN_GAP: &str = "   ";
const HEADER_GAP: &str = " | ";

/// Plain-text table for reports made of many single-line rows. Column
/// widths are measured in characters so task names outside ASCII still
/// line up. Trailing whitespace is trimmed from every line.
pub struct Table {
	column_count: usize,
	rows: Vec<Row>,
	right_align: Vec<bool>, // indicates columns by index
}

enum Row {
	Header(Vec<String>),
	Data(Vec<String>),
	Separator,
	PartialSeparator(Vec<bool>), // indicates columns by index
}

impl Table {
	pub fn new(column_count: usize) -> Self {
		Self {
			column_count,
			rows: Vec::new(),
			right_align: vec![false; column_count],
		}
	}

	pub fn add_header(&mut self, row: Vec<&str>) {
		self.rows.push(Row::Header(self.fit(row)));
	}

	pub fn add_row(&mut self, row: Vec<&str>) {
		self.rows.push(Row::Data(self.fit(row)));
	}

	pub fn add_separator(&mut self) {
		self.rows.push(Row::Separator);
	}

	/// Adds a separator drawn only under the selected columns.
	pub fn add_partial_separator(&mut self, indices: Vec<usize>) {
		let mut cols = vec![false; self.column_count];
		for i in indices {
			if let Some(col) = cols.get_mut(i) {
				*col = true;
			}
		}
		self.rows.push(Row::PartialSeparator(cols));
	}

	pub fn right_align(&mut self, cols: Vec<usize>) {
		for col in cols {
			if let Some(c) = self.right_align.get_mut(col) {
				*c = true;
			}
		}
	}

	/// Pads short rows and drops extra cells so every row has exactly
	/// column_count cells.
	fn fit(&self, row: Vec<&str>) -> Vec<String> {
		let mut out: Vec<String> = row
			.into_iter()
			.take(self.column_count)
			.map(|s| s.to_string())
			.collect();
		out.resize(self.column_count, String::new());
		out
	}

	/// Renders the table, starting with a blank line.
	pub fn render(&self) -> String {
		let mut widths = vec![0; self.column_count];
		for row in &self.rows {
			if let Row::Data(cells) | Row::Header(cells) = row {
				for (i, value) in cells.iter().enumerate() {
					widths[i] = widths[i].max(value.chars().count());
				}
			}
		}

		let mut out = String::from("\n");
		for row in &self.rows {
			let line = match row {
				Row::Header(cells) => cells
					.iter()
					.zip(&widths)
					.map(|(v, w)| center_align(v, *w))
					.collect::<Vec<_>>()
					.join(HEADER_GAP),
				Row::Data(cells) => cells
					.iter()
					.zip(&widths)
					.zip(&self.right_align)
					.map(|((v, w), right)| {
						if *right {
							format!("{:>width$}", v, width = w)
						} else {
							format!("{:<width$}", v, width = w)
						}
					})
					.collect::<Vec<_>>()
					.join(COLUMN_GAP),
				Row::Separator => {
					let total = widths.iter().sum::<usize>()
						+ COLUMN_GAP.len() * self.column_count.saturating_sub(1);
					"-".repeat(total)
				},
				Row::PartialSeparator(draw) => draw
					.iter()
					.zip(&widths)
					.map(|(d, w)| if *d { "-" } else { " " }.repeat(*w))
					.collect::<Vec<_>>()
					.join(COLUMN_GAP),
			};

			out.push_str(line.trim_end());
			out.push('\n');
		}
		out
	}
}

fn center_align(value: &str, width: usize) -> String {
	let len = value.chars().count();
	if len >= width {
		return value.to_string();
	}
	let left = (width - len) / 2;
	let right = width - len - left;

	format!("{}{}{}", " ".repeat(left), value, " ".repeat(right))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_render() {
		let mut table = Table::new(3);
		table.right_align(vec![2]);
		table.add_header(vec!["Task", "Start", "Amount"]);
		table.add_separator();
		table.add_row(vec!["Well", "2024-01-01", "100.00"]);
		table.add_row(vec!["Pipes", "2024-01-05", "20.00"]);
		table.add_partial_separator(vec![2]);
		table.add_row(vec!["", "", "120.00"]);

		let expected = "
Task  |   Start    | Amount
---------------------------
Well    2024-01-01   100.00
Pipes   2024-01-05    20.00
                     ------
                     120.00
";
		assert_eq!(table.render(), expected);
	}

	#[test]
	fn test_widths_count_characters() {
		let mut table = Table::new(2);
		table.add_row(vec!["Café", "x"]);
		table.add_row(vec!["Tea", "y"]);
		assert_eq!(table.render(), "\nCafé   x\nTea    y\n");
	}

	#[test]
	fn test_short_rows_are_padded() {
		let mut table = Table::new(2);
		table.right_align(vec![1]);
		table.add_row(vec!["a"]);
		table.add_row(vec!["b", "22", "extra"]);
		assert_eq!(table.render(), "\na\nb   22\n");
	}

	#[test]
	fn test_center_align() {
		assert_eq!(center_align("ab", 6), "  ab  ");
		assert_eq!(center_align("ab", 5), " ab  ");
		assert_eq!(center_align("abc", 2), "abc");
	}
}
