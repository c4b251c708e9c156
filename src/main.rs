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
use crate::allocation::engine::allocate;
use crate::allocation::projector::view_donation;
use crate::allocation::summary::FundingSummary;
use crate::config::config_file::Config;
use crate::config::filesystem::Filesystem;
use crate::reports::allocation_reporter::{
	to_json, AllocationReporter, NO_ALLOCATION_DATA,
};
use crate::source::file::{FileSource, Snapshot};
use crate::source::firestore::core::FirestoreSource;
use crate::source::loader::{load, project_of_donation, Loaded};
use crate::source::DataSource;
use crate::util::date::DEFAULT_DATE_FORMAT;
use anyhow::{anyhow, bail, Error};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod allocation;
mod config;
mod model;
mod reports;
mod source;
mod util;

#[derive(Parser)]
#[command(
	name = "fundr",
	version = "1.0",
	about = "Shows how donations fund a project's tasks"
)]
struct Cli {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// The command to execute
	command: Directive,

	/// Donation id for view; project id for the other commands
	#[arg(required = false)]
	term: Option<String>,

	// -----------
	// -- FLAGS --
	// -----------
	/// Snapshot file to read from (or write to, for fetch). Without it,
	/// documents are read from Firestore.
	#[arg(short)]
	file: Option<String>,

	/// Custom config file location (default: ~/.config/fundr/config.toml)
	#[arg(long)]
	config: Option<String>,

	/// Decimal places to show for amounts
	#[arg(short, long)]
	precision: Option<u32>,

	/// Print JSON instead of tables
	#[arg(long)]
	json: bool,

	/// More log output on stderr; repeat for more detail
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl Cli {
	/// Money is exact, so this only guards against silly output widths
	const MAX_PRECISION: u32 = 10;

	const DEFAULT_PRECISION: u32 = 2;

	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		if let Some(prec) = self.precision {
			if prec > Cli::MAX_PRECISION {
				bail!("Maximum precision is {}", Cli::MAX_PRECISION);
			}
		}

		match self.command {
			Directive::View if self.term.is_none() => {
				bail!("No donation specified")
			},
			Directive::Fetch if self.term.is_none() => {
				bail!("No project specified")
			},
			Directive::Fetch if self.file.is_none() => {
				bail!("fetch needs an output file (-f)")
			},
			_ => {},
		}

		Ok(())
	}

	/// Whether documents will be read from Firestore, which is the only
	/// thing that needs credentials.
	fn uses_firestore(&self) -> bool {
		self.file.is_none() || self.command == Directive::Fetch
	}
}

#[derive(ValueEnum, Clone, PartialEq)]
enum Directive {
	View,  // one donation's contribution to each task
	Map,   // every (donation, task) allocation
	Tasks, // funding summary per task and per donation
	Check, // load and validate only; problems are logged
	Fetch, // save a project and its donations to a snapshot file
}

fn main() -> Result<(), Error> {
	let args = Cli::parse();
	args.validate()?;
	init_logging(args.verbose);

	let fs = Filesystem::new();
	let config = fs.get_config(args.config.as_ref(), args.uses_firestore())?;

	if args.command == Directive::Fetch {
		return fetch(&fs, config, &args);
	}

	let display = config.display.clone().unwrap_or_default();
	let date_format = display
		.date_format
		.clone()
		.unwrap_or(DEFAULT_DATE_FORMAT.to_string());
	let reporter = AllocationReporter::new(
		args.precision
			.or(display.precision)
			.unwrap_or(Cli::DEFAULT_PRECISION)
			.min(Cli::MAX_PRECISION),
		display.currency.clone(),
		&date_format,
	);

	let (source, sole_project) = open_source(&fs, config, &args)?;

	let project_id = match args.command {
		Directive::View => {
			// validate() guarantees a term here
			let donation_id = args.term.clone().unwrap_or_default();
			match project_of_donation(source.as_ref(), &donation_id)? {
				Some(id) => id,
				None => {
					debug!(donation = %donation_id, "donation not found");
					println!("{}", NO_ALLOCATION_DATA);
					return Ok(());
				},
			}
		},
		_ => match (&args.term, sole_project) {
			(Some(id), _) => id.clone(),
			(None, Some(id)) => id,
			(None, None) => bail!("No project specified"),
		},
	};

	let Some(Loaded { project, donations }) =
		load(source.as_ref(), &project_id)?
	else {
		println!("{}", NO_ALLOCATION_DATA);
		return Ok(());
	};

	match args.command {
		Directive::View => {
			let donation_id = args.term.as_deref().unwrap_or_default();
			let Some(view) =
				view_donation(&project, &donations, donation_id, &date_format)
			else {
				// the donation exists but did not survive validation
				println!("{}", NO_ALLOCATION_DATA);
				return Ok(());
			};

			if args.json {
				print!("{}", to_json(&view)?);
			} else {
				print!("{}", reporter.donation_view(&view));
			}
		},
		Directive::Map => {
			let map = allocate(&project.tasks, &donations);
			if args.json {
				print!("{}", to_json(&map.iter().collect::<Vec<_>>())?);
			} else {
				let report =
					reporter.allocation_map(&project, &donations, &map);
				print!("{}", report);
			}
		},
		Directive::Tasks => {
			let map = allocate(&project.tasks, &donations);
			let summary =
				FundingSummary::new(&project, &donations, &map, &date_format);
			if args.json {
				print!("{}", to_json(&summary)?);
			} else {
				print!("{}", reporter.funding_summary(&summary));
			}
		},
		Directive::Check => {
			// simple log; warnings are emitted while loading
			let map = allocate(&project.tasks, &donations);
			debug!(allocations = map.len(), "check complete");
			println!("Done");
		},
		Directive::Fetch => {}, // handled before loading
	}

	Ok(())
}

/// Log lines go to stderr so reports on stdout stay clean. RUST_LOG wins
/// over the -v flag when set.
fn init_logging(verbose: u8) {
	let filter = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};

	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| filter.into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

/// Returns the source to read from, plus the project to use when the
/// command was given none: a snapshot holding a single project implies it.
fn open_source(
	fs: &Filesystem,
	config: Config,
	args: &Cli,
) -> Result<(Box<dyn DataSource>, Option<String>), Error> {
	match &args.file {
		Some(file) => {
			let source = FileSource::open(fs, file)?;
			let sole_project = match (&args.command, &args.term) {
				(Directive::View, _) | (_, Some(_)) => None,
				_ => Some(source.sole_project_id()?),
			};
			Ok((Box::new(source), sole_project))
		},
		None => Ok((Box::new(firestore(config)?), None)),
	}
}

fn firestore(config: Config) -> Result<FirestoreSource, Error> {
	let firestore = config
		.sources
		.and_then(|s| s.firestore)
		.ok_or_else(|| {
			anyhow!("No input file given and no [sources.firestore] in config")
		})?;
	FirestoreSource::new(firestore)
}

/// Downloads one project and its donations, unvalidated, into a snapshot
/// file that can later be read back with -f.
fn fetch(fs: &Filesystem, config: Config, args: &Cli) -> Result<(), Error> {
	let (Some(project_id), Some(file)) = (&args.term, &args.file) else {
		bail!("fetch needs a project and an output file");
	};

	let source = firestore(config)?;
	let Some(project) = source.project(project_id)? else {
		bail!("Project {} not found", project_id);
	};
	let donations = source.donations(project_id)?;

	Snapshot::new(&project, &donations).save(fs, file)?;
	println!(
		"Saved project {} with {} donation(s) to {}",
		project.id,
		donations.len(),
		file
	);
	Ok(())
}
