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
use crate::config::config_file::Config;
use anyhow::{anyhow, bail, Error};
use dirs::home_dir;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = ".config/fundr/config.toml";

pub struct Filesystem;

impl Filesystem {
	pub fn new() -> Self {
		Self
	}

	pub fn read(&self, file_path: &str) -> Result<String, Error> {
		fs::read_to_string(file_path)
			.map_err(|e| anyhow!("failed to read {}: {}", file_path, e))
	}

	pub fn write(&self, file_path: &str, contents: &str) -> Result<(), Error> {
		fs::write(file_path, contents)
			.map_err(|e| anyhow!("failed to write {}: {}", file_path, e))
	}

	/// Fetches the config from the given path, or the default path if none.
	/// A missing default config is treated as empty; a missing custom one is
	/// an error. The boolean argument indicates whether credentials are
	/// needed, i.e. whether api_key_cmd should be run.
	pub fn get_config(
		&self,
		custom_config_path: Option<&String>,
		expand_auth: bool,
	) -> Result<Config, Error> {
		let config_path = match &custom_config_path {
			None => home_dir()
				.ok_or_else(|| anyhow!("Unable to determine home directory"))?
				.join(DEFAULT_CONFIG_PATH),
			Some(p) => PathBuf::from(p),
		};

		if !config_path.exists() {
			if custom_config_path.is_some() {
				bail!("config file not found: {}", config_path.display());
			}
			debug!(path = %config_path.display(), "no config file; using defaults");
			return Ok(Config::default());
		}

		let content = fs::read_to_string(&config_path)?;
		let mut config: Config = toml::from_str(&content)
			.map_err(|e| anyhow!("failed to parse config: {}", e))?;
		config.validate().map_err(|e| {
			anyhow!("invalid config {}: {}", config_path.display(), e)
		})?;

		if !expand_auth {
			return Ok(config);
		}

		// Execute api_key_cmd if applicable, and put result in api_key
		if let Some(sources) = &mut config.sources {
			if let Some(firestore) = &mut sources.firestore {
				if firestore.api_key_cmd.is_some() && firestore.api_key.is_some()
				{
					bail!("Only one of sources.firestore.api_key and sources.firestore.api_key_cmd may be specified")
				}

				if let Some(api_key_cmd) = &firestore.api_key_cmd {
					firestore.api_key = Some(run_key_command(api_key_cmd)?);
				}
			}
		}

		Ok(config)
	}
}

fn run_key_command(cmd: &str) -> Result<String, Error> {
	let output = Command::new("sh")
		.arg("-c")
		.arg(cmd)
		.output()
		.map_err(|e| anyhow!("failed to execute api_key_cmd: {}", e))?;

	if !output.status.success() {
		bail!(
			"firestore api_key_cmd failed with status {}: {}",
			output.status,
			String::from_utf8_lossy(&output.stderr)
		);
	}

	Ok(String::from_utf8(output.stdout)
		.map_err(|e| anyhow!("failed to parse command output: {}", e))?
		.trim()
		.to_string())
}
