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
use anyhow::{bail, Error};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct Client {
	client: reqwest::blocking::Client,
	base_url: String,

	/// Sent as the `key` query parameter when present
	api_key: Option<String>,
}

impl Client {
	pub fn new(base_url: &str, api_key: Option<String>) -> Self {
		Client {
			client: reqwest::blocking::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key,
		}
	}

	/// Sends a GET. A 404 comes back as None; any other non-2xx response
	/// is an error.
	pub fn get<R>(&self, endpoint: &str) -> Result<Option<R>, Error>
	where
		R: for<'de> Deserialize<'de>,
	{
		let response = self.send(self.request(Method::GET, endpoint))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		Ok(Some(Self::parse(response)?))
	}

	/// Sends a POST with a JSON body. Errors on non-2xx response codes.
	pub fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, Error>
	where
		B: Serialize,
		R: for<'de> Deserialize<'de>,
	{
		let response =
			self.send(self.request(Method::POST, endpoint).json(body))?;
		Self::parse(response)
	}

	fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
		let url = format!("{}/{}", self.base_url, endpoint);
		debug!("Sending {} to {}", method, url);

		let request = self.client.request(method, &url);
		match &self.api_key {
			Some(key) => request.query(&[("key", key)]),
			None => request,
		}
	}

	fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
		Ok(request.send()?)
	}

	fn parse<R>(response: Response) -> Result<R, Error>
	where
		R: for<'de> Deserialize<'de>,
	{
		let status = response.status();
		if !status.is_success() {
			let body = response.text().unwrap_or_default();
			bail!("Request failed with status {}: {}", status, body.trim());
		}

		Ok(response.json()?)
	}
}
