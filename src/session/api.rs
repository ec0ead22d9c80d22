//! Backend access: visualization payloads, task scheduling and the variable
//! list of a stored formula.

use std::time::Duration;

use futures::channel::oneshot;
use leptos::prelude::set_timeout;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, VisError};
use crate::graph::filter::VariableSelection;
use crate::graph::kind::Family;

/// Local storage key holding the API token.
const TOKEN_KEY: &str = "token";

/// Reply to a task-scheduling request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TaskStatus {
	pub status: String,
	#[serde(default)]
	pub message: String,
}

impl TaskStatus {
	pub fn is_ok(&self) -> bool {
		self.status == "ok"
	}
}

/// Where a session gets its data from.
#[allow(async_fn_in_trait)]
pub trait DataSource {
	/// Raw visualization response, `{content}` or `{error}`. `format` is the
	/// route's formula family segment.
	async fn fetch_visualization(
		&self,
		file_id: &str,
		format: &str,
		variables: &VariableSelection,
	) -> Result<Value>;

	async fn schedule_task(&self, file_id: &str, task_name: &str) -> Result<TaskStatus>;

	/// Raw variable-list response for a stored file.
	async fn fetch_variables(&self, file_id: &str, family: Family) -> Result<Value>;

	/// Suspends between polls.
	async fn pause(&self, duration: Duration);
}

/// [`DataSource`] over the REST API.
#[derive(Clone, Debug)]
pub struct HttpDataSource {
	client: Client,
	base: String,
}

impl HttpDataSource {
	pub fn new(base: impl Into<String>) -> Self {
		Self {
			client: Client::new(),
			base: base.into().trim_end_matches('/').to_string(),
		}
	}

	pub fn visualization_url(&self, file_id: &str, format: &str, variables: &VariableSelection) -> String {
		format!(
			"{}/profile/visualization/{file_id}/{format}/?selectedVariables={}",
			self.base,
			variables.query_value()
		)
	}

	pub fn task_url(&self, file_id: &str, task_name: &str) -> String {
		format!("{}/profile/task/{task_name}/{file_id}/", self.base)
	}

	pub fn variables_url(&self, file_id: &str, family: Family) -> String {
		format!("{}/profile/file/{}/{file_id}/variables/", self.base, family.file_segment())
	}

	fn get(&self, url: &str) -> RequestBuilder {
		let request = self.client.get(url);
		match stored_token() {
			Some(token) => request.header(AUTHORIZATION, format!("Token {token}")),
			None => request,
		}
	}

	async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
		debug!("GET {url}");
		let response = self.get(url).send().await?;
		let status = response.status();
		if !status.is_success() {
			warn!("GET {url} -> {status}");
			return Err(VisError::Transport(status.to_string()));
		}
		Ok(response.json::<T>().await?)
	}
}

impl DataSource for HttpDataSource {
	async fn fetch_visualization(
		&self,
		file_id: &str,
		format: &str,
		variables: &VariableSelection,
	) -> Result<Value> {
		self.get_json(&self.visualization_url(file_id, format, variables))
			.await
	}

	async fn schedule_task(&self, file_id: &str, task_name: &str) -> Result<TaskStatus> {
		self.get_json(&self.task_url(file_id, task_name)).await
	}

	async fn fetch_variables(&self, file_id: &str, family: Family) -> Result<Value> {
		self.get_json(&self.variables_url(file_id, family)).await
	}

	async fn pause(&self, duration: Duration) {
		let (done, elapsed) = oneshot::channel();
		set_timeout(
			move || {
				let _ = done.send(());
			},
			duration,
		);
		let _ = elapsed.await;
	}
}

fn stored_token() -> Option<String> {
	web_sys::window()?
		.local_storage()
		.ok()??
		.get_item(TOKEN_KEY)
		.ok()?
}

/// Interpretation of one variable-list reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariablesReply {
	/// The server is still computing; ask again later.
	Pending(String),
	Ready(Vec<String>),
}

/// Reads `content.data.message` (pending) or `content.data.variables`.
pub fn parse_variables(raw: &Value) -> Result<VariablesReply> {
	let data = raw
		.pointer("/content/data")
		.ok_or_else(|| VisError::DataUnavailable("variable list missing".into()))?;
	if let Some(message) = data.get("message").and_then(Value::as_str) {
		return Ok(VariablesReply::Pending(message.to_string()));
	}
	let variables = data
		.get("variables")
		.and_then(Value::as_array)
		.ok_or_else(|| VisError::DataUnavailable("variable list missing".into()))?;
	Ok(VariablesReply::Ready(
		variables
			.iter()
			.map(|v| match v {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			})
			.collect(),
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	#[test]
	fn urls_follow_the_rest_layout() {
		let api = HttpDataSource::new("https://forvis.example/api/");
		assert_eq!(
			api.visualization_url(
				"12",
				"sat",
				&VariableSelection::from_list(vec!["1".into(), "4".into()])
			),
			"https://forvis.example/api/profile/visualization/12/sat/?selectedVariables=1,4"
		);
		assert_eq!(
			api.task_url("12", "maxsat_vis_tree"),
			"https://forvis.example/api/profile/task/maxsat_vis_tree/12/"
		);
		assert_eq!(
			api.variables_url("12", Family::MaxSat),
			"https://forvis.example/api/profile/file/max-sat/12/variables/"
		);
	}

	#[test]
	fn variable_replies() {
		assert_eq!(
			parse_variables(&json!({"content": {"data": {"message": "computing"}}})).unwrap(),
			VariablesReply::Pending("computing".into())
		);
		assert_eq!(
			parse_variables(&json!({"content": {"data": {"variables": [1, "x2"]}}})).unwrap(),
			VariablesReply::Ready(vec!["1".into(), "x2".into()])
		);
		assert!(matches!(parse_variables(&json!({})), Err(VisError::DataUnavailable(_))));
	}

	#[test]
	fn task_status_reads_ok() {
		let status: TaskStatus = serde_json::from_value(json!({"status": "ok", "message": "queued"})).unwrap();
		assert!(status.is_ok());
		let status: TaskStatus = serde_json::from_value(json!({"status": "not ok"})).unwrap();
		assert!(!status.is_ok());
	}
}
