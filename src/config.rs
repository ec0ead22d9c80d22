//! Application configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::graph::drilldown::DeselectPolicy;

const DEFAULT_API_BASE: &str = "/api";

/// Runtime settings shared through Leptos context.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub api_base: String,
	pub variable_poll_interval_ms: u64,
	pub variable_poll_attempts: u32,
	pub deselect_policy: DeselectPolicy,
	pub alert_timeout_ms: u32,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base: DEFAULT_API_BASE.to_string(),
			variable_poll_interval_ms: 1000,
			variable_poll_attempts: 30,
			deselect_policy: DeselectPolicy::KeepDrillDown,
			alert_timeout_ms: 5000,
		}
	}
}

impl AppConfig {
	/// Defaults with the build-time `FORVIS_API_BASE` override applied.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Some(base) = option_env!("FORVIS_API_BASE") {
			config.api_base = base.trim_end_matches('/').to_string();
		}
		config
	}

	pub fn variable_poll_interval(&self) -> Duration {
		Duration::from_millis(self.variable_poll_interval_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config: AppConfig =
			serde_json::from_str(r#"{"api_base":"https://forvis.example/api","deselect_policy":"clear_drill_down"}"#)
				.unwrap();
		assert_eq!(config.api_base, "https://forvis.example/api");
		assert_eq!(config.deselect_policy, DeselectPolicy::ClearDrillDown);
		assert_eq!(config.variable_poll_attempts, 30);
		assert_eq!(config.variable_poll_interval(), Duration::from_secs(1));
	}
}
