//! Failure taxonomy for a single visualization session.

use thiserror::Error;

/// Everything that can go wrong while loading, laying out or exporting a
/// visualization. Failures never escape the session that produced them.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum VisError {
	/// The payload is missing or malformed for the requested kind.
	#[error("no data available: {0}")]
	DataUnavailable(String),
	/// The canvas a layout or export should use is not in the document.
	#[error("render surface `{0}` not found")]
	RenderSurfaceMissing(String),
	/// Network or backend failure.
	#[error("request failed: {0}")]
	Transport(String),
	/// A named heuristic dataset is absent from the payload.
	#[error("heuristic data not available: {0}")]
	HeuristicUnavailable(String),
	/// The primary layout has not settled yet.
	#[error("layout is still stabilizing")]
	NotReady,
	/// Image encoding failed.
	#[error("export failed: {0}")]
	Export(String),
}

impl VisError {
	/// Message shown to the user in the alert banner.
	pub fn user_message(&self) -> String {
		match self {
			VisError::Transport(_) => "An overload occurred during processing your file. \
			                           Please try again with other method or file."
				.to_string(),
			VisError::HeuristicUnavailable(_) => "Selected heuristic data not available".to_string(),
			VisError::RenderSurfaceMissing(_) => "Visualization container not found".to_string(),
			other => other.to_string(),
		}
	}
}

impl From<reqwest::Error> for VisError {
	fn from(err: reqwest::Error) -> Self {
		VisError::Transport(err.to_string())
	}
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VisError>;
