use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Formula family a stored file belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
	Sat,
	MaxSat,
}

impl Family {
	/// Segment used by visualization and task urls (`sat`, `maxsat`).
	pub fn as_str(self) -> &'static str {
		match self {
			Family::Sat => "sat",
			Family::MaxSat => "maxsat",
		}
	}

	/// Segment used by the stored-file endpoints (`sat`, `max-sat`).
	pub fn file_segment(self) -> &'static str {
		match self {
			Family::Sat => "sat",
			Family::MaxSat => "max-sat",
		}
	}
}

impl FromStr for Family {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sat" => Ok(Family::Sat),
			"maxsat" | "max-sat" | "max_sat" => Ok(Family::MaxSat),
			other => Err(format!("unknown formula family `{other}`")),
		}
	}
}

/// Every visualization the server can produce. Each variant implies the
/// payload schema the adapter expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualizationKind {
	SatFactor,
	SatInteraction,
	Matrix,
	Tree,
	Cluster,
	Resolution,
	Distribution,
	Directed,
	Dpll,
	Heatmap,
	Community,
	TwoClause,
	Raw,
}

/// Broad rendering strategy for a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presentation {
	Graph,
	Chart,
	Table,
	Text,
}

impl VisualizationKind {
	pub const ALL: [VisualizationKind; 13] = [
		VisualizationKind::SatFactor,
		VisualizationKind::SatInteraction,
		VisualizationKind::Matrix,
		VisualizationKind::Tree,
		VisualizationKind::Cluster,
		VisualizationKind::Resolution,
		VisualizationKind::Distribution,
		VisualizationKind::Directed,
		VisualizationKind::Dpll,
		VisualizationKind::Heatmap,
		VisualizationKind::Community,
		VisualizationKind::TwoClause,
		VisualizationKind::Raw,
	];

	/// Route / task segment, e.g. `vis_cluster`.
	pub fn slug(self) -> &'static str {
		match self {
			VisualizationKind::SatFactor => "vis_factor",
			VisualizationKind::SatInteraction => "vis_interaction",
			VisualizationKind::Matrix => "vis_matrix",
			VisualizationKind::Tree => "vis_tree",
			VisualizationKind::Cluster => "vis_cluster",
			VisualizationKind::Resolution => "vis_resolution",
			VisualizationKind::Distribution => "vis_distribution",
			VisualizationKind::Directed => "vis_directed",
			VisualizationKind::Dpll => "vis_dpll",
			VisualizationKind::Heatmap => "vis_heatmap",
			VisualizationKind::Community => "vis_community",
			VisualizationKind::TwoClause => "vis_2clause",
			VisualizationKind::Raw => "raw",
		}
	}

	pub fn title(self) -> &'static str {
		match self {
			VisualizationKind::SatFactor => "Factor graph",
			VisualizationKind::SatInteraction => "Interaction graph",
			VisualizationKind::Matrix => "Dependency matrix",
			VisualizationKind::Tree => "Tree",
			VisualizationKind::Cluster => "Clustered interaction graph",
			VisualizationKind::Resolution => "Resolution graph",
			VisualizationKind::Distribution => "Variable distribution",
			VisualizationKind::Directed => "Directed graphical model",
			VisualizationKind::Dpll => "DPLL solver",
			VisualizationKind::Heatmap => "Heatmap",
			VisualizationKind::Community => "Community graph",
			VisualizationKind::TwoClause => "2-clause graph",
			VisualizationKind::Raw => "Raw formula",
		}
	}

	pub fn presentation(self) -> Presentation {
		match self {
			VisualizationKind::Distribution | VisualizationKind::Heatmap => Presentation::Chart,
			VisualizationKind::Matrix => Presentation::Table,
			VisualizationKind::Raw => Presentation::Text,
			_ => Presentation::Graph,
		}
	}

	/// Smallest readable font size for node labels of this kind.
	pub fn font_floor(self) -> f64 {
		match self {
			VisualizationKind::Cluster => CLUSTER_SUMMARY_FONT_FLOOR,
			_ => 1.0,
		}
	}

	/// Task name for scheduling, e.g. `sat_vis_cluster`; `raw` is unprefixed.
	pub fn task_name(self, family: Family) -> String {
		match self {
			VisualizationKind::Raw => self.slug().to_string(),
			_ => format!("{}_{}", family.as_str(), self.slug()),
		}
	}

	/// Kinds a family can schedule.
	pub fn schedulable(family: Family) -> Vec<VisualizationKind> {
		VisualizationKind::ALL
			.into_iter()
			.filter(|kind| match family {
				Family::Sat => *kind != VisualizationKind::Community,
				Family::MaxSat => matches!(
					kind,
					VisualizationKind::SatFactor
						| VisualizationKind::SatInteraction
						| VisualizationKind::Matrix
						| VisualizationKind::Tree
						| VisualizationKind::Cluster
						| VisualizationKind::Resolution
						| VisualizationKind::Raw
				),
			})
			.collect()
	}
}

/// Font floor for the cluster summary network.
pub const CLUSTER_SUMMARY_FONT_FLOOR: f64 = 14.0;
/// Font floor for the whole (detail) network behind a cluster view.
pub const WHOLE_NETWORK_FONT_FLOOR: f64 = 12.0;

impl fmt::Display for VisualizationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.slug())
	}
}

impl FromStr for VisualizationKind {
	type Err = String;

	/// Accepts `vis_cluster`, `visualization-vis_cluster`, `sat_vis_cluster`
	/// and the dashed variants used by some routes (`vis-heatmap`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s
			.trim_start_matches("visualization-")
			.trim_start_matches("maxsat_")
			.trim_start_matches("sat_")
			.replace('-', "_");
		VisualizationKind::ALL
			.into_iter()
			.find(|kind| kind.slug() == normalized)
			.ok_or_else(|| format!("unknown visualization kind `{s}`"))
	}
}
