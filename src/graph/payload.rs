//! Turns the per-kind server payloads into typed, normalized data.
//!
//! Every [`VisualizationKind`] owns one schema; [`normalize`] matches on the
//! kind and deserializes exactly that schema instead of probing fields.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::dataset::{Edge, ElementId, GraphDataset, Node};
use super::filter::{DistributionSeries, Heuristic, HeuristicSets};
use super::kind::{CLUSTER_SUMMARY_FONT_FLOOR, VisualizationKind, WHOLE_NETWORK_FONT_FLOOR};
use super::matrix::DependencyMatrix;

/// A single node/edge network plus the variables it was computed for.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphPayload {
	pub dataset: GraphDataset,
	pub variables: Option<Vec<String>>,
}

/// Summary network (one node per cluster) and the detail network behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusteredPayload {
	pub clustered: GraphDataset,
	pub whole: GraphDataset,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DistributionPayload {
	pub series: DistributionSeries,
	/// Split `p cnf <variables> <clauses>` line.
	pub info: Vec<String>,
}

impl DistributionPayload {
	/// Variable count from the problem line, or the label count without one.
	pub fn variable_count(&self) -> usize {
		self.info
			.get(2)
			.and_then(|v| v.trim().parse().ok())
			.unwrap_or(self.series.len())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
	pub x: f64,
	pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterSeries {
	#[serde(default)]
	pub label: String,
	#[serde(default)]
	pub data: Vec<ScatterPoint>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub background_color: Option<String>,
}

/// Normalized content, one variant per payload shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Visualization {
	Graph(GraphPayload),
	Clustered(ClusteredPayload),
	Heuristics(HeuristicSets),
	Distribution(DistributionPayload),
	Scatter(Vec<ScatterSeries>),
	Matrix(DependencyMatrix),
	Raw(String),
}

/// Adapter result: usable content, or an explanation for an empty state.
#[derive(Clone, Debug, PartialEq)]
pub enum Normalized {
	Ready(Visualization),
	NoData(String),
}

#[derive(Deserialize, Serialize)]
struct GraphContent {
	nodes: Vec<Node>,
	#[serde(default)]
	edges: Vec<Edge>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	variables: Option<Vec<ElementId>>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterContent {
	clustered_network: GraphDataset,
	whole_network: GraphDataset,
}

#[derive(Deserialize)]
struct DistributionContent {
	labels: Vec<ElementId>,
	positive: Vec<u64>,
	negative: Vec<u64>,
	#[serde(default)]
	info: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ScatterContent {
	#[serde(default)]
	datasets: Vec<ScatterSeries>,
}

#[derive(Deserialize)]
struct RawContent {
	raw: String,
}

const MISSING_CONTENT: &str = "Invalid data structure or missing content.";

/// Normalizes `raw` (the whole response body) for `kind`.
///
/// Dangling edges are dropped, duplicate node ids collapse to the first
/// occurrence and unreadable font sizes are raised to the kind's floor.
/// Applying it to its own output via [`Visualization::to_payload`] is a no-op.
pub fn normalize(raw: &Value, kind: VisualizationKind) -> Normalized {
	if let Some(message) = error_message(raw) {
		return Normalized::NoData(message);
	}
	let content = match (kind, raw.get("content")) {
		(VisualizationKind::Heatmap, _) if raw.get("datasets").is_some() => raw,
		(_, Some(content)) if !content.is_null() => content,
		_ => return Normalized::NoData(MISSING_CONTENT.into()),
	};
	if let Some(message) = error_message(content) {
		return Normalized::NoData(message);
	}

	let normalized = match kind {
		VisualizationKind::Cluster => parse::<ClusterContent>(content).map(|c| {
			Visualization::Clustered(ClusteredPayload {
				clustered: c.clustered_network.normalized(CLUSTER_SUMMARY_FONT_FLOOR),
				whole: c.whole_network.normalized(WHOLE_NETWORK_FONT_FLOOR),
			})
		}),
		VisualizationKind::Dpll => parse_heuristics(content, kind.font_floor()),
		VisualizationKind::Distribution => parse::<DistributionContent>(content).map(distribution),
		VisualizationKind::Heatmap => parse::<ScatterContent>(content).and_then(|c| {
			if c.datasets.is_empty() {
				Err("No data available for heatmap visualization.".into())
			} else {
				Ok(Visualization::Scatter(c.datasets))
			}
		}),
		VisualizationKind::Matrix => parse::<DependencyMatrix>(content).map(Visualization::Matrix),
		VisualizationKind::Raw => parse::<RawContent>(content).map(|c| Visualization::Raw(c.raw)),
		_ => parse::<GraphContent>(content).map(|c| {
			Visualization::Graph(GraphPayload {
				dataset: GraphDataset {
					nodes: c.nodes,
					edges: c.edges,
				}
				.normalized(kind.font_floor()),
				variables: c
					.variables
					.map(|vars| vars.iter().map(ElementId::to_string).collect()),
			})
		}),
	};

	match normalized {
		Ok(vis) => {
			debug!("normalized {kind} payload");
			Normalized::Ready(vis)
		}
		Err(message) => {
			warn!("{kind} payload rejected: {message}");
			Normalized::NoData(message)
		}
	}
}

fn error_message(value: &Value) -> Option<String> {
	match value.get("error")? {
		Value::Null => None,
		Value::String(s) => Some(s.clone()),
		other => Some(other.to_string()),
	}
}

fn parse<T: for<'de> Deserialize<'de>>(content: &Value) -> Result<T, String> {
	T::deserialize(content).map_err(|e| {
		debug!("payload schema mismatch: {e}");
		MISSING_CONTENT.to_string()
	})
}

fn parse_heuristics(content: &Value, font_floor: f64) -> Result<Visualization, String> {
	let mut sets = HeuristicSets::new();
	for heuristic in Heuristic::ALL {
		let nodes = content.get(format!("{}_nodes", heuristic.key()));
		let edges = content.get(format!("{}_edges", heuristic.key()));
		let (Some(nodes), Some(edges)) = (nodes, edges) else {
			continue;
		};
		let nodes: Vec<Node> = parse(nodes)?;
		let edges: Vec<Edge> = parse(edges)?;
		sets.insert(
			heuristic,
			GraphDataset { nodes, edges }.normalized(font_floor),
		);
	}
	Ok(Visualization::Heuristics(sets))
}

fn distribution(c: DistributionContent) -> Visualization {
	// the server may ship one label fewer than it has counts
	let len = c.labels.len().min(c.positive.len()).min(c.negative.len());
	let mut labels: Vec<String> = c.labels.iter().map(ElementId::to_string).collect();
	let (mut positive, mut negative) = (c.positive, c.negative);
	labels.truncate(len);
	positive.truncate(len);
	negative.truncate(len);
	Visualization::Distribution(DistributionPayload {
		series: DistributionSeries::new(labels, positive, negative),
		info: c
			.info
			.unwrap_or_default()
			.into_iter()
			.map(|s| s.replace('\n', ""))
			.collect(),
	})
}

impl Visualization {
	/// Response body that [`normalize`] maps back onto `self`.
	pub fn to_payload(&self) -> Value {
		let content = match self {
			Visualization::Graph(g) => json!({
				"nodes": g.dataset.nodes,
				"edges": g.dataset.edges,
				"variables": g.variables,
			}),
			Visualization::Clustered(c) => json!({
				"clusteredNetwork": c.clustered,
				"wholeNetwork": c.whole,
			}),
			Visualization::Heuristics(sets) => {
				let mut map = serde_json::Map::new();
				for (heuristic, dataset) in sets {
					map.insert(format!("{}_nodes", heuristic.key()), json!(dataset.nodes));
					map.insert(format!("{}_edges", heuristic.key()), json!(dataset.edges));
				}
				Value::Object(map)
			}
			Visualization::Distribution(d) => json!({
				"labels": d.series.labels,
				"positive": d.series.positive.clone().unwrap_or_default(),
				"negative": d.series.negative.clone().unwrap_or_default(),
				"info": d.info,
			}),
			Visualization::Scatter(datasets) => json!({ "datasets": datasets }),
			Visualization::Matrix(m) => json!(m),
			Visualization::Raw(text) => json!({ "raw": text }),
		};
		json!({ "content": content })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn ready(raw: &Value, kind: VisualizationKind) -> Visualization {
		match normalize(raw, kind) {
			Normalized::Ready(vis) => vis,
			Normalized::NoData(msg) => panic!("expected data, got `{msg}`"),
		}
	}

	fn cluster_payload() -> Value {
		json!({"content": {
			"clusteredNetwork": {
				"nodes": [{"id": 0, "label": "Cluster 0", "font": {"size": 0}}, {"id": 1}],
				"edges": [{"id": "0_1", "from": 0, "to": 1}]
			},
			"wholeNetwork": {
				"nodes": [
					{"id": 1, "cluster": 0, "font": {"size": 0.5}},
					{"id": 2, "cluster": 0},
					{"id": 3, "cluster": 1}
				],
				"edges": [{"from": 1, "to": 2}, {"from": 2, "to": 3}, {"from": 3, "to": 44}]
			}
		}})
	}

	#[test]
	fn missing_content_is_no_data() {
		assert_eq!(
			normalize(&json!({}), VisualizationKind::SatInteraction),
			Normalized::NoData(MISSING_CONTENT.into())
		);
		assert_eq!(
			normalize(&json!({"content": {"edges": []}}), VisualizationKind::SatFactor),
			Normalized::NoData(MISSING_CONTENT.into())
		);
	}

	#[test]
	fn server_errors_become_no_data() {
		let raw = json!({"content": {"error": "Empty or malformed file. No heatmap generated."}});
		assert_eq!(
			normalize(&raw, VisualizationKind::Heatmap),
			Normalized::NoData("Empty or malformed file. No heatmap generated.".into())
		);
	}

	#[test]
	fn cluster_payload_uses_two_font_floors() {
		let Visualization::Clustered(c) = ready(&cluster_payload(), VisualizationKind::Cluster) else {
			panic!("expected clustered payload");
		};
		assert_eq!(c.clustered.nodes[0].font_size(), Some(14.0));
		assert_eq!(c.whole.nodes[0].font_size(), Some(12.0));
		assert_eq!(c.whole.edges.len(), 2);
		assert!(c.whole.endpoints_resolve());
	}

	#[test]
	fn normalizing_normalized_output_is_identity() {
		for (raw, kind) in [
			(cluster_payload(), VisualizationKind::Cluster),
			(
				json!({"content": {
					"nodes": [{"id": "a", "font": {"size": 0.1}}, {"id": "b"}],
					"edges": [{"from": "a", "to": "b"}, {"from": "a", "to": "zz"}],
					"variables": [1, 2]
				}}),
				VisualizationKind::Resolution,
			),
			(
				json!({"content": {
					"moms_nodes": [{"id": 1, "font": {"size": 0}}], "moms_edges": [],
					"jw_nodes": [{"id": 1}, {"id": 2}], "jw_edges": [{"from": 1, "to": 2}]
				}}),
				VisualizationKind::Dpll,
			),
		] {
			let once = ready(&raw, kind);
			let twice = ready(&once.to_payload(), kind);
			assert_eq!(once, twice);
		}
	}

	#[test]
	fn resolution_variables_are_strings() {
		let raw = json!({"content": {"nodes": [{"id": 1}], "edges": [], "variables": [3, "x4"]}});
		let Visualization::Graph(g) = ready(&raw, VisualizationKind::Resolution) else {
			panic!("expected graph payload");
		};
		assert_eq!(g.variables, Some(vec!["3".to_string(), "x4".to_string()]));
	}

	#[test]
	fn dpll_collects_only_present_heuristics() {
		let raw = json!({"content": {
			"moms_nodes": [{"id": 1}], "moms_edges": [],
			"dlis_nodes": [{"id": 2}]
		}});
		let Visualization::Heuristics(sets) = ready(&raw, VisualizationKind::Dpll) else {
			panic!("expected heuristics");
		};
		assert_eq!(sets.keys().copied().collect::<Vec<_>>(), vec![Heuristic::Moms]);
	}

	#[test]
	fn distribution_trims_to_the_shortest_column() {
		let raw = json!({"content": {
			"labels": ["1", "2"],
			"positive": [1, 0, 4],
			"negative": [0, 2, 1],
			"info": ["p", "cnf", "3", "5\n"]
		}});
		let Visualization::Distribution(d) = ready(&raw, VisualizationKind::Distribution) else {
			panic!("expected distribution");
		};
		assert_eq!(d.series.len(), 2);
		assert_eq!(d.series.positive, Some(vec![1, 0]));
		assert_eq!(d.variable_count(), 3);
	}

	#[test]
	fn heatmap_accepts_top_level_datasets() {
		let raw = json!({"datasets": [{"label": "[0, 1]", "data": [{"x": 0, "y": 1}], "backgroundColor": "#000004"}]});
		let Visualization::Scatter(series) = ready(&raw, VisualizationKind::Heatmap) else {
			panic!("expected scatter");
		};
		assert_eq!(series[0].background_color.as_deref(), Some("#000004"));
		assert_eq!(
			normalize(&json!({"content": {"datasets": []}}), VisualizationKind::Heatmap),
			Normalized::NoData("No data available for heatmap visualization.".into())
		);
	}

	#[test]
	fn matrix_and_raw_payloads() {
		let raw = json!({"content": {
			"labels": ["0", "1"],
			"rows": [
				{"dependencies": [{"positive": -1, "negative": -1}, {"positive": 2, "negative": 0}]},
				{"dependencies": [{"positive": 0, "negative": 1}, {"positive": -1, "negative": -1}]}
			]
		}});
		let Visualization::Matrix(m) = ready(&raw, VisualizationKind::Matrix) else {
			panic!("expected matrix");
		};
		assert_eq!(m.rows[0].dependencies[1].positive, 2);
		assert_eq!(
			ready(&json!({"content": {"raw": "p cnf 1 1\n1 0"}}), VisualizationKind::Raw),
			Visualization::Raw("p cnf 1 1\n1 0".into())
		);
	}
}
