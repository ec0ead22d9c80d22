use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node, edge or cluster identity. The server ships both integers and strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
	Int(i64),
	Text(String),
}

impl fmt::Display for ElementId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ElementId::Int(v) => write!(f, "{v}"),
			ElementId::Text(v) => f.write_str(v),
		}
	}
}

impl From<i64> for ElementId {
	fn from(value: i64) -> Self {
		ElementId::Int(value)
	}
}

impl From<&str> for ElementId {
	fn from(value: &str) -> Self {
		ElementId::Text(value.to_string())
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<f64>,
	#[serde(flatten)]
	pub rest: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	pub id: ElementId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Membership used by drill-down; absent for non-clustered kinds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cluster: Option<ElementId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub font: Option<Font>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<Value>,
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl Node {
	pub fn new(id: impl Into<ElementId>) -> Self {
		Self {
			id: id.into(),
			label: None,
			cluster: None,
			font: None,
			x: None,
			y: None,
			size: None,
			color: None,
			attrs: Map::new(),
		}
	}

	pub fn in_cluster(mut self, cluster: impl Into<ElementId>) -> Self {
		self.cluster = Some(cluster.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Fill colour as either `"#rrggbb"` or `{ background: "#rrggbb" }`.
	pub fn fill_color(&self) -> Option<&str> {
		color_str(self.color.as_ref()?, "background")
	}

	pub fn font_size(&self) -> Option<f64> {
		self.font.as_ref().and_then(|f| f.size)
	}

	/// Raises an unreadable font size (< 1) to `floor`. Absent fonts and
	/// absent sizes are left alone.
	pub fn correct_font(&mut self, floor: f64) -> bool {
		match self.font.as_mut() {
			Some(Font { size: Some(size), .. }) if *size < 1.0 => {
				*size = floor;
				true
			}
			_ => false,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<ElementId>,
	pub from: ElementId,
	pub to: ElementId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<f64>,
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl Edge {
	pub fn new(from: impl Into<ElementId>, to: impl Into<ElementId>) -> Self {
		Self {
			id: None,
			from: from.into(),
			to: to.into(),
			color: None,
			width: None,
			attrs: Map::new(),
		}
	}

	pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Stroke colour as either `"#rrggbb"` or `{ color: "#rrggbb" }`.
	pub fn stroke_color(&self) -> Option<&str> {
		color_str(self.color.as_ref()?, "color")
	}

	/// Undirected endpoint match.
	pub fn connects(&self, a: &ElementId, b: &ElementId) -> bool {
		(&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
	}
}

fn color_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
	match value {
		Value::String(s) => Some(s),
		Value::Object(map) => map.get(key).and_then(Value::as_str),
		_ => None,
	}
}

/// Nodes with unique ids and edges whose endpoints resolve within the set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDataset {
	#[serde(default)]
	pub nodes: Vec<Node>,
	#[serde(default)]
	pub edges: Vec<Edge>,
}

impl GraphDataset {
	/// Builds a dataset, enforcing unique ids and resolvable edge endpoints.
	pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
		let mut dataset = Self { nodes, edges };
		dataset.dedupe_nodes();
		dataset.prune_dangling_edges();
		dataset
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node(&self, id: &ElementId) -> Option<&Node> {
		self.nodes.iter().find(|n| &n.id == id)
	}

	pub fn contains(&self, id: &ElementId) -> bool {
		self.node(id).is_some()
	}

	/// Keeps the first node for every id.
	pub fn dedupe_nodes(&mut self) -> usize {
		let before = self.nodes.len();
		let mut seen = HashSet::with_capacity(before);
		self.nodes.retain(|n| seen.insert(n.id.clone()));
		let dropped = before - self.nodes.len();
		if dropped > 0 {
			debug!("dropped {dropped} duplicate node ids");
		}
		dropped
	}

	/// Drops edges with an endpoint outside the node set.
	pub fn prune_dangling_edges(&mut self) -> usize {
		let ids: HashSet<&ElementId> = self.nodes.iter().map(|n| &n.id).collect();
		let before = self.edges.len();
		self.edges
			.retain(|e| ids.contains(&e.from) && ids.contains(&e.to));
		let dropped = before - self.edges.len();
		if dropped > 0 {
			debug!("dropped {dropped} edges with unresolved endpoints");
		}
		dropped
	}

	pub fn correct_fonts(&mut self, floor: f64) -> usize {
		self.nodes
			.iter_mut()
			.map(|n| n.correct_font(floor))
			.filter(|changed| *changed)
			.count()
	}

	/// Enforces the dataset invariants and the legibility floor. Idempotent.
	pub fn normalized(mut self, font_floor: f64) -> Self {
		self.dedupe_nodes();
		self.prune_dangling_edges();
		self.correct_fonts(font_floor);
		self
	}

	pub fn endpoints_resolve(&self) -> bool {
		let ids: HashSet<&ElementId> = self.nodes.iter().map(|n| &n.id).collect();
		self.edges
			.iter()
			.all(|e| ids.contains(&e.from) && ids.contains(&e.to))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn dataset_from(value: Value) -> GraphDataset {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn ids_accept_integers_and_strings() {
		let ds = dataset_from(json!({
			"nodes": [{"id": 1}, {"id": "x1", "label": "x1"}],
			"edges": [{"from": 1, "to": "x1"}]
		}));
		assert_eq!(ds.nodes[0].id, ElementId::Int(1));
		assert_eq!(ds.nodes[1].id, ElementId::from("x1"));
		assert!(ds.endpoints_resolve());
	}

	#[test]
	fn dangling_edges_are_dropped() {
		let ds = GraphDataset::from_parts(
			vec![Node::new(1), Node::new(2)],
			vec![Edge::new(1, 2), Edge::new(2, 9), Edge::new(7, 1)],
		);
		assert_eq!(ds.edges, vec![Edge::new(1, 2)]);
		assert!(ds.endpoints_resolve());
	}

	#[test]
	fn duplicate_ids_keep_the_first_node() {
		let ds = GraphDataset::from_parts(
			vec![Node::new(1).with_label("a"), Node::new(1).with_label("b")],
			vec![],
		);
		assert_eq!(ds.nodes.len(), 1);
		assert_eq!(ds.nodes[0].label.as_deref(), Some("a"));
	}

	#[test]
	fn font_floor_only_touches_tiny_sizes() {
		let mut ds = dataset_from(json!({
			"nodes": [
				{"id": 1, "font": {"size": 0.2, "face": "Tahoma"}},
				{"id": 2, "font": {"size": 8}},
				{"id": 3, "font": {"face": "Tahoma"}},
				{"id": 4}
			]
		}));
		assert_eq!(ds.correct_fonts(12.0), 1);
		assert_eq!(ds.nodes[0].font_size(), Some(12.0));
		assert_eq!(ds.nodes[0].font.as_ref().unwrap().rest["face"], json!("Tahoma"));
		assert_eq!(ds.nodes[1].font_size(), Some(8.0));
		assert_eq!(ds.nodes[2].font_size(), None);
	}

	#[test]
	fn normalization_is_idempotent() {
		let raw = GraphDataset {
			nodes: vec![
				Node {
					font: Some(Font { size: Some(0.0), rest: Map::new() }),
					..Node::new(1)
				},
				Node::new(2),
				Node::new(2),
			],
			edges: vec![Edge::new(1, 2), Edge::new(2, 3)],
		};
		let once = raw.normalized(1.0);
		let twice = once.clone().normalized(1.0);
		assert_eq!(once, twice);
	}

	#[test]
	fn colors_read_both_shapes() {
		let ds = dataset_from(json!({
			"nodes": [{"id": 1, "color": {"background": "#ff0000"}}, {"id": 2, "color": "#00ff00"}],
			"edges": [{"from": 1, "to": 2, "color": {"color": "#888888", "opacity": 1}}]
		}));
		assert_eq!(ds.nodes[0].fill_color(), Some("#ff0000"));
		assert_eq!(ds.nodes[1].fill_color(), Some("#00ff00"));
		assert_eq!(ds.edges[0].stroke_color(), Some("#888888"));
	}
}
