//! Cluster drill-down: sub-networks induced by a selected cluster or by an
//! edge between two clusters of the summary network.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use serde::Deserialize;

use super::dataset::{Edge, ElementId, GraphDataset, Node};
use crate::layout::{LayoutArena, LayoutHandle, LayoutOptions, Surface};

pub const IDLE_HINT: &str = "Click on a cluster or edge in the graph above to see its details here";
pub const EMPTY_CLUSTER: &str = "No nodes found in this cluster";
pub const EMPTY_CONNECTION: &str = "No connections found between these clusters";

/// What a deselection does to the drill-down surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeselectPolicy {
	/// Clear the label, keep the last sub-network on screen.
	#[default]
	KeepDrillDown,
	/// Clear the label and tear the sub-network down.
	ClearDrillDown,
}

/// Cluster ids arrive as integers on the summary network and as either
/// integers or strings on member nodes; compare them by their text.
fn cluster_key(id: &ElementId) -> String {
	id.to_string()
}

/// Members of one cluster in the whole network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterMembers {
	pub nodes: Vec<ElementId>,
	/// Positions of the intra-cluster edges in the whole network.
	pub edges: Vec<usize>,
}

/// `cluster -> {nodes, edges}` derived from a summary and a whole network.
#[derive(Clone, Debug, Default)]
pub struct ClusterIndex {
	members: BTreeMap<String, ClusterMembers>,
	cluster_of: HashMap<ElementId, String>,
}

impl ClusterIndex {
	pub fn build(clustered: &GraphDataset, whole: &GraphDataset) -> Self {
		let mut members: BTreeMap<String, ClusterMembers> = clustered
			.nodes
			.iter()
			.map(|n| (cluster_key(&n.id), ClusterMembers::default()))
			.collect();
		let mut cluster_of = HashMap::with_capacity(whole.nodes.len());
		for node in &whole.nodes {
			if let Some(cluster) = &node.cluster {
				let key = cluster_key(cluster);
				members.entry(key.clone()).or_default().nodes.push(node.id.clone());
				cluster_of.insert(node.id.clone(), key);
			}
		}
		for (i, edge) in whole.edges.iter().enumerate() {
			if let (Some(a), Some(b)) = (cluster_of.get(&edge.from), cluster_of.get(&edge.to)) {
				if a == b {
					if let Some(entry) = members.get_mut(a) {
						entry.edges.push(i);
					}
				}
			}
		}
		Self { members, cluster_of }
	}

	pub fn members(&self, cluster: &ElementId) -> Option<&ClusterMembers> {
		self.members.get(&cluster_key(cluster))
	}

	pub fn cluster_of(&self, node: &ElementId) -> Option<&str> {
		self.cluster_of.get(node).map(String::as_str)
	}

	pub fn cluster_count(&self) -> usize {
		self.members.len()
	}

	/// Every node of `cluster` plus the edges with both endpoints inside it.
	/// Members without intra-cluster edges are kept.
	pub fn subgraph(&self, cluster: &ElementId, whole: &GraphDataset) -> GraphDataset {
		let Some(members) = self.members(cluster) else {
			return GraphDataset::default();
		};
		let wanted: HashSet<&ElementId> = members.nodes.iter().collect();
		let nodes: Vec<Node> = whole
			.nodes
			.iter()
			.filter(|n| wanted.contains(&n.id))
			.cloned()
			.collect();
		let edges: Vec<Edge> = members
			.edges
			.iter()
			.filter_map(|&i| whole.edges.get(i).cloned())
			.collect();
		GraphDataset::from_parts(nodes, edges)
	}

	/// Edges of the whole network running between clusters `a` and `b` (either
	/// direction) and the nodes that take part in them. Members of `a` or `b`
	/// without such an edge are left out.
	pub fn edge_subgraph(&self, a: &ElementId, b: &ElementId, whole: &GraphDataset) -> GraphDataset {
		let (ka, kb) = (cluster_key(a), cluster_key(b));
		let edges: Vec<Edge> = whole
			.edges
			.iter()
			.filter(|e| match (self.cluster_of(&e.from), self.cluster_of(&e.to)) {
				(Some(cf), Some(ct)) => (cf == ka && ct == kb) || (cf == kb && ct == ka),
				_ => false,
			})
			.cloned()
			.collect();
		let involved: HashSet<&ElementId> = edges.iter().flat_map(|e| [&e.from, &e.to]).collect();
		let nodes: Vec<Node> = whole
			.nodes
			.iter()
			.filter(|n| involved.contains(&n.id))
			.cloned()
			.collect();
		GraphDataset::from_parts(nodes, edges)
	}
}

/// A user pick on the summary network.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
	Cluster(ElementId),
	/// Summary edge between two clusters.
	ClusterEdge { from: ElementId, to: ElementId },
	/// Click on empty canvas.
	Cleared,
}

impl Selection {
	pub fn label(&self) -> Option<String> {
		match self {
			Selection::Cluster(id) => Some(format!("Cluster {id}")),
			Selection::ClusterEdge { from, to } => {
				Some(format!("Connection between Cluster {from} and Cluster {to}"))
			}
			Selection::Cleared => None,
		}
	}
}

/// What the drill-down surface currently shows.
#[derive(Clone, Debug, PartialEq)]
pub enum DrillDownView {
	Idle,
	Empty(&'static str),
	Bound {
		handle: LayoutHandle,
		nodes: usize,
		edges: usize,
	},
}

/// Owns the drill-down selection state; engines live in the session's arena.
#[derive(Clone, Debug)]
pub struct DrillDownEngine {
	policy: DeselectPolicy,
	index: ClusterIndex,
	label: Option<String>,
	view: DrillDownView,
}

impl DrillDownEngine {
	pub fn new(policy: DeselectPolicy) -> Self {
		Self {
			policy,
			index: ClusterIndex::default(),
			label: None,
			view: DrillDownView::Idle,
		}
	}

	pub fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	pub fn view(&self) -> &DrillDownView {
		&self.view
	}

	pub fn policy(&self) -> DeselectPolicy {
		self.policy
	}

	/// Indexes the networks later selections are resolved against.
	pub fn index_networks(&mut self, clustered: &GraphDataset, whole: &GraphDataset) {
		self.index = ClusterIndex::build(clustered, whole);
		debug!("indexed {} clusters", self.index.cluster_count());
	}

	pub fn on_cluster_selected(&self, cluster: &ElementId, whole: &GraphDataset) -> GraphDataset {
		self.index.subgraph(cluster, whole)
	}

	pub fn on_cluster_edge_selected(&self, from: &ElementId, to: &ElementId, whole: &GraphDataset) -> GraphDataset {
		self.index.edge_subgraph(from, to, whole)
	}

	/// Replaces the current drill-down with the sub-network for `selection`.
	/// The previous drill-down engine is destroyed first; an empty result
	/// binds nothing and shows an explanatory message instead.
	pub fn select(&mut self, selection: &Selection, whole: &GraphDataset, arena: &mut LayoutArena) -> &DrillDownView {
		let (subgraph, empty_message) = match selection {
			Selection::Cluster(id) => (self.on_cluster_selected(id, whole), EMPTY_CLUSTER),
			Selection::ClusterEdge { from, to } => {
				(self.on_cluster_edge_selected(from, to, whole), EMPTY_CONNECTION)
			}
			Selection::Cleared => {
				self.deselect(arena);
				return &self.view;
			}
		};

		arena.destroy_surface(Surface::DrillDown);
		self.label = selection.label();
		self.view = if subgraph.is_empty() {
			info!("drill-down {selection:?} is empty");
			DrillDownView::Empty(empty_message)
		} else {
			let handle = arena.bind(Surface::DrillDown, &subgraph, LayoutOptions::drill_down());
			debug!(
				"drill-down {selection:?}: {} nodes, {} edges",
				subgraph.nodes.len(),
				subgraph.edges.len()
			);
			DrillDownView::Bound {
				handle,
				nodes: subgraph.nodes.len(),
				edges: subgraph.edges.len(),
			}
		};
		&self.view
	}

	pub fn deselect(&mut self, arena: &mut LayoutArena) {
		self.label = None;
		if self.policy == DeselectPolicy::ClearDrillDown {
			if let DrillDownView::Bound { handle, .. } = self.view {
				arena.destroy(handle);
			}
			self.view = DrillDownView::Idle;
		}
	}

	/// Drops everything, e.g. when the summary network is replaced.
	pub fn reset(&mut self, arena: &mut LayoutArena) {
		arena.destroy_surface(Surface::DrillDown);
		self.index = ClusterIndex::default();
		self.label = None;
		self.view = DrillDownView::Idle;
	}

	/// Text for the drill-down panel when no sub-network is drawn.
	pub fn message(&self) -> Option<&'static str> {
		match self.view {
			DrillDownView::Idle => Some(IDLE_HINT),
			DrillDownView::Empty(message) => Some(message),
			DrillDownView::Bound { .. } => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn ids(ds: &GraphDataset) -> Vec<String> {
		ds.nodes.iter().map(|n| n.id.to_string()).collect()
	}

	fn pairs(ds: &GraphDataset) -> Vec<(String, String)> {
		ds.edges.iter().map(|e| (e.from.to_string(), e.to.to_string())).collect()
	}

	fn pair(a: &str, b: &str) -> (String, String) {
		(a.to_string(), b.to_string())
	}

	/// Cluster 0 holds 1, 2, 3; cluster 1 holds 4, 5.
	fn whole() -> GraphDataset {
		GraphDataset::from_parts(
			vec![
				Node::new(1).in_cluster(0),
				Node::new(2).in_cluster(0),
				Node::new(3).in_cluster(0),
				Node::new(4).in_cluster(1),
				Node::new(5).in_cluster(1),
			],
			vec![Edge::new(1, 2), Edge::new(2, 3), Edge::new(1, 4), Edge::new(4, 5)],
		)
	}

	fn clustered() -> GraphDataset {
		GraphDataset::from_parts(
			vec![Node::new(0), Node::new(1), Node::new(2)],
			vec![Edge::new(0, 1).with_id("0_1")],
		)
	}

	fn indexed(policy: DeselectPolicy) -> DrillDownEngine {
		let mut drill = DrillDownEngine::new(policy);
		drill.index_networks(&clustered(), &whole());
		drill
	}

	#[test]
	fn cluster_selection_keeps_only_intra_cluster_edges() {
		let whole = GraphDataset::from_parts(
			vec![
				Node::new(1).in_cluster("C"),
				Node::new(2).in_cluster("C"),
				Node::new(3).in_cluster("C"),
				Node::new(4).in_cluster("D"),
			],
			vec![Edge::new(1, 2), Edge::new(2, 3), Edge::new(1, 4)],
		);
		let sub = ClusterIndex::build(&GraphDataset::default(), &whole).subgraph(&ElementId::from("C"), &whole);
		assert_eq!(ids(&sub), vec!["1", "2", "3"]);
		assert_eq!(pairs(&sub), vec![pair("1", "2"), pair("2", "3")]);
	}

	#[test]
	fn isolated_members_stay_in_their_cluster() {
		let whole = GraphDataset::from_parts(
			vec![Node::new(1).in_cluster(0), Node::new(2).in_cluster(0), Node::new(3).in_cluster(0)],
			vec![Edge::new(1, 2)],
		);
		let sub = ClusterIndex::build(&GraphDataset::default(), &whole).subgraph(&ElementId::Int(0), &whole);
		assert_eq!(sub.nodes.len(), 3);
		assert_eq!(sub.edges.len(), 1);
	}

	#[test]
	fn cluster_ids_match_across_int_and_text() {
		let whole = GraphDataset::from_parts(vec![Node::new(9).in_cluster("3")], vec![]);
		let index = ClusterIndex::build(&GraphDataset::default(), &whole);
		assert_eq!(index.subgraph(&ElementId::Int(3), &whole).nodes.len(), 1);
	}

	#[test]
	fn edge_selection_keeps_only_participating_nodes() {
		let sub = ClusterIndex::build(&clustered(), &whole()).edge_subgraph(&ElementId::Int(1), &ElementId::Int(0), &whole());
		assert_eq!(ids(&sub), vec!["1", "4"]);
		assert_eq!(pairs(&sub), vec![pair("1", "4")]);
	}

	#[test]
	fn index_groups_members_and_intra_edges() {
		let index = ClusterIndex::build(&clustered(), &whole());
		assert_eq!(index.cluster_count(), 3);
		let zero = index.members(&ElementId::Int(0)).unwrap();
		assert_eq!(zero.nodes, vec![ElementId::Int(1), ElementId::Int(2), ElementId::Int(3)]);
		assert_eq!(zero.edges, vec![0, 1]);
		assert_eq!(index.members(&ElementId::Int(2)), Some(&ClusterMembers::default()));
		assert_eq!(index.cluster_of(&ElementId::Int(5)), Some("1"));
	}

	#[test]
	fn empty_results_bind_nothing() {
		let mut arena = LayoutArena::new();
		let mut drill = indexed(DeselectPolicy::KeepDrillDown);
		let view = drill.select(&Selection::Cluster(ElementId::Int(2)), &whole(), &mut arena);
		assert_eq!(view, &DrillDownView::Empty(EMPTY_CLUSTER));
		assert_eq!(arena.live_count(), 0);
		assert_eq!(drill.label(), Some("Cluster 2"));

		let edge = Selection::ClusterEdge { from: ElementId::Int(0), to: ElementId::Int(2) };
		drill.select(&edge, &whole(), &mut arena);
		assert_eq!(drill.message(), Some(EMPTY_CONNECTION));
		assert_eq!(drill.label(), Some("Connection between Cluster 0 and Cluster 2"));
	}

	#[test]
	fn selections_replace_each_other() {
		let mut arena = LayoutArena::new();
		let mut drill = indexed(DeselectPolicy::KeepDrillDown);
		let first = match drill.select(&Selection::Cluster(ElementId::Int(0)), &whole(), &mut arena) {
			DrillDownView::Bound { handle, nodes, .. } => {
				assert_eq!(*nodes, 3);
				*handle
			}
			other => panic!("unexpected {other:?}"),
		};
		drill.select(&Selection::Cluster(ElementId::Int(1)), &whole(), &mut arena);
		assert!(!arena.is_live(first));
		assert_eq!(arena.live_count(), 1);
		assert_eq!(arena.on_surface(Surface::DrillDown).map(|e| e.node_count()), Some(2));
	}

	#[test]
	fn deselect_keeps_the_sub_network_by_default() {
		let mut arena = LayoutArena::new();
		let mut drill = indexed(DeselectPolicy::KeepDrillDown);
		drill.select(&Selection::Cluster(ElementId::Int(0)), &whole(), &mut arena);
		drill.select(&Selection::Cleared, &whole(), &mut arena);
		assert_eq!(drill.label(), None);
		assert!(matches!(drill.view(), DrillDownView::Bound { .. }));
		assert_eq!(arena.live_count(), 1);
	}

	#[test]
	fn deselect_can_clear_the_sub_network() {
		let mut arena = LayoutArena::new();
		let mut drill = indexed(DeselectPolicy::ClearDrillDown);
		drill.select(&Selection::Cluster(ElementId::Int(0)), &whole(), &mut arena);
		drill.deselect(&mut arena);
		assert_eq!(drill.label(), None);
		assert_eq!(drill.view(), &DrillDownView::Idle);
		assert_eq!(drill.message(), Some(IDLE_HINT));
		assert_eq!(arena.live_count(), 0);
	}

	#[test]
	fn reset_forgets_the_indexed_networks() {
		let mut arena = LayoutArena::new();
		let mut drill = indexed(DeselectPolicy::KeepDrillDown);
		drill.reset(&mut arena);
		let view = drill.select(&Selection::Cluster(ElementId::Int(0)), &whole(), &mut arena);
		assert_eq!(view, &DrillDownView::Empty(EMPTY_CLUSTER));
	}
}
