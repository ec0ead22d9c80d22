use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, trace};

use super::stabilization::{LayoutEvent, StabilizationController, StabilizationStatus};
use crate::graph::dataset::{ElementId, GraphDataset, Node};
use crate::graph::kind::VisualizationKind;

/// Categorical palette for nodes and series without a colour of their own.
pub const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
const EDGE_HIT_TOLERANCE: f64 = 4.0;
const DEFAULT_EDGE_COLOR: &str = "#888888";
const SPIRAL_SPACING: f64 = 30.0;
const GOLDEN_ANGLE: f64 = PI * 0.763_932;

/// Physics knobs recognized per visualization kind.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
	/// Run the simulation at all; a disabled layout keeps the payload's
	/// coordinates and is settled as soon as it is bound.
	pub enabled: bool,
	/// 0 disables overlap resolution, 1 keeps node discs fully apart.
	pub avoid_overlap: f32,
	/// Fraction of a node's distance to the origin pulled back per unit time.
	pub central_gravity: f32,
	/// Largest displacement a node may make in one tick.
	pub max_velocity: f32,
	/// Largest per-tick displacement still considered at rest.
	pub min_velocity: f32,
	pub timestep: f32,
	pub stabilization_iterations: u32,
	/// Stop iterating once the initial budget is spent.
	pub freeze_after_stabilization: bool,
	pub node_radius: f64,
	pub directed: bool,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			enabled: true,
			avoid_overlap: 0.0,
			central_gravity: 0.3,
			max_velocity: 12.0,
			min_velocity: 0.05,
			timestep: 0.016,
			stabilization_iterations: 1000,
			freeze_after_stabilization: false,
			node_radius: NODE_RADIUS,
			directed: false,
		}
	}
}

impl LayoutOptions {
	pub fn for_kind(kind: VisualizationKind) -> Self {
		let base = Self::default();
		match kind {
			VisualizationKind::SatInteraction | VisualizationKind::Dpll | VisualizationKind::TwoClause => {
				Self {
					avoid_overlap: 1.0,
					..base
				}
			}
			VisualizationKind::Community => Self {
				avoid_overlap: 1.0,
				central_gravity: 1.05,
				..base
			},
			// many variables: pull harder and slow down
			VisualizationKind::Resolution => Self {
				avoid_overlap: 1.0,
				central_gravity: 3.0,
				max_velocity: 6.0,
				timestep: 0.01,
				..base
			},
			VisualizationKind::Directed | VisualizationKind::Tree => Self {
				directed: true,
				..base
			},
			VisualizationKind::Cluster => Self::cluster_summary(),
			_ => base,
		}
	}

	/// The cluster overview ships server coordinates and stays put.
	pub fn cluster_summary() -> Self {
		Self {
			enabled: false,
			node_radius: NODE_RADIUS * 3.0,
			..Self::default()
		}
	}

	/// Sub-networks opened from a cluster view settle quickly, then freeze.
	pub fn drill_down() -> Self {
		Self {
			stabilization_iterations: 100,
			freeze_after_stabilization: true,
			..Self::default()
		}
	}
}

/// Screen placement of graph space: `screen = graph * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// What lies under a pointer position.
#[derive(Clone, Debug, PartialEq)]
pub enum Pick {
	Node(ElementId),
	/// Dataset position of the edge.
	Edge(usize),
	Nothing,
}

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Position of the node in the bound dataset.
	pub slot: usize,
	pub label: Option<String>,
	pub color: String,
	pub radius: f64,
	pub font_size: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct EdgeInfo {
	pub from: DefaultNodeIdx,
	pub to: DefaultNodeIdx,
	pub color: String,
	/// Position of the edge in the bound dataset.
	pub slot: usize,
}

/// One force-directed simulation over a bound dataset.
pub struct LayoutEngine {
	graph: ForceGraph<NodeInfo, ()>,
	ids: Vec<ElementId>,
	index_of: HashMap<ElementId, DefaultNodeIdx>,
	edges: Vec<EdgeInfo>,
	options: LayoutOptions,
	controller: StabilizationController,
	running: bool,
	iterations: u32,
	iterations_reported: bool,
	revision: u64,
}

impl LayoutEngine {
	pub fn create(dataset: &GraphDataset, options: LayoutOptions) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let (ids, index_of, edges) = populate(&mut graph, dataset, &options, &HashMap::new());

		let mut engine = Self {
			graph,
			ids,
			index_of,
			edges,
			options,
			controller: StabilizationController::new(),
			running: false,
			iterations: 0,
			iterations_reported: false,
			revision: 0,
		};
		if engine.options.enabled {
			engine.start_simulation();
		} else {
			engine.emit(LayoutEvent::IterationsDone);
			engine.emit(LayoutEvent::Stabilized);
		}
		debug!(
			"layout bound: {} nodes, {} edges, physics {}",
			engine.ids.len(),
			engine.edges.len(),
			if engine.options.enabled { "on" } else { "off" }
		);
		engine
	}

	pub fn options(&self) -> &LayoutOptions {
		&self.options
	}

	pub fn status(&self) -> StabilizationStatus {
		self.controller.status()
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn iterations(&self) -> u32 {
		self.iterations
	}

	/// Bumped whenever the bound dataset is replaced in place.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn node_count(&self) -> usize {
		self.ids.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	pub fn start_simulation(&mut self) -> Vec<LayoutEvent> {
		if self.running {
			return Vec::new();
		}
		self.running = true;
		self.emit(LayoutEvent::StartStabilizing);
		vec![LayoutEvent::StartStabilizing]
	}

	/// Halts the simulation and returns the transform framing the layout on
	/// a `width` x `height` surface.
	pub fn stop_simulation(&mut self, width: f64, height: f64) -> ViewTransform {
		if self.running {
			self.running = false;
			self.emit(LayoutEvent::Stabilized);
		}
		self.fit(width, height)
	}

	/// Advances the simulation by one timestep.
	pub fn tick(&mut self) -> Vec<LayoutEvent> {
		if !self.running {
			return Vec::new();
		}
		let before = self.positions();
		if self.ids.len() >= 2 {
			self.graph.update(self.options.timestep);
		}
		self.apply_central_gravity();
		if self.options.avoid_overlap > 0.0 {
			self.resolve_overlaps();
		}
		let max_step = self.cap_velocity(&before);
		self.iterations += 1;

		let converged = max_step < f64::from(self.options.min_velocity);
		let budget_spent = self.iterations >= self.options.stabilization_iterations;
		let mut events = Vec::new();
		if (converged || budget_spent) && !self.iterations_reported {
			self.iterations_reported = true;
			events.push(LayoutEvent::IterationsDone);
		}
		if converged || (budget_spent && self.options.freeze_after_stabilization) {
			self.running = false;
			events.push(LayoutEvent::Stabilized);
		}
		for event in &events {
			self.emit(*event);
		}
		trace!("tick {}: max step {max_step:.4}", self.iterations);
		events
	}

	/// Takes over a changed dataset without rebinding. Presentation changes
	/// such as corrected fonts or colours are applied as they are; a changed
	/// node or edge set is rebuilt around the nodes that stay, which keep
	/// their position and pin, and the simulation starts over.
	pub fn update_dataset(&mut self, dataset: &GraphDataset) {
		self.revision += 1;
		if self.same_structure(dataset) {
			let options = &self.options;
			self.graph.visit_nodes_mut(|node| {
				let slot = node.data.user_data.slot;
				if let Some(n) = dataset.nodes.get(slot) {
					node.data.user_data = node_info(n, slot, options);
				}
			});
			for edge in &mut self.edges {
				if let Some(e) = dataset.edges.get(edge.slot) {
					edge.color = e.stroke_color().unwrap_or(DEFAULT_EDGE_COLOR).to_string();
				}
			}
			debug!("layout presentation refreshed ({} nodes)", self.ids.len());
			return;
		}

		let mut kept = HashMap::with_capacity(self.ids.len());
		let ids = &self.ids;
		self.graph.visit_nodes(|node| {
			if let Some(id) = ids.get(node.data.user_data.slot) {
				kept.insert(id.clone(), (node.x(), node.y(), node.data.is_anchor));
			}
		});
		self.graph.clear();
		(self.ids, self.index_of, self.edges) = populate(&mut self.graph, dataset, &self.options, &kept);
		debug!(
			"layout rebuilt in place: {} nodes ({} kept), {} edges",
			self.ids.len(),
			self.ids.iter().filter(|id| kept.contains_key(*id)).count(),
			self.edges.len()
		);
		if self.options.enabled {
			self.running = false;
			self.iterations = 0;
			self.iterations_reported = false;
			self.start_simulation();
		}
	}

	fn same_structure(&self, dataset: &GraphDataset) -> bool {
		self.ids.len() == dataset.nodes.len()
			&& self.ids.iter().zip(&dataset.nodes).all(|(id, n)| *id == n.id)
			&& self.edges.len() == dataset.edges.len()
			&& self.edges.iter().zip(&dataset.edges).all(|(info, e)| {
				self.index_of.get(&e.from) == Some(&info.from) && self.index_of.get(&e.to) == Some(&info.to)
			})
	}

	fn emit(&mut self, event: LayoutEvent) {
		self.controller.handle(event);
	}

	fn apply_central_gravity(&mut self) {
		let pull = (self.options.central_gravity * self.options.timestep).clamp(0.0, 1.0);
		if pull <= 0.0 {
			return;
		}
		self.graph.visit_nodes_mut(|node| {
			if !node.data.is_anchor {
				node.data.x -= node.data.x * pull;
				node.data.y -= node.data.y * pull;
			}
		});
	}

	fn resolve_overlaps(&mut self) {
		let mut placed: Vec<(DefaultNodeIdx, f64, f64, f64)> = Vec::with_capacity(self.ids.len());
		self.graph.visit_nodes(|node| {
			placed.push((node.index(), node.x() as f64, node.y() as f64, node.data.user_data.radius));
		});
		let strength = f64::from(self.options.avoid_overlap.clamp(0.0, 1.0));
		let mut push: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
		for (i, &(a, ax, ay, ar)) in placed.iter().enumerate() {
			for &(b, bx, by, br) in &placed[i + 1..] {
				let min_dist = (ar + br) * strength;
				let (dx, dy) = (bx - ax, by - ay);
				let dist = (dx * dx + dy * dy).sqrt();
				if dist >= min_dist || min_dist <= 0.0 {
					continue;
				}
				let (ux, uy) = if dist > 1e-6 {
					(dx / dist, dy / dist)
				} else {
					(1.0, 0.0)
				};
				let half = (min_dist - dist) / 2.0;
				let pa = push.entry(a).or_default();
				pa.0 -= ux * half;
				pa.1 -= uy * half;
				let pb = push.entry(b).or_default();
				pb.0 += ux * half;
				pb.1 += uy * half;
			}
		}
		if push.is_empty() {
			return;
		}
		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			if let Some(&(dx, dy)) = push.get(&node.index()) {
				node.data.x += dx as f32;
				node.data.y += dy as f32;
			}
		});
	}

	/// Clamps every node's displacement since `before` and returns the
	/// largest remaining step.
	fn cap_velocity(&mut self, before: &HashMap<DefaultNodeIdx, (f32, f32)>) -> f64 {
		let max = f64::from(self.options.max_velocity);
		let mut largest = 0.0_f64;
		self.graph.visit_nodes_mut(|node| {
			let Some(&(ox, oy)) = before.get(&node.index()) else {
				return;
			};
			let (dx, dy) = (f64::from(node.data.x - ox), f64::from(node.data.y - oy));
			let mut step = (dx * dx + dy * dy).sqrt();
			if !step.is_finite() {
				node.data.x = ox;
				node.data.y = oy;
				step = 0.0;
			} else if step > max {
				let scale = max / step;
				node.data.x = ox + (dx * scale) as f32;
				node.data.y = oy + (dy * scale) as f32;
				step = max;
			}
			largest = largest.max(step);
		});
		largest
	}

	pub fn positions(&self) -> HashMap<DefaultNodeIdx, (f32, f32)> {
		let mut out = HashMap::with_capacity(self.ids.len());
		self.graph.visit_nodes(|node| {
			out.insert(node.index(), (node.x(), node.y()));
		});
		out
	}

	pub fn position_of(&self, id: &ElementId) -> Option<(f32, f32)> {
		let idx = *self.index_of.get(id)?;
		self.positions().get(&idx).copied()
	}

	/// Transform centring the layout's bounding box on the surface.
	pub fn fit(&self, width: f64, height: f64) -> ViewTransform {
		let (mut min_x, mut min_y, mut max_x, mut max_y) =
			(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
		self.graph.visit_nodes(|node| {
			let (x, y, r) = (node.x() as f64, node.y() as f64, node.data.user_data.radius);
			min_x = min_x.min(x - r);
			min_y = min_y.min(y - r);
			max_x = max_x.max(x + r);
			max_y = max_y.max(y + r);
		});
		if min_x > max_x {
			return ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			};
		}
		let padding = 40.0;
		let (bw, bh) = ((max_x - min_x).max(1.0), (max_y - min_y).max(1.0));
		let k = ((width - padding) / bw)
			.min((height - padding) / bh)
			.clamp(0.1, 10.0);
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
		ViewTransform {
			x: width / 2.0 - cx * k,
			y: height / 2.0 - cy * k,
			k,
		}
	}

	pub fn element_id(&self, idx: DefaultNodeIdx) -> Option<&ElementId> {
		let mut slot = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				slot = Some(node.data.user_data.slot);
			}
		});
		self.ids.get(slot?)
	}

	/// Node under a graph-space point.
	pub fn node_at(&self, gx: f64, gy: f64) -> Option<DefaultNodeIdx> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS.max(node.data.user_data.radius) {
				found = Some(node.index());
			}
		});
		found
	}

	/// Dataset slot of the edge passing closest to a graph-space point.
	pub fn edge_at(&self, gx: f64, gy: f64) -> Option<usize> {
		let positions = self.positions();
		let mut best: Option<(f64, usize)> = None;
		for edge in &self.edges {
			let (Some(&(x1, y1)), Some(&(x2, y2))) = (positions.get(&edge.from), positions.get(&edge.to))
			else {
				continue;
			};
			let d = segment_distance(gx, gy, x1 as f64, y1 as f64, x2 as f64, y2 as f64);
			if d <= EDGE_HIT_TOLERANCE && best.is_none_or(|(bd, _)| d < bd) {
				best = Some((d, edge.slot));
			}
		}
		best.map(|(_, slot)| slot)
	}

	/// Nodes take precedence over edges running beneath them.
	pub fn pick(&self, gx: f64, gy: f64) -> Pick {
		if let Some(id) = self.node_at(gx, gy).and_then(|idx| self.element_id(idx)) {
			return Pick::Node(id.clone());
		}
		self.edge_at(gx, gy).map_or(Pick::Nothing, Pick::Edge)
	}

	pub fn neighbors(&self, idx: DefaultNodeIdx) -> HashSet<DefaultNodeIdx> {
		self.edges
			.iter()
			.filter_map(|e| {
				if e.from == idx {
					Some(e.to)
				} else if e.to == idx {
					Some(e.from)
				} else {
					None
				}
			})
			.collect()
	}

	/// Pins a node at a graph-space position.
	pub fn pin_node(&mut self, idx: DefaultNodeIdx, x: f32, y: f32) {
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = x;
				node.data.y = y;
				node.data.is_anchor = true;
			}
		});
	}

	pub fn visit_nodes(&self, mut f: impl FnMut(DefaultNodeIdx, f64, f64, &NodeInfo)) {
		self.graph.visit_nodes(|node| {
			f(node.index(), node.x() as f64, node.y() as f64, &node.data.user_data);
		});
	}

	pub fn edges(&self) -> &[EdgeInfo] {
		&self.edges
	}
}

type Populated = (Vec<ElementId>, HashMap<ElementId, DefaultNodeIdx>, Vec<EdgeInfo>);

/// Adds `dataset` to an empty `graph`. Nodes found in `kept` resume from
/// their previous position and pin.
fn populate(
	graph: &mut ForceGraph<NodeInfo, ()>,
	dataset: &GraphDataset,
	options: &LayoutOptions,
	kept: &HashMap<ElementId, (f32, f32, bool)>,
) -> Populated {
	let mut index_of = HashMap::with_capacity(dataset.nodes.len());
	let mut ids = Vec::with_capacity(dataset.nodes.len());
	for (i, node) in dataset.nodes.iter().enumerate() {
		let (x, y, is_anchor) = match kept.get(&node.id) {
			Some(&previous) => previous,
			None => {
				let (x, y) = initial_position(node, i);
				(x, y, false)
			}
		};
		let idx = graph.add_node(NodeData {
			x,
			y,
			mass: 10.0,
			is_anchor,
			user_data: node_info(node, i, options),
		});
		index_of.insert(node.id.clone(), idx);
		ids.push(node.id.clone());
	}

	let mut edges = Vec::with_capacity(dataset.edges.len());
	for (slot, edge) in dataset.edges.iter().enumerate() {
		if let (Some(&from), Some(&to)) = (index_of.get(&edge.from), index_of.get(&edge.to)) {
			graph.add_edge(from, to, EdgeData::default());
			edges.push(EdgeInfo {
				from,
				to,
				color: edge.stroke_color().unwrap_or(DEFAULT_EDGE_COLOR).to_string(),
				slot,
			});
		}
	}
	(ids, index_of, edges)
}

fn initial_position(node: &Node, i: usize) -> (f32, f32) {
	if let (Some(x), Some(y)) = (node.x, node.y) {
		return (x as f32, y as f32);
	}
	let r = SPIRAL_SPACING * (i as f64).sqrt();
	let angle = i as f64 * GOLDEN_ANGLE;
	((r * angle.cos()) as f32, (r * angle.sin()) as f32)
}

fn node_info(node: &Node, slot: usize, options: &LayoutOptions) -> NodeInfo {
	let color = node
		.fill_color()
		.map(str::to_string)
		.unwrap_or_else(|| COLORS[slot % COLORS.len()].into());
	NodeInfo {
		slot,
		label: node.label.clone(),
		color,
		radius: node
			.size
			.map(|s| (s / 2.0).max(NODE_RADIUS))
			.unwrap_or(options.node_radius),
		font_size: node.font_size(),
	}
}

fn segment_distance(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
	let (dx, dy) = (x2 - x1, y2 - y1);
	let len_sq = dx * dx + dy * dy;
	let t = if len_sq < 1e-9 {
		0.0
	} else {
		(((px - x1) * dx + (py - y1) * dy) / len_sq).clamp(0.0, 1.0)
	};
	let (cx, cy) = (x1 + t * dx, y1 + t * dy);
	((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::dataset::{Edge, Font};
	use crate::layout::stabilization::StabilizationPhase;

	fn chain(n: i64) -> GraphDataset {
		GraphDataset::from_parts(
			(0..n).map(Node::new).collect(),
			(1..n).map(|i| Edge::new(i - 1, i)).collect(),
		)
	}

	#[test]
	fn disabled_physics_is_settled_on_bind() {
		let engine = LayoutEngine::create(&chain(3), LayoutOptions::cluster_summary());
		assert!(!engine.is_running());
		assert!(engine.status().interaction_ready);
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilized);
	}

	#[test]
	fn binding_starts_stabilizing() {
		let engine = LayoutEngine::create(&chain(4), LayoutOptions::default());
		assert!(engine.is_running());
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilizing);
		assert!(engine.status().is_loading());
	}

	#[test]
	fn a_lone_node_at_rest_converges_immediately() {
		let mut engine = LayoutEngine::create(&chain(1), LayoutOptions::default());
		let events = engine.tick();
		assert_eq!(events, vec![LayoutEvent::IterationsDone, LayoutEvent::Stabilized]);
		assert!(engine.status().interaction_ready);
		assert!(!engine.is_running());
		assert!(engine.tick().is_empty());
	}

	#[test]
	fn unconverged_layout_stays_stabilizing() {
		let options = LayoutOptions {
			min_velocity: 0.0,
			stabilization_iterations: u32::MAX,
			..LayoutOptions::default()
		};
		let mut engine = LayoutEngine::create(&chain(5), options);
		for _ in 0..50 {
			engine.tick();
		}
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilizing);
		assert!(!engine.status().interaction_ready);
	}

	#[test]
	fn iteration_budget_unlocks_interaction_once() {
		let options = LayoutOptions {
			min_velocity: 0.0,
			stabilization_iterations: 3,
			..LayoutOptions::default()
		};
		let mut engine = LayoutEngine::create(&chain(4), options);
		let mut done = 0;
		for _ in 0..10 {
			done += engine
				.tick()
				.iter()
				.filter(|e| **e == LayoutEvent::IterationsDone)
				.count();
		}
		assert_eq!(done, 1);
		assert!(engine.status().interaction_ready);
		assert!(engine.is_running());
	}

	#[test]
	fn drill_down_layouts_freeze_after_their_budget() {
		let options = LayoutOptions {
			min_velocity: 0.0,
			stabilization_iterations: 2,
			..LayoutOptions::drill_down()
		};
		let mut engine = LayoutEngine::create(&chain(3), options);
		engine.tick();
		let events = engine.tick();
		assert_eq!(events, vec![LayoutEvent::IterationsDone, LayoutEvent::Stabilized]);
		assert!(!engine.is_running());
	}

	#[test]
	fn restart_cycles_back_to_stabilizing() {
		let mut engine = LayoutEngine::create(&chain(1), LayoutOptions::default());
		engine.tick();
		assert_eq!(engine.start_simulation(), vec![LayoutEvent::StartStabilizing]);
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilizing);
		assert!(engine.status().interaction_ready);
		engine.stop_simulation(800.0, 600.0);
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilized);
	}

	#[test]
	fn displacement_per_tick_is_capped() {
		let options = LayoutOptions {
			max_velocity: 0.5,
			min_velocity: 0.0,
			..LayoutOptions::default()
		};
		let mut engine = LayoutEngine::create(&chain(6), options);
		for _ in 0..5 {
			let before = engine.positions();
			engine.tick();
			for (idx, (x, y)) in engine.positions() {
				let (ox, oy) = before[&idx];
				let step = (((x - ox) as f64).powi(2) + ((y - oy) as f64).powi(2)).sqrt();
				assert!(step <= 0.5 + 1e-3, "step {step}");
			}
		}
	}

	#[test]
	fn payload_coordinates_are_kept() {
		let mut node = Node::new(7);
		node.x = Some(150.0);
		node.y = Some(-30.0);
		let ds = GraphDataset::from_parts(vec![node], vec![]);
		let engine = LayoutEngine::create(&ds, LayoutOptions::cluster_summary());
		assert_eq!(engine.position_of(&ElementId::Int(7)), Some((150.0, -30.0)));
	}

	#[test]
	fn hit_testing_finds_nodes_and_edges() {
		let mut a = Node::new(1);
		(a.x, a.y) = (Some(0.0), Some(0.0));
		let mut b = Node::new(2);
		(b.x, b.y) = (Some(100.0), Some(0.0));
		let ds = GraphDataset::from_parts(vec![a, b], vec![Edge::new(1, 2)]);
		let engine = LayoutEngine::create(&ds, LayoutOptions { enabled: false, ..LayoutOptions::default() });
		let idx = engine.node_at(98.0, 1.0).unwrap();
		assert_eq!(engine.element_id(idx), Some(&ElementId::Int(2)));
		assert_eq!(engine.edge_at(50.0, 2.0), Some(0));
		assert_eq!(engine.edge_at(50.0, 30.0), None);
		assert_eq!(engine.pick(1.0, 1.0), Pick::Node(ElementId::Int(1)));
		assert_eq!(engine.pick(50.0, 1.0), Pick::Edge(0));
		assert_eq!(engine.pick(50.0, 80.0), Pick::Nothing);
	}

	#[test]
	fn fit_centres_the_bounding_box() {
		let mut a = Node::new(1);
		(a.x, a.y) = (Some(-100.0), Some(0.0));
		let mut b = Node::new(2);
		(b.x, b.y) = (Some(100.0), Some(0.0));
		let ds = GraphDataset::from_parts(vec![a, b], vec![]);
		let engine = LayoutEngine::create(&ds, LayoutOptions { enabled: false, ..LayoutOptions::default() });
		let t = engine.fit(800.0, 600.0);
		assert!((t.x - 400.0).abs() < 1e-6);
		assert!((t.y - 300.0).abs() < 1e-6);
		assert!(t.k > 1.0);
	}

	#[test]
	fn font_corrections_reach_a_bound_engine() {
		let mut ds = chain(2);
		ds.nodes[1].font = Some(Font {
			size: Some(0.2),
			..Font::default()
		});
		let mut engine = LayoutEngine::create(&ds, LayoutOptions { enabled: false, ..LayoutOptions::default() });
		let before = engine.positions();

		ds.correct_fonts(12.0);
		ds.nodes[0] = ds.nodes[0].clone().with_label("x1");
		engine.update_dataset(&ds);

		let mut seen = Vec::new();
		engine.visit_nodes(|_, _, _, info| seen.push((info.slot, info.label.clone(), info.font_size)));
		seen.sort_by_key(|(slot, _, _)| *slot);
		assert_eq!(seen, vec![(0, Some("x1".to_string()), None), (1, None, Some(12.0))]);
		assert_eq!(engine.positions(), before);
		assert_eq!(engine.revision(), 1);
		assert!(!engine.is_running());
	}

	#[test]
	fn structural_updates_keep_surviving_nodes_in_place() {
		let mut a = Node::new(1);
		(a.x, a.y) = (Some(10.0), Some(20.0));
		let mut b = Node::new(2);
		(b.x, b.y) = (Some(-40.0), Some(5.0));
		let ds = GraphDataset::from_parts(vec![a.clone(), b], vec![Edge::new(1, 2)]);
		let mut engine = LayoutEngine::create(&ds, LayoutOptions::default());
		engine.stop_simulation(800.0, 600.0);
		let kept = engine.position_of(&ElementId::Int(1));

		let next = GraphDataset::from_parts(vec![a, Node::new(3)], vec![Edge::new(1, 3)]);
		engine.update_dataset(&next);
		assert_eq!(engine.node_count(), 2);
		assert_eq!(engine.edge_count(), 1);
		assert_eq!(engine.position_of(&ElementId::Int(1)), kept);
		assert_eq!(engine.position_of(&ElementId::Int(2)), None);
		assert!(engine.is_running());
		assert_eq!(engine.status().phase, StabilizationPhase::Stabilizing);
	}
}
