use std::collections::HashSet;

use force_graph::DefaultNodeIdx;

use crate::layout::{LayoutEngine, LayoutHandle, ViewTransform};

/// Pointer travel below which a press-release counts as a click.
const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

/// Per-canvas view state; the layout itself lives in the session.
pub struct CanvasView {
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	/// Engine the transform was fitted to.
	pub bound: Option<LayoutHandle>,
	/// Dataset revision of that engine.
	pub revision: u64,
	pub was_running: bool,
	press: Option<(f64, f64)>,
}

impl CanvasView {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			bound: None,
			revision: 0,
			was_running: false,
			press: None,
		}
	}

	/// Follows the engine bound to the surface: refits when a new one shows
	/// up, when its dataset changes in place or when it comes to rest.
	pub fn follow(&mut self, handle: Option<LayoutHandle>, engine: Option<&LayoutEngine>) {
		let Some(engine) = engine else {
			self.bound = None;
			self.was_running = false;
			return;
		};
		let running = engine.is_running();
		if self.bound != handle || self.revision != engine.revision() {
			self.bound = handle;
			self.revision = engine.revision();
			self.hover = HoverState::default();
			self.drag = DragState::default();
			self.transform = engine.fit(self.width, self.height);
		} else if self.was_running && !running {
			self.transform = engine.fit(self.width, self.height);
		}
		self.was_running = running;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn press(&mut self, sx: f64, sy: f64) {
		self.press = Some((sx, sy));
	}

	/// Whether releasing at `(sx, sy)` completes a click.
	pub fn release_is_click(&mut self, sx: f64, sy: f64) -> bool {
		match self.press.take() {
			Some((px, py)) => ((sx - px).powi(2) + (sy - py).powi(2)).sqrt() < CLICK_SLOP,
			None => false,
		}
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>, engine: &LayoutEngine) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around for the fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors = node.map(|idx| engine.neighbors(idx)).unwrap_or_default();
		if node.is_some() && !was_hovering {
			self.hover.delay_t = 0.0;
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advances the hover fade by `dt` seconds.
	pub fn animate(&mut self, dt: f64) {
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_press_release_is_a_click() {
		let mut view = CanvasView::new(800.0, 600.0);
		view.press(10.0, 10.0);
		assert!(view.release_is_click(11.0, 12.0));
		view.press(10.0, 10.0);
		assert!(!view.release_is_click(40.0, 10.0));
		assert!(!view.release_is_click(40.0, 10.0));
	}

	#[test]
	fn zoom_keeps_the_pointer_fixed() {
		let mut view = CanvasView::new(800.0, 600.0);
		let before = view.screen_to_graph(200.0, 100.0);
		view.zoom_at(200.0, 100.0, true);
		let after = view.screen_to_graph(200.0, 100.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
		assert!((view.transform.k - 1.1).abs() < 1e-9);
	}

	#[test]
	fn in_place_updates_drop_stale_hover() {
		use crate::graph::dataset::{GraphDataset, Node};
		use crate::layout::{LayoutArena, LayoutOptions, Surface};

		let mut arena = LayoutArena::new();
		let options = LayoutOptions { enabled: false, ..LayoutOptions::default() };
		arena.bind(Surface::Primary, &GraphDataset::from_parts(vec![Node::new(1)], vec![]), options);
		let mut view = CanvasView::new(800.0, 600.0);
		view.follow(arena.handle_of(Surface::Primary), arena.on_surface(Surface::Primary));
		let hovered = arena.on_surface(Surface::Primary).and_then(|e| e.node_at(0.0, 0.0));
		if let Some(engine) = arena.on_surface(Surface::Primary) {
			view.set_hover(hovered, engine);
		}
		assert!(view.has_active_highlight());

		let next = GraphDataset::from_parts(vec![Node::new(2), Node::new(3)], vec![]);
		arena.update(Surface::Primary, &next);
		view.follow(arena.handle_of(Surface::Primary), arena.on_surface(Surface::Primary));
		assert!(!view.has_active_highlight());
		assert_eq!(view.revision, 1);
	}
}
