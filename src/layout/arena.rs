use log::debug;

use super::engine::{LayoutEngine, LayoutOptions};
use crate::graph::dataset::GraphDataset;

/// Rendering surfaces a session may draw on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
	/// The main visualization.
	Primary,
	/// The drill-down panel under a cluster view.
	DrillDown,
}

impl Surface {
	pub const ALL: [Surface; 2] = [Surface::Primary, Surface::DrillDown];

	pub fn dom_id(self) -> &'static str {
		match self {
			Surface::Primary => "visualization",
			Surface::DrillDown => "zoom",
		}
	}

	fn slot(self) -> usize {
		match self {
			Surface::Primary => 0,
			Surface::DrillDown => 1,
		}
	}
}

/// Refers to one engine bound to one surface. Rebinding or destroying the
/// surface invalidates every handle issued before.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutHandle {
	surface: Surface,
	generation: u64,
}

impl LayoutHandle {
	pub fn surface(self) -> Surface {
		self.surface
	}
}

struct Slot {
	generation: u64,
	engine: Option<LayoutEngine>,
}

/// Owns every live engine, at most one per surface.
pub struct LayoutArena {
	slots: [Slot; 2],
	next_generation: u64,
}

impl Default for LayoutArena {
	fn default() -> Self {
		Self::new()
	}
}

impl LayoutArena {
	pub fn new() -> Self {
		Self {
			slots: [
				Slot { generation: 0, engine: None },
				Slot { generation: 0, engine: None },
			],
			next_generation: 1,
		}
	}

	/// Destroys whatever is bound to `surface`, then binds a fresh engine.
	pub fn bind(&mut self, surface: Surface, dataset: &GraphDataset, options: LayoutOptions) -> LayoutHandle {
		self.destroy_surface(surface);
		let generation = self.next_generation;
		self.next_generation += 1;
		let slot = &mut self.slots[surface.slot()];
		slot.generation = generation;
		slot.engine = Some(LayoutEngine::create(dataset, options));
		debug!("bound {surface:?} layout (generation {generation})");
		LayoutHandle { surface, generation }
	}

	/// Returns whether the handle was still live.
	pub fn destroy(&mut self, handle: LayoutHandle) -> bool {
		if self.is_live(handle) {
			self.destroy_surface(handle.surface)
		} else {
			false
		}
	}

	pub fn destroy_surface(&mut self, surface: Surface) -> bool {
		let slot = &mut self.slots[surface.slot()];
		let destroyed = slot.engine.take().is_some();
		if destroyed {
			debug!("destroyed {surface:?} layout (generation {})", slot.generation);
		}
		destroyed
	}

	pub fn destroy_all(&mut self) {
		for surface in Surface::ALL {
			self.destroy_surface(surface);
		}
	}

	pub fn is_live(&self, handle: LayoutHandle) -> bool {
		let slot = &self.slots[handle.surface.slot()];
		slot.engine.is_some() && slot.generation == handle.generation
	}

	/// Hands a changed dataset to the engine already on `surface`, keeping
	/// its handle. Returns `None` when nothing is bound there.
	pub fn update(&mut self, surface: Surface, dataset: &GraphDataset) -> Option<LayoutHandle> {
		let engine = self.slots[surface.slot()].engine.as_mut()?;
		engine.update_dataset(dataset);
		self.handle_of(surface)
	}

	pub fn on_surface(&self, surface: Surface) -> Option<&LayoutEngine> {
		self.slots[surface.slot()].engine.as_ref()
	}

	pub fn on_surface_mut(&mut self, surface: Surface) -> Option<&mut LayoutEngine> {
		self.slots[surface.slot()].engine.as_mut()
	}

	pub fn handle_of(&self, surface: Surface) -> Option<LayoutHandle> {
		let slot = &self.slots[surface.slot()];
		slot.engine.as_ref().map(|_| LayoutHandle {
			surface,
			generation: slot.generation,
		})
	}

	pub fn live_count(&self) -> usize {
		self.slots.iter().filter(|s| s.engine.is_some()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::dataset::{Edge, Node};

	fn dataset(ids: &[i64]) -> GraphDataset {
		GraphDataset::from_parts(
			ids.iter().map(|&i| Node::new(i)).collect(),
			ids.windows(2).map(|w| Edge::new(w[0], w[1])).collect(),
		)
	}

	#[test]
	fn rebinding_invalidates_old_handles() {
		let mut arena = LayoutArena::new();
		let first = arena.bind(Surface::Primary, &dataset(&[1, 2]), LayoutOptions::default());
		let second = arena.bind(Surface::Primary, &dataset(&[3]), LayoutOptions::default());
		assert!(!arena.is_live(first));
		assert!(!arena.destroy(first));
		assert!(arena.is_live(second));
		assert_eq!(arena.on_surface(Surface::Primary).map(LayoutEngine::node_count), Some(1));
		assert_eq!(arena.live_count(), 1);
	}

	#[test]
	fn surfaces_do_not_interfere() {
		let mut arena = LayoutArena::new();
		let primary = arena.bind(Surface::Primary, &dataset(&[1, 2, 3]), LayoutOptions::cluster_summary());
		let zoom = arena.bind(Surface::DrillDown, &dataset(&[1, 2]), LayoutOptions::drill_down());
		assert_eq!(arena.live_count(), 2);

		assert!(arena.destroy(zoom));
		assert!(arena.is_live(primary));
		assert_eq!(arena.on_surface(Surface::Primary).map(LayoutEngine::node_count), Some(3));
		assert!(arena.on_surface(Surface::DrillDown).is_none());
	}

	#[test]
	fn destroy_all_leaves_nothing_live() {
		let mut arena = LayoutArena::new();
		let primary = arena.bind(Surface::Primary, &dataset(&[1]), LayoutOptions::default());
		arena.bind(Surface::DrillDown, &dataset(&[2]), LayoutOptions::default());
		arena.destroy_all();
		assert_eq!(arena.live_count(), 0);
		assert!(!arena.is_live(primary));
		assert_eq!(arena.handle_of(Surface::Primary), None);
	}

	#[test]
	fn updates_keep_the_bound_handle() {
		let mut arena = LayoutArena::new();
		assert_eq!(arena.update(Surface::Primary, &dataset(&[1])), None);
		let handle = arena.bind(Surface::Primary, &dataset(&[1, 2]), LayoutOptions::default());
		assert_eq!(arena.update(Surface::Primary, &dataset(&[1, 2, 3])), Some(handle));
		assert!(arena.is_live(handle));
		assert_eq!(arena.on_surface(Surface::Primary).map(LayoutEngine::node_count), Some(3));
		assert_eq!(arena.on_surface(Surface::Primary).map(LayoutEngine::revision), Some(1));
	}
}
