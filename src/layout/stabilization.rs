use log::debug;

/// Lifecycle signals a simulation reports while it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutEvent {
	/// The physics engine began iterating.
	StartStabilizing,
	/// The initial iteration budget is spent (fires once per engine).
	IterationsDone,
	/// Node velocities fell below the convergence threshold.
	Stabilized,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StabilizationPhase {
	#[default]
	Idle,
	Stabilizing,
	Stabilized,
}

/// Observable status combining the phase and the one-shot ready flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StabilizationStatus {
	pub phase: StabilizationPhase,
	pub interaction_ready: bool,
}

impl StabilizationStatus {
	/// Loading overlay stays up until the initial layout has settled.
	pub fn is_loading(self) -> bool {
		!self.interaction_ready
	}

	pub fn is_stabilizing(self) -> bool {
		self.phase == StabilizationPhase::Stabilizing
	}
}

/// Tracks one simulation's phases.
///
/// `Idle -> Stabilizing -> Stabilized`, cycling back to `Stabilizing` when the
/// simulation is restarted. `interaction_ready` is set by the first
/// [`LayoutEvent::IterationsDone`] and never cleared.
#[derive(Clone, Debug, Default)]
pub struct StabilizationController {
	status: StabilizationStatus,
}

impl StabilizationController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn status(&self) -> StabilizationStatus {
		self.status
	}

	pub fn phase(&self) -> StabilizationPhase {
		self.status.phase
	}

	pub fn is_interaction_ready(&self) -> bool {
		self.status.interaction_ready
	}

	/// Applies `event`; returns whether the observable status changed.
	pub fn handle(&mut self, event: LayoutEvent) -> bool {
		let before = self.status;
		match event {
			LayoutEvent::StartStabilizing => {
				self.status.phase = StabilizationPhase::Stabilizing;
			}
			LayoutEvent::Stabilized => {
				self.status.phase = StabilizationPhase::Stabilized;
			}
			LayoutEvent::IterationsDone => {
				self.status.interaction_ready = true;
			}
		}
		let changed = before != self.status;
		if changed {
			debug!("stabilization {:?} -> {:?}", before, self.status);
		}
		changed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_idle_and_loading() {
		let controller = StabilizationController::new();
		assert_eq!(controller.phase(), StabilizationPhase::Idle);
		assert!(controller.status().is_loading());
	}

	#[test]
	fn without_a_settle_signal_interaction_never_unlocks() {
		let mut controller = StabilizationController::new();
		controller.handle(LayoutEvent::StartStabilizing);
		for _ in 0..100 {
			controller.handle(LayoutEvent::StartStabilizing);
		}
		assert_eq!(controller.phase(), StabilizationPhase::Stabilizing);
		assert!(!controller.is_interaction_ready());
	}

	#[test]
	fn ready_flag_survives_restarts() {
		let mut controller = StabilizationController::new();
		controller.handle(LayoutEvent::StartStabilizing);
		assert!(controller.handle(LayoutEvent::IterationsDone));
		assert!(controller.handle(LayoutEvent::Stabilized));

		controller.handle(LayoutEvent::StartStabilizing);
		assert_eq!(controller.phase(), StabilizationPhase::Stabilizing);
		assert!(controller.is_interaction_ready());
		assert!(!controller.handle(LayoutEvent::IterationsDone));

		controller.handle(LayoutEvent::Stabilized);
		assert_eq!(controller.phase(), StabilizationPhase::Stabilized);
	}
}
