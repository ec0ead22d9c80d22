//! Overlay menu for scheduling new visualizations of a stored file.
//!
//! Components talk to the menu through typed [`MenuCommand`]s sent over one
//! channel; the menu state is a reducer over those commands.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use log::{debug, error, info};

use super::api::DataSource;
use crate::graph::kind::{Family, VisualizationKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuCommand {
	/// Show the kinds a file can be visualized as.
	Open { file_id: String, family: Family },
	/// The task was accepted.
	Confirm { message: String },
	/// The task was refused or could not be sent.
	BadRequest { message: String },
	Close,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MenuState {
	#[default]
	Closed,
	Choosing { file_id: String, family: Family },
	Confirmed { file_id: String, message: String },
	BadRequest { file_id: String, message: String },
}

impl MenuState {
	pub fn file(&self) -> Option<&str> {
		match self {
			MenuState::Closed => None,
			MenuState::Choosing { file_id, .. }
			| MenuState::Confirmed { file_id, .. }
			| MenuState::BadRequest { file_id, .. } => Some(file_id),
		}
	}

	/// Applies `command`. Outcomes only land while a file is selected.
	pub fn apply(&mut self, command: MenuCommand) {
		let next = match command {
			MenuCommand::Open { file_id, family } => MenuState::Choosing { file_id, family },
			MenuCommand::Confirm { message } => match self.file() {
				Some(file_id) => MenuState::Confirmed {
					file_id: file_id.to_string(),
					message,
				},
				None => return,
			},
			MenuCommand::BadRequest { message } => match self.file() {
				Some(file_id) => MenuState::BadRequest {
					file_id: file_id.to_string(),
					message,
				},
				None => return,
			},
			MenuCommand::Close => MenuState::Closed,
		};
		debug!("menu {:?} -> {:?}", self, next);
		*self = next;
	}
}

/// The command channel plus the state it drives.
pub struct MenuChannel {
	sender: UnboundedSender<MenuCommand>,
	receiver: UnboundedReceiver<MenuCommand>,
	state: MenuState,
}

impl Default for MenuChannel {
	fn default() -> Self {
		Self::new()
	}
}

impl MenuChannel {
	pub fn new() -> Self {
		let (sender, receiver) = unbounded();
		Self {
			sender,
			receiver,
			state: MenuState::Closed,
		}
	}

	pub fn sender(&self) -> UnboundedSender<MenuCommand> {
		self.sender.clone()
	}

	pub fn state(&self) -> &MenuState {
		&self.state
	}

	/// Applies every queued command; returns how many were applied.
	pub fn drain(&mut self) -> usize {
		let mut applied = 0;
		while let Ok(Some(command)) = self.receiver.try_next() {
			self.state.apply(command);
			applied += 1;
		}
		applied
	}
}

/// Schedules `kind` for a file and reports the outcome on `menu`.
pub async fn request_visualization(
	source: &impl DataSource,
	menu: &UnboundedSender<MenuCommand>,
	file_id: &str,
	family: Family,
	kind: VisualizationKind,
) -> MenuCommand {
	let task = kind.task_name(family);
	info!("scheduling {task} for file {file_id}");
	let outcome = match source.schedule_task(file_id, &task).await {
		Ok(status) if status.is_ok() => MenuCommand::Confirm {
			message: status.message,
		},
		Ok(status) => MenuCommand::BadRequest {
			message: status.message,
		},
		Err(e) => {
			error!("error scheduling task: {e}");
			MenuCommand::BadRequest {
				message: format!("Error scheduling task: {e}"),
			}
		}
	};
	if menu.unbounded_send(outcome.clone()).is_err() {
		debug!("menu channel closed before {task} was answered");
	}
	outcome
}
