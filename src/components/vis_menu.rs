use leptos::prelude::*;
use leptos::task::spawn_local;

use super::SessionStore;
use crate::graph::kind::{Family, VisualizationKind};
use crate::session::api::HttpDataSource;
use crate::session::menu::{MenuCommand, MenuState, request_visualization};

/// Applies queued menu commands and mirrors the result into `state`.
fn sync(session: SessionStore, state: RwSignal<MenuState>) {
	if let Some(next) = session.try_update_value(|s| {
		s.menu().drain();
		s.menu().state().clone()
	}) {
		state.set(next);
	}
}

fn send(session: SessionStore, state: RwSignal<MenuState>, command: MenuCommand) {
	let sent = session
		.try_with_value(|s| s.menu_sender().unbounded_send(command).is_ok())
		.unwrap_or(false);
	if sent {
		sync(session, state);
	}
}

/// Overlay for scheduling other visualizations of the current file.
#[component]
pub fn VisMenu(
	session: SessionStore,
	state: RwSignal<MenuState>,
	file_id: String,
	family: Family,
	api_base: String,
) -> impl IntoView {
	let file_id = StoredValue::new(file_id);
	let api_base = StoredValue::new(api_base);

	let open = move |_| {
		send(session, state, MenuCommand::Open {
			file_id: file_id.get_value(),
			family,
		})
	};
	let close = move |_| send(session, state, MenuCommand::Close);

	let schedule = move |kind: VisualizationKind| {
		let Some(sender) = session.try_with_value(|s| s.menu_sender()) else {
			return;
		};
		let (file_id, source) = (file_id.get_value(), HttpDataSource::new(api_base.get_value()));
		spawn_local(async move {
			request_visualization(&source, &sender, &file_id, family, kind).await;
			sync(session, state);
		});
	};

	let body = move || match state.get() {
		MenuState::Closed => ().into_any(),
		MenuState::Choosing { family, .. } => view! {
			<p>"Choose a visualization to compute:"</p>
			<ul class="vis-menu-kinds">
				{VisualizationKind::schedulable(family)
					.into_iter()
					.map(|kind| {
						view! {
							<li>
								<button on:click=move |_| schedule(kind)>{kind.title()}</button>
							</li>
						}
					})
					.collect_view()}
			</ul>
		}
		.into_any(),
		MenuState::Confirmed { message, .. } => view! {
			<p class="vis-menu-confirmed">{message}</p>
		}
		.into_any(),
		MenuState::BadRequest { message, .. } => view! {
			<p class="vis-menu-bad-request">{message}</p>
		}
		.into_any(),
	};

	view! {
		<button class="vis-menu-open" on:click=open>
			"Visualize as…"
		</button>
		<Show when=move || state.with(|s| *s != MenuState::Closed)>
			<div class="vis-menu-overlay">
				<div class="vis-menu">
					<button class="vis-menu-close" on:click=close>
						"×"
					</button>
					{body}
				</div>
			</div>
		</Show>
	}
}
