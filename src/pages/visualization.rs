//! The routed view of one visualization.
//!
//! The session lives in a [`SessionStore`] owned by [`VisualizationView`]; the
//! view mirrors what the template needs into signals after every session
//! operation. Navigating away disposes the store, which closes the session
//! before any late response can land.

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params_map;
use log::{debug, info};
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::components::SessionStore;
use crate::components::alert::Alert;
use crate::components::chart::{BarChart, ScatterChart};
use crate::components::force_graph::ForceGraphCanvas;
use crate::components::matrix::MatrixTable;
use crate::components::vis_menu::VisMenu;
use crate::components::{CanvasSnapshot, download};
use crate::config::AppConfig;
use crate::error::VisError;
use crate::graph::export::ExportFormat;
use crate::graph::filter::{ChartForm, DistributionSeries, FilterState, Heuristic, TopPercentage, VariableSelection};
use crate::graph::kind::{Presentation, VisualizationKind};
use crate::graph::payload::Visualization;
use crate::layout::{Pick, StabilizationStatus, Surface};
use crate::session::api::HttpDataSource;
use crate::session::menu::MenuState;
use crate::session::{ContentState, FetchTicket, FilterOutcome, Route, VisualizationSession, load_variables};

/// Session state the template reads.
#[derive(Clone, Copy)]
struct PageSignals {
	state: RwSignal<ContentState>,
	fetching: RwSignal<bool>,
	primary: RwSignal<Option<StabilizationStatus>>,
	drill: RwSignal<Option<StabilizationStatus>>,
	drill_label: RwSignal<Option<String>>,
	drill_message: RwSignal<Option<&'static str>>,
	chart: RwSignal<Option<DistributionSeries>>,
	/// Non-graph content (scatter, matrix, raw text).
	content: RwSignal<Option<Visualization>>,
	filter: RwSignal<FilterState>,
	heuristic: RwSignal<Option<Heuristic>>,
	variables: RwSignal<Vec<String>>,
	menu: RwSignal<MenuState>,
	alert: RwSignal<Option<String>>,
}

impl PageSignals {
	fn new() -> Self {
		Self {
			state: RwSignal::new(ContentState::Loading),
			fetching: RwSignal::new(false),
			primary: RwSignal::new(None),
			drill: RwSignal::new(None),
			drill_label: RwSignal::new(None),
			drill_message: RwSignal::new(None),
			chart: RwSignal::new(None),
			content: RwSignal::new(None),
			filter: RwSignal::new(FilterState::default()),
			heuristic: RwSignal::new(None),
			variables: RwSignal::new(Vec::new()),
			menu: RwSignal::new(MenuState::Closed),
			alert: RwSignal::new(None),
		}
	}

	fn publish(&self, session: &VisualizationSession) {
		self.state.set(session.state().clone());
		self.primary.set(session.status(Surface::Primary));
		self.drill.set(session.status(Surface::DrillDown));
		self.drill_label.set(session.drill().label().map(str::to_string));
		self.drill_message.set(session.drill().message());
		self.chart.set(session.chart().cloned());
		self.filter.set(session.filter().clone());
		self.heuristic.set(session.active_heuristic());
		if let Some(vars) = session.variables() {
			self.variables.set(vars.to_vec());
		}
	}

	/// Shows `err` unless the empty state already explains it.
	fn report(&self, err: &VisError) {
		if !matches!(err, VisError::DataUnavailable(_)) {
			self.alert.set(Some(err.user_message()));
		}
	}
}

fn surface_size(surface: Surface) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = web_sys::window()?
		.document()?
		.get_element_by_id(surface.dom_id())?
		.dyn_into()
		.ok()?;
	Some((canvas.width() as f64, canvas.height() as f64))
}

fn run_fetch(session: SessionStore, signals: PageSignals, ticket: FetchTicket, api_base: String) {
	signals.fetching.set(true);
	spawn_local(async move {
		let response = ticket.fetch(&HttpDataSource::new(api_base)).await;
		let landed = session.try_update_value(|s| {
			let result = s.complete_fetch(&ticket, response);
			signals.publish(s);
			let standalone = s.content().filter(|_| s.kind().presentation() != Presentation::Graph);
			signals.content.set(standalone.cloned());
			result
		});
		match landed {
			None => debug!("view closed before the response landed"),
			Some(Err(e)) => signals.report(&e),
			Some(Ok(())) => {}
		}
		let _ = signals.fetching.try_set(false);
	});
}

fn apply_filter(
	session: SessionStore,
	signals: PageSignals,
	api_base: String,
	change: impl FnOnce(&mut FilterState),
) {
	let mut next = signals.filter.get_untracked();
	change(&mut next);
	let outcome = session.try_update_value(|s| {
		let outcome = s.apply_filter(next);
		signals.publish(s);
		outcome
	});
	match outcome {
		Some(Ok(FilterOutcome::Refetch(ticket))) => run_fetch(session, signals, ticket, api_base),
		Some(Err(e)) => signals.report(&e),
		_ => {}
	}
}

/// Routed entry: parses the parameters and rebuilds the view when they change.
#[component]
pub fn VisualizationPage() -> impl IntoView {
	let params = use_params_map();
	move || {
		let params = params.get();
		let param = |key: &str| params.get(key).unwrap_or_default();
		match Route::parse(&param("vis"), &param("f"), &param("name"), &param("kind")) {
			Ok(route) => view! { <VisualizationView route=route /> }.into_any(),
			Err(e) => view! { <p class="empty-state">{e.user_message()}</p> }.into_any(),
		}
	}
}

#[component]
fn VisualizationView(route: Route) -> impl IntoView {
	let config = use_context::<AppConfig>().unwrap_or_default();
	let api_base = StoredValue::new(config.api_base.clone());
	let alert_timeout = config.alert_timeout_ms;
	let (kind, family, file_id) = (route.kind, route.family, route.file_id.clone());
	let title = format!("{} of {}", kind.title(), route.name);

	let session: SessionStore = StoredValue::new_local(VisualizationSession::new(route, config.clone()));
	let signals = PageSignals::new();

	if let Some(ticket) = session.try_update_value(|s| {
		let variables = s.filter().selected_variables.clone();
		s.begin_fetch(variables)
	}) {
		run_fetch(session, signals, ticket, api_base.get_value());
	}

	if kind == VisualizationKind::Resolution {
		let file_id = file_id.clone();
		spawn_local(async move {
			let source = HttpDataSource::new(config.api_base.clone());
			match load_variables(&source, &file_id, family, &config).await {
				Ok(vars) => {
					info!("{} variables available", vars.len());
					session.try_update_value(|s| {
						s.set_variables(vars);
						signals.publish(s);
					});
				}
				Err(e) => {
					let _ = signals.alert.try_set(Some(e.user_message()));
				}
			}
		});
	}

	let on_pick = Callback::new(move |pick: Pick| {
		let result = session.try_update_value(|s| {
			let result = s.select(pick);
			signals.publish(s);
			result
		});
		if let Some(Err(e)) = result {
			signals.report(&e);
		}
	});

	let on_surface_error = Callback::new(move |err: VisError| {
		session.try_with_value(|s| signals.publish(s));
		signals.report(&err);
	});

	let start = move |_| {
		session.update_value(|s| {
			s.start_simulation(Surface::Primary);
			signals.publish(s);
		});
	};
	let stop = move |_| {
		let (width, height) = surface_size(Surface::Primary).unwrap_or((800.0, 600.0));
		session.update_value(|s| {
			if let Some(fit) = s.stop_simulation(Surface::Primary, width, height) {
				debug!("stopped; fitted to {fit:?}");
			}
			signals.publish(s);
		});
	};

	let export = move |format: ExportFormat| {
		let snapshot = CanvasSnapshot::new(Surface::Primary.dom_id());
		let result = session
			.try_with_value(|s| s.export_image(&snapshot, format))
			.unwrap_or(Err(VisError::NotReady));
		if let Err(e) = result.and_then(|image| download(&image)) {
			signals.report(&e);
		}
	};

	let presentation = kind.presentation();
	let body = match presentation {
		Presentation::Graph => view! {
			<div class="graph-container">
				<ForceGraphCanvas
					session=session
					surface=Surface::Primary
					status=signals.primary
					on_pick=on_pick
					on_error=on_surface_error
				/>
				<Show when=move || signals.primary.get().is_some_and(StabilizationStatus::is_loading)>
					<div class="graph-overlay">"Loading…"</div>
				</Show>
			</div>
		}
		.into_any(),
		Presentation::Chart if kind == VisualizationKind::Heatmap => {
			let datasets = Signal::derive(move || match signals.content.get() {
				Some(Visualization::Scatter(sets)) => sets,
				_ => Vec::new(),
			});
			view! { <ScatterChart datasets=datasets /> }.into_any()
		}
		Presentation::Chart => view! { <BarChart series=signals.chart /> }.into_any(),
		Presentation::Table => (move || match signals.content.get() {
			Some(Visualization::Matrix(matrix)) => view! { <MatrixTable matrix=matrix /> }.into_any(),
			_ => ().into_any(),
		})
		.into_any(),
		Presentation::Text => (move || match signals.content.get() {
			Some(Visualization::Raw(raw)) => view! { <pre class="raw-formula">{raw}</pre> }.into_any(),
			_ => ().into_any(),
		})
		.into_any(),
	};

	let controls = match kind {
		VisualizationKind::Distribution => view! {
			<label>
				"Show "
				<select on:change=move |ev| {
					if let Some(form) = ChartForm::from_key(&event_target_value(&ev)) {
						apply_filter(session, signals, api_base.get_value(), |f| f.chart_form = form);
					}
				}>
					{ChartForm::OPTIONS
						.into_iter()
						.map(|form| view! { <option value=form.key()>{form.description()}</option> })
						.collect_view()}
				</select>
			</label>
			<label>
				"Top variables "
				<select on:change=move |ev| {
					let top = event_target_value(&ev).parse().ok().and_then(TopPercentage::from_value);
					if let Some(top) = top {
						apply_filter(session, signals, api_base.get_value(), |f| f.top_percentage = top);
					}
				}>
					{TopPercentage::OPTIONS
						.into_iter()
						.map(|p| view! { <option value=p.value().to_string()>{p.description()}</option> })
						.collect_view()}
				</select>
			</label>
		}
		.into_any(),
		VisualizationKind::Dpll => view! {
			<label>
				"Heuristic "
				<select on:change=move |ev| {
					if let Some(h) = Heuristic::from_key(&event_target_value(&ev)) {
						apply_filter(session, signals, api_base.get_value(), |f| f.heuristic = Some(h));
					}
				}>
					{Heuristic::ALL
						.into_iter()
						.map(|h| {
							view! {
								<option value=h.key() prop:selected=move || signals.heuristic.get() == Some(h)>
									{h.to_string()}
								</option>
							}
						})
						.collect_view()}
				</select>
			</label>
		}
		.into_any(),
		VisualizationKind::Resolution => {
			let picked = RwSignal::new(Vec::<String>::new());
			view! {
				<div class="variable-picker">
					<span>"Variables "</span>
					{move || {
						signals
							.variables
							.get()
							.into_iter()
							.map(|var| {
								let (checked, toggled) = (var.clone(), var.clone());
								view! {
									<label class="variable">
										<input
											type="checkbox"
											prop:checked=move || picked.with(|p| p.contains(&checked))
											on:change=move |ev| {
												let on = event_target_checked(&ev);
												picked.update(|p| {
													p.retain(|v| *v != toggled);
													if on {
														p.push(toggled.clone());
													}
												});
											}
										/>
										{var}
									</label>
								}
							})
							.collect_view()
					}}
					<button on:click=move |_| {
						let vars = VariableSelection::from_list(picked.get_untracked());
						apply_filter(session, signals, api_base.get_value(), |f| f.selected_variables = vars);
					}>"Apply"</button>
					<button on:click=move |_| {
						picked.set(Vec::new());
						apply_filter(session, signals, api_base.get_value(), |f| {
							f.selected_variables = VariableSelection::All
						});
					}>"All variables"</button>
				</div>
			}
			.into_any()
		}
		_ => ().into_any(),
	};

	let simulation_controls = (presentation == Presentation::Graph).then(|| {
		view! {
			<button on:click=start>"Start stabilization"</button>
			<button on:click=stop>"Stop stabilization"</button>
			<Show when=move || signals.primary.get().is_some_and(StabilizationStatus::is_stabilizing)>
				<span class="stabilizing">"Stabilizing…"</span>
			</Show>
		}
	});

	let export_controls = if presentation == Presentation::Graph {
		view! {
			<button on:click=move |_| export(ExportFormat::Png)>"Download PNG"</button>
			<button on:click=move |_| export(ExportFormat::Pdf)>"Download PDF"</button>
		}
		.into_any()
	} else if presentation == Presentation::Chart {
		view! { <button on:click=move |_| export(ExportFormat::Snapshot)>"Download snapshot"</button> }.into_any()
	} else {
		().into_any()
	};

	let drill_panel = (kind == VisualizationKind::Cluster).then(|| {
		view! {
			<section class="drill-down">
				<h2>
					{move || signals.drill_label.get().unwrap_or_else(|| "Cluster details".to_string())}
				</h2>
				<p class="drill-down-hint">
					{move || signals.drill_message.get().unwrap_or_default()}
				</p>
				<ForceGraphCanvas
					session=session
					surface=Surface::DrillDown
					status=signals.drill
					height=400.0
					on_error=on_surface_error
				/>
			</section>
		}
	});

	view! {
		<div class="visualization">
			<Alert message=signals.alert timeout_ms=alert_timeout />
			<header class="visualization-header">
				<h1>{title}</h1>
				<VisMenu
					session=session
					state=signals.menu
					file_id=file_id
					family=family
					api_base=api_base.get_value()
				/>
			</header>
			<div class="visualization-controls">
				{controls} {simulation_controls} {export_controls}
				<Show when=move || signals.fetching.get()>
					<span class="fetching">"Loading…"</span>
				</Show>
			</div>
			{move || match signals.state.get() {
				ContentState::Empty(message) => view! { <p class="empty-state">{message}</p> }.into_any(),
				_ => ().into_any(),
			}}
			{body}
			{drill_panel}
		</div>
	}
}
