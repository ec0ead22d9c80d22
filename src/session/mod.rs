//! One routed visualization: its data, layouts, filters and drill-down.

pub mod api;
pub mod menu;

use log::{debug, error, info, warn};
use serde_json::Value;

use self::api::{DataSource, VariablesReply, parse_variables};
use self::menu::{MenuChannel, MenuCommand};
use crate::config::AppConfig;
use crate::error::{Result, VisError};
use crate::graph::dataset::GraphDataset;
use crate::graph::drilldown::{DrillDownEngine, Selection};
use crate::graph::export::{self, ExportFormat, Exportable, ExportedImage};
use crate::graph::filter::{
	self, DistributionSeries, FilterState, Heuristic, VariableFilter, VariableSelection,
};
use crate::graph::kind::{Family, Presentation, VisualizationKind};
use crate::graph::payload::{GraphPayload, Normalized, Visualization, normalize};
use crate::layout::{
	LayoutArena, LayoutEngine, LayoutEvent, LayoutOptions, Pick, StabilizationStatus, Surface,
	ViewTransform,
};

/// Route parameters identifying a visualization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
	pub kind: VisualizationKind,
	pub file_id: String,
	pub name: String,
	pub family: Family,
}

impl Route {
	pub fn parse(vis: &str, file_id: &str, name: &str, family: &str) -> Result<Self> {
		let kind = vis.parse().map_err(VisError::DataUnavailable)?;
		let family = family.parse().map_err(VisError::DataUnavailable)?;
		if file_id.is_empty() {
			return Err(VisError::DataUnavailable("missing file id".into()));
		}
		Ok(Self {
			kind,
			file_id: file_id.to_string(),
			name: name.to_string(),
			family,
		})
	}

	/// Client-side path of this visualization.
	pub fn href(&self) -> String {
		format!(
			"/visualization/{}/{}/{}/{}",
			self.kind.slug(),
			self.file_id,
			self.name,
			self.family.as_str()
		)
	}
}

/// Identifies one fetch. Only the ticket of the latest request may land.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
	generation: u64,
	pub file_id: String,
	pub format: String,
	pub variables: VariableSelection,
}

impl FetchTicket {
	pub async fn fetch(&self, source: &impl DataSource) -> Result<Value> {
		source
			.fetch_visualization(&self.file_id, &self.format, &self.variables)
			.await
	}
}

/// What the main area shows.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentState {
	Loading,
	Ready,
	Empty(String),
}

/// Result of applying a filter.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutcome {
	/// Recomputed locally.
	Applied,
	/// The server must lay out a variable subset; run this ticket.
	Refetch(FetchTicket),
}

pub struct VisualizationSession {
	route: Route,
	config: AppConfig,
	generation: u64,
	state: ContentState,
	content: Option<Visualization>,
	/// Graph laid out for all variables, kept for returning from a subset.
	full_graph: Option<GraphDataset>,
	/// Variable selection of the graph currently shown.
	installed_variables: Option<VariableSelection>,
	variables: Option<Vec<String>>,
	filter: FilterState,
	heuristic: Option<Heuristic>,
	chart: Option<DistributionSeries>,
	arena: LayoutArena,
	drill: DrillDownEngine,
	menu: MenuChannel,
	closed: bool,
}

impl VisualizationSession {
	pub fn new(route: Route, config: AppConfig) -> Self {
		info!("opening {} for file {} ({})", route.kind, route.file_id, route.family.as_str());
		let drill = DrillDownEngine::new(config.deselect_policy);
		Self {
			route,
			config,
			generation: 0,
			state: ContentState::Loading,
			content: None,
			full_graph: None,
			installed_variables: None,
			variables: None,
			filter: FilterState::default(),
			heuristic: None,
			chart: None,
			arena: LayoutArena::new(),
			drill,
			menu: MenuChannel::new(),
			closed: false,
		}
	}

	/// Creates the session and loads its first payload. Load failures are
	/// reflected in [`Self::state`]; the session itself always opens.
	pub async fn open(source: &impl DataSource, route: Route, config: AppConfig) -> Self {
		let mut session = Self::new(route, config);
		if let Err(e) = session.load(source).await {
			warn!("initial load failed: {e}");
		}
		session
	}

	pub async fn load(&mut self, source: &impl DataSource) -> Result<()> {
		let ticket = self.begin_fetch(self.filter.selected_variables.clone());
		let response = ticket.fetch(source).await;
		self.complete_fetch(&ticket, response)
	}

	pub fn route(&self) -> &Route {
		&self.route
	}

	pub fn kind(&self) -> VisualizationKind {
		self.route.kind
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	pub fn state(&self) -> &ContentState {
		&self.state
	}

	pub fn content(&self) -> Option<&Visualization> {
		self.content.as_ref()
	}

	pub fn filter(&self) -> &FilterState {
		&self.filter
	}

	/// Heuristic whose dataset is bound, once one is.
	pub fn active_heuristic(&self) -> Option<Heuristic> {
		self.heuristic
	}

	/// Variables the current graph was computed for.
	pub fn variables(&self) -> Option<&[String]> {
		self.variables.as_deref()
	}

	/// Distribution series after the active filters.
	pub fn chart(&self) -> Option<&DistributionSeries> {
		self.chart.as_ref()
	}

	pub fn drill(&self) -> &DrillDownEngine {
		&self.drill
	}

	pub fn arena(&self) -> &LayoutArena {
		&self.arena
	}

	pub fn engine(&self, surface: Surface) -> Option<&LayoutEngine> {
		self.arena.on_surface(surface)
	}

	pub fn engine_mut(&mut self, surface: Surface) -> Option<&mut LayoutEngine> {
		self.arena.on_surface_mut(surface)
	}

	pub fn status(&self, surface: Surface) -> Option<StabilizationStatus> {
		self.engine(surface).map(LayoutEngine::status)
	}

	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Starts a request; any ticket issued before becomes stale.
	pub fn begin_fetch(&mut self, variables: VariableSelection) -> FetchTicket {
		next_ticket(&mut self.generation, &self.route, variables)
	}

	/// Lands a response. Stale tickets and closed sessions are ignored;
	/// transport failures leave the current content in place.
	pub fn complete_fetch(&mut self, ticket: &FetchTicket, response: Result<Value>) -> Result<()> {
		if self.closed || ticket.generation != self.generation {
			debug!(
				"dropping stale response #{} (current #{}, closed: {})",
				ticket.generation, self.generation, self.closed
			);
			return Ok(());
		}
		let raw = match response {
			Ok(raw) => raw,
			Err(e) => {
				error!("fetch #{} failed: {e}", ticket.generation);
				if self.content.is_none() {
					self.state = ContentState::Empty(e.user_message());
				}
				return Err(e);
			}
		};
		match normalize(&raw, self.route.kind) {
			Normalized::NoData(message) => {
				warn!("{} has no data: {message}", self.route.kind);
				self.arena.destroy_all();
				self.drill.reset(&mut self.arena);
				self.content = None;
				self.chart = None;
				self.installed_variables = None;
				self.state = ContentState::Empty(message.clone());
				Err(VisError::DataUnavailable(message))
			}
			Normalized::Ready(vis) => self.install(vis, &ticket.variables),
		}
	}

	fn install(&mut self, vis: Visualization, requested: &VariableSelection) -> Result<()> {
		let kind = self.route.kind;
		let mut outcome = Ok(());
		match &vis {
			Visualization::Graph(graph) => {
				self.show_on_primary(&graph.dataset);
				self.installed_variables = Some(requested.clone());
				if *requested == VariableSelection::All {
					self.full_graph = Some(graph.dataset.clone());
					if graph.variables.is_some() {
						self.variables = graph.variables.clone();
					}
				}
			}
			Visualization::Clustered(clustered) => {
				self.drill.reset(&mut self.arena);
				self.drill.index_networks(&clustered.clustered, &clustered.whole);
				self.arena
					.bind(Surface::Primary, &clustered.clustered, LayoutOptions::cluster_summary());
			}
			Visualization::Heuristics(sets) => {
				match filter::select_heuristic(sets, self.filter.heuristic) {
					Ok((heuristic, dataset)) => {
						self.show_on_primary(dataset);
						self.heuristic = Some(heuristic);
					}
					Err(e) => {
						warn!("{e}");
						self.arena.destroy_surface(Surface::Primary);
						self.heuristic = None;
						outcome = Err(e);
					}
				}
			}
			Visualization::Distribution(dist) => {
				self.chart = Some(filter::apply_chart_filters(
					&dist.series,
					dist.variable_count(),
					&self.filter,
				));
			}
			Visualization::Scatter(_) | Visualization::Matrix(_) | Visualization::Raw(_) => {}
		}
		self.content = Some(vis);
		self.state = ContentState::Ready;
		info!("{kind} ready");
		outcome
	}

	/// Applies `next`. Chart filters and heuristic changes are recomputed from
	/// the payload at hand; a new variable subset needs a fetch. A rejected
	/// filter leaves the current one in place.
	pub fn apply_filter(&mut self, next: FilterState) -> Result<FilterOutcome> {
		debug!("filter {:?} -> {:?}", self.filter, next);

		match &self.content {
			Some(Visualization::Distribution(dist))
				if self.route.kind.presentation() == Presentation::Chart =>
			{
				self.chart = Some(filter::apply_chart_filters(
					&dist.series,
					dist.variable_count(),
					&next,
				));
				self.filter = next;
				Ok(FilterOutcome::Applied)
			}
			Some(Visualization::Heuristics(sets)) => {
				let (heuristic, dataset) = filter::select_heuristic(sets, next.heuristic)?;
				if self.heuristic != Some(heuristic) {
					let dataset = dataset.clone();
					self.show_on_primary(&dataset);
					self.heuristic = Some(heuristic);
				}
				self.filter = next;
				Ok(FilterOutcome::Applied)
			}
			None | Some(Visualization::Graph(_)) if self.full_graph.is_some() => {
				self.apply_variable_selection(next)
			}
			_ => {
				self.filter = next;
				Ok(FilterOutcome::Applied)
			}
		}
	}

	/// Compares against the selection actually shown, so a subset whose
	/// fetch failed or came back empty can be requested again.
	fn apply_variable_selection(&mut self, next: FilterState) -> Result<FilterOutcome> {
		let wanted = next.selected_variables.clone();
		self.filter = next;
		if self.installed_variables.as_ref() == Some(&wanted) {
			return Ok(FilterOutcome::Applied);
		}
		let Some(full) = &self.full_graph else {
			return Ok(FilterOutcome::Applied);
		};
		match filter::filter_by_variable_selection(full, &wanted) {
			VariableFilter::Local(dataset) => {
				// a pending subset request must not land after this
				self.generation += 1;
				self.show_on_primary(&dataset);
				self.content = Some(Visualization::Graph(GraphPayload {
					dataset,
					variables: self.variables.clone(),
				}));
				self.installed_variables = Some(VariableSelection::All);
				self.state = ContentState::Ready;
				info!("{} restored for all variables", self.route.kind);
				Ok(FilterOutcome::Applied)
			}
			VariableFilter::Refetch(vars) => Ok(FilterOutcome::Refetch(next_ticket(
				&mut self.generation,
				&self.route,
				VariableSelection::Subset(vars),
			))),
		}
	}

	/// Hands `dataset` to the primary engine in place, binding one first if
	/// the surface is empty.
	fn show_on_primary(&mut self, dataset: &GraphDataset) {
		if self.arena.update(Surface::Primary, dataset).is_none() {
			self.arena
				.bind(Surface::Primary, dataset, LayoutOptions::for_kind(self.route.kind));
		}
	}

	/// Routes a pick on the primary surface to the drill-down. Rejected with
	/// [`VisError::NotReady`] until the summary layout has settled.
	pub fn select(&mut self, pick: Pick) -> Result<()> {
		let Some(Visualization::Clustered(clustered)) = &self.content else {
			return Ok(());
		};
		let ready = self
			.arena
			.on_surface(Surface::Primary)
			.is_some_and(|engine| engine.status().interaction_ready);
		if !ready {
			warn!("selection {pick:?} rejected: layout still stabilizing");
			return Err(VisError::NotReady);
		}
		let selection = match pick {
			Pick::Node(id) => Selection::Cluster(id),
			Pick::Edge(slot) => match clustered.clustered.edges.get(slot) {
				Some(edge) => Selection::ClusterEdge {
					from: edge.from.clone(),
					to: edge.to.clone(),
				},
				None => Selection::Cleared,
			},
			Pick::Nothing => Selection::Cleared,
		};
		self.drill.select(&selection, &clustered.whole, &mut self.arena);
		Ok(())
	}

	pub fn deselect(&mut self) {
		self.drill.deselect(&mut self.arena);
	}

	/// Tears down the engine of a surface that cannot be drawn on.
	pub fn surface_lost(&mut self, surface: Surface) -> VisError {
		if self.arena.destroy_surface(surface) {
			warn!("{surface:?} layout dropped: #{} cannot be drawn on", surface.dom_id());
		}
		VisError::RenderSurfaceMissing(surface.dom_id().to_string())
	}

	/// Advances the simulation on `surface` by one step.
	pub fn tick(&mut self, surface: Surface) -> Vec<LayoutEvent> {
		self.arena
			.on_surface_mut(surface)
			.map(LayoutEngine::tick)
			.unwrap_or_default()
	}

	pub fn start_simulation(&mut self, surface: Surface) -> Vec<LayoutEvent> {
		self.arena
			.on_surface_mut(surface)
			.map(LayoutEngine::start_simulation)
			.unwrap_or_default()
	}

	/// Stops the simulation and returns the transform framing its layout.
	pub fn stop_simulation(&mut self, surface: Surface, width: f64, height: f64) -> Option<ViewTransform> {
		self.arena
			.on_surface_mut(surface)
			.map(|engine| engine.stop_simulation(width, height))
	}

	pub fn export_image(&self, source: &impl Exportable, format: ExportFormat) -> Result<ExportedImage> {
		if self.content.is_none() {
			return Err(VisError::Export("nothing to export".into()));
		}
		let image = export::export(source, format)?;
		info!("exported {} for file {}", image.file_name, self.route.file_id);
		Ok(image)
	}

	pub fn menu_sender(&self) -> futures::channel::mpsc::UnboundedSender<MenuCommand> {
		self.menu.sender()
	}

	pub fn menu(&mut self) -> &mut MenuChannel {
		&mut self.menu
	}

	pub fn set_variables(&mut self, variables: Vec<String>) {
		self.variables = Some(variables);
	}

	/// Destroys every layout; responses still in flight are dropped.
	pub fn close(&mut self) {
		if self.closed {
			return;
		}
		self.arena.destroy_all();
		self.drill.reset(&mut self.arena);
		self.generation += 1;
		self.closed = true;
		info!("closed {} for file {}", self.route.kind, self.route.file_id);
	}
}

impl Drop for VisualizationSession {
	fn drop(&mut self) {
		self.close();
	}
}

fn next_ticket(generation: &mut u64, route: &Route, variables: VariableSelection) -> FetchTicket {
	*generation += 1;
	debug!("fetch #{generation} for {variables:?}");
	FetchTicket {
		generation: *generation,
		file_id: route.file_id.clone(),
		format: route.family.as_str().to_string(),
		variables,
	}
}

/// Fetches the variable list of a file, polling at the configured interval
/// while the server is still computing it.
pub async fn load_variables(
	source: &impl DataSource,
	file_id: &str,
	family: Family,
	config: &AppConfig,
) -> Result<Vec<String>> {
	let attempts = config.variable_poll_attempts.max(1);
	for attempt in 1..=attempts {
		match parse_variables(&source.fetch_variables(file_id, family).await?)? {
			VariablesReply::Ready(variables) => {
				debug!("{} variables after {attempt} attempt(s)", variables.len());
				return Ok(variables);
			}
			VariablesReply::Pending(message) => {
				debug!("variables pending ({attempt}/{attempts}): {message}");
				if attempt < attempts {
					source.pause(config.variable_poll_interval()).await;
				}
			}
		}
	}
	Err(VisError::DataUnavailable(format!(
		"variables still computing after {attempts} attempts"
	)))
}
