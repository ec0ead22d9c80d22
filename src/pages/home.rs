use leptos::prelude::*;
use leptos_router::components::A;

use crate::graph::kind::{Family, VisualizationKind};
use crate::session::Route;

/// Start page: pick a stored file and a visualization kind to open.
#[component]
pub fn Home() -> impl IntoView {
	let file_id = RwSignal::new(String::new());
	let name = RwSignal::new(String::from("formula"));
	let family = RwSignal::new(Family::Sat);
	let kind = RwSignal::new(VisualizationKind::SatInteraction);

	let target = move || {
		Route::parse(kind.get().slug(), &file_id.get(), &name.get(), family.get().as_str())
			.map(|route| {
				view! {
					<A href=route.href()>{format!("Open {} of file {}", route.kind.title(), route.file_id)}</A>
				}
			})
	};

	view! {
		<div class="home">
			<h1>"Formula visualizations"</h1>
			<p class="subtitle">
				"Open a stored SAT or MaxSAT formula as a graph, chart or matrix."
			</p>

			<div class="home-form">
				<label>
					"File id "
					<input
						type="text"
						prop:value=move || file_id.get()
						on:input=move |ev| file_id.set(event_target_value(&ev))
					/>
				</label>
				<label>
					"Name "
					<input
						type="text"
						prop:value=move || name.get()
						on:input=move |ev| name.set(event_target_value(&ev))
					/>
				</label>
				<label>
					"Family "
					<select on:change=move |ev| {
						if let Ok(next) = event_target_value(&ev).parse() {
							family.set(next);
						}
					}>
						<option value="sat">"SAT"</option>
						<option value="maxsat">"MaxSAT"</option>
					</select>
				</label>
				<label>
					"Visualization "
					<select on:change=move |ev| {
						if let Ok(next) = event_target_value(&ev).parse() {
							kind.set(next);
						}
					}>
						{move || {
							VisualizationKind::schedulable(family.get())
								.into_iter()
								.map(|k| {
									view! {
										<option value=k.slug() prop:selected=move || kind.get() == k>
											{k.title()}
										</option>
									}
								})
								.collect_view()
						}}
					</select>
				</label>
			</div>

			<ErrorBoundary fallback=|errors| {
				view! {
					<ul class="home-errors">
						{move || {
							errors
								.get()
								.into_iter()
								.map(|(_, e)| view! { <li>{e.to_string()}</li> })
								.collect_view()
						}}
					</ul>
				}
			}>{target}</ErrorBoundary>
		</div>
	}
}
