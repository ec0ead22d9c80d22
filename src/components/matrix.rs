use leptos::prelude::*;

use crate::graph::matrix::{DependencyMatrix, MatrixMode};

/// Variable dependency matrix with a display-mode picker and optional
/// cell colouring.
#[component]
pub fn MatrixTable(matrix: DependencyMatrix) -> impl IntoView {
	let mode = RwSignal::new(MatrixMode::default());
	let colors = RwSignal::new(false);
	let matrix = StoredValue::new(matrix);

	let rows = move || {
		let (mode, colors) = (mode.get(), colors.get());
		matrix.with_value(|m| {
			m.rows
				.iter()
				.enumerate()
				.map(|(r, row)| {
					let label = m.labels.get(r).cloned().unwrap_or_default();
					let cells = row
						.dependencies
						.iter()
						.enumerate()
						.map(|(c, dep)| {
							let style = mode.cell_tone(*dep, r, c, colors).css();
							view! { <td style=style>{mode.cell_text(*dep)}</td> }
						})
						.collect_view();
					view! {
						<tr>
							<th>{label}</th>
							{cells}
						</tr>
					}
				})
				.collect_view()
		})
	};

	view! {
		<div class="matrix-controls">
			<select on:change=move |ev| {
				if let Some(next) = MatrixMode::from_key(&event_target_value(&ev)) {
					mode.set(next);
				}
			}>
				{MatrixMode::OPTIONS
					.into_iter()
					.map(|m| view! { <option value=m.key()>{m.description()}</option> })
					.collect_view()}
			</select>
			<label>
				<input
					type="checkbox"
					prop:checked=move || colors.get()
					on:change=move |ev| colors.set(event_target_checked(&ev))
				/>
				" Colors"
			</label>
		</div>
		<div class="matrix-scroll">
			<table class="dependency-matrix">
				<thead>
					<tr>
						<th></th>
						{move || {
							matrix
								.with_value(|m| {
									m.labels.iter().map(|l| view! { <th>{l.clone()}</th> }).collect_view()
								})
						}}
					</tr>
				</thead>
				<tbody>{rows}</tbody>
			</table>
		</div>
	}
}
