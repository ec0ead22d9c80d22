//! Canvas charts for the distribution and heatmap kinds.

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::graph::filter::DistributionSeries;
use crate::graph::payload::ScatterSeries;
use crate::layout::Surface;
use crate::layout::engine::COLORS;

pub const NEGATIVE_COLOR: &str = "#e63030";
pub const POSITIVE_COLOR: &str = "#93eced";

const CHART_HEIGHT: f64 = 500.0;
const MARGIN: Margin = Margin {
	top: 30.0,
	right: 20.0,
	bottom: 40.0,
	left: 50.0,
};
const TICKS: u64 = 5;

#[derive(Clone, Copy, Debug)]
struct Margin {
	top: f64,
	right: f64,
	bottom: f64,
	left: f64,
}

/// Tallest stacked bar.
pub fn stacked_max(series: &DistributionSeries) -> u64 {
	(0..series.len())
		.map(|i| series.positive_at(i) + series.negative_at(i))
		.max()
		.unwrap_or(0)
}

/// Round tick step so that about [`TICKS`] gridlines cover `max`.
pub fn tick_step(max: u64) -> u64 {
	if max == 0 {
		return 1;
	}
	let raw = max.div_ceil(TICKS);
	let magnitude = 10u64.pow(raw.ilog10());
	[1, 2, 5, 10]
		.into_iter()
		.map(|m| m * magnitude)
		.find(|step| *step >= raw)
		.unwrap_or(raw)
}

/// Bounding box of every point, padded when degenerate.
pub fn scatter_bounds(datasets: &[ScatterSeries]) -> Option<(f64, f64, f64, f64)> {
	let mut points = datasets.iter().flat_map(|d| d.data.iter());
	let first = points.next()?;
	let (mut x0, mut x1, mut y0, mut y1) = (first.x, first.x, first.y, first.y);
	for p in points {
		x0 = x0.min(p.x);
		x1 = x1.max(p.x);
		y0 = y0.min(p.y);
		y1 = y1.max(p.y);
	}
	if x1 - x0 < f64::EPSILON {
		(x0, x1) = (x0 - 1.0, x1 + 1.0);
	}
	if y1 - y0 < f64::EPSILON {
		(y0, y1) = (y0 - 1.0, y1 + 1.0);
	}
	Some((x0, x1, y0, y1))
}

/// Sizes the canvas to its parent and returns its 2d context.
fn prepare(canvas_ref: NodeRef<leptos::html::Canvas>) -> Option<(CanvasRenderingContext2d, f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let width = canvas
		.parent_element()
		.map(|p| p.client_width() as f64)
		.filter(|w| *w > 0.0)
		.unwrap_or(800.0);
	canvas.set_width(width as u32);
	canvas.set_height(CHART_HEIGHT as u32);
	let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, width, CHART_HEIGHT);
	Some((ctx, width, CHART_HEIGHT))
}

fn draw_legend(ctx: &CanvasRenderingContext2d, width: f64, entries: &[(&str, &str)]) {
	ctx.set_font("12px sans-serif");
	let mut x = width - MARGIN.right - 110.0 * entries.len() as f64;
	for (label, color) in entries {
		ctx.set_fill_style_str(color);
		ctx.fill_rect(x, 8.0, 14.0, 14.0);
		ctx.set_fill_style_str("#222222");
		let _ = ctx.fill_text(label, x + 20.0, 19.0);
		x += 110.0;
	}
}

fn draw_bars(ctx: &CanvasRenderingContext2d, width: f64, height: f64, series: &DistributionSeries) {
	let (plot_w, plot_h) = (
		width - MARGIN.left - MARGIN.right,
		height - MARGIN.top - MARGIN.bottom,
	);
	let max = stacked_max(series);
	let step = tick_step(max);
	let top = max.div_ceil(step).max(1) * step;
	let y_of = |v: u64| MARGIN.top + plot_h * (1.0 - v as f64 / top as f64);

	ctx.set_font("11px sans-serif");
	ctx.set_stroke_style_str("#e0e0e0");
	ctx.set_line_width(1.0);
	for tick in (0..=top).step_by(step as usize) {
		let y = y_of(tick);
		ctx.begin_path();
		ctx.move_to(MARGIN.left, y);
		ctx.line_to(MARGIN.left + plot_w, y);
		ctx.stroke();
		ctx.set_fill_style_str("#555555");
		let _ = ctx.fill_text(&tick.to_string(), 8.0, y + 4.0);
	}

	if series.is_empty() {
		return;
	}
	let slot = plot_w / series.len() as f64;
	let bar = (slot * 0.8).max(1.0);
	// labels get crowded past a few dozen bars
	let label_every = (series.len() / 40).max(1);
	for (i, label) in series.labels.iter().enumerate() {
		let x = MARGIN.left + slot * i as f64 + (slot - bar) / 2.0;
		let (neg, pos) = (series.negative_at(i), series.positive_at(i));
		ctx.set_fill_style_str(NEGATIVE_COLOR);
		ctx.fill_rect(x, y_of(neg), bar, y_of(0) - y_of(neg));
		ctx.set_fill_style_str(POSITIVE_COLOR);
		ctx.fill_rect(x, y_of(neg + pos), bar, y_of(neg) - y_of(neg + pos));
		if i % label_every == 0 {
			ctx.set_fill_style_str("#555555");
			let _ = ctx.fill_text(label, x, height - MARGIN.bottom + 14.0);
		}
	}
	draw_legend(ctx, width, &[("Negative", NEGATIVE_COLOR), ("Positive", POSITIVE_COLOR)]);
}

fn draw_scatter(ctx: &CanvasRenderingContext2d, width: f64, height: f64, datasets: &[ScatterSeries]) {
	let Some((x0, x1, y0, y1)) = scatter_bounds(datasets) else {
		return;
	};
	let (plot_w, plot_h) = (
		width - MARGIN.left - MARGIN.right,
		height - MARGIN.top - MARGIN.bottom,
	);
	let project = |x: f64, y: f64| {
		(
			MARGIN.left + plot_w * (x - x0) / (x1 - x0),
			MARGIN.top + plot_h * (1.0 - (y - y0) / (y1 - y0)),
		)
	};

	ctx.set_stroke_style_str("#999999");
	ctx.begin_path();
	ctx.move_to(MARGIN.left, MARGIN.top);
	ctx.line_to(MARGIN.left, MARGIN.top + plot_h);
	ctx.line_to(MARGIN.left + plot_w, MARGIN.top + plot_h);
	ctx.stroke();

	let mut legend = Vec::with_capacity(datasets.len());
	for (i, dataset) in datasets.iter().enumerate() {
		let color = dataset
			.background_color
			.as_deref()
			.unwrap_or(COLORS[i % COLORS.len()]);
		ctx.set_fill_style_str(color);
		for p in &dataset.data {
			let (x, y) = project(p.x, p.y);
			ctx.begin_path();
			let _ = ctx.arc(x, y, 3.0, 0.0, std::f64::consts::TAU);
			ctx.fill();
		}
		legend.push((dataset.label.as_str(), color));
	}
	draw_legend(ctx, width, &legend);
}

/// Stacked positive/negative occurrence bars.
#[component]
pub fn BarChart(#[prop(into)] series: Signal<Option<DistributionSeries>>) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	Effect::new(move |_| {
		let series = series.get();
		let Some((ctx, width, height)) = prepare(canvas_ref) else {
			return;
		};
		if let Some(series) = series {
			log::debug!("drawing {} bars", series.len());
			draw_bars(&ctx, width, height, &series);
		}
	});
	view! { <canvas node_ref=canvas_ref id=Surface::Primary.dom_id() class="chart-canvas" /> }
}

#[component]
pub fn ScatterChart(#[prop(into)] datasets: Signal<Vec<ScatterSeries>>) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	Effect::new(move |_| {
		let datasets = datasets.get();
		if let Some((ctx, width, height)) = prepare(canvas_ref) {
			draw_scatter(&ctx, width, height, &datasets);
		}
	});
	view! { <canvas node_ref=canvas_ref id=Surface::Primary.dom_id() class="chart-canvas" /> }
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::graph::payload::ScatterPoint;

	#[test]
	fn bars_stack_both_signs() {
		let series = DistributionSeries::new(
			vec!["1".into(), "2".into()],
			vec![3, 10],
			vec![4, 1],
		);
		assert_eq!(stacked_max(&series), 11);
		assert_eq!(stacked_max(&DistributionSeries::default()), 0);
	}

	#[test]
	fn tick_steps_are_round() {
		assert_eq!(tick_step(0), 1);
		assert_eq!(tick_step(4), 1);
		assert_eq!(tick_step(11), 5);
		assert_eq!(tick_step(37), 10);
		assert_eq!(tick_step(480), 100);
		assert_eq!(tick_step(1200), 500);
	}

	#[test]
	fn scatter_bounds_pad_single_points() {
		let series = |data: Vec<ScatterPoint>| ScatterSeries {
			label: "s".into(),
			data,
			background_color: None,
		};
		assert_eq!(scatter_bounds(&[]), None);
		assert_eq!(
			scatter_bounds(&[series(vec![ScatterPoint { x: 2.0, y: 3.0 }])]),
			Some((1.0, 3.0, 2.0, 4.0))
		);
		assert_eq!(
			scatter_bounds(&[
				series(vec![ScatterPoint { x: 0.0, y: 5.0 }]),
				series(vec![ScatterPoint { x: 4.0, y: -1.0 }]),
			]),
			Some((0.0, 4.0, -1.0, 5.0))
		);
	}
}
