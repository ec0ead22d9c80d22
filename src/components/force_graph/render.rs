use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::CanvasView;
use crate::layout::LayoutEngine;

const BACKGROUND: &str = "#ffffff";
const LABEL_COLOR: &str = "#222222";
const DEFAULT_FONT_SIZE: f64 = 10.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(view: &CanvasView, engine: Option<&LayoutEngine>, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, view.width, view.height);
	let Some(engine) = engine else {
		return;
	};
	ctx.save();
	let _ = ctx.translate(view.transform.x, view.transform.y);
	let _ = ctx.scale(view.transform.k, view.transform.k);
	draw_edges(view, engine, ctx);
	draw_nodes(view, engine, ctx);
	ctx.restore();
}

fn draw_edges(view: &CanvasView, engine: &LayoutEngine, ctx: &CanvasRenderingContext2d) {
	let k = view.transform.k;
	let (line_width, arrow_size) = (1.0 / k.max(0.5), 8.0 / k);
	let directed = engine.options().directed;
	let t = ease_out_cubic(view.hover.highlight_t);
	let positions = engine.positions();
	let mut radii = std::collections::HashMap::new();
	engine.visit_nodes(|idx, _, _, info| {
		radii.insert(idx, info.radius);
	});

	for edge in engine.edges() {
		let (Some(&(x1, y1)), Some(&(x2, y2))) = (positions.get(&edge.from), positions.get(&edge.to))
		else {
			continue;
		};
		let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let r_from = radii.get(&edge.from).copied().unwrap_or(0.0);
		let r_to = radii.get(&edge.to).copied().unwrap_or(0.0);

		let is_highlighted = view.is_highlighted(edge.from) && view.is_highlighted(edge.to);
		// t=0: every edge at base alpha; t=1: highlighted edges up, the rest dimmed
		let (alpha, width) = if is_highlighted {
			(0.6 + 0.4 * t, line_width * (1.0 + 0.5 * t))
		} else {
			(0.6 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};

		ctx.set_global_alpha(alpha);
		ctx.set_stroke_style_str(&edge.color);
		ctx.set_line_width(width);
		let (ux, uy) = (dx / dist, dy / dist);
		let head = if directed { arrow_size } else { 0.0 };
		ctx.begin_path();
		ctx.move_to(x1 + ux * r_from, y1 + uy * r_from);
		ctx.line_to(x2 - ux * (r_to + head), y2 - uy * (r_to + head));
		ctx.stroke();

		if directed {
			ctx.set_fill_style_str(&edge.color);
			let (tip_x, tip_y) = (x2 - ux * r_to, y2 - uy * r_to);
			let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
			let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &str, font_size: Option<f64>, k: f64, x: f64, y: f64) {
	let size = font_size.unwrap_or(DEFAULT_FONT_SIZE / k.max(0.5));
	ctx.set_font(&format!("{size}px sans-serif"));
	let _ = ctx.fill_text(label, x, y + size / 3.0);
}

fn draw_nodes(view: &CanvasView, engine: &LayoutEngine, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		view.has_active_highlight(),
		ease_out_cubic(view.hover.highlight_t),
		view.transform.k,
	);

	engine.visit_nodes(|idx, x, y, info| {
		if has_highlight && view.is_highlighted(idx) {
			return;
		}
		let (alpha, radius) = (1.0 - 0.7 * t, info.radius * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&info.color);
		ctx.fill();

		if let Some(label) = &info.label {
			ctx.set_fill_style_str(LABEL_COLOR);
			draw_label(ctx, label, info.font_size, k, x + radius + 3.0, y);
		}
		ctx.set_global_alpha(1.0);
	});

	if !has_highlight {
		return;
	}

	engine.visit_nodes(|idx, x, y, info| {
		if !view.is_highlighted(idx) {
			return;
		}
		let is_hovered = view.is_hovered(idx);
		let is_neighbor =
			view.hover.neighbors.contains(&idx) || view.hover.prev_neighbors.contains(&idx);

		let (radius, glow_radius) = if is_hovered {
			(info.radius * (1.0 + 0.35 * t), info.radius * (1.8 + 1.2 * t))
		} else if is_neighbor {
			(info.radius * (1.0 + 0.2 * t), info.radius * (1.4 + 0.6 * t))
		} else {
			(info.radius, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(60, 120, 220, {alpha})"));
				let _ = gradient.add_color_stop(0.6, &format!("rgba(60, 120, 220, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(60, 120, 220, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&info.color);
		ctx.fill();

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(34, 34, 34, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		if let Some(label) = &info.label {
			ctx.set_fill_style_str(LABEL_COLOR);
			draw_label(ctx, label, info.font_size, k, x + radius + 3.0, y);
		}
	});
}
