use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{CanvasView, DragState};
use crate::components::SessionStore;
use crate::error::VisError;
use crate::layout::{Pick, StabilizationStatus, Surface};

const FRAME_DT: f64 = 0.016;

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Canvas bound to one layout surface of a session. Ticks the surface's
/// engine every animation frame and reports clicks as [`Pick`]s.
#[component]
pub fn ForceGraphCanvas(
	session: SessionStore,
	surface: Surface,
	/// Mirrors the engine's stabilization status.
	status: RwSignal<Option<StabilizationStatus>>,
	#[prop(optional)] on_pick: Option<Callback<Pick>>,
	/// Told when the surface cannot be drawn on.
	#[prop(optional)] on_error: Option<Callback<VisError>>,
	#[prop(default = 600.0)] height: f64,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let view: Rc<RefCell<CanvasView>> = Rc::new(RefCell::new(CanvasView::new(800.0, height)));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (view_init, animate_init, resize_cb_init) = (view.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window): Option<Window> = web_sys::window() else {
			return;
		};
		let width = canvas
			.parent_element()
			.map(|p| p.client_width() as f64)
			.filter(|w| *w > 0.0)
			.unwrap_or(800.0);
		canvas.set_width(width as u32);
		canvas.set_height(height as u32);
		view_init.borrow_mut().resize(width, height);

		let ctx: Option<CanvasRenderingContext2d> = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into().ok());
		let Some(ctx) = ctx else {
			let err = session
				.try_update_value(|s| s.surface_lost(surface))
				.unwrap_or_else(|| VisError::RenderSurfaceMissing(surface.dom_id().to_string()));
			log::error!("{err}");
			if let Some(cb) = on_error {
				cb.run(err);
			}
			return;
		};

		let (view_resize, canvas_resize) = (view_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(w) = canvas_resize.parent_element().map(|p| p.client_width() as f64) else {
				return;
			};
			canvas_resize.set_width(w as u32);
			view_resize.borrow_mut().resize(w, height);
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (view_anim, animate_inner) = (view_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let alive = session
				.try_update_value(|s| {
					let events = s.tick(surface);
					let mut v = view_anim.borrow_mut();
					let handle = s.arena().handle_of(surface);
					let engine = s.engine(surface);
					v.follow(handle, engine);
					v.animate(FRAME_DT);
					render::render(&v, engine, &ctx);
					let current = s.status(surface);
					if !events.is_empty() || status.get_untracked() != current {
						status.set(current);
					}
				})
				.is_some();
			// the session is gone with its route
			if !alive {
				return;
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let view_md = view.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut v = view_md.borrow_mut();
		v.press(x, y);
		let (gx, gy) = v.screen_to_graph(x, y);
		let grabbed = session
			.try_with_value(|s| {
				let engine = s.engine(surface)?;
				let idx = engine.node_at(gx, gy)?;
				let &(nx, ny) = engine.positions().get(&idx)?;
				Some((idx, nx, ny))
			})
			.flatten();

		if let Some((idx, nx, ny)) = grabbed {
			v.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: x,
				start_y: y,
				node_start_x: nx,
				node_start_y: ny,
			};
		} else {
			v.pan.active = true;
			v.pan.start_x = x;
			v.pan.start_y = y;
			v.pan.transform_start_x = v.transform.x;
			v.pan.transform_start_y = v.transform.y;
		}
	};

	let view_mm = view.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut v = view_mm.borrow_mut();

		if v.drag.active {
			if let Some(idx) = v.drag.node_idx {
				let (dx, dy) = (
					(x - v.drag.start_x) / v.transform.k,
					(y - v.drag.start_y) / v.transform.k,
				);
				let (nx, ny) = (v.drag.node_start_x + dx as f32, v.drag.node_start_y + dy as f32);
				session.update_value(|s| {
					if let Some(engine) = s.engine_mut(surface) {
						engine.pin_node(idx, nx, ny);
					}
				});
			}
		} else if v.pan.active {
			v.transform.x = v.pan.transform_start_x + (x - v.pan.start_x);
			v.transform.y = v.pan.transform_start_y + (y - v.pan.start_y);
		} else {
			let (gx, gy) = v.screen_to_graph(x, y);
			session.with_value(|s| {
				if let Some(engine) = s.engine(surface) {
					let hovered = engine.node_at(gx, gy);
					v.set_hover(hovered, engine);
				}
			});
		}
	};

	let view_mu = view.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let pick = {
			let mut v = view_mu.borrow_mut();
			v.drag = DragState::default();
			v.pan.active = false;
			if v.release_is_click(x, y) {
				let (gx, gy) = v.screen_to_graph(x, y);
				session
					.try_with_value(|s| s.engine(surface).map(|e| e.pick(gx, gy)))
					.flatten()
			} else {
				None
			}
		};
		if let (Some(pick), Some(cb)) = (pick, on_pick) {
			cb.run(pick);
		}
	};

	let view_ml = view.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let mut v = view_ml.borrow_mut();
		v.drag = DragState::default();
		v.pan.active = false;
		v.release_is_click(f64::MAX, f64::MAX);
		session.with_value(|s| {
			if let Some(engine) = s.engine(surface) {
				v.set_hover(None, engine);
			}
		});
	};

	let view_wh = view.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		view_wh.borrow_mut().zoom_at(x, y, ev.delta_y() < 0.0);
	};

	view! {
		<canvas
			node_ref=canvas_ref
			id=surface.dom_id()
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
