//! UI building blocks shared by the pages.

pub mod alert;
pub mod chart;
pub mod force_graph;
pub mod matrix;
pub mod vis_menu;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, Url};

use crate::error::{Result, VisError};
use crate::graph::export::{Exportable, ExportedImage, Frame};
use crate::session::VisualizationSession;

/// A routed session, owned by the view that opened it. Disposing the view
/// drops the session, which destroys its layouts.
pub type SessionStore = StoredValue<VisualizationSession, LocalStorage>;

fn export_error(err: JsValue) -> VisError {
	VisError::Export(format!("{err:?}"))
}

/// Current pixels of a canvas in the document.
pub struct CanvasSnapshot {
	dom_id: &'static str,
}

impl CanvasSnapshot {
	pub fn new(dom_id: &'static str) -> Self {
		Self { dom_id }
	}

	fn canvas(&self) -> Result<HtmlCanvasElement> {
		web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(self.dom_id))
			.and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
			.ok_or_else(|| VisError::RenderSurfaceMissing(self.dom_id.to_string()))
	}
}

impl Exportable for CanvasSnapshot {
	fn capture(&self) -> Result<Frame> {
		let canvas = self.canvas()?;
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.map_err(export_error)?
			.and_then(|ctx| ctx.dyn_into().ok())
			.ok_or_else(|| VisError::RenderSurfaceMissing(self.dom_id.to_string()))?;
		let (width, height) = (canvas.width(), canvas.height());
		let data = ctx
			.get_image_data(0.0, 0.0, width as f64, height as f64)
			.map_err(export_error)?;
		Frame::new(width, height, data.data().0)
	}
}

/// Hands `image` to the browser as a file download.
pub fn download(image: &ExportedImage) -> Result<()> {
	let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(image.bytes.as_slice()));
	let options = BlobPropertyBag::new();
	options.set_type(image.mime);
	let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(export_error)?;
	let url = Url::create_object_url_with_blob(&blob).map_err(export_error)?;

	let anchor: HtmlAnchorElement = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| VisError::Export("no document".into()))?
		.create_element("a")
		.map_err(export_error)?
		.dyn_into()
		.map_err(|_| VisError::Export("not an anchor".into()))?;
	anchor.set_href(&url);
	anchor.set_download(image.file_name);
	anchor.click();
	Url::revoke_object_url(&url).map_err(export_error)?;
	log::debug!("downloaded {} ({} bytes)", image.file_name, image.bytes.len());
	Ok(())
}
