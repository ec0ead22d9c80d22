//! Image export of a render surface: PNG, or a single-page landscape PDF
//! with the bitmap stretched across the page.

use std::fmt::Write as _;
use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use log::debug;

use crate::error::{Result, VisError};

/// A4 landscape in PDF points.
const PAGE_WIDTH: u32 = 842;
const PAGE_HEIGHT: u32 = 595;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
	Png,
	Pdf,
	/// PNG of a chart surface.
	Snapshot,
}

impl ExportFormat {
	pub fn file_name(self) -> &'static str {
		match self {
			ExportFormat::Png => "image.png",
			ExportFormat::Pdf => "image.pdf",
			ExportFormat::Snapshot => "visualization.png",
		}
	}

	pub fn mime(self) -> &'static str {
		match self {
			ExportFormat::Pdf => "application/pdf",
			ExportFormat::Png | ExportFormat::Snapshot => "image/png",
		}
	}
}

/// Pixel content of a surface, row-major RGBA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
	pub width: u32,
	pub height: u32,
	pub rgba: Vec<u8>,
}

impl Frame {
	pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
		let expected = width as usize * height as usize * 4;
		if rgba.len() != expected || width == 0 || height == 0 {
			return Err(VisError::Export(format!(
				"frame {width}x{height} needs {expected} bytes, got {}",
				rgba.len()
			)));
		}
		Ok(Self { width, height, rgba })
	}

	/// RGB with alpha composited onto white, as a printed page would show it.
	fn rgb_on_white(&self) -> Vec<u8> {
		self.rgba
			.chunks_exact(4)
			.flat_map(|px| {
				let a = u16::from(px[3]);
				let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8;
				[blend(px[0]), blend(px[1]), blend(px[2])]
			})
			.collect()
	}
}

/// Something whose current pixels can be captured.
pub trait Exportable {
	fn capture(&self) -> Result<Frame>;
}

/// Encoded file ready for download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedImage {
	pub file_name: &'static str,
	pub mime: &'static str,
	pub bytes: Vec<u8>,
}

pub fn export(source: &impl Exportable, format: ExportFormat) -> Result<ExportedImage> {
	let frame = source.capture()?;
	let bytes = match format {
		ExportFormat::Png | ExportFormat::Snapshot => encode_png(&frame)?,
		ExportFormat::Pdf => encode_pdf(&frame)?,
	};
	debug!(
		"exported {}x{} frame as {} ({} bytes)",
		frame.width,
		frame.height,
		format.file_name(),
		bytes.len()
	);
	Ok(ExportedImage {
		file_name: format.file_name(),
		mime: format.mime(),
		bytes,
	})
}

pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
	let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
		.ok_or_else(|| VisError::Export("frame does not match its dimensions".into()))?;
	let mut out = Cursor::new(Vec::new());
	img.write_to(&mut out, ImageFormat::Png)
		.map_err(|e| VisError::Export(e.to_string()))?;
	Ok(out.into_inner())
}

/// One landscape page with the frame drawn as a full-page image XObject.
pub fn encode_pdf(frame: &Frame) -> Result<Vec<u8>> {
	let pixels = frame.rgb_on_white();
	let content = format!("q\n{PAGE_WIDTH} 0 0 {PAGE_HEIGHT} 0 0 cm\n/Im0 Do\nQ\n");

	let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
	let mut offsets = Vec::with_capacity(5);
	let mut object = |out: &mut Vec<u8>, body: &[u8]| {
		offsets.push(out.len());
		out.extend_from_slice(format!("{} 0 obj\n", offsets.len()).as_bytes());
		out.extend_from_slice(body);
		out.extend_from_slice(b"\nendobj\n");
	};

	object(&mut out, b"<< /Type /Catalog /Pages 2 0 R >>");
	object(&mut out, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
	object(
		&mut out,
		format!(
			"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
			 /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>"
		)
		.as_bytes(),
	);
	let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
	stream.extend_from_slice(content.as_bytes());
	stream.extend_from_slice(b"endstream");
	object(&mut out, &stream);
	let mut image = format!(
		"<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
		 /BitsPerComponent 8 /Length {} >>\nstream\n",
		frame.width,
		frame.height,
		pixels.len()
	)
	.into_bytes();
	image.extend_from_slice(&pixels);
	image.extend_from_slice(b"\nendstream");
	object(&mut out, &image);

	let xref_at = out.len();
	let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1);
	for offset in &offsets {
		writeln!(xref, "{offset:010} 00000 n ").map_err(|e| VisError::Export(e.to_string()))?;
	}
	write!(
		xref,
		"trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
		offsets.len() + 1
	)
	.map_err(|e| VisError::Export(e.to_string()))?;
	out.extend_from_slice(xref.as_bytes());
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Still(Frame);

	impl Exportable for Still {
		fn capture(&self) -> Result<Frame> {
			Ok(self.0.clone())
		}
	}

	fn checker() -> Frame {
		let rgba = (0..16u32)
			.flat_map(|i| if i % 2 == 0 { [255, 0, 0, 255] } else { [0, 0, 255, 128] })
			.collect();
		Frame::new(4, 4, rgba).unwrap()
	}

	#[test]
	fn consecutive_exports_are_identical() {
		let source = Still(checker());
		for format in [ExportFormat::Png, ExportFormat::Pdf, ExportFormat::Snapshot] {
			let a = export(&source, format).unwrap();
			let b = export(&source, format).unwrap();
			assert_eq!(a, b);
		}
	}

	#[test]
	fn png_carries_its_signature() {
		let png = export(&Still(checker()), ExportFormat::Png).unwrap();
		assert_eq!(png.file_name, "image.png");
		assert_eq!(&png.bytes[..8], b"\x89PNG\r\n\x1a\n");
	}

	#[test]
	fn pdf_is_a_single_landscape_page() {
		let pdf = encode_pdf(&checker()).unwrap();
		let text = String::from_utf8_lossy(&pdf);
		assert!(text.starts_with("%PDF-1.4"));
		assert!(text.contains("/MediaBox [0 0 842 595]"));
		assert!(text.contains("/Count 1"));
		assert!(text.contains("/Width 4 /Height 4"));
		assert!(text.trim_end().ends_with("%%EOF"));
	}

	#[test]
	fn pdf_xref_points_at_objects() {
		let pdf = encode_pdf(&checker()).unwrap();
		let text = String::from_utf8_lossy(&pdf);
		let start: usize = text
			.rsplit("startxref\n")
			.next()
			.and_then(|tail| tail.lines().next())
			.and_then(|n| n.parse().ok())
			.unwrap();
		assert!(pdf[start..].starts_with(b"xref"));
		let table = String::from_utf8_lossy(&pdf[start..]);
		let first = table.lines().nth(3).unwrap();
		let offset: usize = first[..10].parse().unwrap();
		assert!(pdf[offset..].starts_with(b"1 0 obj"));
	}

	#[test]
	fn alpha_is_composited_onto_white() {
		let frame = Frame::new(1, 1, vec![0, 0, 0, 0]).unwrap();
		assert_eq!(frame.rgb_on_white(), vec![255, 255, 255]);
	}

	#[test]
	fn mismatched_frames_are_rejected() {
		assert!(matches!(Frame::new(2, 2, vec![0; 3]), Err(VisError::Export(_))));
	}
}
