//! PDF backend
//!
//! Paints a laid-out [`Document`] with printpdf using the built-in Times fonts.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use printpdf::lopdf;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;
use tracing::{debug, warn};
use uuid::Uuid;

use super::document::{Document, DrawOp, FontStyle, Rgb};
use super::ReportError;

const MM_PER_INCH: f64 = 25.4;

/// Stamped as creation, modification and metadata date
const FIXED_DATE: OffsetDateTime = OffsetDateTime::UNIX_EPOCH;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

fn rgb_to_printpdf(color: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

const BLACK: Rgb = Rgb(0, 0, 0);

/// Render `doc` to PDF bytes.
///
/// Equal documents render to equal bytes: the dates are fixed and the
/// trailer `/ID` is derived from the file content.
pub fn render_pdf(doc: &Document) -> Result<Vec<u8>, ReportError> {
    let (pdf, first_page, first_layer) = PdfDocument::new(
        doc.title.as_str(),
        Mm(doc.width as f32),
        Mm(doc.height as f32),
        "Layer 1",
    );
    let pdf = pdf
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_creation_date(FIXED_DATE)
        .with_mod_date(FIXED_DATE)
        .with_metadata_date(FIXED_DATE);

    let font = |f: BuiltinFont| pdf.add_builtin_font(f).map_err(|e| ReportError::Pdf(e.to_string()));
    let fonts = Fonts {
        regular: font(BuiltinFont::TimesRoman)?,
        bold: font(BuiltinFont::TimesBold)?,
        italic: font(BuiltinFont::TimesItalic)?,
    };

    for (index, page) in doc.pages.iter().enumerate() {
        let layer = if index == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_ref, layer_ref) = pdf.add_page(
                Mm(doc.width as f32),
                Mm(doc.height as f32),
                format!("Page {}", index + 1),
            );
            pdf.get_page(page_ref).get_layer(layer_ref)
        };

        for op in &page.ops {
            paint(&layer, &fonts, doc.height, op);
        }
    }

    let mut writer = BufWriter::new(Vec::new());
    pdf.save(&mut writer).map_err(|e| ReportError::Pdf(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))?;
    let bytes = stamp_document_id(&bytes)?;

    debug!(pages = doc.pages.len(), bytes = bytes.len(), "pdf rendered");
    Ok(bytes)
}

/// printpdf writes a random trailer `/ID` on every save. Swap it for a
/// UUIDv5 of the file saved without an `/ID`.
fn stamp_document_id(bytes: &[u8]) -> Result<Vec<u8>, ReportError> {
    let pdf_err = |e: lopdf::Error| ReportError::Pdf(e.to_string());

    let mut document = lopdf::Document::load_mem(bytes).map_err(pdf_err)?;
    document.trailer.remove(b"ID");

    let mut unstamped = Vec::new();
    document.save_to(&mut unstamped).map_err(|e| ReportError::Pdf(e.to_string()))?;
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, &unstamped).simple().to_string();

    let id_string = || lopdf::Object::String(id.clone().into_bytes(), lopdf::StringFormat::Literal);
    document
        .trailer
        .set("ID", lopdf::Object::Array(vec![id_string(), id_string()]));

    let mut stamped = Vec::new();
    document.save_to(&mut stamped).map_err(|e| ReportError::Pdf(e.to_string()))?;
    Ok(stamped)
}

/// Layout y runs down from the top; PDF y runs up from the bottom
fn point(x: f64, y: f64, page_height: f64) -> Point {
    Point::new(Mm(x as f32), Mm((page_height - y) as f32))
}

fn paint(layer: &PdfLayerReference, fonts: &Fonts, page_height: f64, op: &DrawOp) {
    match op {
        DrawOp::Text { x, y, size, style, text } => {
            layer.set_fill_color(rgb_to_printpdf(BLACK));
            layer.use_text(
                text.as_str(),
                *size as f32,
                Mm(*x as f32),
                Mm((page_height - y) as f32),
                fonts.get(*style),
            );
        }
        DrawOp::Line { from, to, thickness } => {
            layer.set_outline_color(rgb_to_printpdf(BLACK));
            layer.set_outline_thickness(*thickness as f32 / 0.3528);
            layer.add_line(Line {
                points: vec![
                    (point(from.0, from.1, page_height), false),
                    (point(to.0, to.1, page_height), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Rect { x, y, width, height, fill, stroke } => {
            let corners = vec![
                (point(*x, *y, page_height), false),
                (point(x + width, *y, page_height), false),
                (point(x + width, y + height, page_height), false),
                (point(*x, y + height, page_height), false),
            ];
            layer.set_outline_color(rgb_to_printpdf(BLACK));
            layer.set_outline_thickness(0.2 / 0.3528);

            if let Some(fill) = fill {
                layer.set_fill_color(rgb_to_printpdf(*fill));
                let mode = if *stroke { PaintMode::FillStroke } else { PaintMode::Fill };
                layer.add_polygon(Polygon {
                    rings: vec![corners],
                    mode,
                    winding_order: WindingOrder::NonZero,
                });
                layer.set_fill_color(rgb_to_printpdf(BLACK));
            } else if *stroke {
                layer.add_line(Line {
                    points: corners,
                    is_closed: true,
                });
            }
        }
        DrawOp::Image { path, x, y, width } => {
            if let Err(e) = paint_image(layer, page_height, path, *x, *y, *width) {
                warn!(path = %path.display(), error = %e, "logo skipped");
            }
        }
    }
}

fn paint_image(
    layer: &PdfLayerReference,
    page_height: f64,
    path: &Path,
    x: f64,
    y: f64,
    width: f64,
) -> Result<(), String> {
    let dynamic_image = printpdf::image_crate::open(path).map_err(|e| e.to_string())?;
    let (px_width, px_height) = (dynamic_image.width() as f64, dynamic_image.height() as f64);
    if px_width == 0.0 || px_height == 0.0 {
        return Err("empty image".to_string());
    }

    // scale so the image is exactly `width` mm wide
    let dpi = px_width * MM_PER_INCH / width;
    let height = px_height / dpi * MM_PER_INCH;

    let transform = ImageTransform {
        translate_x: Some(Mm(x as f32)),
        translate_y: Some(Mm((page_height - y - height) as f32)),
        dpi: Some(dpi as f32),
        ..Default::default()
    };
    Image::from_dynamic_image(&dynamic_image).add_to_layer(layer.clone(), transform);
    Ok(())
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so the
/// fixed output path never holds a partial report.
pub fn write_pdf(bytes: &[u8], path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.pdf".to_string());
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    fs::write(&temp_path, bytes)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::document::Page;

    fn one_page_doc() -> Document {
        Document {
            title: "Test".to_string(),
            width: 210.0,
            height: 297.0,
            pages: vec![Page {
                ops: vec![
                    DrawOp::Rect { x: 5.0, y: 5.0, width: 200.0, height: 287.0, fill: None, stroke: true },
                    DrawOp::Rect { x: 10.0, y: 50.0, width: 60.0, height: 7.0, fill: Some(Rgb(200, 220, 255)), stroke: true },
                    DrawOp::Text { x: 11.0, y: 55.0, size: 10.0, style: FontStyle::Bold, text: "VITALS".to_string() },
                    DrawOp::Line { from: (10.0, 60.0), to: (200.0, 60.0), thickness: 0.2 },
                ],
            }],
        }
    }

    #[test]
    fn test_render_pdf_produces_pdf_bytes() {
        let bytes = render_pdf(&one_page_doc()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_pdf_is_byte_stable() {
        let first = render_pdf(&one_page_doc()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = render_pdf(&one_page_doc()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_pdf_has_no_clock_dates() {
        let bytes = render_pdf(&one_page_doc()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("D:19700101000000"));
        assert!(!text.contains("/Metadata"));
    }

    #[test]
    fn test_document_id_follows_content() {
        let mut other = one_page_doc();
        other.pages[0].ops.push(DrawOp::Text {
            x: 11.0,
            y: 70.0,
            size: 10.0,
            style: FontStyle::Regular,
            text: "Pulse Rate".to_string(),
        });

        let trailer_id = |bytes: &[u8]| {
            let document = lopdf::Document::load_mem(bytes).unwrap();
            document.trailer.get(b"ID").unwrap().clone()
        };
        let a = trailer_id(&render_pdf(&one_page_doc()).unwrap());
        let b = trailer_id(&render_pdf(&other).unwrap());
        assert_ne!(format!("{:?}", a), format!("{:?}", b));
    }

    #[test]
    fn test_missing_logo_is_skipped() {
        let mut doc = one_page_doc();
        doc.pages[0].ops.push(DrawOp::Image {
            path: "does/not/exist.png".into(),
            x: 10.0,
            y: 8.0,
            width: 25.0,
        });
        assert!(render_pdf(&doc).is_ok());
    }

    #[test]
    fn test_write_pdf_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("medical_report.pdf");

        write_pdf(b"%PDF-first", &path).unwrap();
        write_pdf(b"%PDF-second", &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"%PDF-second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
