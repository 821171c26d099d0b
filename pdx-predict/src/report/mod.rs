//! Screening report composer
//!
//! Renders a single-page A4 PDF summarizing one screening run: subject
//! details, per-modality predictions, the fused verdict, and the audio and
//! scan figures. Every field degrades to "N/A" rather than failing the
//! report, and a figure that cannot be decoded is replaced by a red inline
//! caption so the reader knows a figure was attempted.

use anyhow::{anyhow, Result};
use pdx_common::{FusedDecision, ModalityResult, UserInfo};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Line, Mm,
    PdfDocument, PdfLayerReference, Point, Px, Rgb,
};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const FIGURE_WIDTH_MM: f32 = 80.0;
const FIGURE_DPI: f32 = 300.0;

/// Inputs for one report. Everything is optional except the subject block.
#[derive(Debug, Default)]
pub struct ReportInputs<'a> {
    pub user: UserInfo,
    pub decision: Option<&'a FusedDecision>,
    pub audio: Option<&'a ModalityResult>,
    pub image: Option<&'a ModalityResult>,
    pub fused: Option<&'a ModalityResult>,
    pub spectrogram_png: Option<&'a [u8]>,
    pub heatmap_png: Option<&'a [u8]>,
}

/// Human-readable verdict line for the fused decision.
pub fn verdict_text(decision: Option<&FusedDecision>) -> &'static str {
    match decision {
        Some(d) if d.final_label == 1 => "Parkinson's Detected",
        Some(d) if d.borderline => "Borderline - Parkinson's might be present",
        Some(_) => "No Parkinson's",
        None => "N/A",
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("N/A")
}

fn modality_text(result: Option<&ModalityResult>) -> String {
    match result {
        Some(r) => {
            let label = if r.label == 1 { "Positive" } else { "Negative" };
            match r.probability {
                Some(p) => format!("{} ({:.1}%)", label, p * 100.0),
                None => label.to_string(),
            }
        }
        None => "N/A".to_string(),
    }
}

fn confidence_text(decision: Option<&FusedDecision>) -> String {
    decision
        .and_then(|d| d.final_confidence)
        .map(|c| format!("{:.1}%", c * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Compose the report and return the PDF bytes.
pub fn compose_report(inputs: &ReportInputs<'_>) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        "Parkinson's Screening Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("Font error: {}", e))?;
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Font error: {}", e))?;

    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None)));
    layer.use_text("Parkinson's Screening Report", 18.0, Mm(MARGIN_MM), Mm(y), &bold);
    y -= 12.0;
    draw_separator(&layer, y);
    y -= 10.0;

    let user = &inputs.user;
    let identity = [
        ("Name", or_na(&user.name).to_string()),
        ("Phone", or_na(&user.phone).to_string()),
        ("Email", or_na(&user.email).to_string()),
        ("Test Date", or_na(&user.test_date).to_string()),
    ];
    for (field, value) in identity {
        layer.use_text(format!("{}:", field), 11.0, Mm(MARGIN_MM), Mm(y), &bold);
        layer.use_text(value, 11.0, Mm(MARGIN_MM + 30.0), Mm(y), &regular);
        y -= 7.0;
    }
    y -= 3.0;
    draw_separator(&layer, y);
    y -= 10.0;

    layer.use_text("Results", 14.0, Mm(MARGIN_MM), Mm(y), &bold);
    y -= 9.0;
    let rows = [
        ("Voice analysis", modality_text(inputs.audio)),
        ("Scan analysis", modality_text(inputs.image)),
        ("Combined model", modality_text(inputs.fused)),
        ("Confidence", confidence_text(inputs.decision)),
    ];
    for (field, value) in rows {
        layer.use_text(format!("{}:", field), 11.0, Mm(MARGIN_MM), Mm(y), &bold);
        layer.use_text(value, 11.0, Mm(MARGIN_MM + 40.0), Mm(y), &regular);
        y -= 7.0;
    }
    y -= 3.0;

    let verdict = verdict_text(inputs.decision);
    let positive = matches!(inputs.decision, Some(d) if d.final_label == 1 || d.borderline);
    if positive {
        layer.set_fill_color(Color::Rgb(Rgb::new(0.7, 0.1, 0.1, None)));
    } else {
        layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.4, 0.1, None)));
    }
    layer.use_text(format!("Verdict: {}", verdict), 13.0, Mm(MARGIN_MM), Mm(y), &bold);
    layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None)));
    y -= 10.0;
    draw_separator(&layer, y);
    y -= 10.0;

    if inputs.spectrogram_png.is_some() || inputs.heatmap_png.is_some() {
        layer.use_text("Figures", 14.0, Mm(MARGIN_MM), Mm(y), &bold);
        y -= 8.0;

        let figures = [
            ("Voice spectrogram", inputs.spectrogram_png),
            ("Scan heatmap", inputs.heatmap_png),
        ];
        for (i, (caption, png)) in figures.iter().enumerate() {
            let Some(png) = png else { continue };
            let x = MARGIN_MM + i as f32 * (FIGURE_WIDTH_MM + 10.0);
            layer.use_text(*caption, 10.0, Mm(x), Mm(y), &regular);
            if let Err(e) = place_figure(&layer, png, x, y - 4.0) {
                layer.set_fill_color(Color::Rgb(Rgb::new(0.8, 0.0, 0.0, None)));
                layer.use_text(
                    format!("Figure unavailable: {}", e),
                    9.0,
                    Mm(x),
                    Mm(y - 8.0),
                    &regular,
                );
                layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None)));
            }
        }
    }

    doc.save_to_bytes().map_err(|e| anyhow!("PDF write failed: {}", e))
}

fn draw_separator(layer: &PdfLayerReference, y: f32) {
    layer.set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN_MM), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Decode a PNG figure and place it below `(x, top)` at a fixed width.
fn place_figure(layer: &PdfLayerReference, png: &[u8], x: f32, top: f32) -> Result<()> {
    let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| anyhow!("PNG decode failed: {}", e))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Empty figure"));
    }

    let xobject = ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: decoded.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    };

    // Natural size at FIGURE_DPI, scaled to the fixed figure width.
    let natural_width_mm = width as f32 * 25.4 / FIGURE_DPI;
    let scale = FIGURE_WIDTH_MM / natural_width_mm;
    let height_mm = height as f32 * 25.4 / FIGURE_DPI * scale;

    Image::from(xobject).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(top - height_mm)),
            rotate: None,
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(FIGURE_DPI),
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn subject() -> UserInfo {
        UserInfo {
            name: Some("Test Subject".to_string()),
            phone: None,
            email: Some("subject@example.com".to_string()),
            test_date: Some("2026-08-23".to_string()),
        }
    }

    #[test]
    fn composes_with_all_inputs_absent() {
        let inputs = ReportInputs {
            user: UserInfo::default(),
            ..Default::default()
        };
        let bytes = compose_report(&inputs).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn composes_with_decision_and_figures() {
        let decision = FusedDecision {
            final_label: 1,
            final_confidence: Some(0.91),
            fusion_used: true,
            borderline: false,
        };
        let audio = ModalityResult {
            label: 1,
            probability: Some(0.91),
        };
        let png = {
            let img = image::RgbImage::from_pixel(16, 16, image::Rgb([40, 0, 80]));
            let mut bytes = Vec::new();
            img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .unwrap();
            bytes
        };
        let inputs = ReportInputs {
            user: subject(),
            decision: Some(&decision),
            audio: Some(&audio),
            spectrogram_png: Some(&png),
            ..Default::default()
        };
        let bytes = compose_report(&inputs).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn corrupt_figure_does_not_fail_the_report() {
        let inputs = ReportInputs {
            user: subject(),
            spectrogram_png: Some(b"not a png"),
            ..Default::default()
        };
        let bytes = compose_report(&inputs).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn verdict_strings() {
        let positive = FusedDecision {
            final_label: 1,
            final_confidence: Some(0.8),
            fusion_used: false,
            borderline: false,
        };
        let borderline = FusedDecision {
            final_label: 0,
            final_confidence: Some(0.47),
            fusion_used: false,
            borderline: true,
        };
        let negative = FusedDecision {
            final_label: 0,
            final_confidence: Some(0.2),
            fusion_used: false,
            borderline: false,
        };
        assert_eq!(verdict_text(Some(&positive)), "Parkinson's Detected");
        assert_eq!(
            verdict_text(Some(&borderline)),
            "Borderline - Parkinson's might be present"
        );
        assert_eq!(verdict_text(Some(&negative)), "No Parkinson's");
        assert_eq!(verdict_text(None), "N/A");
    }
}
