//! Deterministic PDF report renderer
//!
//! Emits a single-page PDF 1.4 document with the query parameters, the metric
//! table and a distribution summary. The renderer writes plain objects with
//! computed xref offsets and embeds no timestamps, so identical snapshots
//! produce identical bytes (required for reproducibility testing).

use crate::export::ExportSnapshot;
use crate::{ParadecastError, Result, analysis::classify};

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 72.0;
const TITLE_SIZE: f64 = 18.0;
const BODY_SIZE: f64 = 11.0;
const LINE_HEIGHT: f64 = 16.0;

/// Render a snapshot into PDF bytes
pub fn render_pdf(snapshot: &ExportSnapshot) -> Result<Vec<u8>> {
    let lines = report_lines(snapshot);
    if lines.is_empty() {
        return Err(ParadecastError::encode("nothing to render"));
    }
    Ok(build_document(&lines))
}

/// The report text, top to bottom; (text, is_heading) pairs
fn report_lines(snapshot: &ExportSnapshot) -> Vec<(String, bool)> {
    let peak = snapshot
        .metrics
        .iter()
        .map(|m| m.probability)
        .max()
        .unwrap_or(0);
    let sum: u32 = snapshot
        .metrics
        .iter()
        .map(|m| u32::from(m.probability))
        .sum();
    let average = sum / snapshot.metrics.len().max(1) as u32;

    let mut lines = vec![
        ("Will It Rain On My Parade?".to_string(), true),
        (String::new(), false),
        (
            format!(
                "Location: {} ({})",
                snapshot.location.name,
                snapshot.location.format_coordinates()
            ),
            false,
        ),
        (format!("Date: {}", snapshot.settings.date), false),
        (format!("Event: {}", snapshot.settings.event_type), false),
        (
            format!(
                "Thresholds: precipitation {}%, wind {} mph",
                snapshot.settings.precipitation_threshold, snapshot.settings.wind_threshold
            ),
            false,
        ),
        (
            format!(
                "Data sources: historical {}, forecast {}",
                on_off(snapshot.settings.include_historical),
                on_off(snapshot.settings.include_forecast)
            ),
            false,
        ),
        (String::new(), false),
        ("Risk Metrics".to_string(), true),
    ];

    for metric in &snapshot.metrics {
        lines.push((
            format!(
                "{}: {}% ({}, trend {})",
                metric.title,
                metric.probability,
                classify(metric.probability).label(),
                metric.trend
            ),
            false,
        ));
    }

    lines.push((String::new(), false));
    lines.push(("Probability Distribution".to_string(), true));
    lines.push((
        format!(
            "Peak probability {peak}%, average {average}%, {} curve samples",
            snapshot.distribution.len()
        ),
        false,
    ));

    lines
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Assemble the PDF object stream around a text-only content stream
fn build_document(lines: &[(String, bool)]) -> Vec<u8> {
    let content = content_stream(lines);

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
    ];

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF",
            objects.len() + 1
        )
        .as_bytes(),
    );

    out
}

fn content_stream(lines: &[(String, bool)]) -> String {
    let mut stream = String::from("BT\n");
    let mut y = PAGE_HEIGHT - MARGIN;

    for (text, is_heading) in lines {
        let size = if *is_heading { TITLE_SIZE } else { BODY_SIZE };
        if !text.is_empty() {
            stream.push_str(&format!(
                "/F1 {size} Tf\n1 0 0 1 {MARGIN} {y} Tm\n({}) Tj\n",
                escape_pdf_text(text)
            ));
        }
        y -= if *is_heading {
            LINE_HEIGHT * 1.5
        } else {
            LINE_HEIGHT
        };
    }

    stream.push_str("ET");
    stream
}

/// Escape characters reserved in PDF literal strings
fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
