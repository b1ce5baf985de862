//! Certificate issuance rules and text layout.
//!
//! The browser draws the certificate; the server decides what text goes
//! where and at which size so every client renders the same result.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Certificate, LayoutField};

pub const FIELD_NAME: &str = "name";
pub const FIELD_COURSE: &str = "course";
pub const FIELD_DATE: &str = "date";
pub const FIELD_CERTIFICATE_ID: &str = "certificate_id";

pub const KNOWN_FIELDS: [&str; 4] = [FIELD_NAME, FIELD_COURSE, FIELD_DATE, FIELD_CERTIFICATE_ID];

/// `CERT-YYYYMMDD-XXXXXXXX`, the suffix being 8 uppercase hex digits.
pub fn generate_certificate_id(issued_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("CERT-{}-{}", issued_at.format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }

    /// A course without videos is never complete.
    pub fn all_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("{0} video(s) still to complete")]
    VideosRemaining(usize),
    #[error("a course review is required")]
    ReviewMissing,
}

pub fn check_eligibility(progress: Progress, review_submitted: bool) -> Result<(), Ineligible> {
    if !progress.all_complete() {
        let remaining = progress.total.saturating_sub(progress.completed).max(1);
        return Err(Ineligible::VideosRemaining(remaining));
    }
    if !review_submitted {
        return Err(Ineligible::ReviewMissing);
    }
    Ok(())
}

pub trait TextMeasure: Send + Sync {
    /// Rendered width of `text` in pixels at `font_size`.
    fn width(&self, text: &str, font_size: f32) -> f32;
}

/// Width estimate from an average glyph advance.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    pub advance_ratio: f32,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self { advance_ratio: 0.55 }
    }
}

impl TextMeasure for ApproxMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance_ratio
    }
}

/// Measures with real glyph advances and kerning.
pub struct GlyphMeasure {
    font: FontVec,
}

impl GlyphMeasure {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ab_glyph::InvalidFont> {
        Ok(Self {
            font: FontVec::try_from_vec(bytes)?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}

impl TextMeasure for GlyphMeasure {
    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(font_size));
        let mut width = 0.0;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }
}

/// Largest accepted start size for a layout field, in pixels.
pub const MAX_FONT_SIZE: f32 = 500.0;

/// Largest size in `[min, start]`, stepping down 1px, at which `text` fits
/// in `max_width`. Returns `min` when even that overflows. `start` is capped
/// at [`MAX_FONT_SIZE`] so the number of steps is bounded.
pub fn fit_font_size(text: &str, measure: &dyn TextMeasure, max_width: f32, start: f32, min: f32) -> f32 {
    let min = min.max(1.0);
    let start = start.min(MAX_FONT_SIZE).max(min);
    let steps = (start - min).ceil() as u32;
    for step in 0..steps {
        let size = start - step as f32;
        if measure.width(text, size) <= max_width {
            return size;
        }
    }
    min
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedText {
    pub key: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: String,
    pub align: String,
}

pub fn field_text(certificate: &Certificate, key: &str) -> Option<String> {
    match key {
        FIELD_NAME => Some(certificate.user_name.clone()),
        FIELD_COURSE => Some(certificate.course_title.clone()),
        FIELD_DATE => Some(certificate.issued_at.format("%d %B %Y").to_string()),
        FIELD_CERTIFICATE_ID => Some(certificate.certificate_id.clone()),
        _ => None,
    }
}

/// Places every known field; unknown keys are skipped.
pub fn compose(certificate: &Certificate, fields: &[LayoutField], measure: &dyn TextMeasure) -> Vec<PlacedText> {
    fields
        .iter()
        .filter_map(|field| {
            let text = field_text(certificate, &field.key)?;
            let font_size = fit_font_size(&text, measure, field.max_width, field.font_size, field.min_font_size);
            Some(PlacedText {
                key: field.key.clone(),
                text,
                x: field.x,
                y: field.y,
                font_size,
                color: field.color.clone(),
                align: field.align.clone(),
            })
        })
        .collect()
}

pub fn validate_fields(fields: &[LayoutField], width: i32, height: i32) -> Result<(), String> {
    for field in fields {
        if !KNOWN_FIELDS.contains(&field.key.as_str()) {
            return Err(format!("unknown layout field {:?}", field.key));
        }
        if !(field.min_font_size > 0.0 && field.font_size >= field.min_font_size) {
            return Err(format!("field {}: font sizes must satisfy 0 < min <= size", field.key));
        }
        if field.font_size > MAX_FONT_SIZE {
            return Err(format!("field {}: font_size must not exceed {MAX_FONT_SIZE}", field.key));
        }
        if !(field.max_width > 0.0 && field.max_width.is_finite()) {
            return Err(format!("field {}: max_width must be positive", field.key));
        }
        if field.x < 0.0 || field.y < 0.0 || field.x > width as f32 || field.y > height as f32 {
            return Err(format!("field {}: position outside the {width}x{height} canvas", field.key));
        }
        if !matches!(field.align.as_str(), "left" | "center" | "right") {
            return Err(format!("field {}: align must be left, center or right", field.key));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn certificate() -> Certificate {
        Certificate {
            id: 1,
            certificate_id: "CERT-20240601-ABCDEF12".into(),
            user_id: 1,
            course_id: 2,
            user_name: "Asha Raman".into(),
            course_title: "Carnatic Vocals for Beginners".into(),
            issued_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn field(key: &str, max_width: f32, size: f32, min: f32) -> LayoutField {
        LayoutField {
            key: key.into(),
            x: 100.0,
            y: 200.0,
            max_width,
            font_size: size,
            min_font_size: min,
            color: "#111111".into(),
            align: "center".into(),
        }
    }

    #[test]
    fn certificate_id_format() {
        let issued = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let id = generate_certificate_id(issued);
        assert!(id.starts_with("CERT-20240601-"));
        let suffix = &id["CERT-20240601-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn eligibility_requires_videos_then_review() {
        let partial = Progress { completed: 3, total: 5 };
        assert_eq!(check_eligibility(partial, true), Err(Ineligible::VideosRemaining(2)));
        let done = Progress { completed: 5, total: 5 };
        assert_eq!(check_eligibility(done, false), Err(Ineligible::ReviewMissing));
        assert_eq!(check_eligibility(done, true), Ok(()));
    }

    #[test]
    fn empty_course_is_not_complete() {
        let empty = Progress { completed: 0, total: 0 };
        assert!(!empty.all_complete());
        assert_eq!(empty.percent(), 0);
        assert!(check_eligibility(empty, true).is_err());
    }

    #[test]
    fn percent_rounds_down() {
        assert_eq!(Progress { completed: 1, total: 3 }.percent(), 33);
        assert_eq!(Progress { completed: 3, total: 3 }.percent(), 100);
    }

    #[test]
    fn text_that_fits_keeps_start_size() {
        let m = ApproxMeasure { advance_ratio: 0.5 };
        // 10 chars * 40 * 0.5 = 200
        assert_eq!(fit_font_size("abcdefghij", &m, 200.0, 40.0, 12.0), 40.0);
    }

    #[test]
    fn long_text_shrinks_until_it_fits() {
        let m = ApproxMeasure { advance_ratio: 0.5 };
        // 20 chars at size s is 10s wide; 150 fits at 15
        assert_eq!(fit_font_size("abcdefghijabcdefghij", &m, 150.0, 40.0, 12.0), 15.0);
    }

    #[test]
    fn never_goes_below_minimum() {
        let m = ApproxMeasure::default();
        assert_eq!(fit_font_size(&"x".repeat(500), &m, 100.0, 40.0, 14.0), 14.0);
    }

    #[test]
    fn compose_places_known_fields_only() {
        let fields = vec![
            field(FIELD_NAME, 1000.0, 48.0, 18.0),
            field(FIELD_DATE, 1000.0, 20.0, 10.0),
            field("signature", 100.0, 20.0, 10.0),
        ];
        let placed = compose(&certificate(), &fields, &ApproxMeasure::default());
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].text, "Asha Raman");
        assert_eq!(placed[0].font_size, 48.0);
        assert_eq!(placed[1].text, "01 June 2024");
    }

    #[test]
    fn validate_rejects_bad_fields() {
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, 20.0, 10.0)], 800, 600).is_ok());
        assert!(validate_fields(&[field("logo", 100.0, 20.0, 10.0)], 800, 600).is_err());
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, 8.0, 10.0)], 800, 600).is_err());
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, 20.0, 10.0)], 50, 50).is_err());
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, f32::NAN, 10.0)], 800, 600).is_err());
    }

    #[test]
    fn oversized_fonts_are_rejected() {
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, MAX_FONT_SIZE, 10.0)], 800, 600).is_ok());
        assert!(validate_fields(&[field(FIELD_NAME, 100.0, 3e7, 10.0)], 800, 600).is_err());
    }

    #[test]
    fn huge_start_size_still_terminates() {
        // 10 chars at 0.55 per px: 100px fits at 18
        let size = fit_font_size("Asha Raman", &ApproxMeasure::default(), 100.0, 3e7, 10.0);
        assert_eq!(size, 18.0);
        assert_eq!(fit_font_size("Asha Raman", &ApproxMeasure::default(), 1e9, 3e7, 10.0), MAX_FONT_SIZE);
    }
}
