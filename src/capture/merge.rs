//! Combines accessibility and OCR lines into the snapshot's raw content.

use crate::models::CaptureMethod;

use super::text::filter_noise;

pub const ACCESSIBILITY_HEADING: &str = "[Accessibility Text]";
pub const OCR_HEADING: &str = "[OCR Text]";

/// Merged text for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedText {
    pub method: CaptureMethod,
    pub combined: String,
    /// Same merge over lines with real words only, when that changes anything.
    pub filtered: Option<String>,
}

pub fn merge(
    accessibility: &[String],
    ocr: &[String],
    app_name: &str,
    window_title: Option<&str>,
) -> MergedText {
    let method = CaptureMethod::from_sources(!accessibility.is_empty(), !ocr.is_empty());
    let combined = render(method, accessibility, ocr, app_name, window_title);

    let filtered_accessibility = filter_noise(accessibility);
    let filtered_ocr = filter_noise(ocr);
    let filtered_method = CaptureMethod::from_sources(
        !filtered_accessibility.is_empty(),
        !filtered_ocr.is_empty(),
    );
    let filtered = if filtered_method == CaptureMethod::None {
        None
    } else {
        Some(render(
            filtered_method,
            &filtered_accessibility,
            &filtered_ocr,
            app_name,
            window_title,
        ))
        .filter(|text| *text != combined)
    };

    MergedText {
        method,
        combined,
        filtered,
    }
}

fn render(
    method: CaptureMethod,
    accessibility: &[String],
    ocr: &[String],
    app_name: &str,
    window_title: Option<&str>,
) -> String {
    match method {
        CaptureMethod::Hybrid => format!(
            "{ACCESSIBILITY_HEADING}\n{}\n\n{OCR_HEADING}\n{}",
            accessibility.join("\n"),
            ocr.join("\n")
        ),
        CaptureMethod::Accessibility => accessibility.join("\n"),
        CaptureMethod::ScreenshotOcr => ocr.join("\n"),
        CaptureMethod::None => placeholder(app_name, window_title),
    }
}

fn placeholder(app_name: &str, window_title: Option<&str>) -> String {
    let target = match window_title.filter(|title| !title.trim().is_empty()) {
        Some(title) => format!("{app_name} - {title}"),
        None => app_name.to_string(),
    };
    format!(
        "No readable text was captured from {target}. \
         Check that Accessibility and Screen Recording permissions are granted in System Settings."
    )
}
