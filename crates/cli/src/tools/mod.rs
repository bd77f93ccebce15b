use crate::mcp::errors;
use exif_tour_core::{
    AppConfig, ExifGateway, ImageCrateProcessor, MetadataRecord, PathValidator, ToolError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;

pub mod create_photo_tour_kmz;
pub mod get_gps_coordinates;
pub mod parse_exif;
pub mod parse_exif_batch;
pub mod rename_by_exif;

/// Shared state for one server or CLI process.
pub struct ToolContext {
    pub config: AppConfig,
    pub gateway: ExifGateway,
    pub images: ImageCrateProcessor,
}

impl ToolContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            gateway: ExifGateway::new(),
            images: ImageCrateProcessor::new(),
        }
    }

    /// Built per call so a removed or replaced root is noticed.
    pub fn validator(&self) -> Result<PathValidator, ToolError> {
        self.config.validator()
    }
}

pub fn error_result(
    kind: &'static str,
    message: impl Into<String>,
    source: Option<&str>,
) -> Value {
    let message = message.into();
    let mut error = json!({
        "kind": kind,
        "message": message,
    });

    if let Some(source) = source {
        if let Some(obj) = error.as_object_mut() {
            obj.insert("source".to_string(), json!(source));
        }
    }

    json!({
        "content": [{"type": "text", "text": format!("Error: {message}")}],
        "structuredContent": {"error": error},
        "isError": true
    })
}

pub fn tool_error(err: &ToolError, source: Option<&str>) -> Value {
    error_result(err.kind(), err.to_string(), source)
}

pub fn success_result(text: impl Into<String>, structured: impl Serialize) -> Value {
    match serde_json::to_value(structured) {
        Ok(structured) => json!({
            "content": [{"type": "text", "text": text.into()}],
            "structuredContent": structured,
            "isError": false
        }),
        Err(err) => error_result(
            errors::INTERNAL_ERROR,
            format!("failed to serialize result: {err}"),
            None,
        ),
    }
}

/// Deserializes tool arguments, turning a mismatch into an error payload.
pub fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, Value> {
    serde_json::from_value(args.clone()).map_err(|err| {
        error_result(
            errors::INVALID_INPUT,
            format!("invalid arguments: {err}"),
            None,
        )
    })
}

pub fn require_filepaths(filepaths: &[String]) -> Result<(), Value> {
    if filepaths.is_empty() {
        return Err(error_result(
            errors::INVALID_INPUT,
            "filepaths must be a non-empty array",
            None,
        ));
    }
    Ok(())
}

/// Human-readable metadata listing, recognized fields first.
pub fn format_record(record: &MetadataRecord) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: String| {
        let _ = writeln!(out, "{key}: {value}");
    };

    if let Some(t) = record.date_time_original {
        line("DateTimeOriginal", t.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Some(t) = record.create_date {
        line("CreateDate", t.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Some(v) = &record.make {
        line("Make", v.clone());
    }
    if let Some(v) = &record.model {
        line("Model", v.clone());
    }
    if let Some(v) = &record.lens_model {
        line("LensModel", v.clone());
    }
    if let Some(v) = record.latitude {
        line("Latitude", format!("{v:.6}"));
    }
    if let Some(v) = record.longitude {
        line("Longitude", format!("{v:.6}"));
    }
    if let Some(v) = record.altitude {
        line("Altitude", format!("{v:.1} m"));
    }
    for (key, value) in &record.fields {
        line(key.as_str(), value.clone());
    }
    out
}
