use crate::tools::{parse_args, require_filepaths, success_result, tool_error, ToolContext};
use exif_tour_core::{FieldSelection, MetadataGateway, MetadataRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Write as _;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Args {
    filepaths: Vec<String>,
    #[serde(default)]
    options: FieldSelection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ItemStatus {
    Success,
    NoExif,
    Error,
}

#[derive(Debug, Serialize)]
struct BatchItem {
    filepath: String,
    status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<MetadataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
}

pub fn call(ctx: &ToolContext, args: &Value) -> Value {
    let args: Args = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };
    if let Err(err) = require_filepaths(&args.filepaths) {
        return err;
    }
    let validator = match ctx.validator() {
        Ok(validator) => validator,
        Err(err) => return tool_error(&err, None),
    };

    let items: Vec<BatchItem> = args
        .filepaths
        .iter()
        .map(|raw| {
            let extracted = validator
                .validate(raw)
                .and_then(|safe| ctx.gateway.extract(&safe, &args.options));
            match extracted {
                Ok(Some(record)) => BatchItem {
                    filepath: raw.clone(),
                    status: ItemStatus::Success,
                    data: Some(record),
                    error: None,
                    error_kind: None,
                },
                Ok(None) => BatchItem {
                    filepath: raw.clone(),
                    status: ItemStatus::NoExif,
                    data: None,
                    error: None,
                    error_kind: None,
                },
                Err(err) => {
                    debug!(filepath = %raw, error = %err, "batch item failed");
                    BatchItem {
                        filepath: raw.clone(),
                        status: ItemStatus::Error,
                        data: None,
                        error: Some(err.to_string()),
                        error_kind: Some(err.kind()),
                    }
                }
            }
        })
        .collect();

    let success = items
        .iter()
        .filter(|i| matches!(i.status, ItemStatus::Success))
        .count();
    let no_exif = items
        .iter()
        .filter(|i| matches!(i.status, ItemStatus::NoExif))
        .count();
    let errors = items.len() - success - no_exif;

    let mut text = format!(
        "Processed {} file(s): {success} with metadata, {no_exif} without, {errors} failed\n",
        items.len()
    );
    for item in &items {
        let detail = match item.status {
            ItemStatus::Success => "success".to_string(),
            ItemStatus::NoExif => "no EXIF data".to_string(),
            ItemStatus::Error => format!("error: {}", item.error.as_deref().unwrap_or_default()),
        };
        let _ = writeln!(text, "- {}: {detail}", item.filepath);
    }

    success_result(
        text,
        json!({
            "results": items,
            "success": success,
            "no_exif": no_exif,
            "errors": errors,
        }),
    )
}
