use crate::tools::{parse_args, require_filepaths, success_result, tool_error, ToolContext};
use exif_tour_core::rename_batch;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    filepaths: Vec<String>,
    template: Option<String>,
    date_format: Option<String>,
    time_format: Option<String>,
    dry_run: Option<bool>,
    backup: Option<bool>,
    counter_start: Option<u32>,
}

pub fn call(ctx: &ToolContext, args: &Value) -> Value {
    let args: Args = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };
    if let Err(err) = require_filepaths(&args.filepaths) {
        return err;
    }

    let mut options = ctx.config.rename_options();
    if let Some(template) = args.template {
        options.template = template;
    }
    if let Some(date_format) = args.date_format {
        options.date_format = date_format;
    }
    if let Some(time_format) = args.time_format {
        options.time_format = time_format;
    }
    if let Some(dry_run) = args.dry_run {
        options.dry_run = dry_run;
    }
    if let Some(backup) = args.backup {
        options.backup = backup;
    }
    if let Some(counter_start) = args.counter_start {
        options.counter_start = counter_start;
    }

    let report = ctx
        .validator()
        .and_then(|validator| rename_batch(&validator, &ctx.gateway, &args.filepaths, &options));

    match report {
        Ok(report) => success_result(report.summary(), &report),
        Err(err) => tool_error(&err, None),
    }
}
