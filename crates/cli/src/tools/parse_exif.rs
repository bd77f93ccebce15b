use crate::tools::{format_record, parse_args, success_result, tool_error, ToolContext};
use exif_tour_core::{FieldSelection, MetadataGateway};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Args {
    filepath: String,
    #[serde(default)]
    options: FieldSelection,
}

pub fn call(ctx: &ToolContext, args: &Value) -> Value {
    let args: Args = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };

    let extracted = ctx.validator().and_then(|validator| {
        let safe = validator.validate(&args.filepath)?;
        ctx.gateway.extract(&safe, &args.options)
    });

    match extracted {
        Ok(Some(record)) => success_result(
            format!("Metadata for {}:\n{}", args.filepath, format_record(&record)),
            json!({
                "filepath": args.filepath,
                "status": "success",
                "data": record,
            }),
        ),
        Ok(None) => success_result(
            format!("No EXIF data found in {}", args.filepath),
            json!({
                "filepath": args.filepath,
                "status": "no_exif",
            }),
        ),
        Err(err) => tool_error(&err, Some(&args.filepath)),
    }
}
