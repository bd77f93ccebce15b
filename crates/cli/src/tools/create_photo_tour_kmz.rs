use crate::tools::{parse_args, require_filepaths, success_result, tool_error, ToolContext};
use exif_tour_core::create_tour;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    filepaths: Vec<String>,
    output_path: String,
    title: Option<String>,
    description: Option<String>,
    thumbnail_size: Option<u32>,
    include_full_images: Option<bool>,
    draw_path: Option<bool>,
    number_photos: Option<bool>,
}

pub fn call(ctx: &ToolContext, args: &Value) -> Value {
    let args: Args = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };
    if let Err(err) = require_filepaths(&args.filepaths) {
        return err;
    }

    let mut options = ctx.config.tour_options();
    if let Some(title) = args.title {
        options.title = title;
    }
    if let Some(description) = args.description {
        options.description = description;
    }
    if let Some(size) = args.thumbnail_size {
        options.thumbnail_size = size;
    }
    if let Some(include) = args.include_full_images {
        options.include_full_images = include;
    }
    if let Some(draw_path) = args.draw_path {
        options.draw_path = draw_path;
    }
    if let Some(number_photos) = args.number_photos {
        options.number_photos = number_photos;
    }

    let outcome = ctx.validator().and_then(|validator| {
        create_tour(
            &validator,
            &ctx.gateway,
            &ctx.images,
            &args.filepaths,
            &args.output_path,
            &options,
        )
    });

    match outcome {
        Ok(outcome) => success_result(outcome.summary(), &outcome),
        Err(err) => tool_error(&err, Some(&args.output_path)),
    }
}
