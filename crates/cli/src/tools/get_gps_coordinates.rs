use crate::tools::{parse_args, success_result, tool_error, ToolContext};
use exif_tour_core::MetadataGateway;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Args {
    filepath: String,
}

pub fn call(ctx: &ToolContext, args: &Value) -> Value {
    let args: Args = match parse_args(args) {
        Ok(args) => args,
        Err(err) => return err,
    };

    let extracted = ctx.validator().and_then(|validator| {
        let safe = validator.validate(&args.filepath)?;
        ctx.gateway.extract_gps(&safe)
    });

    match extracted {
        Ok(Some(gps)) => {
            let mut text = format!(
                "GPS coordinates for {}:\nLatitude: {:.6}\nLongitude: {:.6}\n",
                args.filepath, gps.latitude, gps.longitude
            );
            if let Some(altitude) = gps.altitude {
                text.push_str(&format!("Altitude: {altitude:.1} m\n"));
            }
            text.push_str(&format!("Map: {}\n", gps.map_link()));

            success_result(
                text,
                json!({
                    "filepath": args.filepath,
                    "coordinates": gps,
                    "mapLink": gps.map_link(),
                }),
            )
        }
        Ok(None) => success_result(
            format!("No GPS data found in {}", args.filepath),
            json!({
                "filepath": args.filepath,
                "coordinates": null,
            }),
        ),
        Err(err) => tool_error(&err, Some(&args.filepath)),
    }
}
