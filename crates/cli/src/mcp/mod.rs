use serde_json::json;

pub mod contracts;
pub mod errors;

pub fn tool_definitions() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": contracts::TOOL_PARSE_EXIF,
            "description": "Read EXIF, GPS, XMP and IPTC metadata from one image.",
            "inputSchema": contracts::parse_exif_schema()
        }),
        json!({
            "name": contracts::TOOL_PARSE_EXIF_BATCH,
            "description": "Read metadata from several images; each file reports success, no_exif or error.",
            "inputSchema": contracts::parse_exif_batch_schema()
        }),
        json!({
            "name": contracts::TOOL_GET_GPS_COORDINATES,
            "description": "Get latitude, longitude and altitude of an image with a map link.",
            "inputSchema": contracts::get_gps_coordinates_schema()
        }),
        json!({
            "name": contracts::TOOL_RENAME_BY_EXIF,
            "description": "Rename images from a metadata template. Dry run by default.",
            "inputSchema": contracts::rename_by_exif_schema()
        }),
        json!({
            "name": contracts::TOOL_CREATE_PHOTO_TOUR_KMZ,
            "description": "Build a KMZ photo tour from geotagged images, ordered by capture time.",
            "inputSchema": contracts::create_photo_tour_kmz_schema()
        }),
    ]
}
