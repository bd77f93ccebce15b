use serde_json::json;

pub const TOOL_PARSE_EXIF: &str = "parse_exif";
pub const TOOL_PARSE_EXIF_BATCH: &str = "parse_exif_batch";
pub const TOOL_GET_GPS_COORDINATES: &str = "get_gps_coordinates";
pub const TOOL_RENAME_BY_EXIF: &str = "rename_by_exif";
pub const TOOL_CREATE_PHOTO_TOUR_KMZ: &str = "create_photo_tour_kmz";

pub const PROTOCOL_VERSION: &str = "2025-11-25";

fn parse_options_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "gps": { "type": "boolean", "default": true },
            "thumbnail": { "type": "boolean", "default": false },
            "xmp": { "type": "boolean", "default": true },
            "icc": { "type": "boolean", "default": false },
            "iptc": { "type": "boolean", "default": true },
            "pick": { "type": "array", "items": { "type": "string" } }
        },
        "additionalProperties": false
    })
}

fn filepaths_schema() -> serde_json::Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "minItems": 1
    })
}

pub fn parse_exif_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "filepath": { "type": "string" },
            "options": parse_options_schema()
        },
        "required": ["filepath"],
        "additionalProperties": false
    })
}

pub fn parse_exif_batch_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "filepaths": filepaths_schema(),
            "options": parse_options_schema()
        },
        "required": ["filepaths"],
        "additionalProperties": false
    })
}

pub fn get_gps_coordinates_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "filepath": { "type": "string" }
        },
        "required": ["filepath"],
        "additionalProperties": false
    })
}

pub fn rename_by_exif_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "filepaths": filepaths_schema(),
            "template": {
                "type": "string",
                "description": "Placeholders: {date} {time} {datetime} {camera} {model} {lens} {location} {city} {country} {original} {counter}"
            },
            "dateFormat": { "type": "string", "description": "YYYY, MM and DD tokens" },
            "timeFormat": { "type": "string", "description": "HH, mm and ss tokens" },
            "dryRun": { "type": "boolean", "default": true },
            "backup": { "type": "boolean", "default": true },
            "counterStart": { "type": "integer", "minimum": 0, "default": 1 }
        },
        "required": ["filepaths"],
        "additionalProperties": false
    })
}

pub fn create_photo_tour_kmz_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "filepaths": filepaths_schema(),
            "outputPath": { "type": "string", "pattern": "\\.[kK][mM][zZ]$" },
            "title": { "type": "string", "default": "Photo Tour" },
            "description": { "type": "string" },
            "thumbnailSize": { "type": "integer", "minimum": 32, "maximum": 2048, "default": 400 },
            "includeFullImages": { "type": "boolean", "default": false },
            "drawPath": { "type": "boolean", "default": true },
            "numberPhotos": { "type": "boolean", "default": true }
        },
        "required": ["filepaths", "outputPath"],
        "additionalProperties": false
    })
}
