use crate::exif_reader::parse_date;
use crate::metadata::{FieldSelection, MetadataRecord};
use std::collections::HashMap;

const PACKET_START: &[u8] = b"<x:xmpmeta";
const PACKET_END: &[u8] = b"</x:xmpmeta>";

/// Normalized XMP property name, and the name it is reported under.
const TARGET_XMP_KEYS: &[(&str, &str)] = &[
    ("datetimeoriginal", "DateTimeOriginal"),
    ("createdate", "CreateDate"),
    ("datecreated", "DateCreated"),
    ("make", "Make"),
    ("model", "Model"),
    ("lensmodel", "LensModel"),
    ("lens", "Lens"),
    ("gpslatitude", "GPSLatitude"),
    ("gpslongitude", "GPSLongitude"),
    ("gpsaltitude", "GPSAltitude"),
    ("city", "City"),
    ("state", "State"),
    ("country", "Country"),
    ("countrycode", "CountryCode"),
    ("location", "Location"),
    ("rating", "Rating"),
    ("label", "Label"),
    ("creatortool", "CreatorTool"),
];

/// Keys that feed named record fields rather than the pass-through map.
const RECOGNIZED_KEYS: &[&str] = &[
    "datetimeoriginal",
    "createdate",
    "make",
    "model",
    "lensmodel",
    "gpslatitude",
    "gpslongitude",
    "gpsaltitude",
];

/// Reads the XMP packet embedded in an image file's bytes, if any.
pub fn read_embedded_xmp(bytes: &[u8], selection: &FieldSelection) -> Option<MetadataRecord> {
    let packet = find_packet(bytes)?;
    let xml = String::from_utf8_lossy(packet);
    let values = collect_tag_values(&xml);
    if values.is_empty() {
        return None;
    }

    let mut record = MetadataRecord {
        date_time_original: values.get("datetimeoriginal").and_then(|v| parse_date(v)),
        create_date: values.get("createdate").and_then(|v| parse_date(v)),
        make: values.get("make").cloned(),
        model: values.get("model").cloned(),
        lens_model: values
            .get("lensmodel")
            .or_else(|| values.get("lens"))
            .cloned(),
        ..MetadataRecord::default()
    };

    if selection.gps {
        record.latitude = values
            .get("gpslatitude")
            .and_then(|v| parse_coordinate(v, 90.0));
        record.longitude = values
            .get("gpslongitude")
            .and_then(|v| parse_coordinate(v, 180.0));
        record.altitude = values.get("gpsaltitude").and_then(|v| parse_rational(v));
    }

    for (key, display) in TARGET_XMP_KEYS {
        if RECOGNIZED_KEYS.contains(key) || !selection.keeps_field(display) {
            continue;
        }
        if let Some(value) = values.get(*key) {
            record.fields.insert(display.to_string(), value.clone());
        }
    }

    Some(record)
}

fn find_packet(bytes: &[u8]) -> Option<&[u8]> {
    let start = find_subslice(bytes, PACKET_START, 0)?;
    let end = find_subslice(bytes, PACKET_END, start)?;
    Some(&bytes[start..end + PACKET_END.len()])
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn is_target(suffix: &str) -> bool {
    TARGET_XMP_KEYS.iter().any(|(key, _)| *key == suffix)
}

fn collect_tag_values(xml: &str) -> HashMap<String, String> {
    let mut values = HashMap::<String, String>::new();
    let mut cursor = 0usize;

    while let Some(start) = xml[cursor..].find('<') {
        let start = cursor + start;
        let Some(raw_end) = xml[start..].find('>') else {
            break;
        };
        let end = raw_end + start;
        let raw_tag = &xml[start + 1..end];

        if raw_tag.starts_with('/') || raw_tag.starts_with('?') || raw_tag.starts_with('!') {
            cursor = end + 1;
            continue;
        }

        collect_attribute_values(raw_tag, &mut values);

        let tag_name = raw_tag.split_whitespace().next().unwrap_or_default();
        let suffix = normalize_tag_name(tag_name);
        if !is_target(&suffix) || values.contains_key(&suffix) {
            cursor = end + 1;
            continue;
        }

        let close_tag = format!("</{}>", tag_name);
        if let Some(close_pos) = xml[end + 1..].find(&close_tag) {
            let close_pos = end + 1 + close_pos;
            let content = first_text(&xml[end + 1..close_pos]);
            if !content.is_empty() {
                values.insert(suffix, html_unescape_basic(&content));
            }
        }

        cursor = end + 1;
    }

    values
}

/// Text of an element, or of its first `rdf:li` when the value is an
/// `rdf:Alt`/`rdf:Seq` container.
fn first_text(inner: &str) -> String {
    let trimmed = inner.trim();
    if !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    let Some(li_start) = trimmed.find("<rdf:li") else {
        return String::new();
    };
    let Some(open_end) = trimmed[li_start..].find('>') else {
        return String::new();
    };
    let text_start = li_start + open_end + 1;
    let Some(text_len) = trimmed[text_start..].find("</rdf:li>") else {
        return String::new();
    };
    trimmed[text_start..text_start + text_len].trim().to_string()
}

fn collect_attribute_values(raw_tag: &str, values: &mut HashMap<String, String>) {
    let bytes = raw_tag.as_bytes();
    let mut cursor = 0usize;

    while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }

    while cursor < bytes.len() {
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] == b'/' {
            break;
        }

        let name_start = cursor;
        while cursor < bytes.len()
            && !bytes[cursor].is_ascii_whitespace()
            && bytes[cursor] != b'='
            && bytes[cursor] != b'/'
        {
            cursor += 1;
        }
        if name_start == cursor {
            cursor += 1;
            continue;
        }
        let raw_name = &raw_tag[name_start..cursor];

        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] != b'=' {
            while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            continue;
        }
        cursor += 1;

        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() {
            break;
        }

        let (value_start, value_end) = if bytes[cursor] == b'"' || bytes[cursor] == b'\'' {
            let quote = bytes[cursor];
            cursor += 1;
            let value_start = cursor;
            while cursor < bytes.len() && bytes[cursor] != quote {
                cursor += 1;
            }
            if cursor >= bytes.len() {
                break;
            }
            let value_end = cursor;
            cursor += 1;
            (value_start, value_end)
        } else {
            let value_start = cursor;
            while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            (value_start, cursor)
        };

        let suffix = normalize_tag_name(raw_name);
        if !is_target(&suffix) || values.contains_key(&suffix) {
            continue;
        }

        let value = raw_tag[value_start..value_end].trim();
        if value.is_empty() {
            continue;
        }
        values.insert(suffix, html_unescape_basic(value));
    }
}

fn normalize_tag_name(tag: &str) -> String {
    tag.rsplit(':')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn html_unescape_basic(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// XMP GPS coordinates look like `35,40.5N` or `35,40,30N`. Values that are
/// not finite or exceed `limit` degrees are rejected.
fn parse_coordinate(input: &str, limit: f64) -> Option<f64> {
    let input = input.trim();
    let reference = input.chars().last()?;
    let body = &input[..input.len() - reference.len_utf8()];
    let mut parts = body.split(',').map(|p| p.trim().parse::<f64>());
    let degrees = parts.next()?.ok()?;
    let minutes = parts.next().transpose().ok()?.unwrap_or(0.0);
    let seconds = parts.next().transpose().ok()?.unwrap_or(0.0);
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    if !value.is_finite() || value.abs() > limit {
        return None;
    }
    match reference.to_ascii_uppercase() {
        'N' | 'E' => Some(value),
        'S' | 'W' => Some(-value),
        _ => None,
    }
}

fn parse_rational(input: &str) -> Option<f64> {
    let input = input.trim();
    let value = match input.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(num / den)
        }
        None => input.parse::<f64>().ok(),
    };
    value.filter(|value| value.is_finite())
}
