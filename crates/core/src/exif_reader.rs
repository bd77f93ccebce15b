use crate::error::ToolError;
use crate::metadata::{FieldSelection, MetadataRecord};
use chrono::{DateTime, NaiveDateTime};
use exif::{Context as TagContext, Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tags lifted into [`MetadataRecord`]'s named fields instead of the
/// pass-through map.
const RECOGNIZED_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,
    Tag::DateTimeDigitized,
    Tag::Make,
    Tag::Model,
    Tag::LensModel,
    Tag::GPSLatitude,
    Tag::GPSLatitudeRef,
    Tag::GPSLongitude,
    Tag::GPSLongitudeRef,
    Tag::GPSAltitude,
    Tag::GPSAltitudeRef,
];

/// Reads the EXIF block of `path`. `Ok(None)` means the container carries no
/// EXIF at all; anything else that goes wrong is an extraction error.
pub fn read_exif_metadata(
    path: &Path,
    selection: &FieldSelection,
) -> Result<Option<MetadataRecord>, ToolError> {
    let file = File::open(path).map_err(|err| {
        ToolError::Extraction(format!("cannot open {}: {err}", path.display()))
    })?;
    let mut buf = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(err) => {
            return Err(ToolError::Extraction(format!(
                "cannot decode EXIF in {}: {err}",
                path.display()
            )))
        }
    };

    Ok(Some(record_from_exif(&exif, selection)))
}

fn record_from_exif(exif: &Exif, selection: &FieldSelection) -> MetadataRecord {
    let mut record = MetadataRecord {
        date_time_original: ascii_field(exif, Tag::DateTimeOriginal)
            .as_deref()
            .and_then(parse_date),
        create_date: ascii_field(exif, Tag::DateTimeDigitized)
            .as_deref()
            .and_then(parse_date),
        make: ascii_field(exif, Tag::Make),
        model: ascii_field(exif, Tag::Model),
        lens_model: ascii_field(exif, Tag::LensModel),
        ..MetadataRecord::default()
    };

    if selection.gps {
        record.latitude = gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S");
        record.longitude = gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W");
        record.altitude = gps_altitude(exif);
    }

    for field in exif.fields() {
        if RECOGNIZED_TAGS.contains(&field.tag) && field.ifd_num == In::PRIMARY {
            continue;
        }
        if field.tag.context() == TagContext::Gps && !selection.gps {
            continue;
        }
        let name = if field.ifd_num == In::THUMBNAIL {
            if !selection.thumbnail {
                continue;
            }
            format!("Thumbnail{}", field.tag)
        } else {
            field.tag.to_string()
        };
        if !selection.keeps_field(&name) {
            continue;
        }
        if let Some(value) = display_field(exif, field) {
            record.fields.entry(name).or_insert(value);
        }
    }

    record
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|part| String::from_utf8_lossy(part).trim().to_string())
            .find(|part| !part.is_empty()),
        _ => normalize(Some(field.display_value().to_string())),
    }
}

fn display_field(exif: &Exif, field: &Field) -> Option<String> {
    let value = match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|part| String::from_utf8_lossy(part).trim().to_string())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Undefined(bytes, _) if bytes.len() > 64 => format!("({} bytes)", bytes.len()),
        _ => field.display_value().with_unit(exif).to_string(),
    };
    normalize(Some(value))
}

fn gps_coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    let degrees = parts.first()?.to_f64();
    let minutes = parts.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
    let seconds = parts.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    if !value.is_finite() {
        return None;
    }

    let negative = ascii_field(exif, ref_tag)
        .map(|r| r.eq_ignore_ascii_case(negative_ref))
        .unwrap_or(false);
    Some(if negative { -value } else { value })
}

fn gps_altitude(exif: &Exif) -> Option<f64> {
    let field = exif.get_field(Tag::GPSAltitude, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    let value = parts.first()?.to_f64();
    if !value.is_finite() {
        return None;
    }
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .map(|v| v == 1)
        .unwrap_or(false);
    Some(if below_sea_level { -value } else { value })
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses the timestamp layouts seen in EXIF and XMP. Offsets are dropped:
/// capture times are kept as the camera's wall-clock time.
pub(crate) fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim();

    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.naive_local());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            return Some(naive);
        }
    }

    None
}
