//! IPTC-IIM reader for JPEG files.
//!
//! IIM bytes live in the APP13 segment, inside the Photoshop 8BIM resource
//! 0x0404. Only Record 2 (application record) is decoded.

use crate::metadata::FieldSelection;
use std::collections::BTreeMap;

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Record 2 dataset number and the field name it is reported under.
const DATASETS: &[(u8, &str)] = &[
    (5, "ObjectName"),
    (25, "Keywords"),
    (80, "By-line"),
    (90, "City"),
    (92, "Sub-location"),
    (95, "Province-State"),
    (100, "Country-PrimaryLocationCode"),
    (101, "Country"),
    (116, "CopyrightNotice"),
    (120, "Caption-Abstract"),
];

/// Reads IPTC fields from JPEG bytes. Repeated datasets (keywords) are
/// joined with `, `. Returns an empty map when nothing is present.
pub fn read_iptc_fields(bytes: &[u8], selection: &FieldSelection) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::<String, String>::new();
    let Some(iim) = find_jpeg_app13_iptc(bytes) else {
        return fields;
    };

    for (dataset, value) in parse_record2(iim) {
        let Some((_, name)) = DATASETS.iter().find(|(number, _)| *number == dataset) else {
            continue;
        };
        if !selection.keeps_field(name) {
            continue;
        }
        fields
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    fields
}

/// Each dataset: 0x1C, record, dataset, big-endian u16 length, data.
fn parse_record2(data: &[u8]) -> Vec<(u8, String)> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }

        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        if pos + length > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + length])
                .trim()
                .to_string();
            if !value.is_empty() {
                out.push((dataset, value));
            }
        }

        pos += length;
    }

    out
}

fn find_jpeg_app13_iptc(data: &[u8]) -> Option<&[u8]> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        // SOS: entropy-coded data follows, no more metadata segments.
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        if marker == 0xD8 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) || marker == 0xFF {
            pos += if marker == 0xFF { 1 } else { 2 };
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        if marker == 0xED && seg_start <= seg_end {
            if let Some(iptc) = extract_iptc_from_8bim(&data[seg_start..seg_end]) {
                return Some(iptc);
            }
        }
        pos += 2 + seg_len.max(2);
    }
    None
}

/// Resource layout: "8BIM", id (u16), padded pascal name, length (u32), data.
fn extract_iptc_from_8bim(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }
        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }

        pos += res_len + (res_len % 2);
    }

    None
}

/// Whether a JPEG carries an ICC profile (APP2 `ICC_PROFILE`), and its size.
pub fn icc_profile_len(data: &[u8]) -> Option<usize> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";

    let mut total = 0usize;
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        if marker == 0xD8 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) || marker == 0xFF {
            pos += if marker == 0xFF { 1 } else { 2 };
            continue;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        if marker == 0xE2 && seg_start <= seg_end {
            let segment = &data[seg_start..seg_end];
            if let Some(rest) = segment.strip_prefix(ICC_HEADER) {
                // Two bytes of chunk sequence numbers precede the profile data.
                total += rest.len().saturating_sub(2);
            }
        }
        pos += 2 + seg_len.max(2);
    }

    (total > 0).then_some(total)
}
