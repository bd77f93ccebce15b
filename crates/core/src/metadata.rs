use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized view of one file's embedded metadata.
///
/// A file with no embedded metadata at all is represented by the gateway
/// returning `None`, never by an empty record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub date_time_original: Option<NaiveDateTime>,
    pub create_date: Option<NaiveDateTime>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens_model: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    /// Pass-through tags keyed by tag name (`City`, `ExposureTime`, ...).
    pub fields: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// DateTimeOriginal, then CreateDate.
    pub fn capture_time(&self) -> Option<NaiveDateTime> {
        self.date_time_original.or(self.create_date)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn gps(&self) -> Option<GpsCoordinates> {
        self.coordinates().map(|(latitude, longitude)| GpsCoordinates {
            latitude,
            longitude,
            altitude: self.altitude,
        })
    }

    /// First non-empty pass-through value among `keys`, matched case-insensitively.
    pub fn field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.trim())
                .filter(|value| !value.is_empty())
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &MetadataRecord::default()
    }

    /// Fills recognized fields that are still missing from `fallback`, and
    /// adds pass-through fields that are not present yet.
    pub fn merge_missing_from(&mut self, fallback: &MetadataRecord) {
        if self.date_time_original.is_none() {
            self.date_time_original = fallback.date_time_original;
        }
        if self.create_date.is_none() {
            self.create_date = fallback.create_date;
        }
        if self.make.is_none() {
            self.make = fallback.make.clone();
        }
        if self.model.is_none() {
            self.model = fallback.model.clone();
        }
        if self.lens_model.is_none() {
            self.lens_model = fallback.lens_model.clone();
        }
        if self.latitude.is_none() || self.longitude.is_none() {
            if let Some((lat, lon)) = fallback.coordinates() {
                self.latitude = Some(lat);
                self.longitude = Some(lon);
            }
        }
        if self.altitude.is_none() {
            self.altitude = fallback.altitude;
        }
        for (key, value) in &fallback.fields {
            self.fields
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GpsCoordinates {
    pub fn map_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Which metadata blocks the gateway should decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    pub gps: bool,
    pub thumbnail: bool,
    pub xmp: bool,
    pub icc: bool,
    pub iptc: bool,
    /// Restricts pass-through fields to these tag names.
    pub pick: Option<Vec<String>>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            gps: true,
            thumbnail: false,
            xmp: true,
            icc: false,
            iptc: true,
            pick: None,
        }
    }
}

impl FieldSelection {
    pub fn rename() -> Self {
        Self {
            gps: true,
            thumbnail: false,
            xmp: true,
            icc: false,
            iptc: true,
            pick: None,
        }
    }

    pub fn tour() -> Self {
        Self {
            gps: true,
            thumbnail: false,
            xmp: false,
            icc: false,
            iptc: false,
            pick: Some(
                [
                    "DateTimeOriginal",
                    "CreateDate",
                    "Make",
                    "Model",
                    "LensModel",
                ]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            ),
        }
    }

    pub fn gps_only() -> Self {
        Self {
            gps: true,
            thumbnail: false,
            xmp: false,
            icc: false,
            iptc: false,
            pick: Some(Vec::new()),
        }
    }

    pub fn keeps_field(&self, name: &str) -> bool {
        match &self.pick {
            Some(pick) => pick.iter().any(|p| p.eq_ignore_ascii_case(name)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 9)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn capture_time_prefers_original_over_create_date() {
        let mut record = MetadataRecord {
            create_date: Some(at(8)),
            ..MetadataRecord::default()
        };
        assert_eq!(record.capture_time(), Some(at(8)));

        record.date_time_original = Some(at(9));
        assert_eq!(record.capture_time(), Some(at(9)));
    }

    #[test]
    fn gps_requires_both_coordinates() {
        let mut record = MetadataRecord {
            latitude: Some(35.0),
            ..MetadataRecord::default()
        };
        assert!(record.gps().is_none());

        record.longitude = Some(139.0);
        record.altitude = Some(12.5);
        let gps = record.gps().expect("gps");
        assert_eq!(gps.altitude, Some(12.5));
        assert_eq!(gps.map_link(), "https://www.google.com/maps?q=35,139");
    }

    #[test]
    fn field_lookup_is_case_insensitive_and_skips_blank() {
        let mut record = MetadataRecord::default();
        record.fields.insert("city".into(), "  ".into());
        record.fields.insert("CountryName".into(), "Japan".into());

        assert_eq!(record.field(&["City"]), None);
        assert_eq!(record.field(&["Country", "countryname"]), Some("Japan"));
    }

    #[test]
    fn merge_missing_from_only_fills_missing_fields() {
        let mut base = MetadataRecord {
            make: Some("Canon".into()),
            latitude: Some(1.0),
            ..MetadataRecord::default()
        };
        base.fields.insert("City".into(), "Kyoto".into());

        let mut fallback = MetadataRecord {
            make: Some("Nikon".into()),
            model: Some("Z6".into()),
            latitude: Some(35.0),
            longitude: Some(139.0),
            create_date: Some(at(10)),
            ..MetadataRecord::default()
        };
        fallback.fields.insert("City".into(), "Tokyo".into());
        fallback.fields.insert("Rating".into(), "5".into());

        base.merge_missing_from(&fallback);
        assert_eq!(base.make.as_deref(), Some("Canon"));
        assert_eq!(base.model.as_deref(), Some("Z6"));
        assert_eq!(base.coordinates(), Some((35.0, 139.0)));
        assert_eq!(base.create_date, Some(at(10)));
        assert_eq!(base.fields.get("City").map(String::as_str), Some("Kyoto"));
        assert_eq!(base.fields.get("Rating").map(String::as_str), Some("5"));
    }

    #[test]
    fn selection_defaults_match_documented_values() {
        let selection = FieldSelection::default();
        assert!(selection.gps && selection.xmp && selection.iptc);
        assert!(!selection.thumbnail && !selection.icc);
        assert!(selection.pick.is_none());

        let parsed: FieldSelection =
            serde_json::from_str(r#"{"icc": true}"#).expect("partial options parse");
        assert!(parsed.icc);
        assert!(parsed.gps);
    }

    #[test]
    fn pick_restricts_pass_through_fields() {
        let selection = FieldSelection::tour();
        assert!(selection.keeps_field("make"));
        assert!(!selection.keeps_field("ExposureTime"));
        assert!(FieldSelection::default().keeps_field("anything"));
    }
}
