//! Metadata Gateway: the single seam through which the engines read
//! embedded metadata.
//!
//! | Block | Source |
//! |---|---|
//! | EXIF / GPS / IFD1 | `kamadak-exif` |
//! | XMP | embedded `<x:xmpmeta>` packet ([`crate::xmp_reader`]) |
//! | IPTC | JPEG APP13 ([`crate::iptc_reader`]) |
//! | ICC | JPEG APP2 presence only |

use crate::error::ToolError;
use crate::exif_reader::read_exif_metadata;
use crate::iptc_reader::{icc_profile_len, read_iptc_fields};
use crate::metadata::{FieldSelection, GpsCoordinates, MetadataRecord};
use crate::path_guard::SafePath;
use crate::xmp_reader::read_embedded_xmp;
use std::fs;

pub trait MetadataGateway {
    /// `Ok(None)` when the file carries no embedded metadata at all.
    fn extract(
        &self,
        path: &SafePath,
        selection: &FieldSelection,
    ) -> Result<Option<MetadataRecord>, ToolError>;

    fn extract_gps(&self, path: &SafePath) -> Result<Option<GpsCoordinates>, ToolError> {
        Ok(self
            .extract(path, &FieldSelection::gps_only())?
            .and_then(|record| record.gps()))
    }
}

/// Production gateway backed by `kamadak-exif` plus the embedded XMP/IPTC
/// readers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifGateway;

impl ExifGateway {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataGateway for ExifGateway {
    fn extract(
        &self,
        path: &SafePath,
        selection: &FieldSelection,
    ) -> Result<Option<MetadataRecord>, ToolError> {
        let exif = read_exif_metadata(path.as_path(), selection)?;
        if !(selection.xmp || selection.iptc || selection.icc) {
            return Ok(exif);
        }

        let bytes = fs::read(path.as_path())
            .map_err(|err| ToolError::Extraction(format!("cannot read {path}: {err}")))?;

        let mut record = exif;
        if selection.xmp {
            if let Some(xmp) = read_embedded_xmp(&bytes, selection) {
                match record.as_mut() {
                    Some(existing) => existing.merge_missing_from(&xmp),
                    None => record = Some(xmp),
                }
            }
        }

        let mut extra = Vec::new();
        if selection.iptc {
            extra.extend(read_iptc_fields(&bytes, selection));
        }
        if selection.icc && selection.keeps_field("ICCProfile") {
            if let Some(len) = icc_profile_len(&bytes) {
                extra.push(("ICCProfile".to_string(), format!("{len} bytes")));
            }
        }
        if !extra.is_empty() {
            let target = record.get_or_insert_with(MetadataRecord::default);
            for (key, value) in extra {
                target.fields.entry(key).or_insert(value);
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;

    /// Gateway that serves canned records keyed by file name.
    #[derive(Debug, Default)]
    pub struct StubGateway {
        records: HashMap<String, MetadataRecord>,
        failures: HashMap<String, String>,
    }

    impl StubGateway {
        pub fn with(mut self, file_name: &str, record: MetadataRecord) -> Self {
            self.records.insert(file_name.to_string(), record);
            self
        }

        pub fn failing(mut self, file_name: &str, message: &str) -> Self {
            self.failures
                .insert(file_name.to_string(), message.to_string());
            self
        }
    }

    impl MetadataGateway for StubGateway {
        fn extract(
            &self,
            path: &SafePath,
            _selection: &FieldSelection,
        ) -> Result<Option<MetadataRecord>, ToolError> {
            let key = path.file_name();
            if let Some(message) = self.failures.get(&key) {
                return Err(ToolError::Extraction(message.clone()));
            }
            Ok(self.records.get(&key).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubGateway;
    use super::*;
    use crate::path_guard::PathValidator;
    use tempfile::tempdir;

    #[test]
    fn plain_jpeg_yields_no_data() {
        let temp = tempdir().expect("tempdir");
        image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]))
            .save(temp.path().join("plain.jpg"))
            .expect("write jpeg");
        let validator = PathValidator::new(temp.path()).expect("validator");
        let safe = validator.validate("plain.jpg").expect("valid");

        let gateway = ExifGateway::new();
        assert!(gateway
            .extract(&safe, &FieldSelection::default())
            .expect("extract")
            .is_none());
        assert!(gateway.extract_gps(&safe).expect("gps").is_none());
    }

    #[test]
    fn default_extract_gps_uses_record_coordinates() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a.jpg"), b"x").expect("write");
        let validator = PathValidator::new(temp.path()).expect("validator");
        let safe = validator.validate("a.jpg").expect("valid");

        let gateway = StubGateway::default().with(
            "a.jpg",
            MetadataRecord {
                latitude: Some(48.8584),
                longitude: Some(2.2945),
                altitude: Some(35.0),
                ..MetadataRecord::default()
            },
        );
        let gps = gateway.extract_gps(&safe).expect("gps").expect("coordinates");
        assert_eq!(gps.latitude, 48.8584);
        assert_eq!(gps.altitude, Some(35.0));
    }
}
