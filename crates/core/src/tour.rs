use crate::archive::package_directory;
use crate::error::ToolError;
use crate::gateway::MetadataGateway;
use crate::imaging::ImageProcessor;
use crate::kml::build_document;
use crate::metadata::FieldSelection;
use crate::path_guard::PathValidator;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DOCUMENT_NAME: &str = "doc.kml";
pub const IMAGES_DIR: &str = "images";
pub const MIN_THUMBNAIL_SIZE: u32 = 32;
pub const MAX_THUMBNAIL_SIZE: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourOptions {
    pub title: String,
    pub description: String,
    pub thumbnail_size: u32,
    pub include_full_images: bool,
    pub draw_path: bool,
    pub number_photos: bool,
}

impl Default for TourOptions {
    fn default() -> Self {
        Self {
            title: "Photo Tour".to_string(),
            description: String::new(),
            thumbnail_size: 400,
            include_full_images: false,
            draw_path: true,
            number_photos: true,
        }
    }
}

impl TourOptions {
    fn normalized(&self) -> Self {
        Self {
            thumbnail_size: self
                .thumbnail_size
                .clamp(MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE),
            ..self.clone()
        }
    }
}

/// One photo accepted into a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoTourEntry {
    /// 1-based, assigned after the chronological sort.
    pub sequence: usize,
    pub id: String,
    pub source: PathBuf,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub timestamp: NaiveDateTime,
    pub camera: Option<String>,
    pub lens: Option<String>,
    /// Archive-relative thumbnail path.
    pub thumbnail: String,
    pub full_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSummary {
    pub output: PathBuf,
    pub considered: usize,
    pub skipped: usize,
    pub image_failures: usize,
    pub archive_bytes: u64,
    pub entries: Vec<PhotoTourEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TourOutcome {
    NoGpsPhotos { considered: usize },
    Created(TourSummary),
}

impl TourOutcome {
    pub fn summary(&self) -> String {
        match self {
            TourOutcome::NoGpsPhotos { considered } => format!(
                "No photos with GPS data found among {considered} file(s). No tour was created."
            ),
            TourOutcome::Created(summary) => {
                let mut out = String::new();
                let _ = writeln!(out, "Photo tour created: {}", summary.output.display());
                let _ = writeln!(
                    out,
                    "Photos included: {} of {} ({} skipped)",
                    summary.entries.len(),
                    summary.considered,
                    summary.skipped
                );
                if summary.image_failures > 0 {
                    let _ = writeln!(
                        out,
                        "Image assets that failed to generate: {}",
                        summary.image_failures
                    );
                }
                let _ = writeln!(out, "Archive size: {} bytes", summary.archive_bytes);
                out.push('\n');
                for entry in &summary.entries {
                    let _ = writeln!(
                        out,
                        "{}. {} ({}) at {:.6}, {:.6}",
                        entry.sequence,
                        entry.id,
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.latitude,
                        entry.longitude
                    );
                }
                out
            }
        }
    }
}

/// Builds a KMZ photo tour at `output_path` from the photos that carry GPS
/// coordinates. Files that fail validation or extraction, or that lack
/// coordinates, are left out without failing the call.
pub fn create_tour(
    validator: &PathValidator,
    gateway: &dyn MetadataGateway,
    images: &dyn ImageProcessor,
    filepaths: &[String],
    output_path: &str,
    options: &TourOptions,
) -> Result<TourOutcome, ToolError> {
    create_tour_in(
        &std::env::temp_dir(),
        validator,
        gateway,
        images,
        filepaths,
        output_path,
        options,
    )
}

fn create_tour_in(
    scratch_parent: &Path,
    validator: &PathValidator,
    gateway: &dyn MetadataGateway,
    images: &dyn ImageProcessor,
    filepaths: &[String],
    output_path: &str,
    options: &TourOptions,
) -> Result<TourOutcome, ToolError> {
    if filepaths.is_empty() {
        return Err(ToolError::InvalidInput(
            "filepaths must be a non-empty array".to_string(),
        ));
    }
    let output = validator.validate_output(output_path, "kmz")?;
    let options = options.normalized();

    let mut entries: Vec<PhotoTourEntry> = filepaths
        .iter()
        .filter_map(|raw| match collect_entry(validator, gateway, raw) {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                debug!(filepath = %raw, "no GPS coordinates, left out of tour");
                None
            }
            Err(err) => {
                debug!(filepath = %raw, error = %err, "left out of tour");
                None
            }
        })
        .collect();

    if entries.is_empty() {
        info!(considered = filepaths.len(), "no photos with GPS data");
        return Ok(TourOutcome::NoGpsPhotos {
            considered: filepaths.len(),
        });
    }

    entries.sort_by_key(|entry| entry.timestamp);
    for (index, entry) in entries.iter_mut().enumerate() {
        let sequence = index + 1;
        entry.sequence = sequence;
        entry.thumbnail = format!("{IMAGES_DIR}/thumb_{sequence:03}.jpg");
        if options.include_full_images {
            let ext = entry
                .source
                .extension()
                .map(|v| v.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_else(|| "jpg".to_string());
            entry.full_image = Some(format!("{IMAGES_DIR}/photo_{sequence:03}.{ext}"));
        }
    }

    // Removed on drop, whichever way this function returns.
    let workspace = tempfile::Builder::new()
        .prefix("photo_tour_")
        .tempdir_in(scratch_parent)
        .map_err(|err| ToolError::Packaging(format!("cannot create scratch workspace: {err}")))?;
    fs::create_dir(workspace.path().join(IMAGES_DIR))
        .map_err(|err| ToolError::Packaging(format!("cannot create image directory: {err}")))?;

    let image_failures = write_image_assets(images, workspace.path(), &entries, &options);

    fs::write(
        workspace.path().join(DOCUMENT_NAME),
        build_document(&entries, &options),
    )
    .map_err(|err| ToolError::Packaging(format!("cannot write {DOCUMENT_NAME}: {err}")))?;

    let archive_bytes = package_directory(workspace.path(), DOCUMENT_NAME, &output)?;
    info!(
        output = %output.display(),
        photos = entries.len(),
        archive_bytes,
        "photo tour created"
    );

    Ok(TourOutcome::Created(TourSummary {
        output,
        considered: filepaths.len(),
        skipped: filepaths.len() - entries.len(),
        image_failures,
        archive_bytes,
        entries,
    }))
}

fn collect_entry(
    validator: &PathValidator,
    gateway: &dyn MetadataGateway,
    raw: &str,
) -> Result<Option<PhotoTourEntry>, ToolError> {
    let safe = validator.validate(raw)?;
    let Some(record) = gateway.extract(&safe, &FieldSelection::tour())? else {
        return Ok(None);
    };
    let Some((latitude, longitude)) = record.coordinates() else {
        return Ok(None);
    };

    let camera = [record.make.as_deref(), record.model.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Some(PhotoTourEntry {
        sequence: 0,
        id: safe.file_name(),
        source: safe.as_path().to_path_buf(),
        latitude,
        longitude,
        altitude: record.altitude,
        timestamp: record
            .capture_time()
            .unwrap_or_else(|| Local::now().naive_local()),
        camera: (!camera.is_empty()).then_some(camera),
        lens: record.lens_model.clone(),
        thumbnail: String::new(),
        full_image: None,
    }))
}

/// Returns how many assets failed. Failures leave the document pointing at
/// a missing image rather than aborting the tour.
fn write_image_assets(
    images: &dyn ImageProcessor,
    workspace: &Path,
    entries: &[PhotoTourEntry],
    options: &TourOptions,
) -> usize {
    let mut failures = 0;
    for entry in entries {
        let thumb = workspace.join(&entry.thumbnail);
        if let Err(err) = images.thumbnail(&entry.source, &thumb, options.thumbnail_size) {
            warn!(photo = %entry.id, error = %err, "thumbnail generation failed");
            failures += 1;
        }
        if let Some(full) = &entry.full_image {
            if let Err(err) = images.full_copy(&entry.source, &workspace.join(full)) {
                warn!(photo = %entry.id, error = %err, "full image copy failed");
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::stub::StubGateway;
    use crate::imaging::mock::{MockProcessor, RecordedOp};
    use crate::metadata::MetadataRecord;
    use chrono::NaiveDate;
    use std::io::Read;
    use tempfile::tempdir;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 9)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid datetime")
    }

    fn geotagged(hour: u32, lat: f64, lon: f64) -> MetadataRecord {
        MetadataRecord {
            date_time_original: Some(at(hour)),
            make: Some("Canon".to_string()),
            model: Some("EOS R5".to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
            ..MetadataRecord::default()
        }
    }

    struct Fixture {
        root: tempfile::TempDir,
        scratch: tempfile::TempDir,
        validator: PathValidator,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let root = tempdir().expect("root");
        for file in files {
            fs::write(root.path().join(file), b"jpeg").expect("write");
        }
        let validator = PathValidator::new(root.path()).expect("validator");
        Fixture {
            root,
            scratch: tempdir().expect("scratch"),
            validator,
        }
    }

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive =
            zip::ZipArchive::new(fs::File::open(path).expect("open")).expect("archive");
        let mut out = String::new();
        archive
            .by_name(name)
            .expect("entry")
            .read_to_string(&mut out)
            .expect("read");
        out
    }

    fn scratch_is_empty(fx: &Fixture) -> bool {
        fs::read_dir(fx.scratch.path()).expect("read").next().is_none()
    }

    #[test]
    fn entries_follow_capture_time_not_input_order() {
        let fx = fixture(&["late.jpg", "early.jpg", "middle.jpg"]);
        let gateway = StubGateway::default()
            .with("late.jpg", geotagged(18, 3.0, 30.0))
            .with("early.jpg", geotagged(8, 1.0, 10.0))
            .with("middle.jpg", geotagged(12, 2.0, 20.0));
        let images = MockProcessor::default();

        let outcome = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &images,
            &paths(&["late.jpg", "early.jpg", "middle.jpg"]),
            "trip.kmz",
            &TourOptions::default(),
        )
        .expect("tour");

        let TourOutcome::Created(summary) = outcome else {
            panic!("expected a created tour");
        };
        let order: Vec<_> = summary
            .entries
            .iter()
            .map(|e| (e.sequence, e.id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(1, "early.jpg"), (2, "middle.jpg"), (3, "late.jpg")]
        );
        assert!(summary
            .entries
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));

        let output = fx.root.path().join("trip.kmz");
        assert!(output.exists());
        let kml = read_entry(&output, DOCUMENT_NAME);
        let line = &kml[kml.find("<LineString>").expect("path")..];
        let vertices: Vec<&str> = line
            .lines()
            .map(str::trim)
            .take_while(|l| !l.starts_with("</coordinates>"))
            .filter(|l| l.contains(',') && !l.starts_with('<'))
            .collect();
        assert_eq!(vertices, vec!["10,1,0", "20,2,0", "30,3,0"]);
        assert!(kml.contains("<name>1. early.jpg</name>"));
        assert_eq!(read_entry(&output, "images/thumb_002.jpg"), "thumb");
        assert!(scratch_is_empty(&fx));
    }

    #[test]
    fn no_gps_photos_produces_no_archive() {
        let fx = fixture(&["a.jpg", "b.jpg"]);
        let gateway = StubGateway::default().with(
            "a.jpg",
            MetadataRecord {
                date_time_original: Some(at(9)),
                latitude: Some(1.0),
                ..MetadataRecord::default()
            },
        );

        let outcome = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &MockProcessor::default(),
            &paths(&["a.jpg", "b.jpg"]),
            "trip.kmz",
            &TourOptions::default(),
        )
        .expect("tour");

        assert_eq!(outcome, TourOutcome::NoGpsPhotos { considered: 2 });
        assert!(outcome.summary().contains("No photos with GPS data"));
        assert!(!fx.root.path().join("trip.kmz").exists());
        assert!(scratch_is_empty(&fx));
    }

    #[test]
    fn bad_inputs_are_left_out_silently() {
        let fx = fixture(&["good.jpg", "broken.jpg", "notes.txt"]);
        let gateway = StubGateway::default()
            .with("good.jpg", geotagged(10, 5.0, 6.0))
            .failing("broken.jpg", "corrupt");

        let outcome = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &MockProcessor::default(),
            &paths(&["good.jpg", "broken.jpg", "notes.txt", "../escape.jpg", "missing.jpg"]),
            "trip.kmz",
            &TourOptions::default(),
        )
        .expect("tour");

        let TourOutcome::Created(summary) = outcome else {
            panic!("expected a created tour");
        };
        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.considered, 5);
        assert_eq!(summary.skipped, 4);
        let kml = read_entry(&summary.output, DOCUMENT_NAME);
        assert!(!kml.contains("<LineString>"));
    }

    #[test]
    fn thumbnail_failures_do_not_abort_the_tour() {
        let fx = fixture(&["a.jpg", "b.jpg"]);
        let gateway = StubGateway::default()
            .with("a.jpg", geotagged(8, 1.0, 1.0))
            .with("b.jpg", geotagged(9, 2.0, 2.0));
        let images = MockProcessor::failing_on(&["b.jpg"]);

        let outcome = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &images,
            &paths(&["a.jpg", "b.jpg"]),
            "trip.kmz",
            &TourOptions::default(),
        )
        .expect("tour");

        let TourOutcome::Created(summary) = outcome else {
            panic!("expected a created tour");
        };
        assert_eq!(summary.image_failures, 1);
        assert!(summary.output.exists());
        assert!(read_entry(&summary.output, DOCUMENT_NAME).contains("images/thumb_002.jpg"));
    }

    #[test]
    fn full_images_and_thumbnail_size_are_forwarded() {
        let fx = fixture(&["a.JPG"]);
        let gateway = StubGateway::default().with("a.JPG", geotagged(8, 1.0, 1.0));
        let images = MockProcessor::default();
        let options = TourOptions {
            include_full_images: true,
            thumbnail_size: 10_000,
            ..TourOptions::default()
        };

        let outcome = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &images,
            &paths(&["a.JPG"]),
            "trip.kmz",
            &options,
        )
        .expect("tour");

        let TourOutcome::Created(summary) = outcome else {
            panic!("expected a created tour");
        };
        assert_eq!(
            summary.entries[0].full_image.as_deref(),
            Some("images/photo_001.jpg")
        );
        let ops = images.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Thumbnail { max_side, .. } if *max_side == MAX_THUMBNAIL_SIZE
        ));
        assert!(matches!(&ops[1], RecordedOp::FullCopy { .. }));
        assert_eq!(read_entry(&summary.output, "images/photo_001.jpg"), "full");
    }

    #[test]
    fn output_path_is_validated_before_collection() {
        let fx = fixture(&["a.jpg"]);
        let gateway = StubGateway::default().with("a.jpg", geotagged(8, 1.0, 1.0));

        for (output, expected) in [
            ("trip.zip", "invalid_input"),
            ("../trip.kmz", "path_traversal"),
            ("nested/trip.kmz", "not_found"),
        ] {
            let err = create_tour_in(
                fx.scratch.path(),
                &fx.validator,
                &gateway,
                &MockProcessor::default(),
                &paths(&["a.jpg"]),
                output,
                &TourOptions::default(),
            )
            .expect_err("must fail");
            assert_eq!(err.kind(), expected, "{output}");
        }

        let err = create_tour_in(
            fx.scratch.path(),
            &fx.validator,
            &gateway,
            &MockProcessor::default(),
            &[],
            "trip.kmz",
            &TourOptions::default(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
