mod common;

use common::{error_kind, is_error, write_geotagged_jpeg, write_plain_jpeg, Server};
use std::fs;
use std::io::Read;
use tempfile::tempdir;

#[test]
fn tour_orders_photos_by_capture_time() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_geotagged_jpeg(&dir.path().join("c.jpg"), "2024:07:09 18:00:00", 3.0, 30.0);
    write_geotagged_jpeg(&dir.path().join("a.jpg"), "2024:07:09 08:00:00", 1.0, 10.0);
    write_geotagged_jpeg(&dir.path().join("b.jpg"), "2024:07:09 12:00:00", 2.0, 20.0);
    write_plain_jpeg(&dir.path().join("plain.jpg"));
    let mut server = Server::spawn(dir.path())?;

    let result = server.call_tool(
        "create_photo_tour_kmz",
        serde_json::json!({
            "filepaths": ["c.jpg", "plain.jpg", "a.jpg", "b.jpg"],
            "outputPath": "trip.kmz",
            "title": "Summer & <Sea>",
            "thumbnailSize": 64
        }),
    )?;
    assert!(!is_error(&result));
    let structured = &result["structuredContent"];
    assert_eq!(structured["status"], "created");
    assert_eq!(structured["skipped"], 1);
    let ids: Vec<&str> = structured["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .filter_map(|e| e["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["a.jpg", "b.jpg", "c.jpg"]);

    let archive_path = dir.path().join("trip.kmz");
    let mut archive = zip::ZipArchive::new(fs::File::open(&archive_path)?)?;
    assert_eq!(archive.by_index(0)?.name(), "doc.kml");

    let mut kml = String::new();
    archive.by_name("doc.kml")?.read_to_string(&mut kml)?;
    assert!(kml.contains("<name>Summer &amp; &lt;Sea&gt;</name>"));
    assert!(kml.contains("<name>1. a.jpg</name>"));
    assert!(kml.contains("<name>3. c.jpg</name>"));

    let mut thumb = Vec::new();
    archive.by_name("images/thumb_001.jpg")?.read_to_end(&mut thumb)?;
    let thumb = image::load_from_memory(&thumb)?;
    assert!(thumb.width() <= 64 && thumb.height() <= 64);
    Ok(())
}

#[test]
fn no_gps_photos_produces_no_archive() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_plain_jpeg(&dir.path().join("plain.jpg"));
    let mut server = Server::spawn(dir.path())?;

    let result = server.call_tool(
        "create_photo_tour_kmz",
        serde_json::json!({ "filepaths": ["plain.jpg"], "outputPath": "trip.kmz" }),
    )?;
    assert!(!is_error(&result));
    assert_eq!(result["structuredContent"]["status"], "no_gps_photos");
    assert!(!dir.path().join("trip.kmz").exists());
    Ok(())
}

#[test]
fn output_path_must_be_a_kmz_inside_root() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_plain_jpeg(&dir.path().join("plain.jpg"));
    let mut server = Server::spawn(dir.path())?;

    for (output, kind) in [("trip.zip", "invalid_input"), ("../trip.kmz", "path_traversal")] {
        let result = server.call_tool(
            "create_photo_tour_kmz",
            serde_json::json!({ "filepaths": ["plain.jpg"], "outputPath": output }),
        )?;
        assert!(is_error(&result), "{output}");
        assert_eq!(error_kind(&result), Some(kind), "{output}");
    }
    Ok(())
}
