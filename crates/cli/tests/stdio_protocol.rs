mod common;

use common::{error_kind, is_error, Server};
use std::collections::HashSet;
use tempfile::tempdir;

#[test]
fn initialize_reports_server_info() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut server = Server::spawn(dir.path())?;

    let response = server.request("initialize", serde_json::json!({}))?;
    let info = &response["result"]["serverInfo"];
    assert_eq!(info["name"], "exif-tour");
    assert!(response["result"]["capabilities"].get("tools").is_some());
    Ok(())
}

#[test]
fn tools_list_includes_expected_tools() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut server = Server::spawn(dir.path())?;

    let response = server.request("tools/list", serde_json::json!({}))?;
    let tools = response
        .get("result")
        .and_then(|value| value.get("tools"))
        .and_then(|value| value.as_array())
        .expect("tools array present");

    let names: HashSet<&str> = tools
        .iter()
        .filter_map(|tool| tool.get("name").and_then(|value| value.as_str()))
        .collect();
    let expected: HashSet<&str> = [
        "parse_exif",
        "parse_exif_batch",
        "get_gps_coordinates",
        "rename_by_exif",
        "create_photo_tour_kmz",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);

    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
    Ok(())
}

#[test]
fn garbage_and_notifications_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut server = Server::spawn(dir.path())?;

    server.send_raw("this is not json")?;
    server.send_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)?;

    let response = server.request("tools/list", serde_json::json!({}))?;
    assert!(response["result"]["tools"].is_array());
    Ok(())
}

#[test]
fn unknown_tool_is_an_error_payload() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut server = Server::spawn(dir.path())?;

    let result = server.call_tool("delete_everything", serde_json::json!({}))?;
    assert!(is_error(&result));
    assert_eq!(error_kind(&result), Some("invalid_input"));

    let result = server.call_tool("parse_exif", serde_json::json!({}))?;
    assert!(is_error(&result));
    assert_eq!(error_kind(&result), Some("invalid_input"));
    Ok(())
}

#[test]
fn unknown_method_with_id_gets_method_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut server = Server::spawn(dir.path())?;

    server.send_raw(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#)?;
    let response = server.request("ping", serde_json::json!({}))?;
    assert_eq!(response["error"]["code"], -32601);
    assert!(response.get("result").is_none());

    let response = server.request("tools/list", serde_json::json!({}))?;
    assert!(response["result"]["tools"].is_array());
    Ok(())
}
