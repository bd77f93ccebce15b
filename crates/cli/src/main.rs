use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use exif_tour_core::{app_paths, load_config, load_config_from, AppConfig};
use serde_json::{json, Map, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};

mod logging;
mod mcp;
mod tools;

use tools::ToolContext;

#[derive(Debug, Parser)]
#[command(name = "exif-tour")]
#[command(version, about = "Photo metadata tools: EXIF reading, template renaming and KMZ tours")]
struct Cli {
    /// Authorized root for all file arguments (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Config file to use instead of the OS default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the tool server
    Serve {
        /// Serve over stdio (NDJSON)
        #[arg(long)]
        stdio: bool,
    },
    /// Print metadata of one or more images
    Exif(ExifArgs),
    /// Print GPS coordinates of an image
    Gps(GpsArgs),
    /// Rename images from a metadata template (dry run unless --apply)
    Rename(RenameArgs),
    /// Build a KMZ photo tour
    Tour(TourArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ExifArgs {
    #[arg(required = true)]
    filepaths: Vec<String>,
    /// Skip GPS fields
    #[arg(long)]
    no_gps: bool,
    /// Include IFD1 thumbnail fields
    #[arg(long)]
    thumbnail: bool,
    /// Report ICC profile presence
    #[arg(long)]
    icc: bool,
    /// Only keep these pass-through fields
    #[arg(long)]
    pick: Vec<String>,
    /// Output JSON structuredContent
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct GpsArgs {
    filepath: String,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(required = true)]
    filepaths: Vec<String>,
    #[arg(long)]
    template: Option<String>,
    #[arg(long)]
    date_format: Option<String>,
    #[arg(long)]
    time_format: Option<String>,
    /// Perform the renames instead of previewing them
    #[arg(long)]
    apply: bool,
    /// Move files directly without a backup directory
    #[arg(long)]
    no_backup: bool,
    #[arg(long)]
    counter_start: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct TourArgs {
    #[arg(required = true)]
    filepaths: Vec<String>,
    /// Output .kmz path
    #[arg(long, short)]
    output: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    thumbnail_size: Option<u32>,
    /// Also embed the original images
    #[arg(long)]
    full_images: bool,
    /// Do not draw the path between photos
    #[arg(long)]
    no_path: bool,
    /// Do not prefix placemark names with sequence numbers
    #[arg(long)]
    no_numbers: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(root) = cli.root {
        config.root = Some(root);
    }
    logging::init_tracing(&config.log_level)?;

    match cli.command {
        Commands::Serve { stdio } => {
            if stdio {
                run_stdio_server(&ToolContext::new(config))
            } else {
                anyhow::bail!("only --stdio transport is supported")
            }
        }
        Commands::Exif(args) => run_exif(&ToolContext::new(config), args),
        Commands::Gps(args) => run_gps(&ToolContext::new(config), args),
        Commands::Rename(args) => run_rename(&ToolContext::new(config), args),
        Commands::Tour(args) => run_tour(&ToolContext::new(config), args),
        Commands::Config(args) => match args.action {
            ConfigAction::Show => run_config_show(&config, cli.config),
        },
    }
}

fn run_exif(ctx: &ToolContext, args: ExifArgs) -> Result<()> {
    let mut options = Map::new();
    options.insert("gps".to_string(), json!(!args.no_gps));
    options.insert("thumbnail".to_string(), json!(args.thumbnail));
    options.insert("icc".to_string(), json!(args.icc));
    if !args.pick.is_empty() {
        options.insert("pick".to_string(), json!(args.pick));
    }

    let result = if let [filepath] = args.filepaths.as_slice() {
        tools::parse_exif::call(ctx, &json!({ "filepath": filepath, "options": options }))
    } else {
        tools::parse_exif_batch::call(
            ctx,
            &json!({ "filepaths": args.filepaths, "options": options }),
        )
    };
    print_tool_result(result, args.json)
}

fn run_gps(ctx: &ToolContext, args: GpsArgs) -> Result<()> {
    let result = tools::get_gps_coordinates::call(ctx, &json!({ "filepath": args.filepath }));
    print_tool_result(result, args.json)
}

fn run_rename(ctx: &ToolContext, args: RenameArgs) -> Result<()> {
    let mut map = Map::new();
    map.insert("filepaths".to_string(), json!(args.filepaths));
    map.insert("dryRun".to_string(), json!(!args.apply));
    map.insert("backup".to_string(), json!(!args.no_backup));
    if let Some(template) = args.template {
        map.insert("template".to_string(), json!(template));
    }
    if let Some(date_format) = args.date_format {
        map.insert("dateFormat".to_string(), json!(date_format));
    }
    if let Some(time_format) = args.time_format {
        map.insert("timeFormat".to_string(), json!(time_format));
    }
    if let Some(counter_start) = args.counter_start {
        map.insert("counterStart".to_string(), json!(counter_start));
    }
    let result = tools::rename_by_exif::call(ctx, &Value::Object(map));
    print_tool_result(result, args.json)
}

fn run_tour(ctx: &ToolContext, args: TourArgs) -> Result<()> {
    let mut map = Map::new();
    map.insert("filepaths".to_string(), json!(args.filepaths));
    map.insert("outputPath".to_string(), json!(args.output));
    map.insert("includeFullImages".to_string(), json!(args.full_images));
    map.insert("drawPath".to_string(), json!(!args.no_path));
    map.insert("numberPhotos".to_string(), json!(!args.no_numbers));
    if let Some(title) = args.title {
        map.insert("title".to_string(), json!(title));
    }
    if let Some(description) = args.description {
        map.insert("description".to_string(), json!(description));
    }
    if let Some(size) = args.thumbnail_size {
        map.insert("thumbnailSize".to_string(), json!(size));
    }
    let result = tools::create_photo_tour_kmz::call(ctx, &Value::Object(map));
    print_tool_result(result, args.json)
}

fn run_config_show(config: &AppConfig, explicit: Option<PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(path) => path,
        None => app_paths()?.config_path,
    };
    println!("Config file: {}", path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_tool_result(result: Value, json_output: bool) -> Result<()> {
    let is_error = result
        .get("isError")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);

    if is_error {
        let message = result
            .get("structuredContent")
            .and_then(|value| value.get("error"))
            .and_then(|value| value.get("message"))
            .and_then(|value| value.as_str())
            .unwrap_or("tool error");
        eprintln!("{message}");
        process::exit(1);
    }

    if json_output {
        let structured = result
            .get("structuredContent")
            .cloned()
            .unwrap_or_else(|| json!({}));
        println!("{}", serde_json::to_string_pretty(&structured)?);
        return Ok(());
    }

    let text = result
        .get("content")
        .and_then(|value| value.as_array())
        .and_then(|arr| arr.first())
        .and_then(|value| value.get("text"))
        .and_then(|value| value.as_str())
        .unwrap_or("");
    println!("{text}");
    Ok(())
}

fn run_stdio_server(ctx: &ToolContext) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = stdin.lock().lines();
    let mut writer = io::BufWriter::new(stdout.lock());
    info!("stdio server started");

    for line in reader {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "skipping unparseable line");
                continue;
            }
        };

        let method = request.get("method").and_then(|value| value.as_str());
        let id = request.get("id").cloned();
        let response = match (method, id) {
            (Some("initialize"), Some(id)) => Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": mcp::contracts::PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {}
                    },
                    "serverInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }
            })),
            (Some("tools/list"), Some(id)) => Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": mcp::tool_definitions()
                }
            })),
            (Some("tools/call"), Some(id)) => {
                let result = handle_tool_call(ctx, &request);
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": result
                }))
            }
            (Some(other), Some(id)) => {
                debug!(method = other, "unknown method");
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": mcp::errors::METHOD_NOT_FOUND,
                        "message": format!("method not found: {other}")
                    }
                }))
            }
            _ => None,
        };

        if let Some(response) = response {
            let serialized =
                serde_json::to_string(&response).context("failed to serialize response")?;
            writeln!(writer, "{serialized}").context("failed to write response")?;
            writer.flush().context("failed to flush response")?;
        }
    }

    info!("stdin closed, stopping");
    Ok(())
}

fn handle_tool_call(ctx: &ToolContext, request: &Value) -> Value {
    let params = request.get("params");
    let Some(params) = params.and_then(|value| value.as_object()) else {
        return tools::error_result(mcp::errors::INVALID_INPUT, "params must be an object", None);
    };

    let name = params.get("name").and_then(|value| value.as_str());
    let Some(name) = name else {
        return tools::error_result(
            mcp::errors::INVALID_INPUT,
            "params.name must be a string",
            None,
        );
    };

    let args = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    debug!(tool = name, "tool call");
    match name {
        mcp::contracts::TOOL_PARSE_EXIF => tools::parse_exif::call(ctx, &args),
        mcp::contracts::TOOL_PARSE_EXIF_BATCH => tools::parse_exif_batch::call(ctx, &args),
        mcp::contracts::TOOL_GET_GPS_COORDINATES => tools::get_gps_coordinates::call(ctx, &args),
        mcp::contracts::TOOL_RENAME_BY_EXIF => tools::rename_by_exif::call(ctx, &args),
        mcp::contracts::TOOL_CREATE_PHOTO_TOUR_KMZ => {
            tools::create_photo_tour_kmz::call(ctx, &args)
        }
        _ => tools::error_result(
            mcp::errors::INVALID_INPUT,
            format!("unknown tool: {name}"),
            Some(name),
        ),
    }
}
