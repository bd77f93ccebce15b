mod archive;
mod config;
mod error;
mod exif_reader;
mod gateway;
mod imaging;
mod iptc_reader;
mod kml;
mod metadata;
mod path_guard;
mod rename;
mod sanitize;
mod template;
mod tour;
mod xmp_reader;

pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths};
pub use error::ToolError;
pub use gateway::{ExifGateway, MetadataGateway};
pub use imaging::{ImageCrateProcessor, ImageProcessor, ImagingError};
pub use kml::xml_escape;
pub use metadata::{FieldSelection, GpsCoordinates, MetadataRecord};
pub use path_guard::{PathValidator, SafePath, SUPPORTED_EXTENSIONS};
pub use rename::{rename_batch, RenameOptions, RenameOutcome, RenameReport, RenameStatus};
pub use template::{
    parse_template, render, render_template, RenderContext, TemplatePart, Token,
    DEFAULT_DATE_FORMAT, DEFAULT_TEMPLATE, DEFAULT_TIME_FORMAT,
};
pub use tour::{create_tour, PhotoTourEntry, TourOptions, TourOutcome, TourSummary};
