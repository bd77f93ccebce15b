use crate::error::ToolError;
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zips every file under `workspace` into `output`, writing `first_entry`
/// before anything else. The archive is assembled next to `output` and moved
/// into place only once complete. Returns the archive size in bytes.
pub fn package_directory(
    workspace: &Path,
    first_entry: &str,
    output: &Path,
) -> Result<u64, ToolError> {
    write_archive(workspace, first_entry, output)
        .map_err(|err| ToolError::Packaging(format!("{err:#}")))
}

fn write_archive(workspace: &Path, first_entry: &str, output: &Path) -> Result<u64> {
    let parent = output
        .parent()
        .with_context(|| format!("output path has no parent: {}", output.display()))?;
    let staging = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create staging file in {}", parent.display()))?;

    let mut zip = ZipWriter::new(BufWriter::new(staging.reopen()?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_file(&mut zip, &workspace.join(first_entry), first_entry, options)?;

    for entry in WalkDir::new(workspace).sort_by_file_name() {
        let entry = entry.context("failed to walk tour workspace")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(workspace)
            .context("workspace entry escaped its root")?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name == first_entry {
            continue;
        }
        add_file(&mut zip, entry.path(), &name, options)?;
    }

    zip.finish()
        .context("failed to finalize archive")?
        .into_inner()
        .map_err(|err| err.into_error())
        .context("failed to flush archive")?;

    staging
        .persist(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(fs::metadata(output)?.len())
}

fn add_file<W: io::Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    zip.start_file(name, options)
        .with_context(|| format!("failed to add {name}"))?;
    io::copy(&mut file, zip).with_context(|| format!("failed to write {name}"))?;
    Ok(())
}
