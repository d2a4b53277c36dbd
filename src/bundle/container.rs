//! Reading and writing bundles on disk
//!
//! A bundle file is a zip archive with one CSV file per sheet, the manifest
//! first. A plain directory of CSV files is accepted on read so hand-edited
//! exports can be imported without re-zipping them.

use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{AcademyError, AcademyResult};
use crate::models::CellValue;

use super::manifest::{Manifest, MANIFEST_SHEET};
use super::sheet::{Bundle, Sheet};

/// Read a bundle from a zip archive or a directory of CSV files
///
/// # Errors
///
/// Returns `AcademyError::Parse` if the path is neither a readable zip
/// archive nor a directory, or if a sheet is not valid CSV.
pub fn read_bundle(path: &Path) -> AcademyResult<Bundle> {
    if path.is_dir() {
        return read_dir(path);
    }

    let file = File::open(path)
        .map_err(|e| AcademyError::Parse(format!("Cannot open {}: {}", path.display(), e)))?;
    read_zip(file).map_err(|e| match e {
        AcademyError::Parse(msg) => AcademyError::Parse(format!("{}: {}", path.display(), msg)),
        other => AcademyError::Parse(format!("{}: {}", path.display(), other)),
    })
}

/// Read a bundle from any zip source
pub fn read_zip<R: Read + Seek>(source: R) -> AcademyResult<Bundle> {
    let mut archive = ZipArchive::new(source)?;
    let mut sheets = Vec::new();

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let Some(sheet_name) = csv_stem(&entry_name) else {
            debug!(entry = %entry_name, "skipping non-CSV bundle entry");
            continue;
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        sheets.push(parse_sheet(sheet_name, &bytes)?);
    }

    Ok(assemble(sheets))
}

fn read_dir(dir: &Path) -> AcademyResult<Bundle> {
    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(|e| AcademyError::Parse(format!("Cannot read {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut sheets = Vec::new();
    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(sheet_name) = csv_stem(&file_name) else {
            continue;
        };
        let bytes = fs::read(&path)?;
        sheets.push(parse_sheet(sheet_name, &bytes)?);
    }

    Ok(assemble(sheets))
}

/// Split the manifest off the entity sheets
fn assemble(sheets: Vec<Sheet>) -> Bundle {
    let (manifest_sheets, sheets): (Vec<_>, Vec<_>) = sheets
        .into_iter()
        .partition(|s| s.name.eq_ignore_ascii_case(MANIFEST_SHEET));
    let manifest = manifest_sheets.first().and_then(Manifest::from_sheet);
    Bundle::new(manifest, sheets)
}

/// Sheet name of a CSV entry (`data/Cursos.csv` -> `Cursos`)
fn csv_stem(entry_name: &str) -> Option<&str> {
    let file_name = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext.eq_ignore_ascii_case("csv") && !stem.is_empty() {
        Some(stem)
    } else {
        None
    }
}

/// Parse one CSV sheet; fully blank lines are dropped
fn parse_sheet(name: &str, bytes: &[u8]) -> AcademyResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.to_string()
        })
        .collect();

    let mut sheet = Sheet::new(name, headers);
    for record in reader.records() {
        let record = record?;
        let row: Vec<CellValue> = record.iter().map(CellValue::from_text).collect();
        if row.iter().all(CellValue::is_empty) {
            continue;
        }
        sheet.push_row(row);
    }
    Ok(sheet)
}

/// Serialize one sheet as CSV text
fn sheet_to_csv(sheet: &Sheet) -> AcademyResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        let mut cells: Vec<String> = row.iter().map(CellValue::as_text).collect();
        cells.resize(sheet.headers.len(), String::new());
        writer.write_record(&cells)?;
    }
    writer
        .into_inner()
        .map_err(|e| AcademyError::Export(format!("Failed to finish sheet '{}': {}", sheet.name, e)))
}

/// Sheets in write order: manifest first, then entity sheets as given
fn ordered_sheets(bundle: &Bundle) -> Vec<Sheet> {
    let mut sheets = Vec::with_capacity(bundle.sheets.len() + 1);
    if let Some(manifest) = &bundle.manifest {
        sheets.push(manifest.to_sheet());
    }
    sheets.extend(bundle.sheets.iter().cloned());
    sheets
}

/// Write a bundle as a zip archive to any sink
pub fn write_zip<W: Write + Seek>(bundle: &Bundle, sink: W) -> AcademyResult<W> {
    let mut zip = ZipWriter::new(sink);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for sheet in ordered_sheets(bundle) {
        let csv = sheet_to_csv(&sheet)?;
        zip.start_file(format!("{}.csv", sheet.name), opts)
            .map_err(|e| AcademyError::Export(format!("Failed to add sheet '{}': {}", sheet.name, e)))?;
        zip.write_all(&csv)
            .map_err(|e| AcademyError::Export(format!("Failed to write sheet '{}': {}", sheet.name, e)))?;
    }

    zip.finish()
        .map_err(|e| AcademyError::Export(format!("Failed to finalize bundle: {}", e)))
}

/// Write a bundle as a zip archive file, creating parent directories
pub fn write_bundle(bundle: &Bundle, path: &Path) -> AcademyResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)
        .map_err(|e| AcademyError::Export(format!("Cannot create {}: {}", path.display(), e)))?;
    write_zip(bundle, file)?;
    Ok(())
}

/// Write a bundle as a directory of CSV files
pub fn write_bundle_dir(bundle: &Bundle, dir: &Path) -> AcademyResult<()> {
    fs::create_dir_all(dir)?;
    for sheet in ordered_sheets(bundle) {
        fs::write(dir.join(format!("{}.csv", sheet.name)), sheet_to_csv(&sheet)?)?;
    }
    Ok(())
}
