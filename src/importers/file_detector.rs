use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::reader;
use super::LayoutKind;
use crate::table::Sheet;

/// Rows read from a file to decide its layout
pub const DEFAULT_SAMPLE_ROWS: usize = 20;

/// Detect the layout of a sample of rows
///
/// Tries each layout in [`LayoutKind::ALL`] order and returns the first one
/// that recognizes the sample. A layout whose check fails is treated as not
/// matching, so a malformed sample never aborts detection.
pub fn detect(sample: &Sheet) -> Option<LayoutKind> {
    LayoutKind::ALL.into_iter().find(|kind| match kind.recognize(sample) {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Error while testing layout {}: {:#}", kind, e);
            false
        }
    })
}

/// Detect the layout of a file, reading the whole sheet only on a match
pub fn detect_file<P: AsRef<Path>>(path: P, sample_rows: usize) -> Result<Option<(LayoutKind, Sheet)>> {
    let path = path.as_ref();
    info!("Identifying file: {:?}", path);

    let sample = reader::read_sample(path, sample_rows)
        .with_context(|| format!("Failed to read sample from {:?}", path))?;
    info!(
        "Sample: {} rows x {} columns",
        sample.len(),
        sample.width()
    );

    match detect(&sample) {
        Some(kind) => {
            info!("Detected layout: {}", kind);
            let sheet = reader::read_sheet(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            Ok(Some((kind, sheet)))
        }
        None => {
            info!("No layout matched {:?}", path);
            Ok(None)
        }
    }
}

/// Names of every known layout, in detection order
pub fn list_layouts() -> Vec<&'static str> {
    LayoutKind::ALL.iter().map(LayoutKind::name).collect()
}

/// Layout by display name, case-insensitive
pub fn layout_by_name(name: &str) -> Option<LayoutKind> {
    let wanted = name.trim().to_lowercase();
    LayoutKind::ALL
        .into_iter()
        .find(|kind| kind.name().to_lowercase() == wanted)
}
