//! Persisted abbreviation maps.
//!
//! Each ingestion run writes two plain UTF-8 JSON documents: law name →
//! {abbreviation → expansion}, and (chunk scope only) `<law_id>:<article_num>`
//! → {abbreviation → expansion}. Files are replaced whole through a
//! temporary file in the same directory, so readers never see a partial
//! document. An ingestion run may merge into the saved maps instead of
//! replacing them.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use lawgraph_core::AbbreviationMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

pub const LAW_MAPS_FILE: &str = "abbr_maps_by_law.json";
pub const CHUNK_MAPS_FILE: &str = "abbr_maps_by_chunk.json";

pub type AbbreviationMaps = BTreeMap<String, AbbreviationMap>;

pub fn save_law_maps(dir: &Path, maps: &AbbreviationMaps) -> Result<PathBuf, StoreError> {
    let path = dir.join(LAW_MAPS_FILE);
    write_json_atomic(&path, maps)?;
    info!(path = %path.display(), laws = maps.len(), "saved law abbreviation maps");
    Ok(path)
}

pub fn save_chunk_maps(dir: &Path, maps: &AbbreviationMaps) -> Result<PathBuf, StoreError> {
    let path = dir.join(CHUNK_MAPS_FILE);
    write_json_atomic(&path, maps)?;
    info!(path = %path.display(), chunks = maps.len(), "saved chunk abbreviation maps");
    Ok(path)
}

pub fn load_law_maps(dir: &Path) -> Result<AbbreviationMaps, StoreError> {
    read_json(&dir.join(LAW_MAPS_FILE))
}

pub fn load_chunk_maps(dir: &Path) -> Result<AbbreviationMaps, StoreError> {
    read_json(&dir.join(CHUNK_MAPS_FILE))
}

/// `fresh` law maps plus whatever the maps saved in `dir` add to them.
pub fn merge_saved_law_maps(dir: &Path, fresh: &AbbreviationMaps) -> Result<AbbreviationMaps, StoreError> {
    merge_saved(load_law_maps(dir), fresh)
}

pub fn merge_saved_chunk_maps(
    dir: &Path,
    fresh: &AbbreviationMaps,
) -> Result<AbbreviationMaps, StoreError> {
    merge_saved(load_chunk_maps(dir), fresh)
}

/// Per key, a saved expansion replaces a fresh one only when it scores
/// higher. A missing artifact counts as empty.
fn merge_saved(
    saved: Result<AbbreviationMaps, StoreError>,
    fresh: &AbbreviationMaps,
) -> Result<AbbreviationMaps, StoreError> {
    let saved = match saved {
        Ok(saved) => saved,
        Err(StoreError::ArtifactNotFound(_)) => AbbreviationMaps::new(),
        Err(e) => return Err(e),
    };
    let mut merged = fresh.clone();
    for (key, map) in &saved {
        merged.entry(key.clone()).or_default().merge(map);
    }
    Ok(merged)
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Err(StoreError::ArtifactNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
