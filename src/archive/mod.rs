//! Unpacks downloaded zip archives, dropping the directory that all entries
//! share so the tables land directly in the destination.

pub mod error;

use crate::archive::error::ArchiveError;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Extracts an in-memory zip archive into `destination`.
///
/// Returns the extracted file paths relative to `destination`.
pub fn extract_bytes(bytes: &[u8], destination: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    extract(Cursor::new(bytes), destination)
}

/// Extracts the zip archive at `archive_path` into `destination`.
pub fn extract_file(archive_path: &Path, destination: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = File::open(archive_path)
        .map_err(|e| ArchiveError::Open(archive_path.to_path_buf(), e))?;
    extract(file, destination)
}

/// Directory prefix shared by every entry name, including its trailing `/`.
///
/// The longest common string prefix is cut back to the last separator, so a
/// shared file-name fragment (`data_a.csv`, `data_b.csv`) is not a root.
///
/// # Examples
///
/// ```
/// use conagua::archive::common_root;
///
/// let names = vec!["data/a.csv".to_string(), "data/b.csv".to_string()];
/// assert_eq!(common_root(&names), "data/");
///
/// let names = vec!["data_a.csv".to_string(), "data_b.csv".to_string()];
/// assert_eq!(common_root(&names), "");
/// ```
pub fn common_root(names: &[String]) -> &str {
    let Some(first) = names.first() else {
        return "";
    };
    let mut prefix = first.as_str();
    for name in names.iter().skip(1) {
        let shared: usize = prefix
            .chars()
            .zip(name.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        prefix = &prefix[..shared];
    }
    match prefix.rfind('/') {
        Some(end) => &prefix[..=end],
        None => "",
    }
}

/// Turns a stripped entry name into a path confined to the destination.
/// `Ok(None)` means the entry is the shared root itself.
fn confined_path(stripped: &str) -> Result<Option<PathBuf>, ArchiveError> {
    let mut path = PathBuf::new();
    for component in Path::new(stripped).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafeEntry(stripped.to_string()))
            }
        }
    }
    Ok((!path.as_os_str().is_empty()).then_some(path))
}

fn extract<R: Read + Seek>(reader: R, destination: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        names.push(archive.by_index_raw(index)?.name().to_string());
    }
    let root = common_root(&names);
    debug!("Archive has {} entries, shared root '{}'", names.len(), root);

    // Every target is validated before anything is written.
    let mut plan = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let stripped = name.strip_prefix(root).unwrap_or(name.as_str());
        if let Some(relative) = confined_path(stripped)? {
            plan.push((index, relative));
        }
    }

    fs::create_dir_all(destination)
        .map_err(|e| ArchiveError::Write(destination.to_path_buf(), e))?;

    let mut extracted = Vec::new();
    for (index, relative) in plan {
        let target = destination.join(&relative);
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ArchiveError::Write(target.clone(), e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::Write(parent.to_path_buf(), e))?;
        }
        let mut file = File::create(&target).map_err(|e| ArchiveError::Write(target.clone(), e))?;
        io::copy(&mut entry, &mut file).map_err(|e| ArchiveError::Write(target.clone(), e))?;
        extracted.push(relative);
    }

    info!(
        "Extracted {} files into {}",
        extracted.len(),
        destination.display()
    );
    Ok(extracted)
}
