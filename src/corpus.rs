//! Reading training text from plain and archived files.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tar::Archive;
use tracing::warn;
use zip::ZipArchive;

use crate::error::Result;

pub fn is_supported_corpus(path: &Path) -> bool {
    let name = file_name(path);
    [".txt", ".gz", ".tgz", ".tar", ".zip"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn read_utf8<R: Read>(mut reader: R) -> Option<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).ok()?;
    String::from_utf8(buf).ok().filter(|text| !text.trim().is_empty())
}

fn tar_texts<R: Read>(archive: &mut Archive<R>) -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for entry in archive.entries()? {
        let Ok(entry) = entry else { continue };
        let is_txt = entry
            .path()
            .ok()
            .and_then(|p| p.extension().map(|ext| ext == "txt"))
            .unwrap_or(false);
        if !is_txt {
            continue;
        }
        texts.extend(read_utf8(entry));
    }
    Ok(texts)
}

fn zip_texts(archive: &mut ZipArchive<File>) -> Vec<String> {
    let mut texts = Vec::new();
    for i in 0..archive.len() {
        let file = match archive.by_index(i) {
            Ok(file) => file,
            Err(err) => {
                warn!(index = i, error = %err, "skipping unreadable zip member");
                continue;
            }
        };
        if file.is_dir() || !file.name().to_ascii_lowercase().ends_with(".txt") {
            continue;
        }
        texts.extend(read_utf8(file));
    }
    texts
}

/// Every text document in `path`. Archives contribute their `.txt` members;
/// unreadable or non-UTF-8 members are skipped.
pub fn read_texts(path: &Path) -> Result<Vec<String>> {
    let name = file_name(path);

    if name.ends_with(".txt") {
        return Ok(vec![fs::read_to_string(path)?]);
    }

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let mut archive = Archive::new(GzDecoder::new(File::open(path)?));
        return tar_texts(&mut archive);
    }

    if name.ends_with(".tar") {
        let mut archive = Archive::new(File::open(path)?);
        return tar_texts(&mut archive);
    }

    if name.ends_with(".zip") {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        return Ok(zip_texts(&mut archive));
    }

    if name.ends_with(".gz") {
        return Ok(read_utf8(GzDecoder::new(File::open(path)?)).into_iter().collect());
    }

    Ok(Vec::new())
}

/// The non-empty, trimmed lines of `text`; each is learned on its own.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}
