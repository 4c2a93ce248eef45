//! Offline ingestion stand-in: turn a directory of text files into documents.

use std::path::Path;

use tracing::info;

use crate::state::Document;
use crate::step::StepError;

/// Files with these extensions are loaded.
const EXTENSIONS: &[&str] = &["txt", "md"];

/// Roughly 250 tokens.
pub const DEFAULT_CHUNK_CHARS: usize = 1000;

/// Load every text file under `dir` (recursively), split into chunks of at
/// most `max_chars` characters on paragraph boundaries. Each chunk records
/// its file as `source`.
pub fn load_dir(dir: &Path, max_chars: usize) -> Result<Vec<Document>, StepError> {
    let mut files = Vec::new();
    find_files_recursive(dir, &mut files)?;
    files.sort();

    let mut documents = Vec::new();
    for path in &files {
        let text = std::fs::read_to_string(path)?;
        let source = path.display().to_string();
        documents.extend(
            chunk(&text, max_chars)
                .into_iter()
                .map(|c| Document::new(c).with_source(source.clone())),
        );
    }
    info!(files = files.len(), chunks = documents.len(), dir = %dir.display(), "loaded corpus");
    Ok(documents)
}

/// Pack paragraphs into chunks no longer than `max_chars`. A single paragraph
/// longer than the limit becomes its own chunk.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.len() + 2 + paragraph.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn find_files_recursive(
    dir: &Path,
    results: &mut Vec<std::path::PathBuf>,
) -> Result<(), StepError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            find_files_recursive(&path, results)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && EXTENSIONS.contains(&ext)
        {
            results.push(path);
        }
    }
    Ok(())
}
