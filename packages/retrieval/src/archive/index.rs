//! Title to byte-range index over the compressed dump.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};

/// Maps each page title to the byte range of the chunk holding its record.
///
/// Many titles share one chunk: pages are batch-compressed, and a chunk's
/// length is the distance to the next distinct manifest offset. Built once,
/// cached to disk, immutable thereafter; rebuilding requires deleting the
/// cache file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIndex {
    entries: HashMap<String, (u64, u64)>,
}

impl ArchiveIndex {
    /// Load the index from `cache_path`, building it from the manifest and
    /// writing the cache on a miss.
    pub fn open(manifest_path: &Path, cache_path: &Path) -> Result<Self> {
        if cache_path.exists() {
            info!(path = %cache_path.display(), "loading archive index from cache");
            let file = File::open(cache_path)?;
            let index: ArchiveIndex = serde_json::from_reader(BufReader::new(file))?;
            return Ok(index);
        }

        let index = Self::build_from_manifest(manifest_path)?;
        let file = File::create(cache_path)?;
        serde_json::to_writer(BufWriter::new(file), &index)?;
        info!(path = %cache_path.display(), titles = index.len(), "cached archive index");
        Ok(index)
    }

    /// Build the index by scanning the manifest.
    ///
    /// Consecutive lines sharing an offset form one chunk; the chunk closes
    /// when the offset changes, binding every title collected so far to
    /// `(chunk_start, new_offset - chunk_start)`. The final chunk never
    /// closes under this rule, so its titles are not indexed.
    pub fn build_from_manifest(manifest_path: &Path) -> Result<Self> {
        let file = File::open(manifest_path)?;
        let reader = BufReader::new(file);

        let mut entries = HashMap::new();
        let mut prev_offset: Option<u64> = None;
        let mut chunk_titles: Vec<String> = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (offset, title) = parse_manifest_line(&line, line_no + 1)?;

            let prev = *prev_offset.get_or_insert(offset);
            if offset < prev {
                return Err(RetrievalError::Manifest {
                    line: line_no + 1,
                    reason: format!("offset {offset} decreases below {prev}"),
                });
            }

            if offset != prev {
                // Chunk closed: bind everything collected so far.
                for chunk_title in chunk_titles.drain(..) {
                    entries.insert(chunk_title, (prev, offset - prev));
                }
                prev_offset = Some(offset);
            }
            chunk_titles.push(title);
        }

        debug!(titles = entries.len(), "built archive index");
        Ok(Self { entries })
    }

    /// Resolve a title to its chunk's `(offset, length)`.
    pub fn resolve(&self, title: &str) -> Result<(u64, u64)> {
        self.entries
            .get(title)
            .copied()
            .ok_or_else(|| RetrievalError::TitleNotFound {
                title: title.to_string(),
            })
    }

    /// True if the title is present in the index.
    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    /// Number of indexed titles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no titles are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one `offset:id:title` manifest line.
///
/// Split at most twice: titles may themselves contain colons.
fn parse_manifest_line(line: &str, line_no: usize) -> Result<(u64, String)> {
    let mut parts = line.splitn(3, ':');
    let offset = parts
        .next()
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| RetrievalError::Manifest {
            line: line_no,
            reason: "offset is not an unsigned integer".to_string(),
        })?;
    let _id = parts.next().ok_or_else(|| RetrievalError::Manifest {
        line: line_no,
        reason: "missing id field".to_string(),
    })?;
    let title = parts.next().ok_or_else(|| RetrievalError::Manifest {
        line: line_no,
        reason: "missing title field".to_string(),
    })?;
    Ok((offset, title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_titles_sharing_a_chunk_resolve_to_the_same_range() {
        let manifest = write_manifest(&["100:1:A", "100:2:B", "250:3:C"]);
        let index = ArchiveIndex::build_from_manifest(manifest.path()).unwrap();

        assert_eq!(index.resolve("A").unwrap(), (100, 150));
        assert_eq!(index.resolve("B").unwrap(), (100, 150));
    }

    #[test]
    fn test_final_chunk_titles_are_dropped() {
        // The last chunk has no subsequent offset to close against, so its
        // titles never enter the index. Pinned behavior.
        let manifest = write_manifest(&["100:1:A", "100:2:B", "250:3:C"]);
        let index = ArchiveIndex::build_from_manifest(manifest.path()).unwrap();

        assert!(matches!(
            index.resolve("C"),
            Err(RetrievalError::TitleNotFound { .. })
        ));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_title_containing_colons() {
        let manifest = write_manifest(&["10:1:C++: The Language", "90:2:End"]);
        let index = ArchiveIndex::build_from_manifest(manifest.path()).unwrap();
        assert_eq!(index.resolve("C++: The Language").unwrap(), (10, 80));
    }

    #[test]
    fn test_malformed_offset_fails_fast() {
        let manifest = write_manifest(&["abc:1:A", "250:2:B"]);
        let err = ArchiveIndex::build_from_manifest(manifest.path()).unwrap_err();
        assert!(matches!(err, RetrievalError::Manifest { line: 1, .. }));
    }

    #[test]
    fn test_decreasing_offset_fails_fast() {
        let manifest = write_manifest(&["100:1:A", "50:2:B"]);
        let err = ArchiveIndex::build_from_manifest(manifest.path()).unwrap_err();
        assert!(matches!(err, RetrievalError::Manifest { line: 2, .. }));
    }

    #[test]
    fn test_open_builds_then_reloads_cache() {
        let manifest = write_manifest(&["0:1:A", "40:2:B", "80:3:C"]);
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("archive.index.json");

        let built = ArchiveIndex::open(manifest.path(), &cache).unwrap();
        assert!(cache.exists());

        let reloaded = ArchiveIndex::open(manifest.path(), &cache).unwrap();
        assert_eq!(reloaded.len(), built.len());
        assert_eq!(reloaded.resolve("A").unwrap(), built.resolve("A").unwrap());
        assert_eq!(reloaded.resolve("B").unwrap(), (40, 40));
    }
}
