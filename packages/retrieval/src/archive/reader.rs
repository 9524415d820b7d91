//! Chunk decompression and page-record extraction.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::error::{Result, RetrievalError};

/// Reads one page's raw source text out of the compressed dump.
pub struct ArchiveReader {
    dump_path: PathBuf,
}

/// Which element's character data is currently being collected.
enum Capture {
    None,
    Title,
    Text,
}

impl ArchiveReader {
    /// Create a reader over the dump file at `dump_path`.
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
        }
    }

    /// Read `length` bytes at `offset`, decompress them as one bzip2 stream,
    /// and return the raw text of the page record titled `title`.
    ///
    /// Title comparison is exact string equality, no normalization.
    pub fn read_page(&self, title: &str, offset: u64, length: u64) -> Result<String> {
        let chunk = self.read_chunk(offset, length)?;
        extract_page(&chunk, title)
    }

    /// Decompress the chunk at `(offset, length)` into its XML text.
    pub fn read_chunk(&self, offset: u64, length: u64) -> Result<String> {
        let mut file = File::open(&self.dump_path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut compressed = vec![0u8; length as usize];
        file.read_exact(&mut compressed)?;

        let mut xml = String::new();
        BzDecoder::new(compressed.as_slice())
            .read_to_string(&mut xml)
            .map_err(|e| RetrievalError::Archive(format!("chunk decompression failed: {e}")))?;
        Ok(xml)
    }

    /// Path of the dump file.
    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }
}

/// Scan a decompressed chunk for the page record whose title matches exactly
/// and return its raw text.
pub fn extract_page(chunk_xml: &str, title: &str) -> Result<String> {
    let mut reader = Reader::from_str(chunk_xml);

    let mut in_page = false;
    let mut capture = Capture::None;
    let mut page_title: Option<String> = None;
    let mut page_text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    in_page = true;
                    page_title = None;
                    page_text = None;
                }
                b"title" if in_page && page_title.is_none() => {
                    capture = Capture::Title;
                    page_title = Some(String::new());
                }
                b"text" if in_page && page_text.is_none() => {
                    capture = Capture::Text;
                    page_text = Some(String::new());
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let unescaped = t.unescape().map_err(|e| {
                    RetrievalError::Archive(format!("chunk XML unescape failed: {e}"))
                })?;
                match capture {
                    Capture::Title => {
                        if let Some(buf) = page_title.as_mut() {
                            buf.push_str(&unescaped);
                        }
                    }
                    Capture::Text => {
                        if let Some(buf) = page_text.as_mut() {
                            buf.push_str(&unescaped);
                        }
                    }
                    Capture::None => {}
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"title" | b"text" => capture = Capture::None,
                b"page" => {
                    if page_title.as_deref() == Some(title) {
                        return Ok(page_text.take().unwrap_or_default());
                    }
                    in_page = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RetrievalError::Archive(format!(
                    "chunk XML parse error: {e}"
                )))
            }
        }
    }

    warn!(title = %title, "page record not found in decompressed chunk");
    Err(RetrievalError::PageNotFoundInChunk {
        title: title.to_string(),
    })
}
