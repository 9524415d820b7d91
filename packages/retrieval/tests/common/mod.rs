//! Shared fixtures: a real compressed archive built on the fly.

use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use bzip2::Compression;

/// Write a dump of independently compressed chunks and its manifest.
///
/// Each inner slice becomes one bzip2 chunk of `(title, body)` page
/// records. Returns `(manifest_path, dump_path)`. Remember that titles in
/// the final chunk are never indexed; callers that want every real page
/// resolvable should append a sentinel chunk.
pub fn build_archive(dir: &Path, chunks: &[&[(&str, &str)]]) -> (PathBuf, PathBuf) {
    let manifest_path = dir.join("manifest.txt");
    let dump_path = dir.join("dump.xml.bz2");

    let mut dump: Vec<u8> = Vec::new();
    let mut manifest = String::new();
    let mut id = 1u64;

    for chunk in chunks {
        let offset = dump.len() as u64;
        let mut xml = String::new();
        for (title, body) in chunk.iter() {
            xml.push_str(&format!(
                "<page><title>{}</title><ns>0</ns><id>{id}</id>\
                 <revision><id>{id}</id><text xml:space=\"preserve\">{}</text></revision></page>",
                xml_escape(title),
                xml_escape(body),
            ));
            manifest.push_str(&format!("{offset}:{id}:{title}\n"));
            id += 1;
        }

        let mut encoder = BzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(xml.as_bytes()).unwrap();
        dump.extend(encoder.finish().unwrap());
    }

    std::fs::write(&manifest_path, manifest).unwrap();
    std::fs::write(&dump_path, &dump).unwrap();
    (manifest_path, dump_path)
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
