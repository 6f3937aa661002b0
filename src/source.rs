//! Input files: zipped exports or bare CAMT.053 XML files.

use crate::camt053_format::Camt053Document;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Supported source file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// ZIP archive holding one or more XML statements
    Zip,
    /// CAMT.053 XML file
    Xml,
}

impl SourceKind {
    /// Detect the kind of a source file from its signature, then its extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        let read = file.read(&mut magic)?;
        if read == magic.len() && magic == ZIP_MAGIC {
            return Ok(SourceKind::Zip);
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Ok(SourceKind::Xml),
            _ => Err(Error::UnsupportedSource(path.to_path_buf())),
        }
    }
}

/// A parsed XML document and where it came from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File path, or `archive.zip:member.xml` for archive members.
    pub origin: String,
    pub document: Camt053Document,
}

/// Read every CAMT.053 document contained in a source file.
pub fn read_source(path: &Path) -> Result<Vec<SourceDocument>> {
    match SourceKind::detect(path)? {
        SourceKind::Xml => {
            let mut file = File::open(path)?;
            let document = Camt053Document::from_read(&mut file)?;
            Ok(vec![SourceDocument {
                origin: path.display().to_string(),
                document,
            }])
        }
        SourceKind::Zip => read_archive(File::open(path)?, &path.display().to_string()),
    }
}

/// Read every XML member of a ZIP archive, in archive order.
pub fn read_archive<R: Read + Seek>(reader: R, origin: &str) -> Result<Vec<SourceDocument>> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut documents = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }

        let name = member.name().to_string();
        if !name.to_lowercase().ends_with(".xml") {
            log::warn!("Skipping {}:{} (not an XML statement)", origin, name);
            continue;
        }

        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        let document = Camt053Document::from_bytes(&bytes)?;
        documents.push(SourceDocument {
            origin: format!("{}:{}", origin, name),
            document,
        });
    }

    if documents.is_empty() {
        return Err(Error::MissingField(format!("{} contains no XML statement", origin)));
    }

    Ok(documents)
}
