//! Rendering phrases into a transcript document and storing the result.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::phrase::Phrase;
use async_trait::async_trait;
use log::*;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const DOCUMENT_EXTENSION: &str = ".docx";

/// Directory below the media root generated documents are written to.
const DOCUMENTS_DIR: &str = "documents";

/// Name of the document generated for a video.
pub fn document_name(video_id: &str) -> String {
    format!("auto_transcription-{video_id}{DOCUMENT_EXTENSION}")
}

/// Document names must be plain `.docx` file names.
pub fn validate_document_name(name: &str) -> Result<(), Error> {
    let stem = name.strip_suffix(DOCUMENT_EXTENSION).unwrap_or_default();
    if stem.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        warn!("Rejected document name {name:?}");
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(format!(
                "Document name must be a plain {DOCUMENT_EXTENSION} file name"
            ))),
        });
    }
    Ok(())
}

/// Turns phrases into the bytes of a document.
pub trait DocumentBuilder: Send + Sync {
    fn build(&self, phrases: &[Phrase]) -> Result<Vec<u8>, Error>;
}

/// Writes a minimal WordprocessingML package: per phrase, a bold start time
/// paragraph followed by a `Speaker X: text` paragraph.
#[derive(Debug, Default, Clone)]
pub struct DocxBuilder;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

impl DocxBuilder {
    fn document_xml(phrases: &[Phrase]) -> String {
        let mut body = String::new();
        for phrase in phrases {
            body.push_str(&paragraph(&phrase.start, true));
            let line = match &phrase.speaker {
                Some(speaker) => format!("Speaker {speaker}: {}", phrase.text),
                None => phrase.text.clone(),
            };
            body.push_str(&paragraph(&line, false));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }
}

impl DocumentBuilder for DocxBuilder {
    fn build(&self, phrases: &[Phrase]) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));

        let options = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(RELATIONSHIPS.as_bytes())?;
        zip.start_file("word/document.xml", options)?;
        zip.write_all(Self::document_xml(phrases).as_bytes())?;
        zip.finish()?;
        drop(zip);

        debug!(
            "Built document of {} bytes from {} phrases",
            buffer.len(),
            phrases.len()
        );
        Ok(buffer)
    }
}

fn paragraph(text: &str, bold: bool) -> String {
    let run_properties = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        r#"<w:p><w:r>{run_properties}<w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_xml(text)
    )
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Where a stored document ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Path relative to the media root, kept on the transcript record
    pub reference: String,
    /// Public download URL
    pub url: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<StoredDocument, Error>;

    /// Deletes a previously stored document. Missing documents are not an error.
    async fn remove(&self, reference: &str) -> Result<(), Error>;

    /// Public URL of a previously stored document.
    fn url(&self, reference: &str) -> String;
}

/// Stores documents below `media_root/documents`, served under `media_url`.
#[derive(Debug, Clone)]
pub struct FileSystemDocumentStore {
    media_root: PathBuf,
    media_url: String,
}

impl FileSystemDocumentStore {
    pub fn new(media_root: impl Into<PathBuf>, media_url: &str) -> Self {
        Self {
            media_root: media_root.into(),
            media_url: media_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl DocumentStore for FileSystemDocumentStore {
    async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<StoredDocument, Error> {
        validate_document_name(name)?;

        let directory = self.media_root.join(DOCUMENTS_DIR);
        tokio::fs::create_dir_all(&directory).await?;
        let path = directory.join(name);
        tokio::fs::write(&path, &bytes).await?;
        info!("Stored document {}", path.display());

        let reference = format!("{DOCUMENTS_DIR}/{name}");
        Ok(StoredDocument {
            url: self.url(&reference),
            reference,
        })
    }

    async fn remove(&self, reference: &str) -> Result<(), Error> {
        let name = document_name_of(reference)?;
        let path = self.media_root.join(DOCUMENTS_DIR).join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed document {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, reference: &str) -> String {
        format!("{}/{reference}", self.media_url)
    }
}

/// File name of a document reference, which must point into the documents directory.
pub(crate) fn document_name_of(reference: &str) -> Result<&str, Error> {
    let name = reference
        .strip_prefix(DOCUMENTS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(reference);
    validate_document_name(name)?;
    Ok(name)
}
