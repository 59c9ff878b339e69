//! Pipeline – ties together style resolution, composition and rendering
//! into a single function call, and encodes the result for the caller.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::assets::{AssetLoader, DefaultAssetLoader};
use crate::compose::compose_document;
use crate::config::RenderConfig;
use crate::document::{DocumentRecord, Profile};
use crate::error::Result;
use crate::render::render_pdf;

/// Output of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    /// PDF bytes with a suggested download name.
    File { file_name: String, bytes: Vec<u8> },
    /// `data:application/pdf;filename=<name>;base64,<payload>`
    DataUri(String),
}

impl Generated {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Generated::File { file_name, .. } => Some(file_name),
            Generated::DataUri(_) => None,
        }
    }
}

/// `<DocType>-<primary id>.pdf`. Characters that are unsafe in file names
/// become `-`; a blank id is dropped.
pub fn file_name_for(doc: &DocumentRecord) -> String {
    let id: String = doc
        .primary_id()
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() || c.is_whitespace() => '-',
            c => c,
        })
        .collect();
    if id.is_empty() {
        format!("{}.pdf", doc.type_name())
    } else {
        format!("{}-{}.pdf", doc.type_name(), id)
    }
}

/// Wrap PDF bytes in a `data:` URI that carries the file name.
pub fn to_data_uri(file_name: &str, bytes: &[u8]) -> String {
    format!(
        "data:application/pdf;filename={};base64,{}",
        file_name,
        BASE64_STD.encode(bytes)
    )
}

/// Generate a document, fetching remote assets with the default loader.
pub fn generate(
    doc: &DocumentRecord,
    profile: &Profile,
    config: &RenderConfig,
    as_data_uri: bool,
) -> Result<Generated> {
    let loader = DefaultAssetLoader::new(config.fetch_timeout_secs.map(Duration::from_secs));
    generate_with_loader(doc, profile, config, &loader, as_data_uri)
}

/// Generate a document with a caller-supplied asset loader.
pub fn generate_with_loader(
    doc: &DocumentRecord,
    profile: &Profile,
    config: &RenderConfig,
    loader: &dyn AssetLoader,
    as_data_uri: bool,
) -> Result<Generated> {
    let layout = compose_document(doc, profile, config, loader)?;
    let bytes = render_pdf(&layout)?;
    let file_name = file_name_for(doc);
    log::debug!(
        "Generated {file_name}: {} page(s), {} bytes",
        layout.pages.len(),
        bytes.len()
    );

    Ok(if as_data_uri {
        Generated::DataUri(to_data_uri(&file_name, &bytes))
    } else {
        Generated::File { file_name, bytes }
    })
}
