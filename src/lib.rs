//! # jobsite-docs – contractor document engine
//!
//! Turns typed document records (invoices, estimates, work orders, logs and
//! more) into PDF files. The pipeline stages are:
//!
//! 1. **Resolve** – pick the template and apply the document theme ([`templates`])
//! 2. **Compose** – lay out header, contact grid, tables, totals and
//!    signatures as positioned draw commands ([`compose`], [`draw`])
//! 3. **Paginate** – rasterise rich-text content once and slice it across
//!    pages ([`richtext`], [`raster`], [`pagination`])
//! 4. **Render** – emit PDF bytes via printpdf ([`render`])
//! 5. **Encode** – hand back bytes with a file name, or a data URI ([`pipeline`])
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod assets;
pub mod compose;
pub mod config;
pub mod document;
pub mod draw;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod pagination;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod richtext;
pub mod templates;
pub mod totals;

// Re-exports for convenience
pub use compose::compose_document;
pub use config::RenderConfig;
pub use document::{DocumentRecord, Profile};
pub use draw::DocumentLayout;
pub use error::{DocError, Result};
pub use pipeline::{file_name_for, generate, generate_with_loader, Generated};
pub use render::render_pdf;
