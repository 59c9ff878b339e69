//! jobsite – command-line document record → PDF converter.
//!
//! Usage:
//!   jobsite <document.json> [output] [--profile profile.json] [--config render.toml]
//!           [--data-uri] [--layout-json]
//!
//! If `output` is omitted the PDF is written next to the input file as
//! `<DocType>-<id>.pdf`. With `--data-uri` or `--layout-json` and no output
//! path the result goes to stdout.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;

use jobsite_docs::assets::DefaultAssetLoader;
use jobsite_docs::{
    compose_document, file_name_for, generate_with_loader, DocumentRecord, Generated, Profile,
    RenderConfig, Result,
};

#[derive(Parser)]
#[command(name = "jobsite")]
#[command(version, about = "Render contractor document records to PDF", long_about = None)]
struct Cli {
    /// Document record (JSON, tagged with "kind")
    input: PathBuf,

    /// Output path (default: <DocType>-<id>.pdf next to the input)
    output: Option<PathBuf>,

    /// Company profile JSON used for empty company fields
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Render settings (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit a data: URI instead of raw PDF bytes
    #[arg(long, conflicts_with = "layout_json")]
    data_uri: bool,

    /// Emit the composed page layout as JSON instead of a PDF
    #[arg(long)]
    layout_json: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let doc = DocumentRecord::from_json(&fs::read_to_string(&cli.input)?)?;
    let profile = match &cli.profile {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Profile::default(),
    };
    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let loader = DefaultAssetLoader::new(config.fetch_timeout_secs.map(std::time::Duration::from_secs));

    if cli.layout_json {
        let layout = compose_document(&doc, &profile, &config, &loader)?;
        let json = layout.to_json();
        emit(cli.output.as_deref(), json.as_bytes())?;
        eprintln!(
            "Composed {} ({} page{})",
            layout.title,
            layout.pages.len(),
            plural(layout.pages.len())
        );
        return Ok(());
    }

    match generate_with_loader(&doc, &profile, &config, &loader, cli.data_uri)? {
        Generated::File { file_name, bytes } => {
            let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.input, &file_name));
            write_file(&output, &bytes)?;
            eprintln!("Wrote '{}' ({} bytes)", output.display(), bytes.len());
        }
        Generated::DataUri(uri) => {
            emit(cli.output.as_deref(), uri.as_bytes())?;
            eprintln!("Encoded {} as a data URI ({} chars)", file_name_for(&doc), uri.len());
        }
    }
    Ok(())
}

fn default_output(input: &Path, file_name: &str) -> PathBuf {
    input
        .parent()
        .map_or_else(|| PathBuf::from(file_name), |dir| dir.join(file_name))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    // Create output directory if necessary.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Write to `path`, or stdout when no path was given.
fn emit(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(p) => write_file(p, bytes),
        None => {
            use std::io::Write;
            let mut out = std::io::stdout().lock();
            out.write_all(bytes)?;
            out.write_all(b"\n")?;
            Ok(())
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
