//! `pubd`: inspect, validate and create Publisher documents from the shell.

use clap::{Parser, Subcommand};
use publisher_core::storage::{read_document, write_document};
use publisher_core::{Document, Editor, Item, PageSize, Settings, StorageError, StorageResult, Unit};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

/// Publisher document tool
#[derive(Parser, Debug)]
#[command(name = "pubd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print pages, sizes and item counts
    Info {
        /// Document to inspect
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a document; exits non-zero with the reason if it is corrupt
    Check {
        /// Document to validate
        input: PathBuf,
    },

    /// Create an empty document
    New {
        /// Output path
        output: PathBuf,

        /// Number of pages
        #[arg(short, long, default_value_t = 1)]
        pages: usize,

        /// Page size preset (Letter, A4, Legal, ...) or WIDTHxHEIGHT in points
        #[arg(short, long, default_value = "Letter")]
        size: String,

        /// Display unit (in, cm, px, ft)
        #[arg(short, long, default_value = "in")]
        unit: String,
    },

    /// Load and re-save a document in canonical form
    Normalize {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> StorageResult<()> {
    match command {
        Command::Info { input, json } => {
            let document = read_document(&input)?;
            if json {
                let summary = serde_json::to_string_pretty(&summary_json(&document))
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                println!("{summary}");
            } else {
                print_summary(&document);
            }
            Ok(())
        }
        Command::Check { input } => {
            let document = read_document(&input)?;
            println!(
                "{}: ok ({} pages, {} items)",
                input.display(),
                document.page_count(),
                document.item_count()
            );
            Ok(())
        }
        Command::New {
            output,
            pages,
            size,
            unit,
        } => {
            let size = parse_page_size(&size)?;
            let unit = parse_unit(&unit)?;
            let mut settings = Settings::default();
            settings.unit = unit;
            let mut editor = Editor::new(settings);
            editor.new_document(size);
            for _ in 1..pages.max(1) {
                editor.add_page(None, size)?;
            }
            write_document(&output, editor.document())?;
            log::info!("Created {} with {} pages", output.display(), editor.document().page_count());
            Ok(())
        }
        Command::Normalize { input, output } => {
            let document = read_document(&input)?;
            write_document(&output, &document)?;
            Ok(())
        }
    }
}

fn parse_page_size(text: &str) -> StorageResult<PageSize> {
    if let Some(size) = PageSize::preset(text) {
        return Ok(size);
    }
    let parsed = text
        .split_once(['x', 'X'])
        .and_then(|(w, h)| Some(PageSize::new(w.trim().parse().ok()?, h.trim().parse().ok()?)));
    match parsed {
        Some(size) if size.width >= 0.0 && size.height >= 0.0 => Ok(size),
        _ => Err(StorageError::Other(format!("unknown page size: {text}"))),
    }
}

fn parse_unit(text: &str) -> StorageResult<Unit> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|_| StorageError::Other(format!("unknown unit: {text}")))
}

fn kind_counts(items: &[Item]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.kind().tag()).or_insert(0) += 1;
    }
    counts
}

fn describe_size(size: PageSize) -> String {
    if size.is_infinite() {
        return "unbounded".to_string();
    }
    match size.preset_name() {
        Some(name) => format!("{name} ({} x {} pt)", size.width, size.height),
        None => format!("{} x {} pt", size.width, size.height),
    }
}

fn print_summary(document: &Document) {
    println!("format version: {}", document.format_version);
    println!("unit: {}", document.unit.suffix());
    println!("created: {}", document.created_at.to_rfc3339());
    println!("modified: {}", document.modified_at.to_rfc3339());
    println!("pages: {}", document.page_count());
    for (index, page) in document.pages().iter().enumerate() {
        println!("  [{index}] {} - {}, {} items", page.name, describe_size(page.size), page.len());
        for (tag, count) in kind_counts(page.items()) {
            println!("      {tag}: {count}");
        }
    }
}

fn summary_json(document: &Document) -> serde_json::Value {
    let pages: Vec<serde_json::Value> = document
        .pages()
        .iter()
        .map(|page| {
            serde_json::json!({
                "name": page.name,
                "width": page.size.width,
                "height": page.size.height,
                "items": kind_counts(page.items()),
            })
        })
        .collect();
    serde_json::json!({
        "format_version": document.format_version,
        "unit": document.unit,
        "modified_at": document.modified_at.to_rfc3339(),
        "pages": pages,
    })
}
