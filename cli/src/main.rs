mod atomic_write;
mod config;
mod document_file;
mod path_utils;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use futures::FutureExt;
use imgdrop_protocol::SelectionRange;
use imgdrop_protocol::Source;
use imgdrop_uploader::ClipboardEntry;
use imgdrop_uploader::DocumentEngine;
use imgdrop_uploader::FilePicker;
use imgdrop_uploader::ImageFile;
use imgdrop_uploader::ImageUploader;
use imgdrop_uploader::MemoryDocument;
use imgdrop_uploader::NoFilePicker;
use imgdrop_uploader::PasteHandling;
use imgdrop_uploader::PointerPosition;
use imgdrop_uploader::UploadOutcome;
use imgdrop_uploader::normalize_dropped_path;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigStore;
use crate::store::DirectoryStore;
use crate::store::StoreSettings;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Insert images into a rich-text document, showing a preview while they upload"
)]
struct Cli {
    /// JSON delta document to edit. Created when missing; without it an empty
    /// document is used and printed.
    #[arg(long, global = true, value_name = "PATH")]
    document: Option<PathBuf>,

    /// Directory uploads are copied into (overrides `[store] dir`).
    #[arg(long, env = "IMGDROP_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// URL prefix for stored files (overrides `[store] base_url`).
    #[arg(long, env = "IMGDROP_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Reject every upload with REASON instead of storing it.
    #[arg(long, value_name = "REASON", global = true)]
    fail_upload: Option<String>,

    /// Print the document as HTML instead of JSON.
    #[arg(long, global = true)]
    html: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Insert an image as if chosen from the toolbar's file picker.
    Insert {
        image: PathBuf,

        /// Caret index to insert at (defaults to the end of the document).
        #[arg(long)]
        index: Option<usize>,
    },
    /// Drop files (paths or `file://` URLs) onto the document.
    Drop {
        items: Vec<String>,

        /// Line under the pointer (0-based).
        #[arg(long, default_value_t = 0)]
        line: usize,

        /// Column under the pointer (0-based).
        #[arg(long, default_value_t = 0)]
        column: usize,
    },
    /// Paste clipboard entries, one per file.
    Paste {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// MIME type for every entry (inferred from the extension by default).
        #[arg(long)]
        mime: Option<String>,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ConfigStore::new_default()?;
    let store_config = config
        .store()
        .with_context(|| format!("read {}", config.path().display()))?;
    let imgdrop_home = config
        .path()
        .parent()
        .map(PathBuf::from)
        .context("config path has no parent directory")?;
    let settings = StoreSettings::resolve(
        cli.store_dir.as_deref(),
        cli.base_url.as_deref(),
        &store_config,
        &imgdrop_home,
    )?;
    let store = DirectoryStore::new(settings).with_failure(cli.fail_upload.clone());

    let doc = match &cli.document {
        Some(path) => document_file::load_document(path)?,
        None => document_file::empty_document(),
    };
    let engine = Arc::new(Mutex::new(doc));

    let outcome = run_command(cli.command, Arc::clone(&engine), store).await?;

    let doc = engine
        .lock()
        .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
    if let Some(path) = &cli.document {
        document_file::save_document(path, &doc)?;
    }
    if cli.html {
        println!("{}", doc.to_html());
    } else if cli.document.is_none() {
        println!("{}", document_file::render_json(&doc)?);
    }
    drop(doc);

    report(outcome)
}

async fn run_command(
    command: CliCommand,
    engine: Arc<Mutex<MemoryDocument>>,
    store: DirectoryStore,
) -> anyhow::Result<Option<UploadOutcome>> {
    let options = store.into_options();
    match command {
        CliCommand::Insert { image, index } => {
            let file = ImageFile::from_path(image);
            let picker = move |_accept: &str| futures::future::ready(Some(file.clone())).boxed();
            let uploader = ImageUploader::new(engine, Arc::new(picker), options);
            place_caret(&uploader, index)?;
            Ok(Some(uploader.trigger_manual_selection().outcome().await))
        }
        CliCommand::Drop {
            items,
            line,
            column,
        } => {
            let files = items
                .iter()
                .filter_map(|item| {
                    let path = normalize_dropped_path(item);
                    if path.is_none() {
                        tracing::warn!("ignoring dropped item {item:?}: not a single path");
                    }
                    path
                })
                .map(ImageFile::from_path)
                .collect();
            let uploader = uploader_without_picker(engine, options);
            let pointer = PointerPosition::new(column as f64, line as f64);
            match uploader.trigger_from_drop(files, pointer) {
                Some(handle) => Ok(Some(handle.outcome().await)),
                None => Ok(None),
            }
        }
        CliCommand::Paste { images, mime } => {
            let entries: Vec<ClipboardEntry> = images
                .into_iter()
                .map(|image| {
                    let file = ImageFile::from_path(image);
                    match &mime {
                        Some(mime) => ClipboardEntry::from_file(file.with_mime(mime.clone())),
                        None => ClipboardEntry::from_file(file),
                    }
                })
                .collect();
            let uploader = uploader_without_picker(engine, options);
            match uploader.trigger_from_paste(&entries) {
                PasteHandling::Intercepted(handle) => Ok(Some(handle.outcome().await)),
                PasteHandling::Default => Ok(None),
            }
        }
    }
}

fn uploader_without_picker(
    engine: Arc<Mutex<MemoryDocument>>,
    options: imgdrop_uploader::ImageUploaderOptions,
) -> ImageUploader<MemoryDocument> {
    let picker: Arc<dyn FilePicker> = Arc::new(NoFilePicker);
    ImageUploader::new(engine, picker, options)
}

/// Puts the caret at `index`, or at the end of the document.
fn place_caret(
    uploader: &ImageUploader<MemoryDocument>,
    index: Option<usize>,
) -> anyhow::Result<()> {
    let mut doc = uploader
        .engine()
        .lock()
        .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
    let end = doc.len().saturating_sub(1);
    doc.set_selection(SelectionRange::caret(index.unwrap_or(end)), Source::User);
    Ok(())
}

fn report(outcome: Option<UploadOutcome>) -> anyhow::Result<()> {
    match outcome {
        Some(UploadOutcome::Inserted { url, selection }) => {
            eprintln!("inserted {url} (caret at {})", selection.index);
            Ok(())
        }
        Some(UploadOutcome::UploadedWithoutSelection { url }) => {
            eprintln!("uploaded {url}; no selection to insert at");
            Ok(())
        }
        Some(UploadOutcome::Failed { reason, removed }) => {
            anyhow::bail!("upload failed: {reason} (removed {removed} preview unit(s))")
        }
        Some(UploadOutcome::Cancelled) => {
            eprintln!("no image selected");
            Ok(())
        }
        None => {
            eprintln!("nothing to upload");
            Ok(())
        }
    }
}
