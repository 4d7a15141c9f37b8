//! Command-line interface for inklet.
//!
//! Provides commands for capturing note images, listing stored notes,
//! deleting a note, reading one aloud, and inspecting configuration.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    ElevenLabsClient, NoteStore, SpeechSynthesizer, SupabaseStore, VisionClient,
};
use crate::config::{self, ResolvedConfig};
use crate::core::{BatchProcessor, BatchSelection, ProcessorOptions, StatusUpdate};
use crate::domain::Note;
use crate::{ingest, render};

/// inklet - handwritten-note capture and transcription
#[derive(Parser, Debug)]
#[command(name = "inklet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe note images and save them
    Add {
        /// Image files to process
        files: Vec<PathBuf>,

        /// Also upload each source image and link its public URL
        #[arg(long)]
        upload_images: bool,
    },

    /// List saved notes, newest first
    List {
        /// Maximum number of notes to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Read a note aloud
    Read {
        /// Note id (as shown by `list`)
        id: String,
    },

    /// Delete a note
    Delete {
        /// Note id (as shown by `list`)
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Add {
                files,
                upload_images,
            } => add_notes(&files, upload_images).await,
            Commands::List { limit } => list_notes(limit).await,
            Commands::Read { id } => read_note(&id).await,
            Commands::Delete { id, yes } => delete_note(&id, yes).await,
            Commands::Config => show_config(),
        }
    }
}

/// Build the store client, requiring its settings to be present
fn store_client(cfg: &ResolvedConfig) -> Result<SupabaseStore> {
    let url = cfg
        .store
        .url
        .clone()
        .context("SUPABASE_URL is not set (environment or .inklet/config.yaml)")?;
    let key = cfg
        .store
        .api_key
        .clone()
        .context("SUPABASE_ANON_KEY is not set")?;
    Ok(SupabaseStore::new(url, key, cfg.store.bucket.clone()))
}

fn vision_client(cfg: &ResolvedConfig) -> Result<VisionClient> {
    let key = cfg
        .vision
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;
    Ok(VisionClient::new(key, cfg.vision.model.clone()).with_base_url(cfg.vision.base_url.clone()))
}

fn speech_client(cfg: &ResolvedConfig) -> Result<ElevenLabsClient> {
    let key = cfg
        .speech
        .api_key
        .clone()
        .context("ELEVENLABS_API_KEY is not set")?;
    Ok(
        ElevenLabsClient::new(key, cfg.speech.voice_id.clone(), cfg.speech.model_id.clone())
            .with_base_url(cfg.speech.base_url.clone()),
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Select the given files (normalizing as needed) and process the batch
async fn add_notes(files: &[PathBuf], upload_images: bool) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No files provided. Usage: inklet add <image>...");
    }

    let cfg = config::config()?;

    // Selection phase: normalize each file and build previews. A file
    // that cannot be read or converted is skipped; the batch continues.
    let mut selection = BatchSelection::new();
    for path in files {
        let name = display_name(path);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Skipping {}: {}", name, e);
                continue;
            }
        };

        match ingest::prepare(&name, bytes, &cfg.processing) {
            Ok(pending) => {
                selection.add(pending);
            }
            Err(e) => {
                eprintln!("Skipping {}: {}", name, e);
            }
        }
    }

    if selection.is_empty() {
        anyhow::bail!("No processable files selected");
    }
    eprintln!("Processing {} file(s)...", selection.len());

    let vision = vision_client(cfg)?;
    let store = store_client(cfg)?;

    let options = ProcessorOptions {
        upload_images,
        error_pause: cfg.processing.error_pause(),
    };
    let processor = BatchProcessor::new(&vision, &store, options);

    let report = processor
        .process(selection, |update| match update {
            StatusUpdate::Step { name, step } => {
                eprintln!("  {} {}...", step, name);
            }
            StatusUpdate::Failed { name, message } => {
                eprintln!("  Error processing {}: {}", name, message);
            }
            StatusUpdate::Completed { .. } => {}
        })
        .await;

    eprintln!(
        "\n{} of {} file(s) saved",
        report.succeeded(),
        report.attempted
    );
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!("  failed: {} ({})", failure.name, e);
        }
    }

    if report.succeeded() == 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Fetch and render stored notes (newest first, per the store's ordering)
async fn list_notes(limit: Option<usize>) -> Result<()> {
    let cfg = config::config()?;
    let store = store_client(cfg)?;

    let mut notes = store
        .get_all_notes()
        .await
        .context("Failed to fetch notes")?;

    if let Some(limit) = limit {
        notes.truncate(limit);
    }

    if notes.is_empty() {
        println!("No notes yet. Use 'inklet add <image>...' to capture some.");
        return Ok(());
    }

    print!("{}", render::render_notes(&notes));
    println!("\nTotal: {} note(s)", notes.len());

    Ok(())
}

/// Find a note by id, fetching the current list from the store
async fn find_note(store: &SupabaseStore, id: &str) -> Result<Note> {
    let notes = store
        .get_all_notes()
        .await
        .context("Failed to fetch notes")?;
    notes
        .into_iter()
        .find(|n| n.id == id)
        .with_context(|| format!("Note not found: {}", id))
}

/// Read a note aloud; returns once playback has finished
async fn read_note(id: &str) -> Result<()> {
    let cfg = config::config()?;
    let store = store_client(cfg)?;
    let speech = speech_client(cfg)?;

    let note = find_note(&store, id).await?;
    let text = render::plain_text(&note.content);
    if text.trim().is_empty() {
        anyhow::bail!("Note {} has no readable text", id);
    }

    eprintln!("Reading note {}...", id);
    speech
        .speak(&text)
        .await
        .context("Failed to read note aloud")?;
    eprintln!("Done");

    Ok(())
}

/// Delete a note after confirmation; the note is reported as removed
/// only once the remote delete has succeeded
async fn delete_note(id: &str, yes: bool) -> Result<()> {
    let cfg = config::config()?;
    let store = store_client(cfg)?;

    if !yes {
        eprint!("Delete note {}? [y/N] ", id);
        std::io::stderr().flush().ok();
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            eprintln!("Cancelled");
            return Ok(());
        }
    }

    store
        .delete_note(id)
        .await
        .with_context(|| format!("Failed to delete note {}", id))?;
    eprintln!("Deleted note {}", id);

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    let set_or_not = |v: &Option<String>| if v.is_some() { "set" } else { "NOT SET" };

    println!("inklet configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Vision:");
    println!("  OPENAI_API_KEY: {}", set_or_not(&cfg.vision.api_key));
    println!("  Model:          {}", cfg.vision.model);
    println!("  Base URL:       {}", cfg.vision.base_url);
    println!();
    println!("Store:");
    println!(
        "  SUPABASE_URL:      {}",
        cfg.store.url.as_deref().unwrap_or("NOT SET")
    );
    println!("  SUPABASE_ANON_KEY: {}", set_or_not(&cfg.store.api_key));
    println!("  Bucket:            {}", cfg.store.bucket);
    println!();
    println!("Speech:");
    println!(
        "  ELEVENLABS_API_KEY: {}",
        set_or_not(&cfg.speech.api_key)
    );
    println!("  Voice:              {}", cfg.speech.voice_id);
    println!("  Model:              {}", cfg.speech.model_id);
    println!();
    println!("Processing:");
    println!("  JPEG quality:  {}", cfg.processing.jpeg_quality);
    println!("  Preview edge:  {}px", cfg.processing.preview_edge);
    println!("  Error pause:   {}ms", cfg.processing.error_pause_ms);

    Ok(())
}
