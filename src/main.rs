use clap::{Parser, Subcommand};
use sigmf_archive::{extract, pack, Metadata, Recording};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sigmf", about = "Pack and extract .sigmf recording archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack recordings into a .sigmf archive
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Metadata files (.sigmf-meta), each with a sibling .sigmf-data
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Extract the recordings of a .sigmf archive
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, input } => {
            let mut recordings = Vec::with_capacity(input.len());
            for meta_path in &input {
                recordings.push(load_recording(meta_path)?);
            }
            let path = pack(&recordings, &output)?;
            for rec in &recordings {
                println!("  packed  {}", rec.name.as_deref().unwrap_or("?"));
            }
            println!("Created: {}", path.display());
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir } => {
            let recordings = extract(&input, Some(&output_dir))?;
            for rec in &recordings {
                let size = rec
                    .data_file
                    .as_deref()
                    .and_then(|p| std::fs::metadata(p).ok())
                    .map(|m| m.len())
                    .unwrap_or(0);
                println!("  {:<26} {:>12} B", rec.name.as_deref().unwrap_or("?"), size);
            }
            println!("Unpacked {} recording(s) to: {}", recordings.len(), output_dir.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Build a recording from a `.sigmf-meta` file: the name is the file stem
/// and the dataset is the sibling `.sigmf-data`.
fn load_recording(meta_path: &Path) -> Result<Recording, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(meta_path)?;
    let metadata = Metadata::from_value(serde_json::from_slice(&bytes)?);

    let mut recording = Recording::new(metadata);
    recording.name = meta_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    recording.data_file = Some(meta_path.with_extension("sigmf-data"));
    Ok(recording)
}
