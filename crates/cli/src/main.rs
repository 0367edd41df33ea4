use clap::{Parser, Subcommand};
use sncop_core::{resolve_config, StorageService};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sncop")]
#[command(about = "SNCOP study-material storage admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List subjects and their files from the storage tree
    List {
        /// Restrict to one subject
        subject: Option<String>,
    },
    /// Create a subject directory structure
    CreateSubject {
        /// Subject name (used as the directory name)
        name: String,
        /// Unit names for the notes section
        #[arg(long = "unit")]
        units: Vec<String>,
    },
    /// Add a unit to a subject's notes
    AddUnit {
        /// Subject name
        subject: String,
        /// Unit name
        unit: String,
    },
    /// Delete a subject and everything under it
    DeleteSubject {
        /// Subject name
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = Arc::new(resolve_config(
        std::env::var("SNCOP_STORAGE_DIR").ok(),
        std::env::var("SNCOP_METADATA_FILE").ok(),
        std::env::var("SNCOP_DEV_MODE").ok(),
    )?);
    let service = StorageService::new(cfg)?;

    match cli.command {
        Some(Commands::List { subject }) => {
            let sync = service.storage_sync(subject.as_deref())?;
            if sync.structure.is_empty() {
                println!("No subjects found.");
            } else {
                for (name, files) in &sync.structure {
                    let note_count: usize = files.notes.values().map(Vec::len).sum();
                    println!(
                        "{name}: {note_count} notes across {} units, {} practice tests, {} practicals",
                        files.notes.len(),
                        files.practice_tests.len(),
                        files.practicals.len()
                    );
                    for (unit, entries) in &files.notes {
                        for entry in entries {
                            println!("  [{unit}] {} ({})", entry.title, entry.filename);
                        }
                    }
                }
            }
        }
        Some(Commands::CreateSubject { name, units }) => {
            match service.create_subject(&name, &units) {
                Ok(path) => println!("Created subject at {}", path.display()),
                Err(e) => eprintln!("Error creating subject: {e}"),
            }
        }
        Some(Commands::AddUnit { subject, unit }) => match service.add_unit(&subject, &unit) {
            Ok(path) => println!("Created unit at {}", path.display()),
            Err(e) => eprintln!("Error creating unit: {e}"),
        },
        Some(Commands::DeleteSubject { name }) => match service.delete_subject(&name) {
            Ok(()) => println!("Deleted subject '{name}'"),
            Err(e) => eprintln!("Error deleting subject: {e}"),
        },
        None => {
            println!("Use --help to see available commands.");
        }
    }

    Ok(())
}
