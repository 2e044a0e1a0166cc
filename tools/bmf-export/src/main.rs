//! bmf-export - Bakge mesh export tool
//!
//! Converts OBJ meshes to Bakge Mesh Files (.bmf) and inspects existing ones

use anyhow::{Context, Result};
use bakge_bmf::{BMF_EXT, FsStorage, MeshData};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bmf_export::{inspect, manifest, obj};

#[derive(Parser)]
#[command(name = "bmf-export")]
#[command(about = "Bakge mesh export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build meshes from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },

    /// Convert a single OBJ mesh
    Mesh {
        /// Input OBJ file
        input: PathBuf,

        /// Output .bmf file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print header, counts and segment offsets of a .bmf file
    Info {
        /// Input .bmf file
        input: PathBuf,
    },

    /// Print vertices and triangles of a .bmf file
    Dump {
        /// Input .bmf file
        input: PathBuf,

        /// Maximum vertices and triangles to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building meshes from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let written = manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete! {} meshes written", written.len());
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Mesh { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension(BMF_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            obj::convert_obj(&input, &output)?;
            tracing::info!("Done!");
        }

        Commands::Info { input } => {
            let info = inspect::mesh_info(&input)?;
            println!("{}", info);
        }

        Commands::Dump { input, limit } => {
            let mesh = MeshData::load(&FsStorage::new(), &input)
                .with_context(|| format!("Failed to load mesh: {:?}", input))?;
            let stdout = std::io::stdout();
            inspect::dump(&mut stdout.lock(), &mesh, limit)?;
        }
    }

    Ok(())
}
