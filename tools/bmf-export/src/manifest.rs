//! Asset manifest (assets.toml) for batch mesh builds
//!
//! ```toml
//! [output]
//! dir = "build/meshes"
//!
//! [[meshes]]
//! id = "cube"
//! path = "models/cube.obj"
//! ```
//!
//! Mesh paths are relative to the manifest's directory. Each mesh is written
//! to `<output dir>/<id>.bmf`.

use anyhow::{Context, Result, bail};
use bakge_bmf::BMF_EXT;
use hashbrown::HashSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::obj;

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsManifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub meshes: Vec<MeshEntry>,
    /// Directory the manifest was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshEntry {
    pub id: String,
    pub path: PathBuf,
}

impl AssetsManifest {
    /// Source path of a mesh entry
    pub fn source_path(&self, entry: &MeshEntry) -> PathBuf {
        self.base_dir.join(&entry.path)
    }

    /// Output directory, optionally overridden
    pub fn output_dir(&self, output_override: Option<&Path>) -> PathBuf {
        match output_override {
            Some(dir) => dir.to_path_buf(),
            None => self.base_dir.join(&self.output.dir),
        }
    }
}

pub fn parse_manifest(text: &str, base_dir: &Path) -> Result<AssetsManifest> {
    let mut manifest: AssetsManifest = toml::from_str(text).context("Invalid manifest")?;
    manifest.base_dir = base_dir.to_path_buf();
    Ok(manifest)
}

pub fn load_manifest(path: &Path) -> Result<AssetsManifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&text, base_dir).with_context(|| format!("In manifest {:?}", path))
}

/// Check ids are unique and valid, and every source exists
pub fn validate(manifest: &AssetsManifest) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in &manifest.meshes {
        if entry.id.is_empty() || entry.id.contains(['/', '\\']) {
            bail!("Invalid mesh id {:?}", entry.id);
        }
        if !seen.insert(entry.id.as_str()) {
            bail!("Duplicate mesh id {:?}", entry.id);
        }
        let source = manifest.source_path(entry);
        if !source.is_file() {
            bail!("Mesh {:?}: source not found: {:?}", entry.id, source);
        }
    }
    Ok(())
}

/// Convert every mesh in the manifest, returning the written paths
pub fn build_all(
    manifest: &AssetsManifest,
    output_override: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    validate(manifest)?;

    let out_dir = manifest.output_dir(output_override);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output dir: {:?}", out_dir))?;

    let mut written = Vec::with_capacity(manifest.meshes.len());
    for entry in &manifest.meshes {
        let input = manifest.source_path(entry);
        let output = out_dir.join(format!("{}.{}", entry.id, BMF_EXT));
        tracing::info!("Mesh {}: {:?} -> {:?}", entry.id, input, output);
        obj::convert_obj(&input, &output).with_context(|| format!("Mesh {:?}", entry.id))?;
        written.push(output);
    }

    Ok(written)
}
