//! bmf-export library
//!
//! OBJ conversion, manifest builds and mesh inspection, shared with the
//! `bmf-export` binary.

pub mod inspect;
pub mod manifest;
pub mod obj;

pub use inspect::{MeshInfo, dump, mesh_info};
pub use manifest::{AssetsManifest, MeshEntry, build_all, load_manifest};
pub use obj::{convert_obj, convert_obj_to_memory, parse_obj};
