//! Scene persistence and mesh export

mod export;
mod obj;
mod serialize;
mod stream;
mod worker;

use std::fs::{self, File};
use std::io::{BufWriter, Error as IOError, Write};
use std::path::{Path, PathBuf};

use serde_json::Error as JSONError;
use thiserror::Error;

use crate::scene::SceneError;

pub use export::*;
pub use obj::ObjWriter;
pub use serialize::*;
pub use stream::*;
pub use worker::*;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("IO Error: {0}")]
    Io(#[from] IOError),
    #[error("JSON Error: {0}")]
    Json(#[from] JSONError),
    #[error("Scene Error: {0}")]
    Scene(#[from] SceneError),
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

/// Writes through a sibling temp file renamed over `path` on success, so a
/// failed write never leaves a truncated target behind.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), IOError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), IOError>,
{
    let tmp = temp_path_for(path);
    let result = File::create(&tmp).and_then(|file| {
        let mut out = BufWriter::new(file);
        write(&mut out)?;
        out.flush()?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()
    });
    let result = result.and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
