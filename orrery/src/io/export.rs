//! Mesh export of the scene's surface objects

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scene::{SOId, Scene, SceneError, SceneObject, SimpleMesh};

use super::obj::ObjWriter;
use super::worker::{ExportStatus, ExportWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IOCode {
    Ok,
    WriteError,
    UnsupportedFeature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IOWriteResult {
    pub code: IOCode,
    pub message: String,
}

impl IOWriteResult {
    pub fn new<S: Into<String>>(code: IOCode, message: S) -> IOWriteResult {
        IOWriteResult {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> IOWriteResult {
        IOWriteResult::new(IOCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code == IOCode::Ok
    }
}

/// Owned copy of one object's geometry, in Scene space.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteMesh {
    pub mesh: SimpleMesh,
    pub name: String,
}

pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone, Default)]
pub struct WriteOptions {
    pub normals: bool,
    pub colors: bool,
    pub uvs: bool,
    pub face_groups: bool,
    /// Called with `(current, max)` as meshes are written.
    pub progress: Option<ProgressFn>,
}

impl WriteOptions {
    pub(crate) fn report(&self, current: usize, max: usize) {
        if let Some(progress) = &self.progress {
            progress(current, max);
        }
    }
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("normals", &self.normals)
            .field("colors", &self.colors)
            .field("uvs", &self.uvs)
            .field("face_groups", &self.face_groups)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// File-format backend.
pub trait MeshWriter: Send + Sync {
    fn write(&self, path: &Path, meshes: &[WriteMesh], options: &WriteOptions) -> IOWriteResult;
}

pub type PartFilter = Box<dyn Fn(SOId, &SceneObject) -> bool>;

pub struct MeshExporter {
    pub write_normals: bool,
    pub write_uvs: bool,
    pub write_vertex_colors: bool,
    pub write_face_groups: bool,
    /// Hand the write to an [`ExportWorker`] when one is given.
    pub background: bool,
    /// Objects rejected by the filter are left out of the export.
    pub part_filter: Option<PartFilter>,
    pub writer: Arc<dyn MeshWriter>,
}

impl Default for MeshExporter {
    fn default() -> Self {
        MeshExporter {
            write_normals: true,
            write_uvs: false,
            write_vertex_colors: false,
            write_face_groups: false,
            background: true,
            part_filter: None,
            writer: Arc::new(ObjWriter::new()),
        }
    }
}

impl MeshExporter {
    pub fn new() -> MeshExporter {
        MeshExporter::default()
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            normals: self.write_normals,
            colors: self.write_vertex_colors,
            uvs: self.write_uvs,
            face_groups: self.write_face_groups,
            progress: None,
        }
    }

    /// One merged mesh per persistent surface object, converted to Scene
    /// space. The result shares nothing with the live scene.
    pub fn snapshot(&self, scene: &Scene) -> Result<Vec<WriteMesh>, SceneError> {
        let mut meshes = Vec::new();
        let mut stack: Vec<(SOId, usize)> = scene.root_objects().iter().rev().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if depth > scene.len() {
                return Err(SceneError::CyclicHierarchy(id));
            }
            let so = scene.get(id)?;
            if so.is_temporary() {
                continue;
            }
            stack.extend(so.children().iter().rev().map(|&c| (c, depth + 1)));

            if !so.is_surface() || !self.part_filter.as_ref().map_or(true, |f| f(id, so)) {
                continue;
            }
            let parts = so.geometry().mesh_parts();
            if parts.is_empty() {
                continue;
            }
            let to_scene = scene.scene_transform(id)?;
            let mapped: Vec<SimpleMesh> = parts
                .iter()
                .map(|part| {
                    part.mesh.mapped(
                        |p| to_scene.local_to_parent(part.transform.local_to_parent(p)),
                        |n| to_scene.normal_to_parent(part.transform.normal_to_parent(n)),
                    )
                })
                .collect();
            meshes.push(WriteMesh {
                mesh: merge_meshes(&mapped)?,
                name: so.name().to_string(),
            });
        }
        Ok(meshes)
    }

    /// Snapshots the scene, then writes either inline or on `worker`.
    pub fn export<P: Into<PathBuf>>(&self, scene: &Scene, path: P, worker: Option<&ExportWorker>) -> ExportStatus {
        let path = path.into();
        let options = self.write_options();
        if options.face_groups {
            log::error!("Export to {} rejected: face groups are not supported", path.display());
            return ExportStatus::finished(IOWriteResult::new(
                IOCode::UnsupportedFeature,
                "face group export is not supported",
            ));
        }
        let meshes = match self.snapshot(scene) {
            Ok(meshes) => meshes,
            Err(e) => {
                log::error!("Export snapshot failed: {}", e);
                return ExportStatus::finished(IOWriteResult::new(IOCode::WriteError, e.to_string()));
            }
        };
        log::info!("Exporting {} meshes to {}", meshes.len(), path.display());
        match worker.filter(|_| self.background) {
            Some(worker) => worker.submit(path, meshes, options, self.writer.clone()),
            None => {
                let result = self.writer.write(&path, &meshes, &options);
                log_result(&path, &result);
                ExportStatus::finished(result)
            }
        }
    }
}

pub(crate) fn log_result(path: &Path, result: &IOWriteResult) {
    if result.is_ok() {
        log::info!("Export to {} finished", path.display());
    } else {
        log::error!("Export to {} failed ({:?}): {}", path.display(), result.code, result.message);
    }
}

/// Concatenates meshes. An optional attribute survives only when every
/// input carries it.
fn merge_meshes(meshes: &[SimpleMesh]) -> Result<SimpleMesh, SceneError> {
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for m in meshes {
        let base = vertices.len() as u32;
        vertices.extend_from_slice(m.vertices());
        triangles.extend(m.triangles().iter().map(|t| [t[0] + base, t[1] + base, t[2] + base]));
    }
    let mut merged = SimpleMesh::new(vertices, triangles)?;
    if let Some(normals) = concat(meshes, |m| m.normals()) {
        merged = merged.with_normals(normals)?;
    }
    if let Some(colors) = concat(meshes, |m| m.colors()) {
        merged = merged.with_colors(colors)?;
    }
    if let Some(uvs) = concat(meshes, |m| m.uvs()) {
        merged = merged.with_uvs(uvs)?;
    }
    Ok(merged)
}

fn concat<T: Clone, F>(meshes: &[SimpleMesh], attr: F) -> Option<Vec<T>>
where
    F: Fn(&SimpleMesh) -> Option<&[T]>,
{
    let mut out = Vec::new();
    for m in meshes {
        out.extend_from_slice(attr(m)?);
    }
    Some(out)
}
