//! Wavefront OBJ mesh writer

use std::io::{Error as IOError, Write};
use std::path::Path;

use super::export::{IOCode, IOWriteResult, MeshWriter, WriteMesh, WriteOptions};
use super::write_atomic;

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjWriter;

impl ObjWriter {
    pub fn new() -> ObjWriter {
        ObjWriter
    }

    fn write_meshes(&self, out: &mut dyn Write, meshes: &[WriteMesh], options: &WriteOptions) -> Result<(), IOError> {
        writeln!(out, "# orrery mesh export")?;
        let (mut v_base, mut vt_base, mut vn_base) = (1usize, 1usize, 1usize);
        options.report(0, meshes.len());
        for (i, wm) in meshes.iter().enumerate() {
            let mesh = &wm.mesh;
            let colors = mesh.colors().filter(|_| options.colors);
            let uvs = mesh.uvs().filter(|_| options.uvs);
            let normals = mesh.normals().filter(|_| options.normals);

            writeln!(out, "o {}", wm.name)?;
            for (j, v) in mesh.vertices().iter().enumerate() {
                match colors.and_then(|c| c.get(j)) {
                    Some(c) => writeln!(out, "v {} {} {} {} {} {}", v.x, v.y, v.z, c.r, c.g, c.b)?,
                    None => writeln!(out, "v {} {} {}", v.x, v.y, v.z)?,
                }
            }
            for uv in uvs.unwrap_or(&[]) {
                writeln!(out, "vt {} {}", uv.x, uv.y)?;
            }
            for n in normals.unwrap_or(&[]) {
                writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
            }
            for tri in mesh.triangles() {
                write!(out, "f")?;
                for &idx in tri {
                    let idx = idx as usize;
                    match (uvs.is_some(), normals.is_some()) {
                        (true, true) => write!(out, " {}/{}/{}", v_base + idx, vt_base + idx, vn_base + idx)?,
                        (true, false) => write!(out, " {}/{}", v_base + idx, vt_base + idx)?,
                        (false, true) => write!(out, " {}//{}", v_base + idx, vn_base + idx)?,
                        (false, false) => write!(out, " {}", v_base + idx)?,
                    }
                }
                writeln!(out)?;
            }

            v_base += mesh.vertex_count();
            vt_base += uvs.map_or(0, |u| u.len());
            vn_base += normals.map_or(0, |n| n.len());
            options.report(i + 1, meshes.len());
        }
        Ok(())
    }
}

impl MeshWriter for ObjWriter {
    fn write(&self, path: &Path, meshes: &[WriteMesh], options: &WriteOptions) -> IOWriteResult {
        if options.face_groups {
            return IOWriteResult::new(IOCode::UnsupportedFeature, "OBJ face groups are not supported");
        }
        match write_atomic(path, |out| self.write_meshes(out, meshes, options)) {
            Ok(()) => IOWriteResult::ok(),
            Err(e) => IOWriteResult::new(IOCode::WriteError, format!("{}: {}", path.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SimpleMesh;
    use orrery_geom::{Vec2, Vec3};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn triangle(name: &str) -> WriteMesh {
        let mesh = SimpleMesh::new(
            vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        )
        .unwrap()
        .with_normals(vec![Vec3::pos_z(); 3])
        .unwrap()
        .with_uvs(vec![Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)])
        .unwrap();
        WriteMesh {
            mesh,
            name: name.to_string(),
        }
    }

    #[test]
    fn writes_offsets_across_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.obj");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let options = WriteOptions {
            normals: true,
            uvs: false,
            progress: Some(Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..WriteOptions::default()
        };
        let r = ObjWriter.write(&path, &[triangle("a"), triangle("b")], &options);
        assert_eq!(r.code, IOCode::Ok);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("o a\n"));
        assert!(text.contains("f 1//1 2//2 3//3\n"));
        assert!(text.contains("f 4//4 5//5 6//6\n"));
        assert!(!text.contains("vt "));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn face_groups_fail_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.obj");
        let options = WriteOptions {
            face_groups: true,
            ..WriteOptions::default()
        };
        let r = ObjWriter.write(&path, &[triangle("a")], &options);
        assert_eq!(r.code, IOCode::UnsupportedFeature);
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.obj");
        let r = ObjWriter.write(&path, &[triangle("a")], &WriteOptions::default());
        assert_eq!(r.code, IOCode::WriteError);
        assert!(!r.message.is_empty());
    }
}
