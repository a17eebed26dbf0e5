//! Triangle meshes and polylines

use std::f32::consts::PI;

use orrery_geom::{Aabb3, Quaternion, Ray3, Vec2, Vec3};

use crate::Color;

use super::SceneError;

const PARALLEL_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub t: f32,
    pub normal: Vec3,
    pub triangle: usize,
}

/// Indexed triangle mesh with optional per-vertex attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleMesh {
    vertices: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    colors: Option<Vec<Color>>,
    uvs: Option<Vec<Vec2>>,
    triangles: Vec<[u32; 3]>,
}

impl SimpleMesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<SimpleMesh, SceneError> {
        let n = vertices.len() as u32;
        if let Some(tri) = triangles.iter().find(|tri| tri.iter().any(|&i| i >= n)) {
            return Err(SceneError::InvalidArgument(format!(
                "triangle {:?} indexes past {} vertices",
                tri, n
            )));
        }
        Ok(SimpleMesh {
            vertices,
            triangles,
            ..SimpleMesh::default()
        })
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<SimpleMesh, SceneError> {
        self.check_attribute_len("normals", normals.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Result<SimpleMesh, SceneError> {
        self.check_attribute_len("colors", colors.len())?;
        self.colors = Some(colors);
        Ok(self)
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Result<SimpleMesh, SceneError> {
        self.check_attribute_len("uvs", uvs.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    fn check_attribute_len(&self, what: &str, len: usize) -> Result<(), SceneError> {
        if len != self.vertices.len() {
            return Err(SceneError::InvalidArgument(format!(
                "{} has {} entries for {} vertices",
                what,
                len,
                self.vertices.len()
            )));
        }
        Ok(())
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    pub fn colors(&self) -> Option<&[Color]> {
        self.colors.as_deref()
    }

    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.vertices.iter().copied())
    }

    /// Applies `point` to every vertex and `normal` to every normal.
    pub fn mapped<P, N>(&self, point: P, normal: N) -> SimpleMesh
    where
        P: Fn(Vec3) -> Vec3,
        N: Fn(Vec3) -> Vec3,
    {
        SimpleMesh {
            vertices: self.vertices.iter().map(|&v| point(v)).collect(),
            normals: self
                .normals
                .as_ref()
                .map(|ns| ns.iter().map(|&n| normal(n)).collect()),
            colors: self.colors.clone(),
            uvs: self.uvs.clone(),
            triangles: self.triangles.clone(),
        }
    }

    /// Nearest two-sided triangle hit. Equal distances resolve to the lower
    /// triangle index. The ray direction need not be unit length.
    pub fn find_ray_intersection(&self, ray: &Ray3) -> Option<MeshHit> {
        let mut best: Option<MeshHit> = None;
        for (index, tri) in self.triangles.iter().enumerate() {
            let a = self.vertices[tri[0] as usize];
            let b = self.vertices[tri[1] as usize];
            let c = self.vertices[tri[2] as usize];
            if let Some(t) = ray_triangle(ray, a, b, c) {
                if best.map_or(true, |h| t < h.t) {
                    best = Some(MeshHit {
                        t,
                        normal: (b - a).cross(c - a).normalized(),
                        triangle: index,
                    });
                }
            }
        }
        best
    }

    /// Axis-aligned box centered on the origin with flat-shaded faces.
    pub fn new_box(extents: Vec3) -> SimpleMesh {
        let mut vertices = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(12);
        for axis in 0..3 {
            for &sign in &[1.0f32, -1.0] {
                let mut n = Vec3::zero();
                n[axis] = sign;
                let mut u = Vec3::zero();
                u[(axis + 1) % 3] = 1.0;
                let v = n.cross(u);
                let center = n * extents[axis];
                let base = vertices.len() as u32;
                for &(su, sv) in &[(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                    vertices.push(center + u * (su * extents[(axis + 1) % 3]) + v * (sv * v.dot(extents).abs()));
                    normals.push(n);
                }
                triangles.push([base, base + 1, base + 2]);
                triangles.push([base, base + 2, base + 3]);
            }
        }
        SimpleMesh {
            vertices,
            normals: Some(normals),
            triangles,
            ..SimpleMesh::default()
        }
    }

    pub fn new_uv_sphere(radius: f32, slices: u32, stacks: u32) -> SimpleMesh {
        let slices = slices.max(3);
        let stacks = stacks.max(2);
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        for i in 0..=stacks {
            let phi = PI * i as f32 / stacks as f32;
            for j in 0..=slices {
                let theta = 2.0 * PI * j as f32 / slices as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(n * radius);
                normals.push(n);
                uvs.push(Vec2::new(j as f32 / slices as f32, 1.0 - i as f32 / stacks as f32));
            }
        }
        let row = slices + 1;
        let mut triangles = Vec::new();
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                triangles.push([a, a + 1, b]);
                triangles.push([a + 1, b + 1, b]);
            }
        }
        SimpleMesh {
            vertices,
            normals: Some(normals),
            uvs: Some(uvs),
            triangles,
            ..SimpleMesh::default()
        }
    }

    /// Capped cylinder along Y, centered on the origin.
    pub fn new_cylinder(radius: f32, height: f32, slices: u32) -> SimpleMesh {
        let slices = slices.max(3);
        let half = height * 0.5;
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut triangles = Vec::new();
        for j in 0..slices {
            let theta = 2.0 * PI * j as f32 / slices as f32;
            let n = Vec3::new(theta.cos(), 0.0, theta.sin());
            vertices.push(n * radius + Vec3::new(0.0, -half, 0.0));
            vertices.push(n * radius + Vec3::new(0.0, half, 0.0));
            normals.push(n);
            normals.push(n);
        }
        for j in 0..slices {
            let a = 2 * j;
            let b = 2 * ((j + 1) % slices);
            triangles.push([a, a + 1, b]);
            triangles.push([b, a + 1, b + 1]);
        }
        for &(y, ny) in &[(-half, -1.0f32), (half, 1.0)] {
            let center = vertices.len() as u32;
            vertices.push(Vec3::new(0.0, y, 0.0));
            normals.push(Vec3::new(0.0, ny, 0.0));
            for j in 0..slices {
                let theta = 2.0 * PI * j as f32 / slices as f32;
                vertices.push(Vec3::new(theta.cos() * radius, y, theta.sin() * radius));
                normals.push(Vec3::new(0.0, ny, 0.0));
            }
            for j in 0..slices {
                let a = center + 1 + j;
                let b = center + 1 + (j + 1) % slices;
                if ny > 0.0 {
                    triangles.push([center, b, a]);
                } else {
                    triangles.push([center, a, b]);
                }
            }
        }
        SimpleMesh {
            vertices,
            normals: Some(normals),
            triangles,
            ..SimpleMesh::default()
        }
    }

    /// Sweeps a closed 2D `polygon` along `curve` using parallel-transported
    /// frames. Open ends are left uncapped.
    pub fn new_tube(curve: &Curve, polygon: &[Vec2]) -> SimpleMesh {
        let points = curve.vertices();
        let (n, m) = (points.len(), polygon.len());
        if n < 2 || m < 2 {
            return SimpleMesh::default();
        }

        let mut vertices = Vec::with_capacity(n * m);
        let mut tangent = curve.tangent(0);
        let mut normal = any_perpendicular(tangent);
        for i in 0..n {
            let next = curve.tangent(i);
            normal = Quaternion::from_to(tangent, next).apply_to(normal);
            tangent = next;
            let binormal = tangent.cross(normal);
            for p in polygon {
                vertices.push(points[i] + normal * p.x + binormal * p.y);
            }
        }

        let rings = if curve.is_closed() { n } else { n - 1 };
        let mut triangles = Vec::with_capacity(rings * m * 2);
        for i in 0..rings {
            let i1 = (i + 1) % n;
            for j in 0..m {
                let j1 = (j + 1) % m;
                let a = (i * m + j) as u32;
                let b = (i * m + j1) as u32;
                let c = (i1 * m + j) as u32;
                let d = (i1 * m + j1) as u32;
                triangles.push([a, c, b]);
                triangles.push([b, c, d]);
            }
        }
        SimpleMesh {
            vertices,
            triangles,
            ..SimpleMesh::default()
        }
    }
}

fn any_perpendicular(v: Vec3) -> Vec3 {
    let a = v.abs();
    let axis = if a.x <= a.y && a.x <= a.z {
        Vec3::pos_x()
    } else if a.y <= a.z {
        Vec3::pos_y()
    } else {
        Vec3::pos_z()
    };
    v.cross(axis).normalized()
}

/// Möller–Trumbore, two-sided. Returns the ray parameter of the hit.
pub(crate) fn ray_triangle(ray: &Ray3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if u < 0.0 || u > 1.0 {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

/// Polyline, optionally closed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    vertices: Vec<Vec3>,
    closed: bool,
}

impl Curve {
    pub fn new(vertices: Vec<Vec3>, closed: bool) -> Curve {
        Curve { vertices, closed }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.vertices.iter().copied())
    }

    pub fn arc_length(&self) -> f32 {
        let open: f32 = self.vertices.windows(2).map(|w| w[0].distance(w[1])).sum();
        match (self.closed, self.vertices.first(), self.vertices.last()) {
            (true, Some(&first), Some(&last)) => open + first.distance(last),
            _ => open,
        }
    }

    /// Central-difference tangent at vertex `i`.
    pub fn tangent(&self, i: usize) -> Vec3 {
        let n = self.vertices.len();
        if n < 2 {
            return Vec3::pos_z();
        }
        let (prev, next) = if self.closed {
            ((i + n - 1) % n, (i + 1) % n)
        } else {
            (i.saturating_sub(1), (i + 1).min(n - 1))
        };
        let t = (self.vertices[next] - self.vertices[prev]).normalized();
        if t.magnitude_sqr() == 0.0 {
            Vec3::pos_z()
        } else {
            t
        }
    }
}
