//! Height field triangulation with level-of-detail simplification.
//!
//! The outer ring of the padded height field is turned into border vertices
//! that only contribute to normal baking, so that adjacent chunks get matching
//! normals along their shared edges.

use glam::{Vec2, Vec3};

use crate::error::GenerationError;
use crate::height_curve::HeightCurve;
use crate::height_field::HeightField;
use crate::settings::MeshSettings;

/// Highest supported level of detail.
pub const MAX_LOD: u32 = 6;

/// Renderable mesh for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Triangle list, three indices per triangle.
    pub triangles: Vec<u32>,
    /// Per-vertex normals, baked including border triangles.
    pub normals: Vec<Vec3>,
    pub lod: u32,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Turns a padded height field into a mesh at some level of detail.
///
/// Implementations run on worker threads and must not touch shared mutable
/// state.
pub trait MeshBuilder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GenerationError::UnsupportedLod`] if `lod` cannot be applied
    /// to a field of this size.
    fn build(&self, heights: &HeightField, lod: u32) -> Result<MeshData, GenerationError>;
}

/// Vertex distance (in samples) between mesh vertices at `lod`.
pub fn simplification_increment(lod: u32) -> usize {
    if lod == 0 { 1 } else { lod as usize * 2 }
}

/// Default mesh builder: curve-shaped heights on a regular grid.
#[derive(Clone, Debug)]
pub struct TerrainMeshBuilder {
    height_multiplier: f32,
    height_curve: HeightCurve,
}

impl TerrainMeshBuilder {
    pub fn new(height_multiplier: f32, height_curve: HeightCurve) -> Self {
        Self {
            height_multiplier,
            height_curve,
        }
    }

    pub fn from_settings(settings: &MeshSettings) -> Self {
        Self::new(settings.height_multiplier, settings.height_curve.clone())
    }
}

/// Vertex index in either the mesh list (`>= 0`) or the border list (`< 0`).
type SignedIndex = i32;

#[derive(Default)]
struct MeshAccumulator {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    border_vertices: Vec<Vec3>,
    border_triangles: Vec<[SignedIndex; 3]>,
}

impl MeshAccumulator {
    fn add_vertex(&mut self, position: Vec3, uv: Vec2, index: SignedIndex) {
        if index < 0 {
            self.border_vertices.push(position);
        } else {
            self.vertices.push(position);
            self.uvs.push(uv);
        }
    }

    fn add_triangle(&mut self, a: SignedIndex, b: SignedIndex, c: SignedIndex) {
        if a < 0 || b < 0 || c < 0 {
            self.border_triangles.push([a, b, c]);
        } else {
            self.triangles.extend([a as u32, b as u32, c as u32]);
        }
    }

    fn position(&self, index: SignedIndex) -> Vec3 {
        if index < 0 {
            self.border_vertices[(-index - 1) as usize]
        } else {
            self.vertices[index as usize]
        }
    }

    fn surface_normal(&self, [a, b, c]: [SignedIndex; 3]) -> Vec3 {
        let pa = self.position(a);
        let ab = self.position(b) - pa;
        let ac = self.position(c) - pa;
        ab.cross(ac).normalize_or_zero()
    }

    fn bake_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.triangles.chunks_exact(3) {
            let indices = [tri[0] as i32, tri[1] as i32, tri[2] as i32];
            let normal = self.surface_normal(indices);
            for i in tri {
                normals[*i as usize] += normal;
            }
        }
        for &tri in &self.border_triangles {
            let normal = self.surface_normal(tri);
            for i in tri {
                if i >= 0 {
                    normals[i as usize] += normal;
                }
            }
        }
        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    fn finish(self, lod: u32) -> MeshData {
        let normals = self.bake_normals();
        MeshData {
            vertices: self.vertices,
            uvs: self.uvs,
            triangles: self.triangles,
            normals,
            lod,
        }
    }
}

impl MeshBuilder for TerrainMeshBuilder {
    fn build(&self, heights: &HeightField, lod: u32) -> Result<MeshData, GenerationError> {
        let bordered_size = heights.width();
        let increment = simplification_increment(lod);
        let unsupported = GenerationError::UnsupportedLod { lod, bordered_size };

        if lod > MAX_LOD
            || heights.height() != bordered_size
            || bordered_size < 2 * increment + 1
            || (bordered_size - 1) % increment != 0
        {
            return Err(unsupported);
        }

        let mesh_size = bordered_size - 2 * increment;
        let mesh_size_unsimplified = (bordered_size - 2) as f32;
        let top_left_x = (mesh_size_unsimplified - 1.0) / -2.0;
        let top_left_z = (mesh_size_unsimplified - 1.0) / 2.0;

        // Mesh vertices are numbered 0, 1, .. and border vertices -1, -2, ..
        // in the same row-major sweep.
        let mut index_map = vec![0 as SignedIndex; bordered_size * bordered_size];
        let mut next_mesh = 0;
        let mut next_border = -1;
        for y in (0..bordered_size).step_by(increment) {
            for x in (0..bordered_size).step_by(increment) {
                let is_border =
                    y == 0 || y == bordered_size - 1 || x == 0 || x == bordered_size - 1;
                let slot = &mut index_map[y * bordered_size + x];
                if is_border {
                    *slot = next_border;
                    next_border -= 1;
                } else {
                    *slot = next_mesh;
                    next_mesh += 1;
                }
            }
        }

        let mut mesh = MeshAccumulator::default();
        let at = |x: usize, y: usize| index_map[y * bordered_size + x];

        for y in (0..bordered_size).step_by(increment) {
            for x in (0..bordered_size).step_by(increment) {
                let percent = Vec2::new(
                    (x as f32 - increment as f32) / mesh_size as f32,
                    (y as f32 - increment as f32) / mesh_size as f32,
                );
                let height = self.height_curve.evaluate(heights.get(x, y)) * self.height_multiplier;
                let position = Vec3::new(
                    top_left_x + percent.x * mesh_size_unsimplified,
                    height,
                    top_left_z - percent.y * mesh_size_unsimplified,
                );
                mesh.add_vertex(position, percent, at(x, y));

                if x < bordered_size - 1 && y < bordered_size - 1 {
                    let a = at(x, y);
                    let b = at(x + increment, y);
                    let c = at(x, y + increment);
                    let d = at(x + increment, y + increment);
                    mesh.add_triangle(a, d, c);
                    mesh.add_triangle(d, a, b);
                }
            }
        }

        Ok(mesh.finish(lod))
    }
}
