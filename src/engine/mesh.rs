// Room geometry.
//
// Every room part is the same unit box drawn with a per-instance model matrix
// (see main.rs), so the only mesh ever uploaded is `unit_box()`.

use glam::Vec3;

/// GPU-ready vertex with position and normal.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle mesh ready for upload.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize { self.indices.len() }

    /// Append a quad given its four corners in CCW order (seen from outside).
    /// The corners get their own vertices, so the face shades flat.
    fn push_quad(&mut self, corners: [Vec3; 4]) {
        let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero();
        let base = self.vertices.len() as u32;

        self.vertices.extend(corners.iter().map(|c| GpuVertex {
            position: c.to_array(),
            normal:   normal.to_array(),
        }));
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Axis-aligned box spanning [-0.5, 0.5] on every axis: 6 quads, 24 vertices.
pub fn unit_box() -> RenderMesh {
    // (outward normal, u, v) with u × v = normal so each quad winds CCW.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X,     Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z,     Vec3::Y),
        (Vec3::Y,     Vec3::X,     Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X,     Vec3::Z),
        (Vec3::Z,     Vec3::X,     Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = RenderMesh {
        vertices: Vec::with_capacity(24),
        indices:  Vec::with_capacity(36),
    };
    for (normal, u, v) in FACES {
        let centre = normal * 0.5;
        let (u, v) = (u * 0.5, v * 0.5);
        mesh.push_quad([centre - u - v, centre + u - v, centre + u + v, centre - u + v]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_box_has_flat_faces() {
        let mesh = unit_box();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);

        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            let n = Vec3::from_array(v.normal);
            // Axis-aligned unit normal, and the vertex lies on that face's plane.
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert_eq!(n.abs().max_element(), 1.0);
            assert!((p.dot(n) - 0.5).abs() < 1e-6);
            assert!(p.abs().max_element() <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn unit_box_winds_outward() {
        let mesh = unit_box();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let centroid = (a + b + c) / 3.0;
            assert!((b - a).cross(c - a).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn byte_views_match_lengths() {
        let mesh = unit_box();
        assert_eq!(mesh.vertex_bytes().len(), 24 * std::mem::size_of::<GpuVertex>());
        assert_eq!(mesh.index_bytes().len(), 36 * 4);
    }
}
