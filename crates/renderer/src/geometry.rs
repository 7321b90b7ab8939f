use bytemuck::{Pod, Zeroable};

/// One corner of the full-viewport quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    /// Texture coordinate; `(0, 0)` is the bottom-left corner.
    pub uv: [f32; 2],
}

/// Corners in triangle-strip order: bottom-left, bottom-right, top-left, top-right.
pub const FULLSCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        uv: [1.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        uv: [1.0, 1.0],
    },
];

/// Static quad covering the whole drawing area, uploaded once.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGeometry {
    vertices: [QuadVertex; 4],
}

impl QuadGeometry {
    pub fn fullscreen() -> Self {
        Self {
            vertices: FULLSCREEN_QUAD,
        }
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Byte distance between consecutive vertices.
    pub fn stride() -> u64 {
        std::mem::size_of::<QuadVertex>() as u64
    }

    /// Byte offset of the texture coordinate inside a vertex.
    pub fn uv_offset() -> u64 {
        std::mem::offset_of!(QuadVertex, uv) as u64
    }

    /// Triangles produced when drawing the vertices as a strip.
    pub fn strip_triangles(&self) -> Vec<[QuadVertex; 3]> {
        self.vertices
            .windows(3)
            .map(|window| [window[0], window[1], window[2]])
            .collect()
    }
}

impl Default for QuadGeometry {
    fn default() -> Self {
        Self::fullscreen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(tri: &[QuadVertex; 3]) -> f32 {
        let [a, b, c] = tri.map(|v| v.position);
        ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])) * 0.5
    }

    #[test]
    fn strip_covers_the_clip_square_with_two_triangles() {
        let quad = QuadGeometry::fullscreen();
        let triangles = quad.strip_triangles();
        assert_eq!(triangles.len(), 2);
        let covered: f32 = triangles.iter().map(|tri| signed_area(tri).abs()).sum();
        assert!((covered - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn uv_follows_position() {
        for vertex in QuadGeometry::fullscreen().vertices() {
            assert_eq!(vertex.uv[0], (vertex.position[0] + 1.0) * 0.5);
            assert_eq!(vertex.uv[1], (vertex.position[1] + 1.0) * 0.5);
        }
    }

    #[test]
    fn interleaved_layout_is_sixteen_bytes() {
        let quad = QuadGeometry::fullscreen();
        assert_eq!(QuadGeometry::stride(), 16);
        assert_eq!(QuadGeometry::uv_offset(), 8);
        assert_eq!(quad.as_bytes().len(), 64);
        assert_eq!(quad.vertex_count(), 4);
    }
}
