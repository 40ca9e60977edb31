//! Vertex data structures and input descriptions.
//!
//! - [`QuadVertex`]: 2D position, color and texture coordinate for the textured quad
//! - [`ColorVertex`]: 2D position and color for the untextured triangle

use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex with position, color and UV.
///
/// Memory layout (28 bytes, tightly packed):
/// - position: 8 bytes (offset 0)
/// - color: 12 bytes (offset 8)
/// - tex_coord: 8 bytes (offset 20)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: Vec2,
    pub color: Vec3,
    pub tex_coord: Vec2,
}

impl QuadVertex {
    #[inline]
    pub const fn new(position: Vec2, color: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, tex_coord) as u32,
            },
        ]
    }
}

/// Vertex with position and color only.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: Vec2,
    pub color: Vec3,
}

impl ColorVertex {
    #[inline]
    pub const fn new(position: Vec2, color: Vec3) -> Self {
        Self { position, color }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, color) as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_vertex_layout() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 28);

        let binding = QuadVertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 28);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);

        let attrs = QuadVertex::attribute_descriptions();
        let summary: Vec<_> = attrs.iter().map(|a| (a.location, a.format, a.offset)).collect();
        assert_eq!(
            summary,
            vec![
                (0, vk::Format::R32G32_SFLOAT, 0),
                (1, vk::Format::R32G32B32_SFLOAT, 8),
                (2, vk::Format::R32G32_SFLOAT, 20),
            ]
        );
    }

    #[test]
    fn test_color_vertex_layout() {
        assert_eq!(std::mem::size_of::<ColorVertex>(), 20);
        assert_eq!(ColorVertex::binding_description().stride, 20);

        let attrs = ColorVertex::attribute_descriptions();
        assert_eq!((attrs[0].location, attrs[0].offset), (0, 0));
        assert_eq!((attrs[1].location, attrs[1].offset), (1, 8));
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
    }

    #[test]
    fn test_quad_vertex_bytes() {
        let vertex = QuadVertex::new(
            Vec2::new(-0.5, -0.5),
            Vec3::new(1.0, 0.0, 0.0),
            Vec2::new(1.0, 0.0),
        );

        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 28);

        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(floats, &[-0.5, -0.5, 1.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
