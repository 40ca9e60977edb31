//! Uniform buffer layouts and the per-frame transform.
//!
//! Structures are `#[repr(C)]` column-major matrices matching the GLSL
//! `uniform` blocks, and implement `Pod` for direct byte uploads.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Degrees of rotation about +Z per second.
pub const ROTATION_DEG_PER_SEC: f32 = 90.0;

const EYE: Vec3 = Vec3::new(2.0, 2.0, 2.0);
const FOV_Y_DEG: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10.0;

/// Model rotation after `elapsed_secs`.
pub fn model_matrix(elapsed_secs: f32) -> Mat4 {
    Mat4::from_rotation_z((elapsed_secs * ROTATION_DEG_PER_SEC).to_radians())
}

/// Camera at (2, 2, 2) looking at the origin with +Z up.
pub fn view_matrix() -> Mat4 {
    Mat4::look_at_rh(EYE, Vec3::ZERO, Vec3::Z)
}

/// 45 degree perspective with Vulkan's downward Y axis.
pub fn projection_matrix(width: u32, height: u32) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    let mut proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect, Z_NEAR, Z_FAR);
    proj.y_axis.y *= -1.0;
    proj
}

/// Model, view and projection in one block (textured quad).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MvpUbo {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl MvpUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn at(elapsed_secs: f32, width: u32, height: u32) -> Self {
        Self {
            model: model_matrix(elapsed_secs),
            view: view_matrix(),
            proj: projection_matrix(width, height),
        }
    }
}

/// Model and view, bound at binding 0 of the two-uniform layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ModelViewUbo {
    pub model: Mat4,
    pub view: Mat4,
}

impl ModelViewUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn at(elapsed_secs: f32) -> Self {
        Self {
            model: model_matrix(elapsed_secs),
            view: view_matrix(),
        }
    }
}

/// Projection alone, bound at binding 1 of the two-uniform layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ProjectionUbo {
    pub proj: Mat4,
}

impl ProjectionUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            proj: projection_matrix(width, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_ubo_sizes() {
        assert_eq!(MvpUbo::SIZE, 192);
        assert_eq!(ModelViewUbo::SIZE, 128);
        assert_eq!(ProjectionUbo::SIZE, 64);
    }

    #[test]
    fn test_model_rotates_quarter_turn_per_second() {
        assert!(model_matrix(0.0).abs_diff_eq(Mat4::IDENTITY, EPS));

        let rotated = model_matrix(1.0).transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::Y, EPS));

        let half_turn = model_matrix(2.0).transform_vector3(Vec3::X);
        assert!(half_turn.abs_diff_eq(-Vec3::X, EPS));
    }

    #[test]
    fn test_view_looks_at_origin() {
        let view = view_matrix();

        let eye = view.transform_point3(Vec3::new(2.0, 2.0, 2.0));
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPS));

        // The origin sits straight ahead on -Z in a right-handed view space.
        let target = view.transform_point3(Vec3::ZERO);
        assert!(target.x.abs() < EPS && target.y.abs() < EPS);
        assert!((target.z + 12.0_f32.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_projection_flips_y() {
        let flipped = projection_matrix(800, 600);
        let plain = Mat4::perspective_rh(45.0_f32.to_radians(), 800.0 / 600.0, 0.1, 10.0);

        assert!((flipped.y_axis.y + plain.y_axis.y).abs() < EPS);
        assert!(flipped.y_axis.y < 0.0);
        assert_eq!(flipped.x_axis, plain.x_axis);
        assert_eq!(flipped.z_axis, plain.z_axis);
        assert_eq!(flipped.w_axis, plain.w_axis);

        // A point above the camera axis lands in the upper half of clip space,
        // which Vulkan addresses with negative Y.
        let clip = flipped * Vec4::new(0.0, 1.0, -5.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn test_blocks_share_matrices() {
        let mvp = MvpUbo::at(0.5, 800, 600);
        let mv = ModelViewUbo::at(0.5);
        let p = ProjectionUbo::new(800, 600);

        assert_eq!(mvp.model, mv.model);
        assert_eq!(mvp.view, mv.view);
        assert_eq!(mvp.proj, p.proj);
    }

    #[test]
    fn test_mvp_bytes_are_column_major() {
        let ubo = MvpUbo::at(0.0, 800, 600);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&ubo));
        assert_eq!(floats.len(), 48);
        // Model is identity at t = 0.
        assert_eq!(&floats[..4], &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&floats[12..16], &[0.0, 0.0, 0.0, 1.0]);
    }
}
