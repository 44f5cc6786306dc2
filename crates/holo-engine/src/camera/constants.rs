use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::holographic::StereoTransform;

/// Bind group index reserved for view-projection data in every content pipeline.
pub const VIEW_PROJECTION_GROUP: u32 = 0;

/// Binding of the view-projection uniform inside [`VIEW_PROJECTION_GROUP`].
pub const VIEW_PROJECTION_BINDING: u32 = 0;

/// Per-camera uniform: one view-projection matrix per eye.
///
/// Matrices are stored for WGSL (`clip = m * position`), i.e. the transpose
/// of the runtime's row-vector `view * projection`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewProjectionConstants {
    pub view_projection: [[[f32; 4]; 4]; 2],
}

impl ViewProjectionConstants {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(view: &StereoTransform, projection: &StereoTransform) -> Self {
        Self {
            view_projection: [
                shader_matrix(view.left, projection.left),
                shader_matrix(view.right, projection.right),
            ],
        }
    }

    /// Stored matrix for `eye` (0 = left, 1 = right).
    pub fn eye(&self, eye: usize) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_projection[eye])
    }
}

fn shader_matrix(view: Mat4, projection: Mat4) -> [[f32; 4]; 4] {
    (view * projection).transpose().to_cols_array_2d()
}

/// Layout of the per-camera view-projection bind group.
pub fn view_projection_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("holo view-projection layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: VIEW_PROJECTION_BINDING,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(ViewProjectionConstants::SIZE),
            },
            count: None,
        }],
    })
}
