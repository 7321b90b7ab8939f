use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};

use crate::types::BackgroundConfig;

/// Pointer position before the first move event arrives.
pub const DEFAULT_POINTER: [f32; 2] = [0.5, 0.5];

/// Everything the shading law reads for one frame.
///
/// `elapsed_time` and `pointer` change every frame, `resolution` on resize.
/// `tint`, `amplitude` and `speed` come from [`BackgroundConfig`] and stay put.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub elapsed_time: f32,
    pub pointer: [f32; 2],
    pub resolution: [f32; 2],
    pub tint: [f32; 3],
    pub amplitude: f32,
    pub speed: f32,
}

impl FrameInputs {
    pub fn new(config: &BackgroundConfig, size: SurfaceSize) -> Self {
        Self {
            elapsed_time: 0.0,
            pointer: DEFAULT_POINTER,
            resolution: size.as_resolution(),
            tint: config.tint,
            amplitude: config.amplitude,
            speed: config.speed,
        }
    }

    pub fn to_uniforms(&self) -> BackgroundUniforms {
        BackgroundUniforms {
            resolution: self.resolution,
            pointer: self.pointer,
            tint: self.tint,
            time: self.elapsed_time,
            amplitude: self.amplitude,
            speed: self.speed,
            _padding: [0.0; 2],
        }
    }
}

/// std140 image of the fragment stage's `BackgroundParams` block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BackgroundUniforms {
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub tint: [f32; 3],
    pub time: f32,
    pub amplitude: f32,
    pub speed: f32,
    pub _padding: [f32; 2],
}

/// Program input names paired with their byte offset in [`BackgroundUniforms`].
pub const UNIFORM_OFFSETS: [(&str, usize); 6] = [
    ("u_resolution", offset_of!(BackgroundUniforms, resolution)),
    ("u_mouse", offset_of!(BackgroundUniforms, pointer)),
    ("u_color", offset_of!(BackgroundUniforms, tint)),
    ("u_time", offset_of!(BackgroundUniforms, time)),
    ("u_amplitude", offset_of!(BackgroundUniforms, amplitude)),
    ("u_speed", offset_of!(BackgroundUniforms, speed)),
];

/// Backing resolution of the surface in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Host-reported viewport: backing size plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub size: SurfaceSize,
    pub scale_factor: f64,
}

/// Surface placement in the coordinate space pointer events are reported in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub fn from_size(size: SurfaceSize) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: f64::from(size.width),
            height: f64::from(size.height),
        }
    }

    /// Maps client coordinates to surface-normalized ones with the origin at
    /// the bottom-left. Values outside `[0, 1]` are passed through unclamped.
    /// Returns `None` for a zero-area rect.
    pub fn normalize_pointer(&self, client_x: f64, client_y: f64) -> Option<[f32; 2]> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (client_x - self.left) / self.width;
        let y = 1.0 - (client_y - self.top) / self.height;
        Some([x as f32, y as f32])
    }
}
