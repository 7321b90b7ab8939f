//! `wgpu` side of the background.
//!
//! - `context` owns the instance, device and window surface and rebuilds the
//!   swapchain when the window resizes.
//! - `pipeline` turns a linked [`crate::ShadingProgram`] into a render
//!   pipeline, uploads the quad and owns the uniform buffer.
//! - `target` implements [`crate::RenderTarget`] on top of both.

mod context;
mod pipeline;
mod target;

pub use target::GpuTarget;
