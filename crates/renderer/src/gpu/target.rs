use std::sync::Arc;

use winit::window::Window;

use crate::background::RenderTarget;
use crate::compile::ShadingProgram;
use crate::error::{BackgroundError, FrameError};
use crate::geometry::QuadGeometry;
use crate::inputs::{BackgroundUniforms, SurfaceRect, SurfaceSize, Viewport};
use crate::types::GpuPowerPreference;

use super::context::GpuContext;
use super::pipeline::BackgroundPipeline;

/// [`RenderTarget`] backed by a winit window and a wgpu surface.
pub struct GpuTarget {
    window: Arc<Window>,
    context: Option<GpuContext>,
    pipeline: Option<BackgroundPipeline>,
}

impl GpuTarget {
    pub(crate) fn new(
        window: Arc<Window>,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self, BackgroundError> {
        let size = window.inner_size();
        let context = GpuContext::new(
            window.clone(),
            SurfaceSize::new(size.width, size.height),
            gpu_power,
        )?;
        Ok(Self {
            window,
            context: Some(context),
            pipeline: None,
        })
    }

    /// Restores the swapchain after a lost or outdated surface.
    pub fn reconfigure(&self) {
        if let Some(context) = self.context.as_ref() {
            context.reconfigure();
        }
    }

    fn submit(&mut self, uniforms: Option<&BackgroundUniforms>) -> Result<(), FrameError> {
        let Some(context) = self.context.as_ref() else {
            return Err(FrameError::Device("render target was released".to_string()));
        };
        let frame = context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let pipeline = match (uniforms, self.pipeline.as_ref()) {
            (Some(uniforms), Some(pipeline)) => {
                pipeline.write_uniforms(&context.queue, uniforms);
                Some(pipeline)
            }
            _ => None,
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("background encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("background pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(pipeline) = pipeline {
                pipeline.encode(&mut pass);
            }
        }
        context.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}

impl RenderTarget for GpuTarget {
    fn viewport(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport {
            size: SurfaceSize::new(size.width, size.height),
            scale_factor: self.window.scale_factor(),
        }
    }

    fn bounds(&self) -> SurfaceRect {
        // winit reports cursor positions relative to the window's client area.
        SurfaceRect::from_size(self.viewport().size)
    }

    fn configure(&mut self, size: SurfaceSize) -> SurfaceSize {
        match self.context.as_mut() {
            Some(context) => context.resize(size),
            None => size,
        }
    }

    fn install(
        &mut self,
        program: &ShadingProgram,
        geometry: &QuadGeometry,
    ) -> Result<(), BackgroundError> {
        let context = self.context.as_ref().ok_or_else(|| {
            BackgroundError::UnsupportedPlatform("render target was released".to_string())
        })?;
        let pipeline =
            BackgroundPipeline::new(&context.device, context.surface_format, program, geometry)?;
        tracing::debug!(
            width = context.size().width,
            height = context.size().height,
            "uploaded background quad and pipeline"
        );
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn draw(&mut self, uniforms: &BackgroundUniforms) -> Result<(), FrameError> {
        if self.pipeline.is_none() {
            return Err(FrameError::Device("no pipeline installed".to_string()));
        }
        self.submit(Some(uniforms))
    }

    fn clear(&mut self) -> Result<(), FrameError> {
        self.submit(None)
    }

    fn release(&mut self) {
        self.pipeline = None;
        self.context = None;
    }
}
