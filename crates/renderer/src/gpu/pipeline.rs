use std::borrow::Cow;

use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::compile::{CompiledStage, ShadingProgram};
use crate::error::{BackgroundError, StageKind};
use crate::geometry::QuadGeometry;
use crate::inputs::BackgroundUniforms;

/// Device-side program, quad and uniform block.
pub(crate) struct BackgroundPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    pub uniform_buffer: wgpu::Buffer,
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
    pub bind_group_index: u32,
}

impl BackgroundPipeline {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        program: &ShadingProgram,
        geometry: &QuadGeometry,
    ) -> Result<Self, BackgroundError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = Self::build(device, surface_format, program, geometry);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BackgroundError::link(format!(
                "device rejected the shading program: {err}"
            )));
        }
        Ok(pipeline)
    }

    fn build(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        program: &ShadingProgram,
        geometry: &QuadGeometry,
    ) -> Self {
        let slots = program.slots();
        let vertex_module = create_module(device, program.vertex());
        let fragment_module = create_module(device, program.fragment());

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("background uniforms"),
            size: std::mem::size_of::<BackgroundUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("background quad"),
            contents: geometry.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: slots.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: slots.binding,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Bind groups below the uniform block's group stay empty.
        let empty_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background empty layout"),
            entries: &[],
        });
        let mut bind_group_layouts = vec![&empty_layout; slots.group as usize];
        bind_group_layouts.push(&uniform_layout);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let attributes = [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: slots.position_location,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: QuadGeometry::uv_offset(),
                shader_location: slots.uv_location,
            },
        ];
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: QuadGeometry::stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("background pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            vertex_buffer,
            vertex_count: geometry.vertex_count(),
            bind_group_index: slots.group,
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &BackgroundUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(self.bind_group_index, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

fn create_module(device: &wgpu::Device, stage: &CompiledStage) -> wgpu::ShaderModule {
    let (label, naga_stage) = match stage.stage() {
        StageKind::Vertex => ("background vertex", ShaderStage::Vertex),
        StageKind::Fragment => ("background fragment", ShaderStage::Fragment),
    };
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(stage.source().to_string()),
            stage: naga_stage,
            defines: &[],
        },
    })
}
