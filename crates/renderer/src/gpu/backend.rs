use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::warn;
use winit::dpi::PhysicalSize;

use crate::program::{Drawable, GraphicsBackend, UniformLocation, UniformName, UniformValue};
use crate::types::{Antialiasing, ColorSpaceMode};
use crate::RenderError;

use super::context::{GpuContext, MultisampleTarget};
use super::pipeline::{PipelineLayouts, RaymarchPipeline};
use super::quad::ScreenQuad;
use super::uniforms::RaymarchUniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ProgramId(usize);

/// [`GraphicsBackend`] on top of `wgpu`.
///
/// Uniform writes land in a per-program CPU mirror and are uploaded once,
/// right before that program's next draw.
pub(crate) struct WgpuBackend {
    context: GpuContext,
    layouts: PipelineLayouts,
    programs: Vec<RaymarchPipeline>,
    bound: Option<usize>,
    msaa: Option<MultisampleTarget>,
}

impl WgpuBackend {
    pub fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing, color_space)?;
        let layouts = PipelineLayouts::new(&context.device);
        let msaa = MultisampleTarget::new(&context);
        Ok(Self {
            context,
            layouts,
            programs: Vec::new(),
            bound: None,
            msaa,
        })
    }

    pub fn create_program(&mut self, fragment_source: &str) -> Result<ProgramId, RenderError> {
        let pipeline = RaymarchPipeline::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            self.context.sample_count,
            fragment_source,
        )?;
        self.programs.push(pipeline);
        Ok(ProgramId(self.programs.len() - 1))
    }

    pub fn create_quad(&self) -> ScreenQuad {
        ScreenQuad::new(&self.context.device)
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if self.context.resize(size) {
            self.msaa = MultisampleTarget::new(&self.context);
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    type Program = ProgramId;
    type Mesh = ScreenQuad;

    fn use_program(&mut self, program: ProgramId) {
        self.bound = Some(program.0);
    }

    fn uniform_location(&self, program: ProgramId, name: UniformName) -> Option<UniformLocation> {
        let pipeline = self.programs.get(program.0)?;
        pipeline
            .interface
            .declares(name)
            .then(|| RaymarchUniforms::location(name))
    }

    fn write_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(pipeline) = self.bound.and_then(|index| self.programs.get_mut(index)) else {
            warn!(?location, "uniform write with no program bound");
            return;
        };
        if pipeline.staged.write(location, &value) {
            pipeline.dirty = true;
        } else {
            warn!(?location, ?value, "uniform write outside the parameter block");
        }
    }

    fn draw(&mut self, mesh: &ScreenQuad) -> Result<(), RenderError> {
        let index = self.bound.ok_or(RenderError::NoProgramBound)?;
        let pipeline = self
            .programs
            .get_mut(index)
            .ok_or(RenderError::UnknownProgram(index))?;

        if pipeline.dirty {
            self.context.queue.write_buffer(
                &pipeline.uniform_buffer,
                0,
                bytemuck::bytes_of(&pipeline.staged),
            );
            pipeline.dirty = false;
        }

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("raymarch encoder"),
                });

        {
            let (attachment_view, resolve_target) = match self.msaa.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("raymarch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&pipeline.pipeline);
            render_pass.set_bind_group(0, &pipeline.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.positions.slice(..));
            render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.element_count(), 0, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
