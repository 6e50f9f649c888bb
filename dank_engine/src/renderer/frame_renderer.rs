/// Frame renderer - the backend-independent `Renderer`
///
/// Drives resource sync, binding encoding and frame submission against any
/// `GraphicsDevice`. Per `render` call:
///
/// 1. Sample the mesh and texture libraries. When a GPU object a frame in
///    flight may still read is about to change, drain every frame slot.
/// 2. Rebake meshes / upload textures, then re-encode the argument tables
///    if the resident resource set changed.
/// 3. Wait for the current slot, acquire a render target (or skip the
///    frame), write the camera and instance data, record, submit, present.
///
/// Shader stage tables:
///
/// ```text
/// set 0 (vertex)    slot 0  uniform  camera
///                   slot 1  storage  vertex blob
///                   slot 2  storage  index blob
/// set 1 (fragment)  slot N  sampled  texture bound to slot N
/// ```

use std::sync::Arc;
use crate::error::Result;
use crate::frame_context::FrameContext;
use crate::graphics_device::{
    ArgumentEntry, ArgumentTableDesc, BindingKind, BindingResource, Buffer, BufferDesc,
    BufferUsage, ClearValue, GraphicsDevice, Pipeline, PipelineDesc, Rect2D, ShaderSource,
    ShaderStage, Viewport,
};
use crate::renderer::{
    BindingEncoder, DrawEncoding, DrawIndexedIndirectCommand, FrameOutcome, FramePipeline,
    GpuInstance, GpuMeshCache, GpuTextureCache, Renderer, RendererConfig, RendererStats,
};
use crate::scene::{CameraUniform, Scene};
use crate::{engine_error, engine_err, engine_info, engine_trace, engine_warn};

/// Vertex table layout: camera, vertex blob, index blob
pub fn vertex_table_desc() -> ArgumentTableDesc {
    ArgumentTableDesc {
        stage: ShaderStage::Vertex,
        entries: vec![
            ArgumentEntry { kind: BindingKind::UniformBuffer, count: 1 },
            ArgumentEntry { kind: BindingKind::StorageBuffer, count: 2 },
        ],
    }
}

/// Fragment table layout: `max_texture_slots` sampled textures
pub fn fragment_table_desc(max_texture_slots: u32) -> ArgumentTableDesc {
    ArgumentTableDesc {
        stage: ShaderStage::Fragment,
        entries: vec![ArgumentEntry { kind: BindingKind::SampledTexture, count: max_texture_slots }],
    }
}

/// `Renderer` over a graphics device
///
/// Fields drop in declaration order: every GPU object goes before `device`.
pub struct FrameRenderer<D: GraphicsDevice> {
    mesh_cache: GpuMeshCache,
    texture_cache: GpuTextureCache,
    encoder: BindingEncoder,
    frames: FramePipeline,
    camera_buffer: Arc<dyn Buffer>,
    pipeline: Arc<dyn Pipeline>,
    vertex_table: ArgumentTableDesc,
    fragment_table: ArgumentTableDesc,
    config: RendererConfig,
    stats: RendererStats,
    view_size: (u32, u32),
    instances: Vec<GpuInstance>,
    draws: Vec<DrawIndexedIndirectCommand>,
    released: bool,
    device: D,
}

impl<D: GraphicsDevice> FrameRenderer<D> {
    /// Create the renderer and its pipeline
    ///
    /// # Arguments
    ///
    /// * `device` - Graphics device the renderer takes ownership of
    /// * `config` - Renderer configuration
    /// * `vertex_shader` - SPIR-V vertex stage
    /// * `fragment_shader` - SPIR-V fragment stage
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when the configuration or the pipeline is
    /// rejected; the renderer cannot start without its pipeline.
    pub fn new(
        mut device: D,
        config: RendererConfig,
        vertex_shader: ShaderSource,
        fragment_shader: ShaderSource,
    ) -> Result<Self> {
        config.validate()?;

        let vertex_table = vertex_table_desc();
        let fragment_table = fragment_table_desc(config.max_texture_slots);

        let pipeline = device
            .create_pipeline(PipelineDesc {
                vertex_shader,
                fragment_shader,
                instance_layout: GpuInstance::layout(),
                argument_tables: vec![vertex_table.clone(), fragment_table.clone()],
            })
            .inspect_err(|e| engine_error!("dank::FrameRenderer", "Pipeline creation failed: {}", e))?;

        let camera_buffer = device.create_buffer(BufferDesc {
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsage::UNIFORM,
        })?;
        let frames = FramePipeline::new(&mut device, config.frames_in_flight, config.instance_page_size)?;
        let view_size = device.surface_size();

        engine_info!(
            "dank::FrameRenderer",
            "Renderer initialized: {}x{}, {} frames in flight, {:?} draws",
            view_size.0,
            view_size.1,
            config.frames_in_flight,
            config.draw_encoding
        );

        Ok(Self {
            mesh_cache: GpuMeshCache::new(),
            texture_cache: GpuTextureCache::new(config.max_texture_slots),
            encoder: BindingEncoder::new(),
            frames,
            camera_buffer,
            pipeline,
            vertex_table,
            fragment_table,
            config,
            stats: RendererStats::default(),
            view_size,
            instances: Vec::new(),
            draws: Vec::new(),
            released: false,
            device,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn mesh_cache(&self) -> &GpuMeshCache {
        &self.mesh_cache
    }

    pub fn texture_cache(&self) -> &GpuTextureCache {
        &self.texture_cache
    }

    pub fn encoder(&self) -> &BindingEncoder {
        &self.encoder
    }

    pub fn frames(&self) -> &FramePipeline {
        &self.frames
    }

    /// Bring GPU resources in line with the libraries
    fn sync_resources(&mut self, ctx: &FrameContext) -> Result<()> {
        let meshes_stale = self.mesh_cache.is_stale(&ctx.meshes);
        let textures_touched = self.texture_cache.poll(&ctx.textures);
        if meshes_stale || textures_touched {
            self.frames.drain()?;
        }

        let meshes_changed = self.mesh_cache.sync(&mut self.device, &ctx.meshes)?;
        let textures_changed = self.texture_cache.apply(&mut self.device, &ctx.textures)?;

        if meshes_changed || self.encoder.table(ShaderStage::Vertex).is_none() {
            let mut bindings = vec![(0, BindingResource::UniformBuffer(self.camera_buffer.clone()))];
            if let (Some(vertices), Some(indices)) =
                (self.mesh_cache.vertex_buffer(), self.mesh_cache.index_buffer())
            {
                bindings.push((1, BindingResource::StorageBuffer(vertices.clone())));
                bindings.push((2, BindingResource::StorageBuffer(indices.clone())));
            }
            self.encoder.encode(&mut self.device, &self.vertex_table, &bindings)?;
        }

        if textures_changed || self.encoder.table(ShaderStage::Fragment).is_none() {
            let bindings: Vec<(u32, BindingResource)> = self
                .texture_cache
                .bindings()
                .into_iter()
                .map(|(slot, texture)| (slot, BindingResource::SampledTexture(texture)))
                .collect();
            self.encoder.encode(&mut self.device, &self.fragment_table, &bindings)?;
        }
        Ok(())
    }

    /// Resolve the draw list into instance records, skipping draws whose
    /// texture is not active or whose mesh is not baked
    fn collect_draws(&mut self, ctx: &FrameContext) -> u32 {
        self.instances.clear();
        self.draws.clear();
        let mut skipped = 0;

        for drawable in ctx.draw_list.iter() {
            let mesh = self.mesh_cache.descriptor(drawable.mesh);
            let slot = self
                .texture_cache
                .binding_slot(drawable.texture)
                .filter(|_| self.texture_cache.is_active(drawable.texture));
            let (Some(mesh), Some(slot)) = (mesh, slot) else {
                skipped += 1;
                continue;
            };

            let first_instance = self.instances.len() as u32;
            self.instances.push(GpuInstance::new(drawable, mesh.buffer_index, slot));
            self.draws.push(DrawIndexedIndirectCommand {
                index_count: mesh.index_count,
                instance_count: 1,
                first_index: mesh.index_offset,
                vertex_offset: 0,
                first_instance,
            });
        }
        skipped
    }
}

impl<D: GraphicsDevice> Renderer for FrameRenderer<D> {
    fn init_or_update_view(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == self.view_size {
            return Ok(());
        }
        self.frames.drain()?;
        self.device.resize(width, height)?;
        self.view_size = (width, height);
        engine_info!("dank::FrameRenderer", "View resized to {}x{}", width, height);
        Ok(())
    }

    fn render(&mut self, ctx: &FrameContext, scene: &dyn Scene) -> Result<FrameOutcome> {
        if self.released {
            return Err(engine_err!("dank::FrameRenderer", "render called after release"));
        }

        self.sync_resources(ctx)?;

        self.frames.wait()?;
        let Some(target) = self.device.acquire_render_target()? else {
            self.stats.frames_skipped += 1;
            engine_trace!("dank::FrameRenderer", "No render target, frame skipped");
            return Ok(FrameOutcome::Skipped);
        };

        self.camera_buffer.update(0, bytemuck::bytes_of(&scene.camera().uniform()))?;

        let skipped = self.collect_draws(ctx);
        let count = self.instances.len() as u32;

        let instance_buffer = self.frames.reserve_instances(&mut self.device, count)?.clone();
        if count > 0 {
            instance_buffer.update(0, bytemuck::cast_slice(&self.instances))?;
        }
        let indirect_buffer = match self.config.draw_encoding {
            DrawEncoding::Direct => None,
            DrawEncoding::Indirect => {
                let buffer = self.frames.reserve_indirect(&mut self.device, count)?.clone();
                if count > 0 {
                    buffer.update(0, bytemuck::cast_slice(&self.draws))?;
                }
                Some(buffer)
            }
        };

        self.frames.record(&target)?;
        let commands = self.frames.commands();
        commands.begin_render_pass(&target, ClearValue(self.config.clear_color))?;
        commands.set_viewport(Viewport::full(target.width, target.height))?;
        commands.set_scissor(Rect2D { x: 0, y: 0, width: target.width, height: target.height })?;

        let mut draw_calls = 0;
        if count > 0 {
            let (Some(vertex_table), Some(fragment_table), Some(index_buffer)) = (
                self.encoder.table(ShaderStage::Vertex),
                self.encoder.table(ShaderStage::Fragment),
                self.mesh_cache.index_buffer(),
            ) else {
                return Err(engine_err!("dank::FrameRenderer", "Draws recorded without encoded bindings"));
            };

            commands.bind_pipeline(&self.pipeline)?;
            commands.bind_argument_table(&self.pipeline, 0, vertex_table)?;
            commands.bind_argument_table(&self.pipeline, 1, fragment_table)?;
            commands.bind_instance_buffer(&instance_buffer, 0)?;
            commands.bind_index_buffer(index_buffer, 0)?;

            match &indirect_buffer {
                Some(buffer) => {
                    commands.draw_indexed_indirect(buffer, 0, count, DrawIndexedIndirectCommand::STRIDE)?;
                    draw_calls = 1;
                }
                None => {
                    for draw in &self.draws {
                        commands.draw_indexed(
                            draw.index_count,
                            draw.instance_count,
                            draw.first_index,
                            draw.vertex_offset,
                            draw.first_instance,
                        )?;
                    }
                    draw_calls = count;
                }
            }
        }

        commands.end_render_pass()?;
        self.frames.finish(&mut self.device, &target)?;

        self.stats.frames_presented += 1;
        self.stats.draw_calls = draw_calls;
        self.stats.instances = count;
        self.stats.skipped_draws = skipped;
        self.stats.triangles = self.draws.iter().map(|draw| draw.index_count / 3).sum();
        self.stats.mesh_uploads = self.mesh_cache.upload_count();
        self.stats.texture_uploads = self.texture_cache.upload_count();
        self.stats.encodes = self.encoder.encode_count();
        self.stats.active_textures = self.texture_cache.active_count();
        Ok(FrameOutcome::Presented)
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.frames.drain()?;
        self.encoder.release();
        self.texture_cache.release_all();
        self.mesh_cache.release();
        self.device.wait_idle()?;
        self.released = true;
        engine_info!("dank::FrameRenderer", "Renderer released");
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }
}

impl<D: GraphicsDevice> Drop for FrameRenderer<D> {
    fn drop(&mut self) {
        if let Err(e) = self.frames.drain().and_then(|_| self.device.wait_idle()) {
            engine_warn!("dank::FrameRenderer", "GPU did not drain before drop: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
