use std::any::Any;
use std::path::Path;

use crate::config::RendererConfig;
use crate::coords::Rect;
use crate::device::{
    BindableResource, BufferDesc, BufferUsage, CommandRecorder, GraphicsDevice, IndexFormat,
    LayoutElement, PipelineDesc, RasterizerState, ResourceKind, ShaderDesc, ShaderStage,
    TextureDesc, Visibility,
};
use crate::error::{RenderError, Result};

use super::batch::{BatchRenderer, RenderState, TextureId};
use super::pipeline::{PipelineCache, PipelineKey};
use super::projection::ProjectionUniform;
use super::shaders::load_shader;
use super::slots::SlotTable;
use super::vertex::SpriteVertex;

const PROJECTION_LAYOUT: [LayoutElement; 1] = [LayoutElement::new(
    "projection",
    ResourceKind::UniformBuffer,
    Visibility::Vertex,
)];

const TEXTURE_LAYOUT: [LayoutElement; 2] = [
    LayoutElement::new("sprite_texture", ResourceKind::TextureReadOnly, Visibility::Fragment),
    LayoutElement::new("sprite_sampler", ResourceKind::Sampler, Visibility::Fragment),
];

/// GPU handles of one registered texture.
struct TextureSlot<D: GraphicsDevice> {
    // Drop order: set, then view, then texture.
    set: D::ResourceSet,
    _view: D::TextureView,
    texture: D::Texture,
}

/// Fixed-capacity GPU buffer, recreated larger when an upload does not fit.
struct GrowableBuffer<B> {
    buffer: B,
    /// Capacity in elements.
    capacity: usize,
}

/// Everything the renderer owns while alive. Dropped by [`Resources::teardown`].
struct Resources<D: GraphicsDevice> {
    pipelines: PipelineCache<PipelineKey<D::OutputFormat>, D::Pipeline>,
    textures: SlotTable<TextureSlot<D>>,
    texture_layout: D::ResourceLayout,
    projection_set: D::ResourceSet,
    projection_layout: D::ResourceLayout,
    projection_buffer: D::Buffer,
    vertex_shader: D::Shader,
    fragment_shader: D::Shader,
    commands: D::CommandList,
    vertices: GrowableBuffer<D::Buffer>,
    indices: GrowableBuffer<D::Buffer>,
    device: D,
}

/// Sprite-batching renderer over a [`GraphicsDevice`].
///
/// Owns the device and every GPU object created through it. After
/// [`SpriteRenderer::dispose`] (or drop) all of them are released and every
/// operation fails with `InvalidState`.
pub struct SpriteRenderer<D: GraphicsDevice> {
    config: RendererConfig,
    resources: Option<Resources<D>>,
    frame_open: bool,
    /// Index count uploaded by the open frame's `begin_render`.
    frame_indices: u32,
}

impl<D: GraphicsDevice> SpriteRenderer<D> {
    /// Builds the fixed GPU state (shaders, layouts, buffers, projection) on `device`.
    pub fn new(mut device: D, config: RendererConfig) -> Result<Self> {
        let format = device.shader_format();
        let set = config.shader_set.as_str();
        let vertex_shader = create_shader(&mut device, set, ShaderStage::Vertex, format)?;
        let fragment_shader = create_shader(&mut device, set, ShaderStage::Fragment, format)?;

        let projection_layout =
            device.create_resource_layout("marduk sprite projection layout", &PROJECTION_LAYOUT)?;
        let texture_layout =
            device.create_resource_layout("marduk sprite texture layout", &TEXTURE_LAYOUT)?;

        let projection_buffer = device.create_buffer(&BufferDesc {
            label: "marduk sprite projection ubo",
            size: ProjectionUniform::SIZE,
            usage: BufferUsage::Uniform,
        })?;
        let projection_set = device.create_resource_set(
            "marduk sprite projection set",
            &projection_layout,
            &[BindableResource::Buffer(&projection_buffer)],
        )?;

        let vertices = create_growable::<D, SpriteVertex>(
            &mut device,
            "marduk sprite vbo",
            BufferUsage::Vertex,
            config.initial_vertex_capacity,
        )?;
        let indices = create_growable::<D, u16>(
            &mut device,
            "marduk sprite ibo",
            BufferUsage::Index,
            config.initial_index_capacity,
        )?;

        let commands = device.create_command_list()?;

        let mut renderer = Self {
            resources: Some(Resources {
                pipelines: PipelineCache::new(),
                textures: SlotTable::new(config.initial_texture_capacity),
                texture_layout,
                projection_set,
                projection_layout,
                projection_buffer,
                vertex_shader,
                fragment_shader,
                commands,
                vertices,
                indices,
                device,
            }),
            config,
            frame_open: false,
            frame_indices: 0,
        };
        renderer.update_wvp()?;

        log::debug!(
            "sprite renderer ready: {} texture slots, shader set {:?}",
            renderer.config.initial_texture_capacity,
            renderer.config.shader_set
        );
        Ok(renderer)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.resources.is_none()
    }

    /// The owned device, or `None` after disposal.
    pub fn device(&self) -> Option<&D> {
        self.resources.as_ref().map(|r| &r.device)
    }

    /// Mutable access to the owned device, e.g. to resize its surface.
    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.resources.as_mut().map(|r| &mut r.device)
    }

    /// Number of live texture registrations.
    pub fn texture_count(&self) -> usize {
        self.resources.as_ref().map_or(0, |r| r.textures.len())
    }

    /// Current texture slot capacity.
    pub fn texture_capacity(&self) -> usize {
        self.resources.as_ref().map_or(0, |r| r.textures.capacity())
    }

    /// Number of pipelines currently cached.
    pub fn pipeline_count(&self) -> usize {
        self.resources.as_ref().map_or(0, |r| r.pipelines.len())
    }

    /// Recomputes the projection from the current target size and uploads it.
    ///
    /// Call after the target is resized or replaced; the renderer does not
    /// observe resize events.
    pub fn update_wvp(&mut self) -> Result<()> {
        let res = self.live_mut()?;
        let (width, height) = res.device.target_size();
        let uniform = ProjectionUniform::for_target(width, height);
        res.device
            .update_buffer(&res.projection_buffer, 0, bytemuck::bytes_of(&uniform));
        log::debug!("projection updated for {width}x{height}");
        Ok(())
    }

    /// Releases every GPU object, then the device. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(resources) = self.resources.take() {
            resources.teardown();
            self.frame_open = false;
            self.frame_indices = 0;
            log::debug!("sprite renderer disposed");
        }
    }

    fn live(&self) -> Result<&Resources<D>> {
        self.resources.as_ref().ok_or_else(RenderError::disposed)
    }

    fn live_mut(&mut self) -> Result<&mut Resources<D>> {
        self.resources.as_mut().ok_or_else(RenderError::disposed)
    }
}

impl<D: GraphicsDevice> Drop for SpriteRenderer<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<D: GraphicsDevice> Resources<D> {
    /// Drops GPU objects in dependency order: pipelines and texture sets before
    /// the layouts they were built from, everything before the device.
    fn teardown(self) {
        let Resources {
            mut pipelines,
            mut textures,
            texture_layout,
            projection_set,
            projection_layout,
            projection_buffer,
            vertex_shader,
            fragment_shader,
            commands,
            vertices,
            indices,
            device,
        } = self;

        log::debug!(
            "releasing {} pipelines ({} built over the renderer's lifetime) and {} textures",
            pipelines.len(),
            pipelines.created(),
            textures.len()
        );
        pipelines.clear();
        drop(textures.drain());
        drop(texture_layout);
        drop(projection_set);
        drop(projection_layout);
        drop(projection_buffer);
        drop(vertex_shader);
        drop(fragment_shader);
        drop(commands);
        drop(vertices);
        drop(indices);
        drop(device);
    }

    /// Makes room for `count` elements, recreating the buffer at the next
    /// power of two when needed.
    fn ensure_capacity<T>(
        device: &mut D,
        target: &mut GrowableBuffer<D::Buffer>,
        label: &str,
        usage: BufferUsage,
        count: usize,
    ) -> Result<()> {
        if count <= target.capacity {
            return Ok(());
        }
        let grown = create_growable::<D, T>(device, label, usage, count.next_power_of_two())?;
        log::debug!("{label} grown {} -> {}", target.capacity, grown.capacity);
        *target = grown;
        Ok(())
    }
}

fn create_shader<D: GraphicsDevice>(
    device: &mut D,
    set: &str,
    stage: ShaderStage,
    format: crate::device::ShaderFormat,
) -> Result<D::Shader> {
    let asset = load_shader(set, stage, format)?;
    device.create_shader(&ShaderDesc {
        label: asset.name,
        stage,
        format,
        source: asset.source,
        entry_point: asset.entry_point,
    })
}

fn create_growable<D: GraphicsDevice, T>(
    device: &mut D,
    label: &str,
    usage: BufferUsage,
    capacity: usize,
) -> Result<GrowableBuffer<D::Buffer>> {
    let capacity = capacity.max(1);
    let buffer = device.create_buffer(&BufferDesc {
        label,
        size: (capacity * std::mem::size_of::<T>()) as u64,
        usage,
    })?;
    Ok(GrowableBuffer { buffer, capacity })
}

impl<D: GraphicsDevice> BatchRenderer for SpriteRenderer<D> {
    type Texture = D::Texture;

    fn register_file(&mut self, path: &Path, name: Option<&str>) -> Result<String> {
        if !path.is_file() {
            return Err(RenderError::InvalidArgument(format!(
                "texture file does not exist: {}",
                path.display()
            )));
        }
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    RenderError::InvalidArgument(format!(
                        "cannot derive a name from {}",
                        path.display()
                    ))
                })?,
        };

        let res = self.live_mut()?;
        if res.textures.contains(&name) {
            return Err(RenderError::DuplicateKey(name));
        }

        let image = image::open(path)
            .map_err(|err| RenderError::InvalidArgument(format!("{}: {err}", path.display())))?
            .to_rgba8();
        let texture = res.device.create_texture(&TextureDesc {
            label: &name,
            width: image.width(),
            height: image.height(),
            rgba: image.as_raw(),
        })?;

        self.register_texture(texture, &name)
    }

    fn register_texture(&mut self, texture: D::Texture, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(RenderError::InvalidArgument("texture name is empty".to_string()));
        }
        let filter = self.config.sampler_filter;
        let res = self.live_mut()?;
        if res.textures.contains(name) {
            return Err(RenderError::DuplicateKey(name.to_string()));
        }

        let view = res.device.create_texture_view(&texture)?;
        let set = res.device.create_resource_set(
            name,
            &res.texture_layout,
            &[
                BindableResource::TextureView(&view),
                BindableResource::Sampler(res.device.sampler(filter)),
            ],
        )?;

        let id = res.textures.insert(
            name,
            TextureSlot {
                set,
                _view: view,
                texture,
            },
        )?;
        log::debug!("registered texture {name:?} as {id}");
        Ok(name.to_string())
    }

    fn release(&mut self, name: &str) {
        let Some(res) = self.resources.as_mut() else { return };
        if let Some(slot) = res.textures.remove(name) {
            drop(slot);
            log::debug!("released texture {name:?}");
        }
    }

    fn get_texture(&self, name: &str) -> Result<TextureId> {
        self.live()?
            .textures
            .id(name)
            .ok_or_else(|| RenderError::KeyNotFound(name.to_string()))
    }

    fn get_texture_size(&self, id: TextureId) -> Result<(u32, u32)> {
        let res = self.live()?;
        let slot = res
            .textures
            .get(id)
            .ok_or_else(|| RenderError::KeyNotFound(id.to_string()))?;
        Ok(res.device.texture_size(&slot.texture))
    }

    fn get_text_size(&self, _text: &str, _font_size: f32) -> Result<(f32, f32)> {
        Err(RenderError::NotImplemented("text measurement"))
    }

    fn get_viewport(&self) -> Result<Rect> {
        let (width, height) = self.live()?.device.target_size();
        Ok(Rect::from_size(width, height))
    }

    fn begin_render(
        &mut self,
        vertices: &[SpriteVertex],
        indices: &[u16],
        vertex_count: usize,
        index_count: usize,
    ) -> Result<()> {
        if self.frame_open {
            return Err(RenderError::InvalidState("begin_render while a frame is open"));
        }
        let clear = self.config.clear_color;
        let res = self.live_mut()?;

        let vertices = vertices.get(..vertex_count).ok_or_else(|| {
            let len = vertices.len();
            RenderError::InvalidArgument(format!("vertex_count {vertex_count} exceeds {len}"))
        })?;
        let indices = indices.get(..index_count).ok_or_else(|| {
            let len = indices.len();
            RenderError::InvalidArgument(format!("index_count {index_count} exceeds {len}"))
        })?;
        let frame_indices = u32::try_from(index_count).map_err(|_| {
            RenderError::InvalidArgument(format!("index_count {index_count} exceeds u32"))
        })?;

        Resources::ensure_capacity::<SpriteVertex>(
            &mut res.device,
            &mut res.vertices,
            "marduk sprite vbo",
            BufferUsage::Vertex,
            vertices.len(),
        )?;
        Resources::ensure_capacity::<u16>(
            &mut res.device,
            &mut res.indices,
            "marduk sprite ibo",
            BufferUsage::Index,
            indices.len(),
        )?;

        if !vertices.is_empty() {
            res.device
                .update_buffer(&res.vertices.buffer, 0, bytemuck::cast_slice(vertices));
        }
        if !indices.is_empty() {
            res.device
                .update_buffer(&res.indices.buffer, 0, bytemuck::cast_slice(indices));
        }

        let commands = &mut res.commands;
        commands.begin();
        commands.set_framebuffer();
        commands.clear_color_target(0, clear);
        commands.set_vertex_buffer(0, &res.vertices.buffer);
        commands.set_index_buffer(&res.indices.buffer, IndexFormat::Uint16);

        self.frame_open = true;
        self.frame_indices = frame_indices;
        Ok(())
    }

    fn draw_batch(
        &mut self,
        state: &RenderState,
        start_index: u32,
        index_count: u32,
        _user_data: Option<&dyn Any>,
    ) -> Result<()> {
        let (frame_open, uploaded) = (self.frame_open, self.frame_indices);
        let res = self.live_mut()?;
        if !frame_open {
            return Err(RenderError::InvalidState("draw_batch outside begin_render/end_render"));
        }
        if state.sampler.is_some() {
            return Err(RenderError::NotImplemented("per-draw sampler override"));
        }
        match start_index.checked_add(index_count) {
            Some(end) if end <= uploaded => {}
            _ => {
                return Err(RenderError::InvalidArgument(format!(
                    "indices {start_index}+{index_count} exceed the {uploaded} uploaded this frame"
                )));
            }
        }

        let texture_set = &res
            .textures
            .get(state.texture)
            .ok_or_else(|| RenderError::KeyNotFound(state.texture.to_string()))?
            .set;

        let key = PipelineKey::new(state, res.device.output_format());
        let device = &mut res.device;
        let layouts = [&res.projection_layout, &res.texture_layout];
        let pipeline = res.pipelines.get_or_try_create(key, |key| {
            log::debug!("creating sprite pipeline for {key:?}");
            device.create_pipeline(&PipelineDesc {
                label: "marduk sprite pipeline",
                blend: key.blend,
                rasterizer: RasterizerState::sprites(key.scissor_test),
                vertex_shader: &res.vertex_shader,
                fragment_shader: &res.fragment_shader,
                resource_layouts: &layouts,
                vertex_layout: SpriteVertex::LAYOUT,
                output: key.format,
            })
        })?;

        let commands = &mut res.commands;
        commands.set_pipeline(pipeline);
        commands.set_resource_set(0, &res.projection_set);
        commands.set_resource_set(1, texture_set);
        if state.use_scissor_rect {
            commands.set_scissor_rect(0, state.scissor_rect);
        }
        commands.draw_indexed(index_count, 1, start_index, 0, 0);
        Ok(())
    }

    fn end_render(&mut self) -> Result<()> {
        let frame_open = self.frame_open;
        let res = self.live_mut()?;
        if !frame_open {
            return Err(RenderError::InvalidState("end_render without begin_render"));
        }

        res.commands.end();
        res.device.submit(&mut res.commands);
        self.frame_open = false;
        self.frame_indices = 0;
        Ok(())
    }
}
