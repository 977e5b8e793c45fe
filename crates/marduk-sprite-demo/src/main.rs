use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use marduk_sprite::coords::ScissorRect;
use marduk_sprite::device::{GpuInit, GraphicsDevice, TextureDesc, WgpuDevice};
use marduk_sprite::logging::{init_logging, LoggingConfig};
use marduk_sprite::render::BlendMode;
use marduk_sprite::{
    BatchRenderer, RenderState, RendererConfig, SpriteRenderer, SpriteVertex, TextureId,
};

const SPRITE: f32 = 64.0;
const CHECKER_SIZE: u32 = 64;
const CHECKER_CELL: u32 = 8;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut demo = Demo::default();
    event_loop
        .run_app(&mut demo)
        .context("winit event loop terminated with error")?;
    Ok(())
}

#[derive(Default)]
struct Demo {
    window: Option<Arc<Window>>,
    renderer: Option<SpriteRenderer<WgpuDevice>>,
    textures: Vec<TextureId>,
    frame: u64,
}

impl Demo {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("marduk sprites")
            .with_inner_size(LogicalSize::new(960.0, 640.0));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let device = pollster::block_on(WgpuDevice::new(window.clone(), GpuInit::default()))
            .context("GPU initialization failed")?;
        log::info!("adapter: {:?}", device.adapter_info());

        let mut renderer = SpriteRenderer::new(device, RendererConfig::default())?;

        let pixels = checker_pixels(CHECKER_SIZE, CHECKER_CELL);
        let checker = renderer
            .device_mut()
            .context("renderer disposed")?
            .create_texture(&TextureDesc {
                label: "checker",
                width: CHECKER_SIZE,
                height: CHECKER_SIZE,
                rgba: &pixels,
            })?;
        let name = renderer.register_texture(checker, "checker")?;
        self.textures.push(renderer.get_texture(&name)?);

        // Image files given on the command line are drawn alongside the checker.
        for arg in std::env::args_os().skip(1) {
            match renderer.register_file(Path::new(&arg), None) {
                Ok(name) => self.textures.push(renderer.get_texture(&name)?),
                Err(e) => log::warn!("skipping {}: {e}", Path::new(&arg).display()),
            }
        }

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        self.frame += 1;

        let viewport = renderer.get_viewport()?;
        let cols = ((viewport.width / SPRITE) as u32).max(1);
        let rows = ((viewport.height / SPRITE) as u32).max(1);
        let quads = (cols * rows).min(u16::MAX as u32 / 4);

        let mut vertices = Vec::with_capacity(quads as usize * 4);
        let mut indices = Vec::with_capacity(quads as usize * 6);
        let phase = (self.frame % 256) as u8;
        for i in 0..quads {
            let (x, y) = ((i % cols) as f32 * SPRITE, (i / cols) as f32 * SPRITE);
            let tint = [phase.wrapping_add((i as u8).wrapping_mul(16)), 255 - phase, 192, 255];
            push_quad(&mut vertices, &mut indices, x, y, SPRITE, tint);
        }

        let index_count = indices.len() as u32;
        renderer.begin_render(&vertices, &indices, vertices.len(), indices.len())?;

        let per_texture = (index_count / 6).div_ceil(self.textures.len() as u32) * 6;
        let mut start = 0;
        for &texture in &self.textures {
            let count = per_texture.min(index_count - start);
            if count == 0 {
                break;
            }
            renderer.draw_batch(&RenderState::new(texture), start, count, None)?;
            start += count;
        }

        // Opaque overdraw of the first row, clipped to the left half.
        let clip = ScissorRect::new(0, 0, (viewport.width / 2.0) as u32, SPRITE as u32);
        let state = RenderState::new(self.textures[0])
            .with_blend(BlendMode::Override)
            .with_scissor(clip);
        renderer.draw_batch(&state, 0, (cols * 6).min(index_count), None)?;

        renderer.end_render()?;
        Ok(())
    }

    fn resize(&mut self) -> Result<()> {
        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return Ok(());
        };
        if let Some(device) = renderer.device_mut() {
            device.resize(window.inner_size());
        }
        renderer.update_wvp()?;
        window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("failed to start: {e:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let result = match event {
            WindowEvent::CloseRequested => {
                // The renderer owns the surface; release it before the window.
                self.renderer = None;
                self.window = None;
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.resize(),
            WindowEvent::RedrawRequested => self.draw(),
            _ => Ok(()),
        };

        if let Err(e) = result {
            log::error!("{e:#}");
            event_loop.exit();
        }
    }
}

/// Two-tone checkerboard, `size` × `size` RGBA8 with `cell`-pixel squares.
fn checker_pixels(size: u32, cell: u32) -> Vec<u8> {
    (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size, i / size);
            if (x / cell + y / cell) % 2 == 0 {
                [240, 240, 240, 255]
            } else {
                [60, 60, 72, 255]
            }
        })
        .collect()
}

fn push_quad(
    vertices: &mut Vec<SpriteVertex>,
    indices: &mut Vec<u16>,
    x: f32,
    y: f32,
    size: f32,
    color: [u8; 4],
) {
    let base = vertices.len() as u16;
    vertices.extend([
        SpriteVertex::new([x, y, 0.0], color, [0.0, 0.0]),
        SpriteVertex::new([x + size, y, 0.0], color, [1.0, 0.0]),
        SpriteVertex::new([x + size, y + size, 0.0], color, [1.0, 1.0]),
        SpriteVertex::new([x, y + size, 0.0], color, [0.0, 1.0]),
    ]);
    indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}
