//! Demo: a spinning sprite field under a pulsing spotlight mask.
//!
//! Images are generated procedurally at startup, so the binary needs no
//! assets on disk. Esc or closing the window exits.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use quadrel::coords::{Color, Rect, Vec2};
use quadrel::gpu::{WgpuBackend, WgpuInit};
use quadrel::logging::{self, LoggingConfig};
use quadrel::pixmap::{Pixmap, Rgba8};
use quadrel::renderer::{Renderer, RendererConfig};

fn main() -> Result<()> {
    logging::init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = DemoApp::new();
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;
    Ok(())
}

struct DemoApp {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer<WgpuBackend>>,
    started: Instant,
    frames: u64,
}

impl DemoApp {
    fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            started: Instant::now(),
            frames: 0,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("quadrel demo")
            .with_inner_size(LogicalSize::new(960.0, 640.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            (size.width, size.height),
            WgpuInit::default(),
        ))?;

        let mut renderer = Renderer::new(
            backend,
            RendererConfig {
                atlas_size: 256,
                ..RendererConfig::default()
            },
        )?;

        renderer.register_image(
            "checker",
            &checkerboard(64, 8, [236, 201, 98, 255], [38, 41, 52, 255]),
        )?;
        renderer.register_image("disc", &disc(96, [255, 255, 255, 255]))?;
        renderer.register_image(
            "sky",
            &gradient(128, 128, [96, 150, 230, 255], [18, 24, 44, 255]),
        )?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return Ok(());
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(()); // minimized
        }

        let t = self.started.elapsed().as_secs_f32();
        let (w, h) = (size.width as f32, size.height as f32);
        let center = Vec2::new(w / 2.0, h / 2.0);

        renderer.begin_frame(size.width, size.height)?;

        // Backdrop and a checkerboard floor.
        renderer.draw_rect(Rect::new(0.0, 0.0, w, h), Color::new(0.07, 0.08, 0.12, 1.0))?;
        let mut x = 0.0;
        while x < w {
            renderer.draw_image("checker", Vec2::new(x, 0.0))?;
            x += 64.0;
        }

        // Pulsing spotlight: only sprites inside the disc show through.
        let pulse = 1.6 + 0.6 * (t * 1.3).sin();
        renderer.begin_mask()?;
        renderer.draw_image_ex(
            "disc",
            center - Vec2::splat(48.0 * pulse),
            Color::white(),
            pulse,
        )?;
        renderer.end_mask()?;

        renderer.save_transform();
        renderer.translate(center);
        renderer.rotate(t * 0.4);
        for i in 0..8 {
            let angle = i as f32 / 8.0 * std::f32::consts::TAU;
            let offset = Vec2::new(angle.cos(), angle.sin()) * 170.0;
            let glow = 0.55 + 0.45 * (t + i as f32 * 0.8).sin().abs();
            let tint = Color::new(glow, 0.75, 0.95, 1.0);
            renderer.draw_image_ex("sky", offset - Vec2::splat(32.0), tint, 0.5)?;
        }
        renderer.restore_transform();
        renderer.pop_mask()?;

        // Unmasked marker in the top-left corner.
        renderer.draw_rect(
            Rect::new(16.0, h - 24.0, 120.0, 8.0),
            Color::new(0.9, 0.3, 0.25, 0.9),
        )?;

        renderer.end_frame()?;

        self.frames += 1;
        if self.frames % 240 == 0 {
            let fs = renderer.frame_stats();
            let at = renderer.atlas_stats();
            log::debug!(
                "frame {}: {} draw calls, {} quads; atlas {}px ({}/{} tiles)",
                self.frames,
                fs.draw_calls,
                fs.quads,
                at.side,
                at.tiles_used,
                at.tiles_total,
            );
        }
        Ok(())
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            log::error!("demo initialization failed: {err:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        // Continuous redraw drives the animation.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    log::warn!("frame skipped: {err:#}");
                }
            }
            _ => {}
        }
    }
}

// ── procedural images ─────────────────────────────────────────────────────

fn checkerboard(size: u32, cell: u32, a: Rgba8, b: Rgba8) -> Pixmap {
    let mut pm = Pixmap::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let odd = (x / cell + y / cell) % 2 == 1;
            pm.set_pixel(x, y, if odd { b } else { a });
        }
    }
    pm
}

/// Filled circle with a one-pixel antialiased rim.
fn disc(size: u32, color: Rgba8) -> Pixmap {
    let mut pm = Pixmap::new(size, size);
    let c = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - c;
            let dy = y as f32 + 0.5 - c;
            let d = (dx * dx + dy * dy).sqrt();
            let alpha = (c - 1.0 - d).clamp(0.0, 1.0);
            if alpha > 0.0 {
                let a = (alpha * 255.0) as u8;
                pm.set_pixel(x, y, [color[0], color[1], color[2], a]);
            }
        }
    }
    pm
}

fn gradient(w: u32, h: u32, top: Rgba8, bottom: Rgba8) -> Pixmap {
    let mut pm = Pixmap::new(w, h);
    for y in 0..h {
        let f = y as f32 / (h - 1).max(1) as f32;
        let mut px = [0u8; 4];
        for (i, channel) in px.iter_mut().enumerate() {
            *channel = (top[i] as f32 + (bottom[i] as f32 - top[i] as f32) * f) as u8;
        }
        for x in 0..w {
            pm.set_pixel(x, y, px);
        }
    }
    pm
}
