//! wgpu implementation of the backend seam.
//!
//! Owns the surface, device and queue, the atlas texture, the mask layer
//! textures and the two render pipelines (sprite pass to the surface, mask
//! pass into an R8 coverage layer). Each draw call submits its own encoder,
//! so vertex buffer writes from consecutive flushes never overtake each
//! other.

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{DrawPass, GpuBackend, SpriteVertex};

const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Initialization parameters for the wgpu backend.
///
/// Keep this structure stable and minimal; add flags only when a concrete
/// platform requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is broadly supported.
    pub present_mode: wgpu::PresentMode,

    /// Desired maximum frame latency for the surface; a hint.
    pub desired_maximum_frame_latency: u32,

    pub power_preference: wgpu::PowerPreference,

    /// Surface clear color at `begin_frame`.
    pub clear_color: wgpu::Color,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

/// Frame size uniform shared by both pipelines. The vertex stage maps world
/// pixels to NDC with it; the fragment stages turn framebuffer positions
/// into mask UVs.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

struct AtlasTexture {
    texture: wgpu::Texture,
    side: u32,
    /// Group 0: frame uniform, atlas view, atlas sampler.
    bind_group: wgpu::BindGroup,
}

struct MaskLayer {
    view: wgpu::TextureView,
    /// Group 1: layer view plus the mask sampler.
    bind_group: wgpu::BindGroup,
}

struct FrameInFlight {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// GPU backend submitting real work through wgpu.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    clear_color: wgpu::Color,

    sprite_pipeline: wgpu::RenderPipeline,
    mask_pipeline: wgpu::RenderPipeline,
    atlas_bgl: wgpu::BindGroupLayout,
    mask_bgl: wgpu::BindGroupLayout,

    frame_ubo: wgpu::Buffer,
    mask_sampler: wgpu::Sampler,

    atlas: Option<AtlasTexture>,

    /// Group 1 binding for "no masking": a 1x1 full-coverage layer.
    white_bind_group: wgpu::BindGroup,
    /// Layer `i + 1` lives at index `i`. Dropped on frame resize and
    /// recreated by `clear_mask_layer`.
    mask_layers: Vec<MaskLayer>,
    mask_size: (u32, u32),

    vertex_buf: Option<wgpu::Buffer>,
    index_buf: Option<wgpu::Buffer>,

    frame: Option<FrameInFlight>,
}

impl WgpuBackend {
    /// Creates a backend bound to a surface target (for example an
    /// `Arc<winit::window::Window>`). `size` is the initial drawable size in
    /// physical pixels.
    ///
    /// Adapter and device acquisition are asynchronous under wgpu.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: (u32, u32),
        init: WgpuInit,
    ) -> Result<Self> {
        // Use all backends so wgpu picks the optimal platform backend.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("quadrel device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        log::info!(
            "wgpu backend up: {:?}, surface {}x{} {format:?}",
            adapter.get_info().backend,
            config.width,
            config.height,
        );

        let atlas_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadrel atlas bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(
                                std::mem::size_of::<FrameUniform>() as u64
                            )
                            .unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let mask_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quadrel mask bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadrel pipeline layout"),
            bind_group_layouts: &[&atlas_bgl, &mask_bgl],
            immediate_size: 0,
        });

        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadrel sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });
        let mask_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadrel mask shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mask.wgsl").into()),
        });

        let sprite_pipeline = make_pipeline(
            &device,
            "quadrel sprite pipeline",
            &pipeline_layout,
            &sprite_shader,
            format,
            wgpu::BlendState::ALPHA_BLENDING,
        );
        let mask_pipeline = make_pipeline(
            &device,
            "quadrel mask pipeline",
            &pipeline_layout,
            &mask_shader,
            MASK_FORMAT,
            coverage_blend(),
        );

        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadrel frame ubo"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mask_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quadrel mask sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let white_bind_group =
            make_white_layer(&device, &queue, &mask_bgl, &mask_sampler);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            clear_color: init.clear_color,
            sprite_pipeline,
            mask_pipeline,
            atlas_bgl,
            mask_bgl,
            frame_ubo,
            mask_sampler,
            atlas: None,
            white_bind_group,
            mask_layers: Vec::new(),
            mask_size: (0, 0),
            vertex_buf: None,
            index_buf: None,
            frame: None,
        })
    }

    fn make_mask_layer(&self, width: u32, height: u32) -> MaskLayer {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("quadrel mask layer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MASK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadrel mask layer bind group"),
            layout: &self.mask_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.mask_sampler),
                },
            ],
        });
        MaskLayer { view, bind_group }
    }
}

impl GpuBackend for WgpuBackend {
    fn init_atlas(&mut self, side: u32, pixelate: bool) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("quadrel atlas"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter = if pixelate {
            wgpu::FilterMode::Nearest
        } else {
            wgpu::FilterMode::Linear
        };
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quadrel atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadrel atlas bind group"),
            layout: &self.atlas_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.frame_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        self.atlas = Some(AtlasTexture {
            texture,
            side,
            bind_group,
        });
    }

    fn upload_atlas(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &[u8]) {
        let Some(atlas) = self.atlas.as_ref() else {
            return;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &atlas.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * 4),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
    }

    fn read_atlas(&mut self) -> Result<Vec<u8>> {
        let Some(atlas) = self.atlas.as_ref() else {
            anyhow::bail!("atlas readback before init_atlas");
        };
        let side = atlas.side;

        // Buffer copies need 256-byte row alignment; rows are unpadded after
        // mapping.
        let bytes_per_row = (side * 4).next_multiple_of(256);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadrel atlas readback"),
            size: u64::from(bytes_per_row) * u64::from(side),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadrel atlas readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &atlas.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("device poll failed during atlas readback")?;
        rx.recv()
            .context("atlas readback callback dropped")?
            .context("failed to map the atlas readback buffer")?;

        let mut pixels = Vec::with_capacity((side * side * 4) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..(side * 4) as usize]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    fn set_index_pattern(&mut self, indices: &[u16]) {
        self.index_buf = Some(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("quadrel quad ibo"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        ));

        let max_quads = indices.len() / 6;
        self.vertex_buf = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadrel batch vbo"),
            size: (max_quads * 4 * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    fn frame_begin(&mut self, width: u32, height: u32) -> Result<()> {
        anyhow::ensure!(width > 0 && height > 0, "frame size must be non-zero");

        if width != self.config.width || height != self.config.height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
        if (width, height) != self.mask_size {
            // Stale frame-sized layers; clear_mask_layer recreates on demand.
            self.mask_layers.clear();
            self.mask_size = (width, height);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .context("surface could not be reacquired")?
            }
            Err(err) => {
                return Err(
                    anyhow::Error::new(err).context("failed to acquire the surface texture")
                );
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.frame_ubo,
            0,
            bytemuck::bytes_of(&FrameUniform {
                size: [width as f32, height as f32],
                _pad: [0.0; 2],
            }),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadrel clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadrel clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        self.frame = Some(FrameInFlight {
            surface_texture,
            view,
        });
        Ok(())
    }

    fn frame_end(&mut self) {
        if let Some(frame) = self.frame.take() {
            drop(frame.view);
            frame.surface_texture.present();
        }
    }

    fn clear_mask_layer(&mut self, layer: usize) {
        debug_assert!(layer >= 1);
        let (width, height) = self.mask_size;
        if width == 0 || height == 0 {
            return;
        }

        while self.mask_layers.len() < layer {
            let fresh = self.make_mask_layer(width, height);
            self.mask_layers.push(fresh);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadrel mask clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadrel mask clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.mask_layers[layer - 1].view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw(&mut self, pass: DrawPass, vertices: &[SpriteVertex], quads: usize) {
        let Some(frame) = self.frame.as_ref() else {
            return;
        };
        let Some(atlas) = self.atlas.as_ref() else {
            return;
        };
        let (Some(vertex_buf), Some(index_buf)) = (&self.vertex_buf, &self.index_buf) else {
            return;
        };

        self.queue.write_buffer(
            vertex_buf,
            0,
            bytemuck::cast_slice(&vertices[..quads * 4]),
        );

        let (target_view, pipeline, mask_read) = match pass {
            DrawPass::Surface { mask_read } => {
                (&frame.view, &self.sprite_pipeline, mask_read)
            }
            DrawPass::MaskLayer { layer, mask_read } => {
                let Some(target) = self.mask_layers.get(layer - 1) else {
                    return;
                };
                (&target.view, &self.mask_pipeline, mask_read)
            }
        };
        let mask_bind = if mask_read == 0 {
            &self.white_bind_group
        } else {
            let Some(layer) = self.mask_layers.get(mask_read - 1) else {
                return;
            };
            &layer.bind_group
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadrel draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadrel draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &atlas.bind_group, &[]);
            rpass.set_bind_group(1, mask_bind, &[]);
            rpass.set_vertex_buffer(0, vertex_buf.slice(..));
            rpass.set_index_buffer(index_buf.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..(quads * 6) as u32, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

fn make_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[SpriteVertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Coverage accumulates premultiplied: `out = src + dst * (1 - src.a)`, the
/// union of overlapping mask quads.
fn coverage_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn make_white_layer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mask_bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("quadrel white mask"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MASK_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255u8],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(1),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quadrel white mask bind group"),
        layout: mask_bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
