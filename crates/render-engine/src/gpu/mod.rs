//! Headless wgpu backend.
//!
//! The provider opens one adapter and device lazily and shares them between
//! every surface it hands out. A surface is a multisampled `Rgba8Unorm`
//! color target resolved into a single-sample texture, a
//! `Depth24PlusStencil8` attachment with the same sample count, and a
//! mappable buffer the resolved frame is copied into for readback.

use std::sync::{mpsc, Arc};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use framepipe_common::error::{FramepipeError, FramepipeResult};
use framepipe_scene_model::export::{ClearColor, RowOrder, MAX_DIMENSION};
use framepipe_scene_model::scene::SceneDescription;

use crate::compositor::{compose, DrawRect};
use crate::engine::{EngineConfig, GraphicsApi, SceneEngine};
use crate::surface::{RenderSurface, SurfaceProvider, SurfaceSpec, Viewport};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Device shared by every surface of one provider.
pub struct GpuContext {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    high_sample_counts: bool,
}

impl GpuContext {
    fn open(backends: wgpu::Backends) -> FramepipeResult<Self> {
        pollster::block_on(Self::open_async(backends))
    }

    async fn open_async(backends: wgpu::Backends) -> FramepipeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| FramepipeError::surface(format!("no suitable GPU adapter: {e}")))?;

        // Sample counts above 4 are adapter specific and need this feature.
        let high_sample_counts = adapter
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
        let mut required_features = wgpu::Features::empty();
        if high_sample_counts {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("framepipe device"),
                required_features,
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| FramepipeError::surface(format!("failed to create GPU device: {e}")))?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "GPU device opened"
        );

        Ok(Self {
            adapter,
            device,
            queue,
            high_sample_counts,
        })
    }

    /// Human-readable adapter description.
    pub fn adapter_name(&self) -> String {
        let info = self.adapter.get_info();
        format!("{} ({:?})", info.name, info.backend)
    }

    /// Sample counts usable for both the color and depth-stencil targets.
    pub fn supported_sample_counts(&self) -> Vec<u32> {
        let color = self.adapter.get_texture_format_features(COLOR_FORMAT);
        let depth = self.adapter.get_texture_format_features(DEPTH_FORMAT);
        let resolvable = color
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE);

        let mut counts: Vec<u32> = color
            .flags
            .supported_sample_counts()
            .into_iter()
            .filter(|&count| depth.flags.sample_count_supported(count))
            .filter(|&count| count == 1 || resolvable)
            .filter(|&count| count <= 4 || self.high_sample_counts)
            .collect();
        counts.push(1);
        counts.sort_unstable();
        counts.dedup();
        counts
    }

    fn wait_idle(&self) -> FramepipeResult<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| FramepipeError::surface(format!("GPU poll failed: {e}")))
    }
}

/// Largest of `supported` not above `requested`, or 1.
pub fn pick_sample_count(requested: u32, supported: &[u32]) -> u32 {
    let requested = requested.max(1);
    supported
        .iter()
        .copied()
        .filter(|&count| count <= requested)
        .max()
        .unwrap_or(1)
}

/// Hands out [`GpuSurface`]s from one lazily opened device.
pub struct GpuSurfaceProvider {
    backends: wgpu::Backends,
    context: Option<Arc<GpuContext>>,
}

impl Default for GpuSurfaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuSurfaceProvider {
    pub fn new() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            context: None,
        }
    }

    /// Restrict adapter selection to the backends of `api`.
    pub fn for_api(api: GraphicsApi) -> Self {
        let backends = match api {
            GraphicsApi::Auto => wgpu::Backends::all(),
            GraphicsApi::Vulkan => wgpu::Backends::VULKAN,
            GraphicsApi::Metal => wgpu::Backends::METAL,
            GraphicsApi::Dx12 => wgpu::Backends::DX12,
            GraphicsApi::Gl => wgpu::Backends::GL,
        };
        Self {
            backends,
            context: None,
        }
    }

    /// Open (or reuse) the device.
    pub fn context(&mut self) -> FramepipeResult<Arc<GpuContext>> {
        if let Some(context) = &self.context {
            return Ok(Arc::clone(context));
        }
        let context = Arc::new(GpuContext::open(self.backends)?);
        self.context = Some(Arc::clone(&context));
        Ok(context)
    }
}

impl SurfaceProvider for GpuSurfaceProvider {
    type Surface = GpuSurface;

    fn name(&self) -> &str {
        "gpu"
    }

    fn acquire(&mut self, spec: SurfaceSpec) -> FramepipeResult<GpuSurface> {
        let context = self.context()?;
        GpuSurface::new(context, spec)
    }
}

/// Offscreen framebuffer on the GPU.
pub struct GpuSurface {
    context: Arc<GpuContext>,
    width: u32,
    height: u32,
    samples: u32,
    msaa_view: Option<wgpu::TextureView>,
    resolve_texture: wgpu::Texture,
    resolve_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_row_bytes: u32,
}

impl GpuSurface {
    fn new(context: Arc<GpuContext>, spec: SurfaceSpec) -> FramepipeResult<Self> {
        let max_side = context.device.limits().max_texture_dimension_2d.min(MAX_DIMENSION);
        if spec.width == 0 || spec.height == 0 || spec.width > max_side || spec.height > max_side {
            return Err(FramepipeError::surface(format!(
                "{}x{} is outside the device's 1..={max_side} texture range",
                spec.width, spec.height
            )));
        }

        let supported = context.supported_sample_counts();
        let samples = pick_sample_count(spec.sample_count, &supported);
        if samples != spec.effective_samples() {
            tracing::warn!(
                requested = spec.sample_count,
                fallback = samples,
                ?supported,
                "Requested sample count not supported; falling back"
            );
        }

        let size = wgpu::Extent3d {
            width: spec.width,
            height: spec.height,
            depth_or_array_layers: 1,
        };
        let device = &context.device;

        let msaa_view = (samples > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("framepipe msaa color"),
                    size,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format: COLOR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let resolve_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("framepipe resolved color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let resolve_view = resolve_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_view = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("framepipe depth-stencil"),
                size,
                mip_level_count: 1,
                sample_count: samples,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let padded_row_bytes = padded_row_bytes(spec.width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("framepipe readback"),
            size: padded_row_bytes as u64 * spec.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        tracing::debug!(
            width = spec.width,
            height = spec.height,
            samples,
            padded_row_bytes,
            "GPU surface acquired"
        );

        Ok(Self {
            context,
            width: spec.width,
            height: spec.height,
            samples,
            msaa_view,
            resolve_texture,
            resolve_view,
            depth_view,
            readback,
            padded_row_bytes,
        })
    }
}

/// Row pitch of the readback buffer, padded to the copy alignment.
pub fn padded_row_bytes(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

impl RenderSurface for GpuSurface {
    type Target<'a> = GpuTarget<'a>;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample_count(&self) -> u32 {
        self.samples
    }

    fn row_order(&self) -> RowOrder {
        // Texture row 0 is the top of the image.
        RowOrder::TopDown
    }

    fn make_current(&mut self) -> FramepipeResult<GpuTarget<'_>> {
        let (color_view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&self.resolve_view)),
            None => (&self.resolve_view, None),
        };
        Ok(GpuTarget {
            context: &self.context,
            color_view,
            resolve_target,
            depth_view: &self.depth_view,
            width: self.width,
            height: self.height,
            samples: self.samples,
        })
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> FramepipeResult<()> {
        let row_bytes = self.width as usize * 4;
        if out.len() != row_bytes * self.height as usize {
            return Err(FramepipeError::surface(format!(
                "readback buffer is {} bytes, frame needs {}",
                out.len(),
                row_bytes * self.height as usize
            )));
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("framepipe readback encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.resolve_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.context.wait_idle()?;
        rx.recv()
            .map_err(|_| FramepipeError::surface("readback mapping was dropped"))?
            .map_err(|e| FramepipeError::surface(format!("readback mapping failed: {e}")))?;

        {
            let mapped = slice.get_mapped_range();
            for (dst, src) in out
                .chunks_exact_mut(row_bytes)
                .zip(mapped.chunks_exact(self.padded_row_bytes as usize))
            {
                dst.copy_from_slice(&src[..row_bytes]);
            }
        }
        self.readback.unmap();
        Ok(())
    }

    fn swap(&mut self) -> FramepipeResult<()> {
        self.context.wait_idle()
    }
}

/// Attachments of a current [`GpuSurface`].
pub struct GpuTarget<'a> {
    context: &'a GpuContext,
    color_view: &'a wgpu::TextureView,
    resolve_target: Option<&'a wgpu::TextureView>,
    depth_view: &'a wgpu::TextureView,
    width: u32,
    height: u32,
    samples: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct RectInstance {
    origin: [f32; 2],
    size: [f32; 2],
    color: [f32; 4],
    depth: f32,
}

impl RectInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2,
        2 => Float32x2,
        3 => Float32x4,
        4 => Float32
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

impl From<&DrawRect> for RectInstance {
    fn from(rect: &DrawRect) -> Self {
        Self {
            origin: [rect.x0, rect.y0],
            size: [rect.width(), rect.height()],
            color: rect.color,
            depth: rect.depth,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    _pad: [f32; 2],
}

/// GPU objects created on first draw, tied to one sample count.
struct Pipeline {
    samples: u32,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

/// Scene engine drawing composed rectangles as instanced quads.
#[derive(Default)]
pub struct GpuSceneRenderer {
    configured: bool,
    scene: Option<SceneDescription>,
    viewport: Option<Viewport>,
    clear_color: ClearColor,
    pipeline: Option<Pipeline>,
}

impl GpuSceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_pipeline(&mut self, context: &GpuContext, samples: u32) -> &mut Pipeline {
        let pipeline = match self.pipeline.take() {
            Some(pipeline) if pipeline.samples == samples => pipeline,
            _ => build_pipeline(&context.device, samples),
        };
        self.pipeline.insert(pipeline)
    }
}

fn build_pipeline(device: &wgpu::Device, samples: u32) -> Pipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("framepipe rect shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("rect.wgsl").into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("framepipe rect bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<ViewportUniform>() as u64,
                ),
            },
            count: None,
        }],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("framepipe rect pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("framepipe rect pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout(), RectInstance::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    });

    let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("framepipe viewport ubo"),
        size: std::mem::size_of::<ViewportUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("framepipe rect bind group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: viewport_ubo.as_entire_binding(),
        }],
    });

    let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("framepipe quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("framepipe quad ibo"),
        contents: bytemuck::cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    Pipeline {
        samples,
        pipeline,
        bind_group,
        viewport_ubo,
        quad_vbo,
        quad_ibo,
        instance_vbo: None,
        instance_capacity: 0,
    }
}

impl Pipeline {
    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(64);
        self.instance_vbo = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("framepipe rect instance vbo"),
            size: (capacity * std::mem::size_of::<RectInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = capacity;
    }
}

impl SceneEngine<GpuSurface> for GpuSceneRenderer {
    fn configure(&mut self, config: &EngineConfig) -> FramepipeResult<()> {
        if !config.offscreen {
            return Err(FramepipeError::config(
                "the GPU renderer only renders off-screen",
            ));
        }
        self.configured = true;
        Ok(())
    }

    fn set_scene(&mut self, scene: &SceneDescription) -> FramepipeResult<()> {
        scene.validate()?;
        self.scene = Some(scene.clone());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn draw(&mut self, target: GpuTarget<'_>, time: f64) -> FramepipeResult<()> {
        if !self.configured {
            return Err(FramepipeError::scene("draw called before the renderer was configured"));
        }
        let scene = self
            .scene
            .as_ref()
            .ok_or_else(|| FramepipeError::scene("draw called before a scene was bound"))?;
        let viewport = self
            .viewport
            .unwrap_or_else(|| Viewport::full(target.width, target.height));
        let instances: Vec<RectInstance> = compose(scene, time, viewport)?
            .iter()
            .map(RectInstance::from)
            .collect();
        let clear = self.clear_color;

        let context = target.context;
        let pipeline = self.ensure_pipeline(context, target.samples);
        pipeline.ensure_instance_capacity(&context.device, instances.len());

        context.queue.write_buffer(
            &pipeline.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                size: [target.width as f32, target.height as f32],
                _pad: [0.0; 2],
            }),
        );
        if let Some(instance_vbo) = &pipeline.instance_vbo {
            if !instances.is_empty() {
                context
                    .queue
                    .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&instances));
            }
        }

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("framepipe draw encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("framepipe rect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: target.resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r() as f64,
                            g: clear.g() as f64,
                            b: clear.b() as f64,
                            a: clear.a() as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let (Some(instance_vbo), false) = (&pipeline.instance_vbo, instances.is_empty()) {
                rpass.set_pipeline(&pipeline.pipeline);
                rpass.set_bind_group(0, &pipeline.bind_group, &[]);
                rpass.set_vertex_buffer(0, pipeline.quad_vbo.slice(..));
                rpass.set_vertex_buffer(1, instance_vbo.slice(..));
                rpass.set_index_buffer(pipeline.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(0..6, 0, 0..instances.len() as u32);
            }
        }
        context.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
