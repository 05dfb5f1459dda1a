use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use rgb::RGBA8;
use wgpu::util::DeviceExt;

use crate::sequence::Image;

/// Quad vertex: position in clip space, UV coords.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,  // position
        1 => Float32x2,  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Full-surface quad; the uniform scale shrinks it around the centre.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [-1.0,  1.0], uv: [0.0, 0.0] }, // top-left
    Vertex { position: [ 1.0,  1.0], uv: [1.0, 0.0] }, // top-right
    Vertex { position: [ 1.0, -1.0], uv: [1.0, 1.0] }, // bottom-right
    Vertex { position: [-1.0, -1.0], uv: [0.0, 1.0] }, // bottom-left
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Per-draw uniform. `scale` is the quad's half-extent in clip space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteUniform {
    pub scale: [f32; 2],
    _pad: [f32; 2],
}

impl SpriteUniform {
    /// Fit `image` inside `surface` keeping its aspect ratio. Never upscales.
    pub fn fit(image: (usize, usize), surface: (u32, u32)) -> Self {
        let (iw, ih) = (image.0.max(1) as f32, image.1.max(1) as f32);
        let (sw, sh) = (surface.0.max(1) as f32, surface.1.max(1) as f32);
        let k = (sw / iw).min(sh / ih).min(1.0);
        Self {
            scale: [iw * k / sw, ih * k / sh],
            _pad: [0.0; 2],
        }
    }
}

/// The current frame as a GPU texture plus what it takes to draw it.
pub struct SpritePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: Option<wgpu::BindGroup>,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture: Option<wgpu::Texture>,
    image_size: (usize, usize),
}

impl SpritePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Shader outputs premultiplied colour
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertex_buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_index_buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite_uniform_buffer"),
            contents: bytemuck::bytes_of(&SpriteUniform::fit((1, 1), (1, 1))),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group: None,
            bind_group_layout,
            sampler,
            texture: None,
            image_size: (0, 0),
        }
    }

    /// Upload a frame. The texture is recreated only when the size changes.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &Image) {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return;
        }
        let extent = wgpu::Extent3d {
            width: width as u32,
            height: height as u32,
            depth_or_array_layers: 1,
        };

        if self.texture.is_none() || self.image_size != (width, height) {
            self.recreate_texture(device, extent);
            self.image_size = (width, height);
        }
        let Some(texture) = &self.texture else { return };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&contiguous(image)),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * extent.width),
                rows_per_image: Some(extent.height),
            },
            extent,
        );
    }

    /// Re-fit the current frame to the surface.
    pub fn update_scale(&self, queue: &wgpu::Queue, surface_width: u32, surface_height: u32) {
        let uniform = SpriteUniform::fit(self.image_size, (surface_width, surface_height));
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    fn recreate_texture(&mut self, device: &wgpu::Device, extent: wgpu::Extent3d) {
        log::debug!("Sprite texture {}x{}", extent.width, extent.height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprite_texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }));
        self.texture = Some(texture);
    }
}

/// Tightly packed rows, copying only for strided sub-images.
fn contiguous(image: &Image) -> Cow<'_, [RGBA8]> {
    if image.width() == image.stride() {
        Cow::Borrowed(&image.buf()[..image.width() * image.height()])
    } else {
        let mut contig = Vec::with_capacity(image.width() * image.height());
        contig.extend(image.rows().flat_map(|r| r.iter().cloned()));
        Cow::Owned(contig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::Img;

    #[test]
    fn same_size_fills_surface() {
        assert_eq!(SpriteUniform::fit((200, 200), (200, 200)).scale, [1.0, 1.0]);
    }

    #[test]
    fn large_image_shrinks_keeping_aspect() {
        let [sx, sy] = SpriteUniform::fit((400, 200), (200, 200)).scale;
        assert_eq!(sx, 1.0);
        assert_eq!(sy, 0.5);
    }

    #[test]
    fn small_image_is_not_enlarged() {
        let [sx, sy] = SpriteUniform::fit((50, 100), (200, 200)).scale;
        assert_eq!((sx, sy), (0.25, 0.5));
    }

    #[test]
    fn strided_image_is_packed() {
        let px = |v| RGBA8::new(v, 0, 0, 255);
        let buf = vec![px(1), px(2), px(9), px(3), px(4), px(9)];
        let image = Img::new_stride(buf, 2, 2, 3);
        let packed = contiguous(&image);
        assert_eq!(packed.iter().map(|p| p.r).collect::<Vec<_>>(), [1, 2, 3, 4]);
    }
}
