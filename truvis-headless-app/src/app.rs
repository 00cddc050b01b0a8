use std::collections::HashMap;

use anyhow::Context;
use ash::vk;
use ash::vk::Handle;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::heap::heap_manager::RgHeapCapacities;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_frame_passes::full_screen_triangle::RgFullScreenTriangle;
use truvis_frame_passes::mesh_draw::{RgMaterialType, RgMeshDraw};
use truvis_frame_passes::pass_base::RgPassBase;
use truvis_frame_passes::passes::buffer_upload_pass::BufferUploadPass;
use truvis_frame_passes::passes::composition_pass::{CompositionInputs, CompositionPass};
use truvis_frame_passes::passes::geometry_pass::{GeometryPass, GeometryTargets};
use truvis_frame_passes::passes::shadow_composition_pass::{ShadowCompositionInputs, ShadowCompositionPass};
use truvis_frame_passes::passes::shadowing_pass::ShadowingPass;
use truvis_frame_passes::passes::ui_overlay_pass::{UiDrawCmd, UiDrawList, UiOverlayPass};
use truvis_frame_passes::render_target::{
    RgRenderTargetDesc, RgRenderTargetUsage, register_render_target, register_swapchain, release_render_target,
};
use truvis_gfx::commands::recording_command_buffer::GfxRecordingCommandBuffer;
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use truvis_gfx::resources::buffer::GfxBuffer;
use truvis_gfx::resources::resource::GfxResource;
use truvis_gfx::resources::resource_state::GfxResourceState;

/// 运行参数
#[derive(Clone, Copy, Debug)]
pub struct HeadlessConfig {
    pub frame_count: u64,
    pub extent: vk::Extent2D,
    pub swapchain_image_count: usize,
    pub shadow_cascades: u32,
    pub heap_capacities: RgHeapCapacities,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            frame_count: 3,
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            swapchain_image_count: 3,
            shadow_cascades: 4,
            heap_capacities: RgHeapCapacities::default(),
        }
    }
}

/// 分配假的 Vulkan handle
///
/// headless 模式下没有设备，handle 只用于在录制的命令中区分对象
#[derive(Default)]
struct FakeHandles {
    next: u64,
}

impl FakeHandles {
    fn next(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn pipeline(&mut self) -> GfxGraphicsPipeline {
        GfxGraphicsPipeline::new(vk::Pipeline::from_raw(self.next()), vk::PipelineLayout::from_raw(self.next()))
    }
}

/// 场景中的资源，渲染期间不变
struct SceneResources {
    camera: RgResourceHandle,
    light: RgResourceHandle,
    mesh: RgMeshDraw,
    ui_vertices: RgResourceHandle,
    ui_indices: RgResourceHandle,
    swapchain: RgResourceHandle,

    gbuffer_albedo: RgResourceHandle,
    gbuffer_normal: RgResourceHandle,
    gbuffer_depth: RgResourceHandle,
    shadow_map: RgResourceHandle,
    scene_color: RgResourceHandle,
    ui_target: RgResourceHandle,
    font_atlas: RgResourceHandle,
}

impl SceneResources {
    fn render_targets(&self) -> [RgResourceHandle; 7] {
        [
            self.gbuffer_albedo,
            self.gbuffer_normal,
            self.gbuffer_depth,
            self.shadow_map,
            self.scene_color,
            self.ui_target,
            self.font_atlas,
        ]
    }
}

struct Passes {
    upload: BufferUploadPass,
    shadowing: ShadowingPass,
    geometry: GeometryPass,
    shadow_composition: ShadowCompositionPass,
    ui: UiOverlayPass,
    composition: CompositionPass,
}

pub struct HeadlessApp {
    config: HeadlessConfig,
    ctx: RgFrameGraphContext,
    graph: RenderGraph,
    scene: SceneResources,
    passes: Passes,
    cmd: GfxRecordingCommandBuffer,
    frame_id: u64,
}

// new & init
impl HeadlessApp {
    pub fn new(config: HeadlessConfig) -> anyhow::Result<Self> {
        let _span = tracy_client::span!("HeadlessApp::new");
        let ctx = RgFrameGraphContext::new(config.heap_capacities);
        let mut handles = FakeHandles::default();

        let scene = Self::create_scene(&ctx, &config, &mut handles)?;
        let passes = Self::create_passes(&ctx, &scene, &mut handles);

        let mut graph = RenderGraph::new();
        let registered = [
            passes.upload.add_to_graph(&mut graph),
            passes.shadowing.add_to_graph(&mut graph),
            passes.geometry.add_to_graph(&mut graph),
            passes.shadow_composition.add_to_graph(&mut graph),
            passes.ui.add_to_graph(&mut graph),
            passes.composition.add_to_graph(&mut graph),
        ];
        anyhow::ensure!(registered.iter().all(|ok| *ok), "failed to register passes");
        log::info!("frame graph ready: {} passes", graph.len());

        Ok(Self {
            config,
            ctx,
            graph,
            scene,
            passes,
            cmd: GfxRecordingCommandBuffer::new("headless"),
            frame_id: 0,
        })
    }

    fn create_buffer(
        ctx: &RgFrameGraphContext,
        handles: &mut FakeHandles,
        name: &str,
        size: vk::DeviceSize,
        state: GfxResourceState,
    ) -> RgResourceHandle {
        let raw = handles.next();
        let buffer = GfxBuffer::new(vk::Buffer::from_raw(raw), size, vk::BufferUsageFlags::STORAGE_BUFFER)
            .with_device_address(raw << 16);
        ctx.adder().add_resource(GfxResource::from_buffer(name, buffer, state))
    }

    fn create_target(
        ctx: &RgFrameGraphContext,
        handles: &mut FakeHandles,
        name: &str,
        extent: vk::Extent2D,
        usage: RgRenderTargetUsage,
        array_layers: u32,
    ) -> anyhow::Result<RgResourceHandle> {
        let desc = RgRenderTargetDesc {
            name: name.to_string(),
            vk_image: vk::Image::from_raw(handles.next()),
            attachment_view: vk::ImageView::from_raw(handles.next()),
            sampled_view: vk::ImageView::from_raw(handles.next()),
            format: match usage {
                RgRenderTargetUsage::Color => vk::Format::R16G16B16A16_SFLOAT,
                RgRenderTargetUsage::Depth => vk::Format::D32_SFLOAT,
            },
            extent,
            array_layers,
            usage,
        };
        register_render_target(ctx, desc).with_context(|| format!("failed to register render target {name}"))
    }

    fn create_scene(
        ctx: &RgFrameGraphContext,
        config: &HeadlessConfig,
        handles: &mut FakeHandles,
    ) -> anyhow::Result<SceneResources> {
        // 上传前的 buffer 为 UNDEFINED，静态几何认为已经上传完毕
        let camera = Self::create_buffer(ctx, handles, "camera", 256, GfxResourceState::UNDEFINED);
        let light = Self::create_buffer(ctx, handles, "light", 1024, GfxResourceState::UNDEFINED);
        let mesh = RgMeshDraw {
            vertex_buffer: Self::create_buffer(ctx, handles, "cube-vertices", 24 * 32, GfxResourceState::SHADER_READ_GENERIC),
            index_buffer: Self::create_buffer(ctx, handles, "cube-indices", 36 * 4, GfxResourceState::SHADER_READ_GENERIC),
            index_count: 36,
            world_buffer: Self::create_buffer(ctx, handles, "cube-world", 64, GfxResourceState::UNDEFINED),
            material_type: RgMaterialType(0),
        };
        let ui_vertices = Self::create_buffer(ctx, handles, "ui-vertices", 4096, GfxResourceState::SHADER_READ_GENERIC);
        let ui_indices = Self::create_buffer(ctx, handles, "ui-indices", 4096, GfxResourceState::SHADER_READ_GENERIC);

        let extent = config.extent;
        let shadow_extent = vk::Extent2D {
            width: 2048,
            height: 2048,
        };
        let gbuffer_albedo =
            Self::create_target(ctx, handles, "gbuffer-albedo", extent, RgRenderTargetUsage::Color, 1)?;
        let gbuffer_normal =
            Self::create_target(ctx, handles, "gbuffer-normal", extent, RgRenderTargetUsage::Color, 1)?;
        let gbuffer_depth = Self::create_target(ctx, handles, "gbuffer-depth", extent, RgRenderTargetUsage::Depth, 1)?;
        let shadow_map = Self::create_target(
            ctx,
            handles,
            "shadow-map",
            shadow_extent,
            RgRenderTargetUsage::Depth,
            config.shadow_cascades,
        )?;
        let scene_color = Self::create_target(ctx, handles, "scene-color", extent, RgRenderTargetUsage::Color, 1)?;
        let ui_target = Self::create_target(ctx, handles, "ui", extent, RgRenderTargetUsage::Color, 1)?;
        let font_atlas = Self::create_target(
            ctx,
            handles,
            "font-atlas",
            vk::Extent2D { width: 512, height: 512 },
            RgRenderTargetUsage::Color,
            1,
        )?;

        let swapchain_images = (0..config.swapchain_image_count)
            .map(|_| (vk::Image::from_raw(handles.next()), vk::ImageView::from_raw(handles.next())))
            .collect::<Vec<_>>();
        let swapchain = register_swapchain(ctx, "swapchain", &swapchain_images, vk::Format::B8G8R8A8_SRGB, extent)
            .context("failed to register swapchain")?;

        Ok(SceneResources {
            camera,
            light,
            mesh,
            ui_vertices,
            ui_indices,
            swapchain,
            gbuffer_albedo,
            gbuffer_normal,
            gbuffer_depth,
            shadow_map,
            scene_color,
            ui_target,
            font_atlas,
        })
    }

    fn create_passes(ctx: &RgFrameGraphContext, scene: &SceneResources, handles: &mut FakeHandles) -> Passes {
        let triangle = RgFullScreenTriangle {
            vertex_buffer: Self::create_buffer(ctx, handles, "triangle-vertices", 3 * 16, GfxResourceState::SHADER_READ_GENERIC),
            index_buffer: Self::create_buffer(ctx, handles, "triangle-indices", 3 * 2, GfxResourceState::SHADER_READ_GENERIC),
        };

        Passes {
            upload: BufferUploadPass::new(ctx),
            shadowing: ShadowingPass::new(ctx, scene.shadow_map, handles.pipeline()),
            geometry: GeometryPass::new(
                ctx,
                GeometryTargets {
                    gbuffers: vec![scene.gbuffer_albedo, scene.gbuffer_normal],
                    depth_stencil: scene.gbuffer_depth,
                    clear_color: glam::vec4(0.1, 0.1, 0.1, 1.0),
                },
                HashMap::from([(RgMaterialType(0), handles.pipeline())]),
            ),
            shadow_composition: ShadowCompositionPass::new(
                ctx,
                ShadowCompositionInputs {
                    gbuffer_normal: scene.gbuffer_normal,
                    gbuffer_depth: scene.gbuffer_depth,
                    shadow_map: scene.shadow_map,
                    output: scene.scene_color,
                    triangle,
                },
                handles.pipeline(),
            ),
            ui: UiOverlayPass::new(ctx, scene.ui_target, handles.pipeline()),
            composition: CompositionPass::new(
                ctx,
                CompositionInputs {
                    scene: scene.scene_color,
                    ui: scene.ui_target,
                    triangle,
                },
                handles.pipeline(),
            ),
        }
    }
}

// 逐帧驱动
impl HeadlessApp {
    pub fn run(&mut self) {
        for _ in 0..self.config.frame_count {
            self.run_frame();
        }
    }

    /// 失败的帧只记录日志，不重试
    fn run_frame(&mut self) {
        let _span = tracy_client::span!("HeadlessApp::run_frame");
        self.set_frame_params();

        if let Err(e) = self.graph.run_frame(&mut self.cmd, self.frame_id) {
            log::error!("frame {} failed: {e}", self.frame_id);
        } else {
            let report = self.graph.validate();
            report.log_issues();
        }

        let commands = self.cmd.take_commands();
        log::info!("frame {}: recorded {} commands", self.frame_id, commands.len());
        for command in &commands {
            log::trace!("  {command:?}");
        }
        self.frame_id += 1;
    }

    fn set_frame_params(&self) {
        let scene = &self.scene;
        let passes = &self.passes;
        let time = self.frame_id as f32 / 60.0;
        let aspect = self.config.extent.width as f32 / self.config.extent.height as f32;

        let view = glam::Mat4::look_at_rh(glam::vec3(0.0, 2.0, 5.0), glam::Vec3::ZERO, glam::Vec3::Y);
        let proj = glam::Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
        passes.upload.add_upload_pod(scene.camera, &(proj * view));
        let light_view_proj = [glam::Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.1, 50.0); 4];
        passes.upload.add_upload_pod(scene.light, &light_view_proj);
        passes.upload.add_upload_pod(scene.mesh.world_buffer, &glam::Mat4::from_rotation_y(time));

        passes.shadowing.set_light_view_proj_buffer(scene.light);
        passes.shadowing.add_shadow_caster(scene.mesh);

        passes.geometry.set_view_proj_buffer(scene.camera);
        passes.geometry.add_draw_mesh(scene.mesh);

        passes.shadow_composition.set_light_buffer(scene.light);

        passes.ui.set_draw_list(UiDrawList {
            vertex_buffer: scene.ui_vertices,
            index_buffer: scene.ui_indices,
            display_size: glam::vec2(self.config.extent.width as f32, self.config.extent.height as f32),
            commands: vec![UiDrawCmd {
                index_count: 6,
                first_index: 0,
                vertex_offset: 0,
                clip_rect: vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.config.extent,
                },
                texture: scene.font_atlas,
            }],
        });

        let image_index = (self.frame_id % self.config.swapchain_image_count as u64) as usize;
        passes.composition.set_target_swapchain(scene.swapchain, image_index);
    }
}

// destroy
impl HeadlessApp {
    /// 把 render target 与 swapchain 移出 graph，归还 descriptor slot
    pub fn destroy(self) {
        for handle in self.scene.render_targets().into_iter().chain([self.scene.swapchain]) {
            if let Some(resource) = release_render_target(&self.ctx, handle) {
                log::debug!("released {}", resource.name());
            }
        }
        log::info!("headless app finished after {} frames", self.frame_id);
    }
}
