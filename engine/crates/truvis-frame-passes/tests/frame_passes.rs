use std::collections::HashMap;

use ash::vk;
use ash::vk::Handle;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::error::RgError;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::pass::pass_id::RgPassId;
use truvis_frame_graph::resource::access_token::RgAccessToken;
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
use truvis_gfx::commands::recording_command_buffer::{GfxRecordedCommand, GfxRecordingCommandBuffer};
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use truvis_gfx::resources::buffer::GfxBuffer;
use truvis_gfx::resources::resource::GfxResource;
use truvis_gfx::resources::resource_state::GfxResourceState;

const EXTENT: vk::Extent2D = vk::Extent2D { width: 64, height: 32 };

fn buffer(ctx: &RgFrameGraphContext, raw: u64, state: GfxResourceState) -> RgResourceHandle {
    let buffer = GfxBuffer::new(vk::Buffer::from_raw(raw), 256, vk::BufferUsageFlags::STORAGE_BUFFER)
        .with_device_address(raw << 12);
    ctx.adder().add_resource(GfxResource::from_buffer(format!("buffer-{raw}"), buffer, state))
}

fn target(ctx: &RgFrameGraphContext, raw: u64, usage: RgRenderTargetUsage, array_layers: u32) -> RgResourceHandle {
    register_render_target(
        ctx,
        RgRenderTargetDesc {
            name: format!("target-{raw}"),
            vk_image: vk::Image::from_raw(raw),
            attachment_view: vk::ImageView::from_raw(raw * 10),
            sampled_view: vk::ImageView::from_raw(raw * 10 + 1),
            format: match usage {
                RgRenderTargetUsage::Color => vk::Format::R16G16B16A16_SFLOAT,
                RgRenderTargetUsage::Depth => vk::Format::D32_SFLOAT,
            },
            extent: EXTENT,
            array_layers,
            usage,
        },
    )
    .unwrap()
}

fn pipeline(raw: u64) -> GfxGraphicsPipeline {
    GfxGraphicsPipeline::new(vk::Pipeline::from_raw(raw), vk::PipelineLayout::from_raw(raw + 1))
}

fn state_of(ctx: &RgFrameGraphContext, handle: RgResourceHandle) -> GfxResourceState {
    let mut token = RgAccessToken::new();
    token.permit_access(handle);
    ctx.resource_manager().with_lock(|resources| resources.get_read_resource(handle, &token).current_state())
}

/// 一个最小的场景：一个 mesh、一盏光、一条 UI 命令
struct Scene {
    ctx: RgFrameGraphContext,
    graph: RenderGraph,

    upload: BufferUploadPass,
    shadowing: ShadowingPass,
    geometry: GeometryPass,
    shadow_composition: ShadowCompositionPass,
    ui: UiOverlayPass,
    composition: CompositionPass,

    camera: RgResourceHandle,
    light: RgResourceHandle,
    mesh: RgMeshDraw,
    ui_vertices: RgResourceHandle,
    ui_indices: RgResourceHandle,
    font_atlas: RgResourceHandle,
    swapchain: RgResourceHandle,
}

impl Scene {
    fn new() -> Self {
        let ctx = RgFrameGraphContext::default();

        let camera = buffer(&ctx, 1, GfxResourceState::UNDEFINED);
        let light = buffer(&ctx, 2, GfxResourceState::UNDEFINED);
        let mesh = RgMeshDraw {
            vertex_buffer: buffer(&ctx, 3, GfxResourceState::SHADER_READ_GENERIC),
            index_buffer: buffer(&ctx, 4, GfxResourceState::SHADER_READ_GENERIC),
            index_count: 36,
            world_buffer: buffer(&ctx, 5, GfxResourceState::UNDEFINED),
            material_type: RgMaterialType(0),
        };
        let triangle = RgFullScreenTriangle {
            vertex_buffer: buffer(&ctx, 6, GfxResourceState::SHADER_READ_GENERIC),
            index_buffer: buffer(&ctx, 7, GfxResourceState::SHADER_READ_GENERIC),
        };
        let ui_vertices = buffer(&ctx, 8, GfxResourceState::SHADER_READ_GENERIC);
        let ui_indices = buffer(&ctx, 9, GfxResourceState::SHADER_READ_GENERIC);

        let albedo = target(&ctx, 101, RgRenderTargetUsage::Color, 1);
        let normal = target(&ctx, 102, RgRenderTargetUsage::Color, 1);
        let depth = target(&ctx, 103, RgRenderTargetUsage::Depth, 1);
        let shadow_map = target(&ctx, 104, RgRenderTargetUsage::Depth, 4);
        let scene_color = target(&ctx, 105, RgRenderTargetUsage::Color, 1);
        let ui_target = target(&ctx, 106, RgRenderTargetUsage::Color, 1);
        let font_atlas = target(&ctx, 107, RgRenderTargetUsage::Color, 1);
        let swapchain = register_swapchain(
            &ctx,
            "swapchain",
            &[
                (vk::Image::from_raw(201), vk::ImageView::from_raw(2010)),
                (vk::Image::from_raw(202), vk::ImageView::from_raw(2020)),
                (vk::Image::from_raw(203), vk::ImageView::from_raw(2030)),
            ],
            vk::Format::B8G8R8A8_SRGB,
            EXTENT,
        )
        .unwrap();

        let upload = BufferUploadPass::new(&ctx);
        let shadowing = ShadowingPass::new(&ctx, shadow_map, pipeline(300));
        let geometry = GeometryPass::new(
            &ctx,
            GeometryTargets {
                gbuffers: vec![albedo, normal],
                depth_stencil: depth,
                clear_color: glam::Vec4::ZERO,
            },
            HashMap::from([(RgMaterialType(0), pipeline(310))]),
        );
        let shadow_composition = ShadowCompositionPass::new(
            &ctx,
            ShadowCompositionInputs {
                gbuffer_normal: normal,
                gbuffer_depth: depth,
                shadow_map,
                output: scene_color,
                triangle,
            },
            pipeline(320),
        );
        let ui = UiOverlayPass::new(&ctx, ui_target, pipeline(330));
        let composition = CompositionPass::new(
            &ctx,
            CompositionInputs {
                scene: scene_color,
                ui: ui_target,
                triangle,
            },
            pipeline(340),
        );

        let mut graph = RenderGraph::new();
        assert!(upload.add_to_graph(&mut graph));
        assert!(shadowing.add_to_graph(&mut graph));
        assert!(geometry.add_to_graph(&mut graph));
        assert!(shadow_composition.add_to_graph(&mut graph));
        assert!(ui.add_to_graph(&mut graph));
        assert!(composition.add_to_graph(&mut graph));

        Self {
            ctx,
            graph,
            upload,
            shadowing,
            geometry,
            shadow_composition,
            ui,
            composition,
            camera,
            light,
            mesh,
            ui_vertices,
            ui_indices,
            font_atlas,
            swapchain,
        }
    }

    fn set_frame_params(&self, image_index: usize) {
        self.set_scene_params();
        self.composition.set_target_swapchain(self.swapchain, image_index);
    }

    /// 除了 swapchain 之外的所有逐帧参数
    fn set_scene_params(&self) {
        self.upload.add_upload_pod(self.camera, &glam::Mat4::IDENTITY);
        self.upload.add_upload_pod(self.light, &[glam::Mat4::IDENTITY; 4]);
        self.upload.add_upload_pod(self.mesh.world_buffer, &glam::Mat4::from_translation(glam::Vec3::X));

        self.shadowing.set_light_view_proj_buffer(self.light);
        self.shadowing.add_shadow_caster(self.mesh);

        self.geometry.set_view_proj_buffer(self.camera);
        self.geometry.add_draw_mesh(self.mesh);

        self.shadow_composition.set_light_buffer(self.light);

        self.ui.set_draw_list(UiDrawList {
            vertex_buffer: self.ui_vertices,
            index_buffer: self.ui_indices,
            display_size: glam::vec2(EXTENT.width as f32, EXTENT.height as f32),
            commands: vec![UiDrawCmd {
                index_count: 6,
                first_index: 0,
                vertex_offset: 0,
                clip_rect: vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: EXTENT,
                },
                texture: self.font_atlas,
            }],
        });
    }
}

#[test]
fn test_full_frame() {
    let mut scene = Scene::new();
    scene.set_frame_params(0);

    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    scene.graph.run_frame(&mut cmd, 0).unwrap();
    assert!(scene.graph.validate().is_clean());
    assert_eq!(cmd.label_depth(), 0);

    // geometry、shadowing、shadow composition、ui、composition 各一次
    assert_eq!(cmd.draw_count(), 5);
    // upload 3 个 buffer 各两次；shadow map、scene color、ui target、swapchain 各两次；两个 gbuffer 与 depth 各两次
    assert_eq!(cmd.barrier_count(), 20);

    let labels = cmd
        .commands()
        .iter()
        .filter_map(|c| match c {
            GfxRecordedCommand::BeginLabel(label) => Some(label.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        [
            "frame-0",
            "BufferUploadPass",
            "ShadowingPass",
            "GeometryPass",
            "ShadowCompositionPass",
            "UiOverlayPass",
            "CompositionPass"
        ]
    );

    assert_eq!(state_of(&scene.ctx, scene.swapchain), GfxResourceState::PRESENT);
    assert_eq!(state_of(&scene.ctx, scene.camera), GfxResourceState::SHADER_READ_GENERIC);
}

#[test]
fn test_frame_params_must_be_set_every_frame() {
    let mut scene = Scene::new();
    scene.set_frame_params(0);
    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    scene.graph.run_frame(&mut cmd, 0).unwrap();

    // 第二帧没有设置参数：upload / shadowing / geometry 没有工作，shadow composition 缺少光源
    cmd.clear();
    let result = scene.graph.run_frame(&mut cmd, 1);
    assert!(matches!(result, Err(RgError::SetupFailed(id)) if id == RgPassId::of::<ShadowCompositionPass>()));
    assert!(cmd.commands().is_empty());

    // 重新设置后恢复正常，第二帧使用另一张 swapchain image
    scene.set_frame_params(2);
    scene.graph.run_frame(&mut cmd, 2).unwrap();
    let presented = cmd.commands().iter().rev().find_map(|c| match c {
        GfxRecordedCommand::ImageBarrier { image, new_layout, .. } => Some((image.as_raw(), *new_layout)),
        _ => None,
    });
    assert_eq!(presented, Some((203, vk::ImageLayout::PRESENT_SRC_KHR)));
}

#[test]
fn test_failed_setup_does_not_leak_params_into_next_frame() {
    let mut scene = Scene::new();
    let mut cmd = GfxRecordingCommandBuffer::new("frame");

    // 忘记设置 swapchain：composition 的 setup 失败，前面的 pass 已经声明了本帧的读写
    scene.set_scene_params();
    let result = scene.graph.run_frame(&mut cmd, 0);
    assert!(matches!(result, Err(RgError::SetupFailed(id)) if id == RgPassId::of::<CompositionPass>()));
    assert_eq!(scene.upload.pending_task_count(), 0);

    scene.set_frame_params(1);
    cmd.clear();
    scene.graph.run_frame(&mut cmd, 1).unwrap();
    assert_eq!(cmd.draw_count(), 5);
    assert_eq!(
        cmd.commands().iter().filter(|c| matches!(c, GfxRecordedCommand::UpdateBuffer { .. })).count(),
        3
    );
}

#[test]
fn test_commands_can_be_taken_each_frame() {
    let mut scene = Scene::new();
    let mut cmd = GfxRecordingCommandBuffer::new("frame");

    for frame_id in 0..3u64 {
        scene.set_frame_params(frame_id as usize % 3);
        scene.graph.run_frame(&mut cmd, frame_id).unwrap();
        let commands = cmd.take_commands();
        assert_eq!(
            commands.iter().filter(|c| matches!(c, GfxRecordedCommand::DrawIndexed { .. })).count(),
            5
        );
        assert!(cmd.commands().is_empty());
    }
}

#[test]
fn test_release_swapchain_on_resize() {
    let scene = Scene::new();
    let released = release_render_target(&scene.ctx, scene.swapchain).unwrap();
    assert_eq!(released.name(), "swapchain");
    assert!(!scene.ctx.resource_manager().contains(scene.swapchain));
    // 7 个 render target 仍然占用 rtv / dsv
    scene.ctx.heap_manager().with_unique_lock(|heaps| {
        assert_eq!(heaps.rtv_heap_allocator().allocated_count(), 5);
        assert_eq!(heaps.dsv_heap_allocator().allocated_count(), 2);
        assert_eq!(heaps.srv_heap_allocator().allocated_count(), 7);
    });
}
