//! G-buffer pass
//!
//! 把本帧的 mesh 绘制到多个 G-buffer 以及深度图中，结束后切换到采样状态供合成 pass 读取。

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use itertools::Itertools;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::pass::frame_params::RgFrameParams;
use truvis_frame_graph::pass::pass_id::RgPassId;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_gfx::descriptors::descriptor_heap::GfxDescriptorCpuHandle;
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use truvis_gfx::pipelines::rendering_info::GfxRenderingInfo;
use truvis_gfx::resources::resource_state::GfxResourceState;

use crate::mesh_draw::{RgMaterialType, RgMeshDraw, RgResolvedMeshDraw};
use crate::pass_base::RgPassBase;
use crate::render_target::{full_viewport, prepare_color_target};

/// 绑定管线时直接传入的绘制参数
///
/// 以 push constant 的形式提交，字段均为 buffer device address
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GeometryDrawParams {
    pub world: vk::DeviceAddress,
    pub view_proj: vk::DeviceAddress,
}

/// G-buffer 与深度图，创建 pass 时确定
#[derive(Clone, Debug)]
pub struct GeometryTargets {
    pub gbuffers: Vec<RgResourceHandle>,
    pub depth_stencil: RgResourceHandle,
    pub clear_color: glam::Vec4,
}

#[derive(Default)]
struct GeometryFrameParams {
    meshes: Vec<RgMeshDraw>,
    view_proj_buffer: Option<RgResourceHandle>,
    viewport: Option<vk::Viewport>,
    scissor: Option<vk::Rect2D>,
}

pub struct GeometryPass {
    ctx: RgFrameGraphContext,
    targets: Arc<GeometryTargets>,
    pipelines: Arc<HashMap<RgMaterialType, GfxGraphicsPipeline>>,
    params: RgFrameParams<GeometryFrameParams>,
}

// new & init
impl GeometryPass {
    pub fn new(
        ctx: &RgFrameGraphContext,
        targets: GeometryTargets,
        pipelines: HashMap<RgMaterialType, GfxGraphicsPipeline>,
    ) -> Self {
        assert!(!targets.gbuffers.is_empty(), "geometry pass needs at least one gbuffer");
        Self {
            ctx: ctx.clone(),
            targets: Arc::new(targets),
            pipelines: Arc::new(pipelines),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl GeometryPass {
    pub fn add_draw_mesh(&self, mesh: RgMeshDraw) {
        self.params.update(|p| p.meshes.push(mesh));
    }

    pub fn set_view_proj_buffer(&self, buffer: RgResourceHandle) {
        self.params.update(|p| p.view_proj_buffer = Some(buffer));
    }

    /// 不设置时使用 G-buffer 的尺寸
    pub fn set_viewport(&self, viewport: vk::Viewport) {
        self.params.update(|p| p.viewport = Some(viewport));
    }

    /// 不设置时使用 G-buffer 的尺寸
    pub fn set_scissor(&self, scissor: vk::Rect2D) {
        self.params.update(|p| p.scissor = Some(scissor));
    }
}

impl RgPassBase for GeometryPass {
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool {
        let setup_params = self.params.clone();
        let setup_targets = self.targets.clone();
        let execute_params = self.params.clone();
        let discard_params = self.params.clone();
        let targets = self.targets.clone();
        let pipelines = self.pipelines.clone();
        let resource_manager = self.ctx.resource_manager().clone();
        let heap_manager = self.ctx.heap_manager().clone();

        graph.add_pass_with_discard(
            RgPassId::of::<Self>(),
            move |builder| {
                setup_targets.gbuffers.iter().for_each(|h| {
                    builder.write(*h);
                });
                builder.write(setup_targets.depth_stencil);

                setup_params.read(|p| {
                    if !p.meshes.is_empty() {
                        let Some(view_proj) = p.view_proj_buffer else {
                            log::error!("geometry pass has {} meshes but no view-proj buffer", p.meshes.len());
                            return false;
                        };
                        builder.read(view_proj);
                    }
                    p.meshes.iter().for_each(|mesh| mesh.declare_reads(builder));
                    true
                })
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("GeometryPass::execute");
                let frame = execute_params.take();
                let cmd = pass_ctx.cmd();

                // 切换 attachment 状态，并在锁内解析出录制需要的对象
                struct Resolved {
                    rtvs: Vec<GfxDescriptorCpuHandle>,
                    dsv: GfxDescriptorCpuHandle,
                    extent: vk::Extent2D,
                    view_proj: vk::DeviceAddress,
                    draws: Vec<RgResolvedMeshDraw>,
                }
                let resolved = resource_manager.with_lock(|resources| -> Option<Resolved> {
                    let write_token = pass.write_token();
                    let mut rtvs = Vec::with_capacity(targets.gbuffers.len());
                    let mut extent = vk::Extent2D::default();
                    for &gbuffer in &targets.gbuffers {
                        let (rtv, gbuffer_extent) = prepare_color_target(resources, gbuffer, write_token, cmd)?;
                        extent = gbuffer_extent;
                        rtvs.push(rtv);
                    }

                    resources.transition_to(
                        targets.depth_stencil,
                        write_token,
                        cmd,
                        GfxResourceState::DEPTH_ATTACHMENT_WRITE,
                    );
                    let dsv = resources.get_write_resource(targets.depth_stencil, write_token).as_image()?.views().dsv?;

                    let view_proj = match frame.view_proj_buffer {
                        Some(h) => resources.get_read_resource(h, pass.read_token()).as_buffer()?.device_address(),
                        None => 0,
                    };
                    let draws = frame
                        .meshes
                        .iter()
                        .map(|mesh| mesh.resolve(resources, pass.read_token()))
                        .collect::<Option<Vec<_>>>()?;

                    Some(Resolved {
                        rtvs,
                        dsv,
                        extent,
                        view_proj,
                        draws,
                    })
                });
                let Some(resolved) = resolved else {
                    log::error!("geometry pass targets or meshes have the wrong resource kind or missing views");
                    return false;
                };

                heap_manager.with_unique_lock(|heaps| {
                    let mut rendering_info = GfxRenderingInfo::new(resolved.extent);
                    for &rtv in &resolved.rtvs {
                        rendering_info = rendering_info.color(heaps.rtv_heap().view(rtv), Some(targets.clear_color));
                    }
                    rendering_info = rendering_info.depth(heaps.dsv_heap().view(resolved.dsv), Some((1.0, 0)));

                    cmd.cmd_begin_rendering(&rendering_info);
                    cmd.cmd_set_viewport(frame.viewport.unwrap_or(full_viewport(resolved.extent)));
                    cmd.cmd_set_scissor(frame.scissor.unwrap_or(rendering_info.render_area));

                    // 同一材质的 mesh 连续绘制，减少管线切换
                    for (material_type, draws) in
                        &resolved.draws.iter().sorted_by_key(|d| d.material_type.0).group_by(|d| d.material_type)
                    {
                        let Some(pipeline) = pipelines.get(&material_type) else {
                            log::warn!("no pipeline for material type {}, skip its meshes", material_type.0);
                            continue;
                        };
                        cmd.cmd_bind_pipeline(pipeline);
                        cmd.cmd_bind_descriptor_heap(pipeline, heaps.srv_heap());
                        for draw in draws {
                            let params = GeometryDrawParams {
                                world: draw.world_address,
                                view_proj: resolved.view_proj,
                            };
                            cmd.cmd_push_constants(pipeline, bytemuck::bytes_of(&params));
                            cmd.cmd_bind_vertex_buffer(draw.vertex_buffer, 0);
                            cmd.cmd_bind_index_buffer(draw.index_buffer, 0, vk::IndexType::UINT32);
                            cmd.cmd_draw_indexed(draw.index_count, 1, 0, 0, 0);
                        }
                    }
                    cmd.cmd_end_rendering();
                });

                resource_manager.with_lock(|resources| {
                    let write_token = pass.write_token();
                    for &gbuffer in &targets.gbuffers {
                        resources.transition_to(gbuffer, write_token, cmd, GfxResourceState::SHADER_READ_FRAGMENT);
                    }
                    resources.transition_to(
                        targets.depth_stencil,
                        write_token,
                        cmd,
                        GfxResourceState::DEPTH_READ_FRAGMENT,
                    );
                });
                true
            },
            move || discard_params.reset(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use truvis_frame_graph::error::RgError;
    use truvis_gfx::commands::recording_command_buffer::{GfxRecordedCommand, GfxRecordingCommandBuffer};

    use crate::render_target::RgRenderTargetUsage;
    use crate::test_utils::{add_buffer, add_target, count_commands, current_state};

    fn mesh(ctx: &RgFrameGraphContext, raw: u64, material: u32) -> RgMeshDraw {
        RgMeshDraw {
            vertex_buffer: add_buffer(ctx, raw),
            index_buffer: add_buffer(ctx, raw + 1),
            index_count: 36,
            world_buffer: add_buffer(ctx, raw + 2),
            material_type: RgMaterialType(material),
        }
    }

    fn pass(ctx: &RgFrameGraphContext) -> (GeometryPass, Vec<RgResourceHandle>, RgResourceHandle) {
        let gbuffers = vec![
            add_target(ctx, 1, RgRenderTargetUsage::Color, 1),
            add_target(ctx, 2, RgRenderTargetUsage::Color, 1),
        ];
        let depth = add_target(ctx, 3, RgRenderTargetUsage::Depth, 1);
        let pipelines = HashMap::from([
            (
                RgMaterialType(0),
                GfxGraphicsPipeline::new(vk::Pipeline::from_raw(100), vk::PipelineLayout::from_raw(200)),
            ),
            (
                RgMaterialType(1),
                GfxGraphicsPipeline::new(vk::Pipeline::from_raw(101), vk::PipelineLayout::from_raw(201)),
            ),
        ]);
        let targets = GeometryTargets {
            gbuffers: gbuffers.clone(),
            depth_stencil: depth,
            clear_color: glam::Vec4::ZERO,
        };
        (GeometryPass::new(ctx, targets, pipelines), gbuffers, depth)
    }

    #[test]
    fn test_draws_grouped_by_material() {
        let ctx = RgFrameGraphContext::default();
        let (geometry, gbuffers, depth) = pass(&ctx);
        let mut graph = RenderGraph::new();
        assert!(geometry.add_to_graph(&mut graph));

        let view_proj = add_buffer(&ctx, 50);
        geometry.set_view_proj_buffer(view_proj);
        geometry.add_draw_mesh(mesh(&ctx, 10, 1));
        geometry.add_draw_mesh(mesh(&ctx, 20, 0));
        geometry.add_draw_mesh(mesh(&ctx, 30, 1));

        let mut cmd = GfxRecordingCommandBuffer::new("geometry");
        graph.run_frame(&mut cmd, 0).unwrap();

        assert_eq!(cmd.draw_count(), 3);
        let pipelines = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                GfxRecordedCommand::BindPipeline(p) => Some(p.as_raw()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(pipelines, vec![100, 101]);

        // 第一个 draw 属于材质 0，push constant 是其 world buffer 与相机的地址
        let first_push = cmd.commands().iter().find_map(|c| match c {
            GfxRecordedCommand::PushConstants(data) => Some(data.clone()),
            _ => None,
        });
        let expected = GeometryDrawParams {
            world: 22 << 12,
            view_proj: 50 << 12,
        };
        assert_eq!(first_push.unwrap(), bytemuck::bytes_of(&expected));

        let rendering = cmd.commands().iter().find_map(|c| match c {
            GfxRecordedCommand::BeginRendering(info) => Some(info.clone()),
            _ => None,
        });
        let rendering = rendering.unwrap();
        assert_eq!(rendering.color_attachments.len(), 2);
        assert!(rendering.depth_attachment.is_some());

        // attachment 进出各一次 barrier
        assert_eq!(cmd.barrier_count(), 6);
        for gbuffer in gbuffers {
            assert_eq!(current_state(&ctx, gbuffer), GfxResourceState::SHADER_READ_FRAGMENT);
        }
        assert_eq!(current_state(&ctx, depth), GfxResourceState::DEPTH_READ_FRAGMENT);
    }

    #[test]
    fn test_meshes_without_camera_fail_setup() {
        let ctx = RgFrameGraphContext::default();
        let (geometry, _, _) = pass(&ctx);
        let mut graph = RenderGraph::new();
        geometry.add_to_graph(&mut graph);

        geometry.add_draw_mesh(mesh(&ctx, 10, 0));
        let mut cmd = GfxRecordingCommandBuffer::new("geometry");
        assert!(matches!(graph.run_frame(&mut cmd, 0), Err(RgError::SetupFailed(_))));
    }

    #[test]
    fn test_unknown_material_is_skipped() {
        let ctx = RgFrameGraphContext::default();
        let (geometry, _, _) = pass(&ctx);
        let mut graph = RenderGraph::new();
        geometry.add_to_graph(&mut graph);

        geometry.set_view_proj_buffer(add_buffer(&ctx, 50));
        geometry.add_draw_mesh(mesh(&ctx, 10, 7));
        geometry.add_draw_mesh(mesh(&ctx, 20, 0));
        let mut cmd = GfxRecordingCommandBuffer::new("geometry");
        graph.run_frame(&mut cmd, 0).unwrap();
        assert_eq!(cmd.draw_count(), 1);

        // 参数已被取走，下一帧只清屏
        cmd.clear();
        graph.run_frame(&mut cmd, 1).unwrap();
        assert_eq!(cmd.draw_count(), 0);
        assert_eq!(count_commands(cmd.commands(), |c| matches!(c, GfxRecordedCommand::BeginRendering(_))), 1);
    }
}
