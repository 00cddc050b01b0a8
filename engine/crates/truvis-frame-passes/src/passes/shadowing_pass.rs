//! 阴影图 pass
//!
//! 阴影图是一张深度 image，每个 array layer 对应一级 cascade。
//! 所有 cascade 在一次 rendering 中完成：每个 caster 以 cascade 数量作为 instance count 绘制，
//! 由 vertex shader 根据 instance index 选择 layer。

use std::sync::Arc;

use ash::vk;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::pass::frame_params::RgFrameParams;
use truvis_frame_graph::pass::pass_id::RgPassId;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_gfx::descriptors::descriptor_heap::GfxDescriptorCpuHandle;
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use truvis_gfx::pipelines::rendering_info::GfxRenderingInfo;
use truvis_gfx::resources::resource_state::GfxResourceState;

use crate::mesh_draw::{RgMeshDraw, RgResolvedMeshDraw};
use crate::pass_base::RgPassBase;
use crate::render_target::full_viewport;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowDrawParams {
    pub world: vk::DeviceAddress,
    /// 每级 cascade 一个矩阵
    pub light_view_proj: vk::DeviceAddress,
    pub cascade_count: u32,
    pub _padding: u32,
}

#[derive(Default)]
struct ShadowingFrameParams {
    casters: Vec<RgMeshDraw>,
    light_view_proj_buffer: Option<RgResourceHandle>,
}

pub struct ShadowingPass {
    ctx: RgFrameGraphContext,
    shadow_map: RgResourceHandle,
    pipeline: Arc<GfxGraphicsPipeline>,
    params: RgFrameParams<ShadowingFrameParams>,
}

// new & init
impl ShadowingPass {
    pub fn new(ctx: &RgFrameGraphContext, shadow_map: RgResourceHandle, pipeline: GfxGraphicsPipeline) -> Self {
        Self {
            ctx: ctx.clone(),
            shadow_map,
            pipeline: Arc::new(pipeline),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl ShadowingPass {
    pub fn add_shadow_caster(&self, mesh: RgMeshDraw) {
        self.params.update(|p| p.casters.push(mesh));
    }

    pub fn set_light_view_proj_buffer(&self, buffer: RgResourceHandle) {
        self.params.update(|p| p.light_view_proj_buffer = Some(buffer));
    }
}

impl RgPassBase for ShadowingPass {
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool {
        let shadow_map = self.shadow_map;
        let setup_params = self.params.clone();
        let execute_params = self.params.clone();
        let discard_params = self.params.clone();
        let pipeline = self.pipeline.clone();
        let resource_manager = self.ctx.resource_manager().clone();
        let heap_manager = self.ctx.heap_manager().clone();

        graph.add_pass_with_discard(
            RgPassId::of::<Self>(),
            move |builder| {
                builder.write(shadow_map);
                setup_params.read(|p| {
                    if p.casters.is_empty() {
                        return true;
                    }
                    let Some(light) = p.light_view_proj_buffer else {
                        log::error!("shadowing pass has {} casters but no light buffer", p.casters.len());
                        return false;
                    };
                    builder.read(light);
                    p.casters.iter().for_each(|caster| caster.declare_reads(builder));
                    true
                })
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("ShadowingPass::execute");
                let frame = execute_params.take();
                let cmd = pass_ctx.cmd();

                type Resolved = (u32, vk::Extent2D, GfxDescriptorCpuHandle, vk::DeviceAddress, Vec<RgResolvedMeshDraw>);
                let resolved = resource_manager.with_lock(|resources| -> Option<Resolved> {
                    let layers = resources.get_write_resource(shadow_map, pass.write_token()).as_image()?.array_layers();
                    resources.transition_to_with_count(
                        shadow_map,
                        pass.write_token(),
                        cmd,
                        GfxResourceState::DEPTH_ATTACHMENT_WRITE,
                        layers,
                    );
                    let image = resources.get_write_resource(shadow_map, pass.write_token()).as_image()?;
                    let (extent, dsv) = (image.extent(), image.views().dsv?);

                    let light = match frame.light_view_proj_buffer {
                        Some(h) => resources.get_read_resource(h, pass.read_token()).as_buffer()?.device_address(),
                        None => 0,
                    };
                    let casters = frame
                        .casters
                        .iter()
                        .map(|caster| caster.resolve(resources, pass.read_token()))
                        .collect::<Option<Vec<_>>>()?;
                    Some((layers, extent, dsv, light, casters))
                });
                let Some((layers, extent, dsv, light, casters)) = resolved else {
                    log::error!("shadow map is not a depth image or a caster is not a buffer");
                    return false;
                };

                heap_manager.with_unique_lock(|heaps| {
                    let rendering_info = GfxRenderingInfo::new(extent).depth(heaps.dsv_heap().view(dsv), Some((1.0, 0)));
                    cmd.cmd_begin_rendering(&rendering_info);
                    cmd.cmd_set_viewport(full_viewport(extent));
                    cmd.cmd_set_scissor(rendering_info.render_area);

                    if !casters.is_empty() {
                        cmd.cmd_bind_pipeline(&pipeline);
                        for caster in &casters {
                            let params = ShadowDrawParams {
                                world: caster.world_address,
                                light_view_proj: light,
                                cascade_count: layers,
                                _padding: 0,
                            };
                            cmd.cmd_push_constants(&pipeline, bytemuck::bytes_of(&params));
                            cmd.cmd_bind_vertex_buffer(caster.vertex_buffer, 0);
                            cmd.cmd_bind_index_buffer(caster.index_buffer, 0, vk::IndexType::UINT32);
                            cmd.cmd_draw_indexed(caster.index_count, layers, 0, 0, 0);
                        }
                    }
                    cmd.cmd_end_rendering();
                });

                resource_manager.with_lock(|resources| {
                    resources.transition_to_with_count(
                        shadow_map,
                        pass.write_token(),
                        cmd,
                        GfxResourceState::DEPTH_READ_FRAGMENT,
                        layers,
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

    use crate::mesh_draw::RgMaterialType;
    use crate::render_target::RgRenderTargetUsage;
    use crate::test_utils::{add_buffer, add_target, current_state};

    fn shadowing(ctx: &RgFrameGraphContext) -> (ShadowingPass, RgResourceHandle) {
        let shadow_map = add_target(ctx, 7, RgRenderTargetUsage::Depth, 4);
        let pipeline = GfxGraphicsPipeline::new(vk::Pipeline::from_raw(300), vk::PipelineLayout::from_raw(301));
        (ShadowingPass::new(ctx, shadow_map, pipeline), shadow_map)
    }

    #[test]
    fn test_casters_drawn_once_per_cascade() {
        let ctx = RgFrameGraphContext::default();
        let (pass, shadow_map) = shadowing(&ctx);
        let mut graph = RenderGraph::new();
        assert!(pass.add_to_graph(&mut graph));

        pass.set_light_view_proj_buffer(add_buffer(&ctx, 40));
        pass.add_shadow_caster(RgMeshDraw {
            vertex_buffer: add_buffer(&ctx, 10),
            index_buffer: add_buffer(&ctx, 11),
            index_count: 6,
            world_buffer: add_buffer(&ctx, 12),
            material_type: RgMaterialType(0),
        });

        let mut cmd = GfxRecordingCommandBuffer::new("shadow");
        graph.run_frame(&mut cmd, 0).unwrap();

        let instances = cmd.commands().iter().find_map(|c| match c {
            GfxRecordedCommand::DrawIndexed { instance_count, .. } => Some(*instance_count),
            _ => None,
        });
        assert_eq!(instances, Some(4));

        // barrier 覆盖所有 cascade
        let layer_counts = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                GfxRecordedCommand::ImageBarrier { layer_count, .. } => Some(*layer_count),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(layer_counts, vec![4, 4]);
        assert_eq!(current_state(&ctx, shadow_map), GfxResourceState::DEPTH_READ_FRAGMENT);
    }

    #[test]
    fn test_no_casters_still_clears() {
        let ctx = RgFrameGraphContext::default();
        let (pass, _) = shadowing(&ctx);
        let mut graph = RenderGraph::new();
        pass.add_to_graph(&mut graph);

        let mut cmd = GfxRecordingCommandBuffer::new("shadow");
        graph.run_frame(&mut cmd, 0).unwrap();
        assert_eq!(cmd.draw_count(), 0);
        assert!(cmd.commands().iter().any(|c| matches!(c, GfxRecordedCommand::BeginRendering(_))));
    }

    #[test]
    fn test_casters_without_light_fail_setup() {
        let ctx = RgFrameGraphContext::default();
        let (pass, _) = shadowing(&ctx);
        let mut graph = RenderGraph::new();
        pass.add_to_graph(&mut graph);

        pass.add_shadow_caster(RgMeshDraw {
            vertex_buffer: add_buffer(&ctx, 10),
            index_buffer: add_buffer(&ctx, 11),
            index_count: 6,
            world_buffer: add_buffer(&ctx, 12),
            material_type: RgMaterialType(0),
        });
        let mut cmd = GfxRecordingCommandBuffer::new("shadow");
        assert!(matches!(graph.run_frame(&mut cmd, 0), Err(RgError::SetupFailed(_))));
    }
}
