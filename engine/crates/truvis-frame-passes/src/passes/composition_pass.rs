//! 最终合成
//!
//! 把场景颜色与 UI 叠加后写入本帧 acquire 到的 swapchain image，结束时 swapchain 回到 PRESENT 状态。

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

use crate::full_screen_triangle::RgFullScreenTriangle;
use crate::pass_base::RgPassBase;
use crate::render_target::{full_viewport, prepare_color_target, sampled_index};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositionParams {
    pub scene_srv: u32,
    pub ui_srv: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct CompositionInputs {
    pub scene: RgResourceHandle,
    pub ui: RgResourceHandle,
    pub triangle: RgFullScreenTriangle,
}

#[derive(Clone, Copy, Debug)]
struct SwapchainTarget {
    handle: RgResourceHandle,
    image_index: usize,
}

#[derive(Default)]
struct CompositionFrameParams {
    target: Option<SwapchainTarget>,
}

pub struct CompositionPass {
    ctx: RgFrameGraphContext,
    inputs: CompositionInputs,
    pipeline: Arc<GfxGraphicsPipeline>,
    params: RgFrameParams<CompositionFrameParams>,
}

// new & init
impl CompositionPass {
    pub fn new(ctx: &RgFrameGraphContext, inputs: CompositionInputs, pipeline: GfxGraphicsPipeline) -> Self {
        Self {
            ctx: ctx.clone(),
            inputs,
            pipeline: Arc::new(pipeline),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl CompositionPass {
    /// 本帧写入的 swapchain 以及 acquire 得到的 image 下标
    ///
    /// 每帧必须设置，否则 setup 失败
    pub fn set_target_swapchain(&self, swapchain: RgResourceHandle, image_index: usize) {
        self.params.update(|p| {
            p.target = Some(SwapchainTarget {
                handle: swapchain,
                image_index,
            })
        });
    }
}

impl RgPassBase for CompositionPass {
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool {
        let inputs = self.inputs;
        let setup_params = self.params.clone();
        let execute_params = self.params.clone();
        let discard_params = self.params.clone();
        let pipeline = self.pipeline.clone();
        let resource_manager = self.ctx.resource_manager().clone();
        let heap_manager = self.ctx.heap_manager().clone();

        graph.add_pass_with_discard(
            RgPassId::of::<Self>(),
            move |builder| {
                let Some(target) = setup_params.read(|p| p.target) else {
                    log::error!("composition pass has no swapchain target this frame");
                    return false;
                };
                builder.read(inputs.scene).read(inputs.ui).write(target.handle);
                inputs.triangle.declare_reads(builder);
                true
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("CompositionPass::execute");
                let frame = execute_params.take();
                let Some(target) = frame.target else {
                    return false;
                };
                let cmd = pass_ctx.cmd();

                type Resolved = (CompositionParams, (vk::Buffer, vk::Buffer), GfxDescriptorCpuHandle, vk::Extent2D);
                let resolved = resource_manager.with_lock(|resources| -> Option<Resolved> {
                    let params = CompositionParams {
                        scene_srv: sampled_index(resources, inputs.scene, pass.read_token())?,
                        ui_srv: sampled_index(resources, inputs.ui, pass.read_token())?,
                    };
                    let triangle = inputs.triangle.resolve(resources, pass.read_token())?;

                    let swapchain = resources.get_write_resource(target.handle, pass.write_token()).as_swapchain_mut()?;
                    if target.image_index >= swapchain.image_count() {
                        log::error!(
                            "swapchain image {} out of range ({} images)",
                            target.image_index,
                            swapchain.image_count()
                        );
                        return None;
                    }
                    swapchain.acquire(target.image_index);

                    let (rtv, extent) = prepare_color_target(resources, target.handle, pass.write_token(), cmd)?;
                    Some((params, triangle, rtv, extent))
                });
                let Some((params, triangle, rtv, extent)) = resolved else {
                    log::error!("composition inputs or swapchain target are invalid");
                    return false;
                };

                heap_manager.with_unique_lock(|heaps| {
                    let rendering_info = GfxRenderingInfo::new(extent).color(heaps.rtv_heap().view(rtv), None);
                    cmd.cmd_begin_rendering(&rendering_info);
                    cmd.cmd_set_viewport(full_viewport(extent));
                    cmd.cmd_set_scissor(rendering_info.render_area);
                    cmd.cmd_bind_pipeline(&pipeline);
                    cmd.cmd_bind_descriptor_heap(&pipeline, heaps.srv_heap());
                    cmd.cmd_push_constants(&pipeline, bytemuck::bytes_of(&params));
                    RgFullScreenTriangle::draw(cmd, triangle);
                    cmd.cmd_end_rendering();
                });

                resource_manager.with_lock(|resources| {
                    resources.transition_to(target.handle, pass.write_token(), cmd, GfxResourceState::PRESENT);
                });
                true
            },
            move || discard_params.reset(),
        )
    }
}
