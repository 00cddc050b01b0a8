//! 阴影合成
//!
//! 以 G-buffer 的法线、深度以及阴影图为输入，用全屏三角形计算每个像素的阴影遮蔽，写入阴影合成 target。

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

/// 输入纹理以 bindless 下标传入
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowCompositionParams {
    pub light: vk::DeviceAddress,
    pub normal_srv: u32,
    pub depth_srv: u32,
    pub shadow_map_srv: u32,
    pub _padding: u32,
}

/// 创建时确定的输入输出
#[derive(Clone, Copy, Debug)]
pub struct ShadowCompositionInputs {
    pub gbuffer_normal: RgResourceHandle,
    pub gbuffer_depth: RgResourceHandle,
    pub shadow_map: RgResourceHandle,
    pub output: RgResourceHandle,
    pub triangle: RgFullScreenTriangle,
}

#[derive(Default)]
struct ShadowCompositionFrameParams {
    light_buffer: Option<RgResourceHandle>,
}

pub struct ShadowCompositionPass {
    ctx: RgFrameGraphContext,
    inputs: ShadowCompositionInputs,
    pipeline: Arc<GfxGraphicsPipeline>,
    params: RgFrameParams<ShadowCompositionFrameParams>,
}

// new & init
impl ShadowCompositionPass {
    pub fn new(ctx: &RgFrameGraphContext, inputs: ShadowCompositionInputs, pipeline: GfxGraphicsPipeline) -> Self {
        Self {
            ctx: ctx.clone(),
            inputs,
            pipeline: Arc::new(pipeline),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl ShadowCompositionPass {
    /// 本帧必须设置，否则 setup 失败
    pub fn set_light_buffer(&self, buffer: RgResourceHandle) {
        self.params.update(|p| p.light_buffer = Some(buffer));
    }
}

impl RgPassBase for ShadowCompositionPass {
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
                let Some(light) = setup_params.read(|p| p.light_buffer) else {
                    log::error!("shadow composition needs a light buffer every frame");
                    return false;
                };
                builder
                    .read(inputs.gbuffer_normal)
                    .read(inputs.gbuffer_depth)
                    .read(inputs.shadow_map)
                    .read(light)
                    .write(inputs.output);
                inputs.triangle.declare_reads(builder);
                true
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("ShadowCompositionPass::execute");
                let frame = execute_params.take();
                let cmd = pass_ctx.cmd();

                type Resolved = (ShadowCompositionParams, (vk::Buffer, vk::Buffer), GfxDescriptorCpuHandle, vk::Extent2D);
                let resolved = resource_manager.with_lock(|resources| -> Option<Resolved> {
                    let light = resources.get_read_resource(frame.light_buffer?, pass.read_token()).as_buffer()?;
                    let mut params = ShadowCompositionParams {
                        light: light.device_address(),
                        ..Default::default()
                    };
                    params.normal_srv = sampled_index(resources, inputs.gbuffer_normal, pass.read_token())?;
                    params.depth_srv = sampled_index(resources, inputs.gbuffer_depth, pass.read_token())?;
                    params.shadow_map_srv = sampled_index(resources, inputs.shadow_map, pass.read_token())?;
                    let triangle = inputs.triangle.resolve(resources, pass.read_token())?;

                    let (rtv, extent) = prepare_color_target(resources, inputs.output, pass.write_token(), cmd)?;
                    Some((params, triangle, rtv, extent))
                });
                let Some((params, triangle, rtv, extent)) = resolved else {
                    log::error!("shadow composition inputs are missing their views or have the wrong kind");
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
                    resources.transition_to(inputs.output, pass.write_token(), cmd, GfxResourceState::SHADER_READ_FRAGMENT);
                });
                true
            },
            move || discard_params.reset(),
        )
    }
}
