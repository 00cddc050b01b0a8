//! UI 叠加层
//!
//! 把外部 UI 库生成的 draw list 绘制到 UI target 中，之后由合成 pass 叠加到场景上。

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

use crate::pass_base::RgPassBase;
use crate::render_target::{full_viewport, prepare_color_target, sampled_index};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UiDrawParams {
    /// 把 UI 坐标映射到 NDC
    pub scale: glam::Vec2,
    pub translate: glam::Vec2,
    pub texture_srv: u32,
    pub _padding: u32,
}

/// 一段使用相同纹理与裁剪矩形的索引
#[derive(Clone, Copy, Debug)]
pub struct UiDrawCmd {
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub clip_rect: vk::Rect2D,
    /// 必须是已注册、带 SRV 的 image
    pub texture: RgResourceHandle,
}

/// 一帧的 UI 绘制数据，顶点与索引已经上传到 GPU
#[derive(Clone, Debug)]
pub struct UiDrawList {
    pub vertex_buffer: RgResourceHandle,
    pub index_buffer: RgResourceHandle,
    /// UI 坐标系的尺寸
    pub display_size: glam::Vec2,
    pub commands: Vec<UiDrawCmd>,
}

#[derive(Default)]
struct UiOverlayFrameParams {
    draw_list: Option<UiDrawList>,
}

pub struct UiOverlayPass {
    ctx: RgFrameGraphContext,
    ui_target: RgResourceHandle,
    pipeline: Arc<GfxGraphicsPipeline>,
    params: RgFrameParams<UiOverlayFrameParams>,
}

// new & init
impl UiOverlayPass {
    pub fn new(ctx: &RgFrameGraphContext, ui_target: RgResourceHandle, pipeline: GfxGraphicsPipeline) -> Self {
        Self {
            ctx: ctx.clone(),
            ui_target,
            pipeline: Arc::new(pipeline),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl UiOverlayPass {
    /// 不设置时本帧只把 UI target 清空为透明
    pub fn set_draw_list(&self, draw_list: UiDrawList) {
        self.params.update(|p| p.draw_list = Some(draw_list));
    }
}

impl RgPassBase for UiOverlayPass {
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool {
        let ui_target = self.ui_target;
        let setup_params = self.params.clone();
        let execute_params = self.params.clone();
        let discard_params = self.params.clone();
        let pipeline = self.pipeline.clone();
        let resource_manager = self.ctx.resource_manager().clone();
        let heap_manager = self.ctx.heap_manager().clone();

        graph.add_pass_with_discard(
            RgPassId::of::<Self>(),
            move |builder| {
                builder.write(ui_target);
                setup_params.read(|p| {
                    if let Some(draw_list) = &p.draw_list {
                        builder.read(draw_list.vertex_buffer).read(draw_list.index_buffer);
                        for draw_cmd in &draw_list.commands {
                            builder.read(draw_cmd.texture);
                        }
                    }
                });
                true
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("UiOverlayPass::execute");
                let frame = execute_params.take();
                let cmd = pass_ctx.cmd();

                struct Resolved {
                    rtv: GfxDescriptorCpuHandle,
                    extent: vk::Extent2D,
                    buffers: Option<(vk::Buffer, vk::Buffer)>,
                    texture_srvs: Vec<u32>,
                }
                let resolved = resource_manager.with_lock(|resources| -> Option<Resolved> {
                    let (buffers, texture_srvs) = match &frame.draw_list {
                        Some(draw_list) => {
                            let vertex = resources.get_read_resource(draw_list.vertex_buffer, pass.read_token());
                            let index = resources.get_read_resource(draw_list.index_buffer, pass.read_token());
                            let buffers = (vertex.as_buffer()?.vk_buffer(), index.as_buffer()?.vk_buffer());
                            let texture_srvs = draw_list
                                .commands
                                .iter()
                                .map(|draw_cmd| sampled_index(resources, draw_cmd.texture, pass.read_token()))
                                .collect::<Option<Vec<_>>>()?;
                            (Some(buffers), texture_srvs)
                        }
                        None => (None, Vec::new()),
                    };
                    let (rtv, extent) = prepare_color_target(resources, ui_target, pass.write_token(), cmd)?;
                    Some(Resolved {
                        rtv,
                        extent,
                        buffers,
                        texture_srvs,
                    })
                });
                let Some(resolved) = resolved else {
                    log::error!("ui overlay target or draw list resources have the wrong kind");
                    return false;
                };

                heap_manager.with_unique_lock(|heaps| {
                    let rendering_info = GfxRenderingInfo::new(resolved.extent)
                        .color(heaps.rtv_heap().view(resolved.rtv), Some(glam::Vec4::ZERO));
                    cmd.cmd_begin_rendering(&rendering_info);
                    cmd.cmd_set_viewport(full_viewport(resolved.extent));

                    if let (Some(draw_list), Some((vertex_buffer, index_buffer))) = (&frame.draw_list, resolved.buffers) {
                        cmd.cmd_bind_pipeline(&pipeline);
                        cmd.cmd_bind_descriptor_heap(&pipeline, heaps.srv_heap());
                        cmd.cmd_bind_vertex_buffer(vertex_buffer, 0);
                        cmd.cmd_bind_index_buffer(index_buffer, 0, vk::IndexType::UINT16);

                        let scale = 2.0 / draw_list.display_size;
                        for (draw_cmd, &texture_srv) in draw_list.commands.iter().zip(&resolved.texture_srvs) {
                            if draw_cmd.index_count == 0 {
                                continue;
                            }
                            let params = UiDrawParams {
                                scale,
                                translate: glam::Vec2::splat(-1.0),
                                texture_srv,
                                _padding: 0,
                            };
                            cmd.cmd_set_scissor(draw_cmd.clip_rect);
                            cmd.cmd_push_constants(&pipeline, bytemuck::bytes_of(&params));
                            cmd.cmd_draw_indexed(draw_cmd.index_count, 1, draw_cmd.first_index, draw_cmd.vertex_offset, 0);
                        }
                    }
                    cmd.cmd_end_rendering();
                });

                resource_manager.with_lock(|resources| {
                    resources.transition_to(ui_target, pass.write_token(), cmd, GfxResourceState::SHADER_READ_FRAGMENT);
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
    use truvis_gfx::commands::recording_command_buffer::{GfxRecordedCommand, GfxRecordingCommandBuffer};

    use crate::render_target::RgRenderTargetUsage;
    use crate::test_utils::{add_buffer, add_target, count_commands, current_state};

    fn clip(x: i32, width: u32) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x, y: 0 },
            extent: vk::Extent2D { width, height: 16 },
        }
    }

    #[test]
    fn test_one_scissor_and_draw_per_command() {
        let ctx = RgFrameGraphContext::default();
        let ui_target = add_target(&ctx, 1, RgRenderTargetUsage::Color, 1);
        let font_atlas = add_target(&ctx, 2, RgRenderTargetUsage::Color, 1);
        let pipeline = GfxGraphicsPipeline::new(vk::Pipeline::from_raw(500), vk::PipelineLayout::from_raw(501));
        let pass = UiOverlayPass::new(&ctx, ui_target, pipeline);
        let mut graph = RenderGraph::new();
        assert!(pass.add_to_graph(&mut graph));

        pass.set_draw_list(UiDrawList {
            vertex_buffer: add_buffer(&ctx, 10),
            index_buffer: add_buffer(&ctx, 11),
            display_size: glam::vec2(64.0, 32.0),
            commands: vec![
                UiDrawCmd {
                    index_count: 6,
                    first_index: 0,
                    vertex_offset: 0,
                    clip_rect: clip(0, 32),
                    texture: font_atlas,
                },
                UiDrawCmd {
                    index_count: 0,
                    first_index: 6,
                    vertex_offset: 4,
                    clip_rect: clip(0, 8),
                    texture: font_atlas,
                },
                UiDrawCmd {
                    index_count: 12,
                    first_index: 6,
                    vertex_offset: 4,
                    clip_rect: clip(32, 32),
                    texture: font_atlas,
                },
            ],
        });

        let mut cmd = GfxRecordingCommandBuffer::new("ui");
        graph.run_frame(&mut cmd, 0).unwrap();

        // 空命令被跳过
        assert_eq!(cmd.draw_count(), 2);
        let scissors = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                GfxRecordedCommand::SetScissor(rect) => Some(rect.offset.x),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(scissors, vec![0, 32]);
        assert!(cmd.commands().iter().any(|c| matches!(
            c,
            GfxRecordedCommand::DrawIndexed {
                index_count: 12,
                first_index: 6,
                vertex_offset: 4,
                ..
            }
        )));

        // 字体纹理的 srv 下标是 1
        let pushed = cmd.commands().iter().find_map(|c| match c {
            GfxRecordedCommand::PushConstants(data) => Some(data.clone()),
            _ => None,
        });
        let params: UiDrawParams = bytemuck::pod_read_unaligned(&pushed.unwrap());
        assert_eq!(params.texture_srv, 1);
        assert_eq!(params.scale, glam::vec2(2.0 / 64.0, 2.0 / 32.0));

        assert_eq!(current_state(&ctx, ui_target), GfxResourceState::SHADER_READ_FRAGMENT);
        assert_eq!(current_state(&ctx, font_atlas), GfxResourceState::UNDEFINED);
    }

    #[test]
    fn test_without_draw_list_only_clears() {
        let ctx = RgFrameGraphContext::default();
        let ui_target = add_target(&ctx, 1, RgRenderTargetUsage::Color, 1);
        let pipeline = GfxGraphicsPipeline::new(vk::Pipeline::from_raw(500), vk::PipelineLayout::from_raw(501));
        let pass = UiOverlayPass::new(&ctx, ui_target, pipeline);
        let mut graph = RenderGraph::new();
        pass.add_to_graph(&mut graph);

        let mut cmd = GfxRecordingCommandBuffer::new("ui");
        graph.run_frame(&mut cmd, 0).unwrap();
        assert_eq!(cmd.draw_count(), 0);
        assert_eq!(count_commands(cmd.commands(), |c| matches!(c, GfxRecordedCommand::BindPipeline(_))), 0);
        assert_eq!(count_commands(cmd.commands(), |c| matches!(c, GfxRecordedCommand::BeginRendering(_))), 1);
    }
}
