use ash::vk;

use crate::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::descriptors::descriptor_heap::GfxDescriptorHeap;
use crate::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use crate::pipelines::rendering_info::GfxRenderingInfo;

/// 命令录制接口
///
/// pass 只通过该 trait 录制命令，因此既可以录制到真实的 [`super::command_buffer::GfxCommandBuffer`]，
/// 也可以录制到内存中的 [`super::recording_command_buffer::GfxRecordingCommandBuffer`]。
///
/// 命令的提交顺序与录制顺序一致。
pub trait GfxCommandRecorder {
    /// 录制器名称，用于日志
    fn name(&self) -> &str;

    // ============ 同步 ============

    /// - command type: synchronize
    fn cmd_pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]);

    // ============ debug ============

    fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4);

    fn end_label(&mut self);

    // ============ 绘制 ============

    /// - command type: action, state
    fn cmd_begin_rendering(&mut self, rendering_info: &GfxRenderingInfo);

    fn cmd_end_rendering(&mut self);

    /// - command type: state
    fn cmd_set_viewport(&mut self, viewport: vk::Viewport);

    /// - command type: state
    fn cmd_set_scissor(&mut self, scissor: vk::Rect2D);

    /// - command type: state
    fn cmd_bind_pipeline(&mut self, pipeline: &GfxGraphicsPipeline);

    /// 绑定 shader resource heap 对应的 bindless descriptor set
    fn cmd_bind_descriptor_heap(&mut self, pipeline: &GfxGraphicsPipeline, heap: &GfxDescriptorHeap);

    /// - command type: state
    fn cmd_push_constants(&mut self, pipeline: &GfxGraphicsPipeline, data: &[u8]);

    /// - command type: state
    fn cmd_bind_vertex_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize);

    /// - command type: state
    fn cmd_bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);

    /// - command type: action
    fn cmd_draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// - command type: action
    fn cmd_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    // ============ 数据传输 ============

    /// - command type: action
    fn cmd_copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]);

    /// 将 data 写入 buffer，大小限制 65536 Bytes，offset 与 data 长度都必须是 4 的倍数，需要在 rendering 之外调用
    fn cmd_update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]);
}

/// `vkCmdUpdateBuffer` 的合法性：非空、不超过 64KB、offset 与长度 4 字节对齐
pub fn is_valid_update_range(offset: vk::DeviceSize, data: &[u8]) -> bool {
    !data.is_empty() && data.len() <= 65536 && offset % 4 == 0 && data.len() % 4 == 0
}
