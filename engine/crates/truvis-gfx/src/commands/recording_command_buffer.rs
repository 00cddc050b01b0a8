use ash::vk;

use crate::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::commands::command_recorder::{GfxCommandRecorder, is_valid_update_range};
use crate::descriptors::descriptor_heap::GfxDescriptorHeap;
use crate::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use crate::pipelines::rendering_info::GfxRenderingInfo;

/// 被录制下来的一条命令
#[derive(Clone, Debug)]
pub enum GfxRecordedCommand {
    ImageBarrier {
        image: vk::Image,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage: vk::PipelineStageFlags2,
        dst_stage: vk::PipelineStageFlags2,
        layer_count: u32,
    },
    BufferBarrier {
        buffer: vk::Buffer,
        src_stage: vk::PipelineStageFlags2,
        dst_stage: vk::PipelineStageFlags2,
        size: vk::DeviceSize,
    },
    BeginLabel(String),
    EndLabel,
    BeginRendering(GfxRenderingInfo),
    EndRendering,
    SetViewport(vk::Viewport),
    SetScissor(vk::Rect2D),
    BindPipeline(vk::Pipeline),
    BindDescriptorSet(vk::DescriptorSet),
    PushConstants(Vec<u8>),
    BindVertexBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    },
    BindIndexBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
    },
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: Vec<vk::BufferCopy>,
    },
    UpdateBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        data: Vec<u8>,
    },
}

/// 内存中的命令录制器
///
/// 不依赖 GPU 设备，按顺序保存所有命令。用于测试以及 headless 模式下检查一帧录制了什么。
pub struct GfxRecordingCommandBuffer {
    name: String,
    commands: Vec<GfxRecordedCommand>,
    label_depth: usize,
}

// new & init
impl GfxRecordingCommandBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            label_depth: 0,
        }
    }
}

// getters
impl GfxRecordingCommandBuffer {
    #[inline]
    pub fn commands(&self) -> &[GfxRecordedCommand] {
        &self.commands
    }

    /// 当前未闭合的 debug label 层数
    #[inline]
    pub fn label_depth(&self) -> usize {
        self.label_depth
    }
}

// tools
impl GfxRecordingCommandBuffer {
    /// 取出已录制的命令，录制器被清空
    pub fn take_commands(&mut self) -> Vec<GfxRecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.label_depth = 0;
    }

    pub fn barrier_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GfxRecordedCommand::ImageBarrier { .. } | GfxRecordedCommand::BufferBarrier { .. }))
            .count()
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GfxRecordedCommand::Draw { .. } | GfxRecordedCommand::DrawIndexed { .. }))
            .count()
    }
}

impl GfxCommandRecorder for GfxRecordingCommandBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn cmd_pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]) {
        for barrier in image_barriers.iter().map(GfxImageBarrier::inner) {
            self.commands.push(GfxRecordedCommand::ImageBarrier {
                image: barrier.image,
                old_layout: barrier.old_layout,
                new_layout: barrier.new_layout,
                src_stage: barrier.src_stage_mask,
                dst_stage: barrier.dst_stage_mask,
                layer_count: barrier.subresource_range.layer_count,
            });
        }
        for barrier in buffer_barriers.iter().map(GfxBufferBarrier::inner) {
            self.commands.push(GfxRecordedCommand::BufferBarrier {
                buffer: barrier.buffer,
                src_stage: barrier.src_stage_mask,
                dst_stage: barrier.dst_stage_mask,
                size: barrier.size,
            });
        }
    }

    fn begin_label(&mut self, label_name: &str, _label_color: glam::Vec4) {
        self.label_depth += 1;
        self.commands.push(GfxRecordedCommand::BeginLabel(label_name.to_string()));
    }

    fn end_label(&mut self) {
        assert!(self.label_depth > 0, "end_label without matching begin_label");
        self.label_depth -= 1;
        self.commands.push(GfxRecordedCommand::EndLabel);
    }

    fn cmd_begin_rendering(&mut self, rendering_info: &GfxRenderingInfo) {
        self.commands.push(GfxRecordedCommand::BeginRendering(rendering_info.clone()));
    }

    fn cmd_end_rendering(&mut self) {
        self.commands.push(GfxRecordedCommand::EndRendering);
    }

    fn cmd_set_viewport(&mut self, viewport: vk::Viewport) {
        self.commands.push(GfxRecordedCommand::SetViewport(viewport));
    }

    fn cmd_set_scissor(&mut self, scissor: vk::Rect2D) {
        self.commands.push(GfxRecordedCommand::SetScissor(scissor));
    }

    fn cmd_bind_pipeline(&mut self, pipeline: &GfxGraphicsPipeline) {
        self.commands.push(GfxRecordedCommand::BindPipeline(pipeline.pipeline()));
    }

    fn cmd_bind_descriptor_heap(&mut self, _pipeline: &GfxGraphicsPipeline, heap: &GfxDescriptorHeap) {
        self.commands.push(GfxRecordedCommand::BindDescriptorSet(heap.descriptor_set()));
    }

    fn cmd_push_constants(&mut self, _pipeline: &GfxGraphicsPipeline, data: &[u8]) {
        self.commands.push(GfxRecordedCommand::PushConstants(data.to_vec()));
    }

    fn cmd_bind_vertex_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        self.commands.push(GfxRecordedCommand::BindVertexBuffer { buffer, offset });
    }

    fn cmd_bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        self.commands.push(GfxRecordedCommand::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        });
    }

    fn cmd_draw(&mut self, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        self.commands.push(GfxRecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn cmd_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.commands.push(GfxRecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
        });
    }

    fn cmd_copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        self.commands.push(GfxRecordedCommand::CopyBuffer {
            src,
            dst,
            regions: regions.to_vec(),
        });
    }

    fn cmd_update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        debug_assert!(
            is_valid_update_range(offset, data),
            "invalid cmd_update_buffer range: {} bytes at {offset}",
            data.len()
        );
        self.commands.push(GfxRecordedCommand::UpdateBuffer {
            buffer,
            offset,
            data: data.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_commands_keep_recording_order() {
        let mut cmd = GfxRecordingCommandBuffer::new("test");
        cmd.begin_label("pass", glam::Vec4::ONE);
        cmd.cmd_update_buffer(vk::Buffer::from_raw(3), 0, &[1, 2, 3, 4]);
        cmd.cmd_draw(3, 1, 0, 0);
        cmd.end_label();

        assert_eq!(cmd.commands().len(), 4);
        assert!(matches!(&cmd.commands()[0], GfxRecordedCommand::BeginLabel(name) if name == "pass"));
        assert!(matches!(&cmd.commands()[1], GfxRecordedCommand::UpdateBuffer { data, .. } if data.len() == 4));
        assert_eq!(cmd.draw_count(), 1);
        assert_eq!(cmd.label_depth(), 0);

        let taken = cmd.take_commands();
        assert_eq!(taken.len(), 4);
        assert!(cmd.commands().is_empty());
    }

    #[test]
    #[should_panic(expected = "without matching")]
    fn test_unbalanced_label() {
        let mut cmd = GfxRecordingCommandBuffer::new("test");
        cmd.end_label();
    }
    #[test]
    fn test_update_range_alignment() {
        assert!(is_valid_update_range(0, &[0; 4]));
        assert!(is_valid_update_range(65532, &[0; 65536]));
        assert!(!is_valid_update_range(1, &[0; 4]));
        assert!(!is_valid_update_range(0, &[0; 3]));
        assert!(!is_valid_update_range(0, &[]));
        assert!(!is_valid_update_range(0, &[0; 65540]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid cmd_update_buffer range")]
    fn test_unaligned_update_buffer() {
        let mut cmd = GfxRecordingCommandBuffer::new("test");
        cmd.cmd_update_buffer(vk::Buffer::from_raw(3), 2, &[1, 2, 3, 4]);
    }
}
