use ash::vk;
use itertools::Itertools;

use crate::basic::color::LabelColor;
use crate::commands::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::commands::command_recorder::{GfxCommandRecorder, is_valid_update_range};
use crate::descriptors::descriptor_heap::GfxDescriptorHeap;
use crate::error::GfxResult;
use crate::pipelines::graphics_pipeline::GfxGraphicsPipeline;
use crate::pipelines::rendering_info::GfxRenderingInfo;

/// 命令缓冲封装
///
/// 封装 Vulkan CommandBuffer，实现 [`GfxCommandRecorder`]。
/// command buffer 由平台层从 command pool 中分配，这里只负责录制。
///
/// # 使用示例
/// ```ignore
/// let mut cmd = GfxCommandBuffer::from_raw(device.clone(), debug_utils, vk_cmd, "frame");
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "frame")?;
/// graph.run_frame(&mut cmd, frame_id)?;
/// cmd.end()?;
/// ```
pub struct GfxCommandBuffer {
    device: ash::Device,
    debug_utils: Option<ash::ext::debug_utils::Device>,
    vk_handle: vk::CommandBuffer,
    name: String,
}

// new & init
impl GfxCommandBuffer {
    /// `debug_utils` 为 `None` 时 debug label 被忽略
    pub fn from_raw(
        device: ash::Device,
        debug_utils: Option<ash::ext::debug_utils::Device>,
        vk_handle: vk::CommandBuffer,
        name: impl Into<String>,
    ) -> Self {
        Self {
            device,
            debug_utils,
            vk_handle,
            name: name.into(),
        }
    }
}

// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command，自动设置 debug label
    pub fn begin(&mut self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> GfxResult<()> {
        unsafe {
            self.device
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))?;
        }
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command，结束 debug label
    pub fn end(&mut self) -> GfxResult<()> {
        self.end_label();
        unsafe { self.device.end_command_buffer(self.vk_handle)? };
        Ok(())
    }
}

// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}

impl GfxCommandRecorder for GfxCommandBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    /// - supported queue types: graphics, compute, transfer
    fn cmd_pipeline_barrier(&mut self, image_barriers: &[GfxImageBarrier], buffer_barriers: &[GfxBufferBarrier]) {
        let image_barriers = image_barriers.iter().map(|b| *b.inner()).collect_vec();
        let buffer_barriers = buffer_barriers.iter().map(|b| *b.inner()).collect_vec();
        let dependency_info = vk::DependencyInfo::default()
            .image_memory_barriers(&image_barriers)
            .buffer_memory_barriers(&buffer_barriers);
        unsafe {
            self.device.cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }

    fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        // label 中的 \0 会截断名称，直接丢弃该 label
        let Ok(name) = std::ffi::CString::new(label_name) else {
            log::warn!("debug label {label_name:?} contains a nul byte");
            return;
        };
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.to_array()),
            );
        }
    }

    fn end_label(&mut self) {
        if let Some(debug_utils) = &self.debug_utils {
            unsafe { debug_utils.cmd_end_debug_utils_label(self.vk_handle) };
        }
    }

    /// - supported queue types: graphics
    fn cmd_begin_rendering(&mut self, rendering_info: &GfxRenderingInfo) {
        let color_attachments = rendering_info.color_attachment_infos();
        let depth_attachment = rendering_info.depth_attachment_info();
        let mut info = vk::RenderingInfo::default()
            .render_area(rendering_info.render_area)
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth_attachment) = depth_attachment.as_ref() {
            info = info.depth_attachment(depth_attachment);
        }
        unsafe {
            self.device.cmd_begin_rendering(self.vk_handle, &info);
        }
    }

    fn cmd_end_rendering(&mut self) {
        unsafe {
            self.device.cmd_end_rendering(self.vk_handle);
        }
    }

    fn cmd_set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe {
            self.device.cmd_set_viewport(self.vk_handle, 0, std::slice::from_ref(&viewport));
        }
    }

    fn cmd_set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe {
            self.device.cmd_set_scissor(self.vk_handle, 0, std::slice::from_ref(&scissor));
        }
    }

    fn cmd_bind_pipeline(&mut self, pipeline: &GfxGraphicsPipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(self.vk_handle, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline());
        }
    }

    fn cmd_bind_descriptor_heap(&mut self, pipeline: &GfxGraphicsPipeline, heap: &GfxDescriptorHeap) {
        debug_assert!(heap.is_shader_visible(), "only shader visible heaps can be bound");
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.vk_handle,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout(),
                0,
                &[heap.descriptor_set()],
                &[],
            );
        }
    }

    fn cmd_push_constants(&mut self, pipeline: &GfxGraphicsPipeline, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(
                self.vk_handle,
                pipeline.layout(),
                pipeline.push_constant_stages(),
                0,
                data,
            );
        }
    }

    fn cmd_bind_vertex_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(self.vk_handle, 0, &[buffer], &[offset]);
        }
    }

    fn cmd_bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device.cmd_bind_index_buffer(self.vk_handle, buffer, offset, index_type);
        }
    }

    fn cmd_draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        unsafe {
            self.device.cmd_draw(self.vk_handle, vertex_count, instance_count, first_vertex, first_instance);
        }
    }

    fn cmd_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.vk_handle,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    /// - supported queue types: transfer, graphics, compute
    fn cmd_copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe {
            self.device.cmd_copy_buffer(self.vk_handle, src, dst, regions);
        }
    }

    fn cmd_update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        debug_assert!(
            is_valid_update_range(offset, data),
            "invalid cmd_update_buffer range: {} bytes at {offset}",
            data.len()
        );
        unsafe {
            self.device.cmd_update_buffer(self.vk_handle, buffer, offset, data);
        }
    }
}
