use ash::vk;

use crate::commands::command_recorder::GfxCommandRecorder;
use crate::resources::resource::{GfxBarrierTarget, GfxResource};
use crate::resources::resource_state::GfxResourceState;

/// 便捷创建 image memory barrier 的结构体
#[derive(Clone, Copy, Debug)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl Default for GfxImageBarrier {
    fn default() -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::empty(),
                    base_array_layer: 0,
                    layer_count: 1,
                    base_mip_level: 0,
                    level_count: 1,
                },
                ..Default::default()
            },
        }
    }
}

impl GfxImageBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'static> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn layout_transfer(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.inner.old_layout = old_layout;
        self.inner.new_layout = new_layout;
        self
    }

    /// builder
    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    /// builder
    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }

    /// builder
    /// miplevel 使用默认值
    #[inline]
    pub fn image_aspect_flag(mut self, aspect_mask: vk::ImageAspectFlags) -> Self {
        self.inner.subresource_range.aspect_mask = aspect_mask;
        self
    }

    /// builder
    #[inline]
    pub fn layer_count(mut self, layer_count: u32) -> Self {
        self.inner.subresource_range.layer_count = layer_count;
        self
    }

    /// builder
    #[inline]
    pub fn image(mut self, image: vk::Image) -> Self {
        self.inner.image = image;
        self
    }
}

/// 便捷创建 buffer memory barrier 的结构体
#[derive(Clone, Copy, Debug)]
pub struct GfxBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl Default for GfxBufferBarrier {
    fn default() -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                size: vk::WHOLE_SIZE,
                ..Default::default()
            },
        }
    }
}

impl GfxBufferBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'static> {
        &self.inner
    }

    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }

    #[inline]
    pub fn buffer(mut self, buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        self.inner.buffer = buffer;
        self.inner.offset = offset;
        self.inner.size = size;
        self
    }
}

/// 一次性的资源状态切换
///
/// 构造即录制：`new` 返回时 barrier 已经写入 command recorder。
/// 它不是 RAII guard，drop 时什么也不做；资源的 `current_state` 需要调用方自行更新。
#[derive(Clone, Copy, Debug)]
pub struct GfxBarrier {
    before: GfxResourceState,
    after: GfxResourceState,
    count: u32,
}

impl GfxBarrier {
    pub fn new(
        resource: &GfxResource,
        cmd: &mut dyn GfxCommandRecorder,
        before: GfxResourceState,
        after: GfxResourceState,
    ) -> Self {
        Self::with_count(resource, cmd, before, after, 1)
    }

    /// `count` 为 image 覆盖的 array layer 数量，buffer 忽略
    pub fn with_count(
        resource: &GfxResource,
        cmd: &mut dyn GfxCommandRecorder,
        before: GfxResourceState,
        after: GfxResourceState,
        count: u32,
    ) -> Self {
        assert_ne!(before, after, "barrier of {} must change the state", resource.name());
        assert!(count > 0, "barrier count must be positive");

        match resource.barrier_target() {
            GfxBarrierTarget::Image {
                image,
                aspect,
                array_layers,
            } => {
                debug_assert!(count <= array_layers, "barrier covers more layers than {} owns", resource.name());
                let barrier = GfxImageBarrier::new()
                    .image(image)
                    .image_aspect_flag(aspect)
                    .layer_count(count)
                    .layout_transfer(before.layout, after.layout)
                    .src_mask(before.stage, before.src_access())
                    .dst_mask(after.stage, after.access);
                cmd.cmd_pipeline_barrier(std::slice::from_ref(&barrier), &[]);
            }
            GfxBarrierTarget::Buffer { buffer, size } => {
                let barrier = GfxBufferBarrier::new()
                    .buffer(buffer, 0, size)
                    .src_mask(before.stage, before.src_access())
                    .dst_mask(after.stage, after.access);
                cmd.cmd_pipeline_barrier(&[], std::slice::from_ref(&barrier));
            }
        }

        Self { before, after, count }
    }

    #[inline]
    pub fn before(&self) -> GfxResourceState {
        self.before
    }

    #[inline]
    pub fn after(&self) -> GfxResourceState {
        self.after
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }
}
