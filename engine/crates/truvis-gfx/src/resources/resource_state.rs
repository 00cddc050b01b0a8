//! 资源状态定义
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 提供预定义的常用状态组合。buffer 与 image 共用同一个类型，buffer 的 layout 恒为 `UNDEFINED`。

use ash::vk;

/// GPU 资源当前所处的使用状态
///
/// 保存在 [`crate::resources::resource::GfxResource`] 上，由 barrier 负责切换
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxResourceState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
    /// Image layout，buffer 忽略
    pub layout: vk::ImageLayout,
}

impl Default for GfxResourceState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl GfxResourceState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// buffer 使用的状态，没有 layout
    #[inline]
    pub const fn buffer(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self::new(stage, access, vk::ImageLayout::UNDEFINED)
    }

    // ============ 预定义状态常量 ============

    /// 未定义状态（初始状态或不关心内容）
    pub const UNDEFINED: Self =
        Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// 通用布局
    pub const GENERAL: Self = Self::new(
        vk::PipelineStageFlags2::ALL_COMMANDS,
        vk::AccessFlags2::from_raw(vk::AccessFlags2::MEMORY_READ.as_raw() | vk::AccessFlags2::MEMORY_WRITE.as_raw()),
        vk::ImageLayout::GENERAL,
    );

    /// 颜色附件输出
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 深度附件写入
    pub const DEPTH_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::from_raw(
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
                | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
        ),
        vk::AccessFlags2::from_raw(
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    );

    /// 深度只读（作为纹理采样）
    pub const DEPTH_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
    );

    /// 着色器只读采样（片段着色器）
    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现（swapchain image）
    pub const PRESENT: Self =
        Self::new(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);

    /// buffer 作为传输目标
    pub const BUFFER_TRANSFER_DST: Self =
        Self::buffer(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE);

    /// 顶点缓冲区读取
    pub const VERTEX_BUFFER: Self =
        Self::buffer(vk::PipelineStageFlags2::VERTEX_INPUT, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);

    /// 索引缓冲区读取
    pub const INDEX_BUFFER: Self = Self::buffer(vk::PipelineStageFlags2::INDEX_INPUT, vk::AccessFlags2::INDEX_READ);

    /// 上传完成后的通用只读状态，任何着色器阶段与顶点输入都可以读
    pub const SHADER_READ_GENERIC: Self = Self::buffer(
        vk::PipelineStageFlags2::ALL_GRAPHICS,
        vk::AccessFlags2::from_raw(
            vk::AccessFlags2::SHADER_READ.as_raw()
                | vk::AccessFlags2::UNIFORM_READ.as_raw()
                | vk::AccessFlags2::VERTEX_ATTRIBUTE_READ.as_raw()
                | vk::AccessFlags2::INDEX_READ.as_raw(),
        ),
    );

    // ============ 辅助方法 ============

    /// 写操作的 access flags
    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }

    /// 获取用于 barrier src 的 access（去掉读操作）
    ///
    /// 读操作不需要 make available，只有写需要
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & Self::WRITE_ACCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_detection() {
        assert!(GfxResourceState::COLOR_ATTACHMENT_WRITE.is_write());
        assert!(GfxResourceState::DEPTH_ATTACHMENT_WRITE.is_write());
        assert!(GfxResourceState::BUFFER_TRANSFER_DST.is_write());
        assert!(!GfxResourceState::SHADER_READ_FRAGMENT.is_write());
        assert!(!GfxResourceState::PRESENT.is_write());
    }

    #[test]
    fn test_src_access_drops_reads() {
        let src = GfxResourceState::DEPTH_ATTACHMENT_WRITE.src_access();
        assert_eq!(src, vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE);
        assert_eq!(GfxResourceState::SHADER_READ_FRAGMENT.src_access(), vk::AccessFlags2::NONE);
    }
}
