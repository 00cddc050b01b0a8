use std::time::Duration;

use ash::vk;

use crate::descriptors::descriptor_heap::GfxDescriptorHeapKind;

/// GFX 层可恢复的错误
///
/// 契约错误（重复释放、越界 index 等）直接 panic，不走这里
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("descriptor heap {kind:?} is exhausted (capacity {capacity})")]
    DescriptorHeapExhausted { kind: GfxDescriptorHeapKind, capacity: u32 },

    #[error("descriptor heap {kind:?} is not shader visible, gpu handle is unavailable")]
    NotShaderVisible { kind: GfxDescriptorHeapKind },

    #[error("fence wait timed out after {0:?}")]
    FenceTimeout(Duration),

    #[error("vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}

pub type GfxResult<T> = Result<T, GfxError>;
