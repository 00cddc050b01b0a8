//! Truvis GFX 层
//!
//! frame graph 只通过这里的类型接触 Vulkan：
//! - 资源（buffer / image / swapchain）以及它们的状态
//! - barrier 的 builder 与一次性的 [`commands::barrier::GfxBarrier`]
//! - 命令录制 trait [`commands::command_recorder::GfxCommandRecorder`]，有真实的 Vulkan 实现和内存录制实现
//! - descriptor heap 以及基于 free-list 的分配器
//! - 带超时的 fence

pub mod error;

pub mod basic {
    pub mod color;
}

pub mod commands {
    pub mod barrier;
    pub mod command_buffer;
    pub mod command_recorder;
    pub mod fence;
    pub mod recording_command_buffer;
}

pub mod descriptors {
    pub mod descriptor_heap;
    pub mod descriptor_heap_allocator;
}

pub mod pipelines {
    pub mod graphics_pipeline;
    pub mod rendering_info;
}

pub mod resources {
    pub mod buffer;
    pub mod image;
    pub mod resource;
    pub mod resource_state;
}
