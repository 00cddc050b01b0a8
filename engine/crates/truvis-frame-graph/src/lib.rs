//! Truvis Frame Graph
//!
//! 让相互独立的渲染 pass 声明自己要访问的 GPU 资源，并在能力检查下安全地访问进程内共享的资源池。
//!
//! # 数据流
//! 1. 通过 [`resource::adder::RgResourceAdder`] 创建资源，得到 [`resource::handle::RgResourceHandle`]
//! 2. 通过 [`graph::render_graph::RenderGraph::add_pass`] 注册 pass
//! 3. 每帧按注册顺序：
//!    - setup：pass 通过 [`pass::builder::RgPassBuilder`] 把 handle 写入自己的读/写令牌
//!    - execute：pass 在 [`resource::resource_manager::RgResourceManager::with_lock`] 中凭令牌取资源、录制命令
//!
//! 读写声明只用于访问控制和校验（[`graph::validation`]），不会改变执行顺序。

pub mod context;
pub mod error;

pub mod resource {
    pub mod access_token;
    pub mod adder;
    pub mod container;
    pub mod handle;
    pub mod resource_manager;
}

pub mod heap {
    pub mod heap_manager;
}

pub mod pass {
    pub mod builder;
    pub mod frame_params;
    pub mod pass_context;
    pub mod pass_id;
    pub mod render_pass;
}

pub mod graph {
    pub mod render_graph;
    pub mod validation;
}
