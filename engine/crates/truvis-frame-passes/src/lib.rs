//! 具体的渲染 pass
//!
//! 每个 pass 持有 [`truvis_frame_graph::context::RgFrameGraphContext`]，对外提供 `set_*` / `add_*` 方法写入本帧参数，
//! 通过 [`pass_base::RgPassBase::add_to_graph`] 注册到 graph。本帧参数在 execute 开始时被取走并重置。
//!
//! 推荐的注册顺序（也是执行顺序）：
//! upload -> shadowing -> geometry -> shadow composition -> ui overlay -> composition

pub mod full_screen_triangle;
pub mod mesh_draw;
pub mod pass_base;
pub mod render_target;

#[cfg(test)]
mod test_utils;

pub mod passes {
    pub mod buffer_upload_pass;
    pub mod composition_pass;
    pub mod geometry_pass;
    pub mod shadow_composition_pass;
    pub mod shadowing_pass;
    pub mod ui_overlay_pass;
}
