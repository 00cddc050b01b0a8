//! 渲染图
//!
//! 按注册顺序保存 pass，每帧先依次 setup，再依次 execute。
//! 读写声明只用于访问控制与 [`RgValidationReport`]，注册顺序就是执行顺序。

use indexmap::IndexMap;
use truvis_gfx::basic::color::LabelColor;
use truvis_gfx::commands::command_recorder::GfxCommandRecorder;

use crate::error::{RgError, RgResult};
use crate::graph::validation::RgValidationReport;
use crate::pass::builder::RgPassBuilder;
use crate::pass::pass_context::RgPassContext;
use crate::pass::pass_id::RgPassId;
use crate::pass::render_pass::{RenderPass, RgDiscardFn, RgExecuteFn, RgPassAccess, RgPassState, RgSetupFn};

#[derive(Default)]
pub struct RenderGraph {
    passes: IndexMap<RgPassId, RenderPass>,
}

// new & init
impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

// 注册
impl RenderGraph {
    /// 注册 pass
    ///
    /// # 返回
    /// `id` 已经注册过时返回 false，原有的注册保持不变
    pub fn add_pass<S, E>(&mut self, id: RgPassId, setup: S, execute: E) -> bool
    where
        S: FnMut(&mut RgPassBuilder<'_>) -> bool + Send + 'static,
        E: FnMut(&RgPassAccess, &mut RgPassContext<'_>) -> bool + Send + 'static,
    {
        self.insert_pass(id, Box::new(setup), Box::new(execute), None)
    }

    /// 注册 pass，并附带本帧中止时的 `discard` 回调
    ///
    /// 某个 pass 的 setup 或 execute 失败后，graph 会对所有 pass 调用 `discard`，
    /// 持有逐帧参数的 pass 在这里丢弃参数，避免下一帧在旧参数上继续累加
    pub fn add_pass_with_discard<S, E, D>(&mut self, id: RgPassId, setup: S, execute: E, discard: D) -> bool
    where
        S: FnMut(&mut RgPassBuilder<'_>) -> bool + Send + 'static,
        E: FnMut(&RgPassAccess, &mut RgPassContext<'_>) -> bool + Send + 'static,
        D: FnMut() + Send + 'static,
    {
        self.insert_pass(id, Box::new(setup), Box::new(execute), Some(Box::new(discard)))
    }

    fn insert_pass(
        &mut self,
        id: RgPassId,
        setup: RgSetupFn,
        execute: RgExecuteFn,
        discard: Option<RgDiscardFn>,
    ) -> bool {
        if self.passes.contains_key(&id) {
            log::error!("{}", RgError::DuplicatePass(id));
            return false;
        }

        self.passes.insert(id, RenderPass::new(id, setup, execute, discard));
        log::info!("register pass {id} (#{})", self.passes.len());
        true
    }

    /// 移除 pass，其余 pass 的相对顺序不变
    pub fn remove_pass(&mut self, id: RgPassId) -> RgResult<()> {
        self.passes.shift_remove(&id).map(|_| ()).ok_or(RgError::PassNotRegistered(id))
    }

    /// 移除所有 pass
    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

// getters
impl RenderGraph {
    #[inline]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[inline]
    pub fn contains_pass(&self, id: RgPassId) -> bool {
        self.passes.contains_key(&id)
    }

    /// 按注册顺序
    pub fn pass_ids(&self) -> impl Iterator<Item = RgPassId> + '_ {
        self.passes.keys().copied()
    }

    pub fn pass_state(&self, id: RgPassId) -> Option<RgPassState> {
        self.passes.get(&id).map(RenderPass::state)
    }

    /// pass 本帧的令牌，用于调试
    pub fn pass_access(&self, id: RgPassId) -> Option<&RgPassAccess> {
        self.passes.get(&id).map(RenderPass::access)
    }
}

// 逐帧驱动
impl RenderGraph {
    /// 按注册顺序 setup 所有 pass
    ///
    /// 某个 pass 的 setup 失败时立即返回，后续 pass 本帧不再 setup，所有 pass 的逐帧参数被丢弃
    pub fn setup(&mut self) -> RgResult<()> {
        let _span = tracy_client::span!("RenderGraph::setup");
        let failed = self.passes.values_mut().find_map(|pass| (!pass.setup()).then(|| pass.id()));
        if let Some(id) = failed {
            log::error!("setup of pass {id} failed, abort this frame");
            self.discard_frame();
            return Err(RgError::SetupFailed(id));
        }
        Ok(())
    }

    /// 按注册顺序 execute 所有 pass
    ///
    /// 所有 pass 都必须已经完成本帧的 setup；某个 pass 失败时立即返回，
    /// 已经录制的命令不做回滚，尚未 execute 的 pass 的逐帧参数被丢弃
    pub fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> RgResult<()> {
        let _span = tracy_client::span!("RenderGraph::execute");
        if let Some(pass) = self.passes.values().find(|p| p.state() != RgPassState::Ready) {
            log::error!("pass {} is {:?}, expected Ready", pass.id(), pass.state());
            let id = pass.id();
            self.discard_frame();
            return Err(RgError::PassNotReady(id));
        }

        let mut failed = None;
        for pass in self.passes.values_mut() {
            ctx.cmd().begin_label(pass.id().name(), LabelColor::COLOR_PASS);
            let ok = pass.execute(ctx);
            ctx.cmd().end_label();

            if !ok {
                log::error!("execute of pass {} failed in frame {}", pass.id(), ctx.frame_id());
                failed = Some(pass.id());
                break;
            }
        }

        match failed {
            Some(id) => {
                self.discard_frame();
                Err(RgError::ExecuteFailed(id))
            }
            None => Ok(()),
        }
    }

    /// 本帧中止：所有 pass 丢弃逐帧参数
    fn discard_frame(&mut self) {
        let _span = tracy_client::span!("RenderGraph::discard_frame");
        for pass in self.passes.values_mut() {
            pass.discard();
        }
    }

    /// 一帧：setup 然后 execute
    pub fn run_frame(&mut self, cmd: &mut dyn GfxCommandRecorder, frame_id: u64) -> RgResult<()> {
        let _span = tracy_client::span!("RenderGraph::run_frame");
        self.setup()?;

        let mut ctx = RgPassContext::new(cmd, frame_id);
        ctx.cmd().begin_label(&format!("frame-{frame_id}"), LabelColor::COLOR_STAGE);
        let result = self.execute(&mut ctx);
        ctx.cmd().end_label();
        result
    }

    /// 根据本帧 setup 填充的令牌做依赖分析，不改变执行顺序
    ///
    /// 需要在 [`Self::setup`] 之后调用
    pub fn validate(&self) -> RgValidationReport {
        RgValidationReport::analyze(self.passes.values().map(RenderPass::access))
    }
}
