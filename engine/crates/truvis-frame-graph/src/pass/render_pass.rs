//! Pass 定义
//!
//! 一个 pass = 身份（[`RgPassId`]）+ setup 闭包 + execute 闭包 + 自己的读/写令牌。
//! pass 的生命周期跨越多帧，令牌每帧 setup 前清空后重新填充。

use crate::pass::builder::RgPassBuilder;
use crate::pass::pass_context::RgPassContext;
use crate::pass::pass_id::RgPassId;
use crate::resource::access_token::RgAccessToken;

/// setup 闭包，返回 false 表示本帧 graph 构建失败
pub type RgSetupFn = Box<dyn FnMut(&mut RgPassBuilder<'_>) -> bool + Send>;

/// execute 闭包，返回 false 表示本帧出现致命错误
pub type RgExecuteFn = Box<dyn FnMut(&RgPassAccess, &mut RgPassContext<'_>) -> bool + Send>;

/// 本帧中止（setup 或 execute 失败）时调用，用于丢弃还没有被 execute 取走的逐帧参数
pub type RgDiscardFn = Box<dyn FnMut() + Send>;

/// pass 在一帧内所处的阶段
///
/// `Registered -> Ready -> Idle`，之后每帧重复 `Ready -> Idle`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgPassState {
    /// 已注册，本帧尚未 setup（或者 setup 失败）
    Registered,
    /// setup 成功，令牌已冻结，等待 execute
    Ready,
    /// 本帧已经 execute
    Idle,
}

/// pass 的身份与令牌，execute 闭包通过它出示令牌
#[derive(Debug)]
pub struct RgPassAccess {
    id: RgPassId,
    pub(crate) read_token: RgAccessToken,
    pub(crate) write_token: RgAccessToken,
}

impl RgPassAccess {
    pub(crate) fn new(id: RgPassId) -> Self {
        Self {
            id,
            read_token: RgAccessToken::new(),
            write_token: RgAccessToken::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> RgPassId {
        self.id
    }

    #[inline]
    pub fn read_token(&self) -> &RgAccessToken {
        &self.read_token
    }

    #[inline]
    pub fn write_token(&self) -> &RgAccessToken {
        &self.write_token
    }

    pub(crate) fn reset_tokens(&mut self) {
        self.read_token.clear();
        self.write_token.clear();
    }
}

/// 注册在 graph 中的 pass
pub struct RenderPass {
    access: RgPassAccess,
    state: RgPassState,
    setup_fn: RgSetupFn,
    execute_fn: RgExecuteFn,
    discard_fn: Option<RgDiscardFn>,
}

// new & init
impl RenderPass {
    pub(crate) fn new(
        id: RgPassId,
        setup_fn: RgSetupFn,
        execute_fn: RgExecuteFn,
        discard_fn: Option<RgDiscardFn>,
    ) -> Self {
        Self {
            access: RgPassAccess::new(id),
            state: RgPassState::Registered,
            setup_fn,
            execute_fn,
            discard_fn,
        }
    }
}

// getters
impl RenderPass {
    #[inline]
    pub fn id(&self) -> RgPassId {
        self.access.id
    }

    #[inline]
    pub fn state(&self) -> RgPassState {
        self.state
    }

    #[inline]
    pub fn access(&self) -> &RgPassAccess {
        &self.access
    }
}

// 逐帧驱动
impl RenderPass {
    /// 清空令牌后调用 setup 闭包
    pub(crate) fn setup(&mut self) -> bool {
        let _span = tracy_client::span!("RenderPass::setup");
        self.access.reset_tokens();
        self.state = RgPassState::Registered;

        let mut builder = RgPassBuilder::new(&mut self.access);
        let ok = (self.setup_fn)(&mut builder);
        if ok {
            self.state = RgPassState::Ready;
        }
        ok
    }

    pub(crate) fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> bool {
        let _span = tracy_client::span!("RenderPass::execute");
        debug_assert_eq!(self.state, RgPassState::Ready);

        let ok = (self.execute_fn)(&self.access, ctx);
        self.state = RgPassState::Idle;
        ok
    }

    /// 本帧中止，pass 回到 `Registered` 并丢弃逐帧参数
    pub(crate) fn discard(&mut self) {
        self.state = RgPassState::Registered;
        if let Some(discard_fn) = self.discard_fn.as_mut() {
            discard_fn();
        }
    }
}
