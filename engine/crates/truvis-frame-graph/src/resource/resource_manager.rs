//! 资源管理器
//!
//! 所有 pass 对资源的访问都要经过这里：先进入 [`RgResourceManager::with_lock`] 临界区，
//! 再出示 setup 阶段得到的令牌取资源。访问器只存在于锁内视图 [`RgLockedResources`] 上，
//! 因此不可能在锁外调用。

use std::sync::Arc;

use truvis_gfx::commands::barrier::GfxBarrier;
use truvis_gfx::commands::command_recorder::GfxCommandRecorder;
use truvis_gfx::resources::resource::GfxResource;
use truvis_gfx::resources::resource_state::GfxResourceState;

use crate::error::{RgAccessKind, RgError, RgResult};
use crate::resource::access_token::RgAccessToken;
use crate::resource::container::{RgResourceContainer, RgResourceSlots};
use crate::resource::handle::RgResourceHandle;

/// 通用 GPU 资源的管理器
///
/// 由 [`crate::context::RgFrameGraphContext`] 持有并以引用的方式传给各个 pass，不是全局单例。
#[derive(Clone)]
pub struct RgResourceManager {
    container: Arc<RgResourceContainer>,
}

// new & init
impl RgResourceManager {
    pub fn new(container: Arc<RgResourceContainer>) -> Self {
        Self { container }
    }
}

// tools
impl RgResourceManager {
    /// 阻塞地进入临界区，所有资源访问都必须在 `f` 内完成
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut RgLockedResources<'_>) -> R) -> R {
        self.container.with_lock(|slots| {
            let mut locked = RgLockedResources { slots };
            f(&mut locked)
        })
    }

    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        self.container.contains(handle)
    }
}

/// 锁内的资源视图
pub struct RgLockedResources<'a> {
    slots: &'a mut RgResourceSlots,
}

// 令牌检查
impl RgLockedResources<'_> {
    fn check_access(token: &RgAccessToken, handle: RgResourceHandle, kind: RgAccessKind) -> RgResult<()> {
        if token.has_access(handle) {
            Ok(())
        } else {
            Err(RgError::AccessDenied { handle, kind })
        }
    }

    pub fn try_get_read_resource(
        &self,
        handle: RgResourceHandle,
        read_token: &RgAccessToken,
    ) -> RgResult<&GfxResource> {
        Self::check_access(read_token, handle, RgAccessKind::Read)?;
        self.slots.try_get(handle).ok_or(RgError::StaleHandle(handle))
    }

    pub fn try_get_write_resource(
        &mut self,
        handle: RgResourceHandle,
        write_token: &RgAccessToken,
    ) -> RgResult<&mut GfxResource> {
        Self::check_access(write_token, handle, RgAccessKind::Write)?;
        self.slots.try_get_mut(handle).ok_or(RgError::StaleHandle(handle))
    }

    /// 凭读令牌取只读资源
    ///
    /// # Panics
    /// 令牌中没有该句柄，或者句柄已经失效
    pub fn get_read_resource(&self, handle: RgResourceHandle, read_token: &RgAccessToken) -> &GfxResource {
        match self.try_get_read_resource(handle, read_token) {
            Ok(resource) => resource,
            Err(e) => panic!("{e}"),
        }
    }

    /// 凭写令牌取可变资源
    ///
    /// # Panics
    /// 令牌中没有该句柄，或者句柄已经失效
    pub fn get_write_resource(&mut self, handle: RgResourceHandle, write_token: &RgAccessToken) -> &mut GfxResource {
        match self.try_get_write_resource(handle, write_token) {
            Ok(resource) => resource,
            Err(e) => panic!("{e}"),
        }
    }

    #[inline]
    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        self.slots.contains(handle)
    }
}

// 状态切换
impl RgLockedResources<'_> {
    /// 把资源切换到 `new_state`
    ///
    /// 录制 barrier 与更新 `current_state` 在同一次调用中完成；资源已经处于目标状态时什么也不录制。
    ///
    /// # 返回
    /// 是否录制了 barrier
    pub fn transition_to(
        &mut self,
        handle: RgResourceHandle,
        write_token: &RgAccessToken,
        cmd: &mut dyn GfxCommandRecorder,
        new_state: GfxResourceState,
    ) -> bool {
        self.transition_to_with_count(handle, write_token, cmd, new_state, 1)
    }

    /// `count` 为 image 需要切换的 array layer 数量
    pub fn transition_to_with_count(
        &mut self,
        handle: RgResourceHandle,
        write_token: &RgAccessToken,
        cmd: &mut dyn GfxCommandRecorder,
        new_state: GfxResourceState,
        count: u32,
    ) -> bool {
        let resource = self.get_write_resource(handle, write_token);
        let current_state = resource.current_state();
        if current_state == new_state {
            return false;
        }

        GfxBarrier::with_count(resource, cmd, current_state, new_state, count);
        resource.set_current_state(new_state);
        true
    }
}
