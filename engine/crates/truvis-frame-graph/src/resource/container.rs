//! 资源容器
//!
//! 基于 slotmap 的代际 arena，独占持有所有 [`GfxResource`]。
//! 容器由一把 `parking_lot::Mutex` 保护，外部只能在 [`RgResourceContainer::with_lock`] 内访问内部的 slot。

use parking_lot::Mutex;
use slotmap::SlotMap;
use truvis_gfx::resources::resource::GfxResource;

use crate::resource::handle::RgResourceHandle;

/// 容器内部的 slot 存储，只能在锁内拿到
#[derive(Default)]
pub struct RgResourceSlots {
    resources: SlotMap<RgResourceHandle, GfxResource>,
}

// tools
impl RgResourceSlots {
    /// 插入资源，返回新的句柄
    pub fn add(&mut self, resource: GfxResource) -> RgResourceHandle {
        self.resources.insert(resource)
    }

    #[inline]
    pub fn try_get(&self, handle: RgResourceHandle) -> Option<&GfxResource> {
        self.resources.get(handle)
    }

    #[inline]
    pub fn try_get_mut(&mut self, handle: RgResourceHandle) -> Option<&mut GfxResource> {
        self.resources.get_mut(handle)
    }

    /// # Panics
    /// 句柄为空或者已经失效
    pub fn get(&self, handle: RgResourceHandle) -> &GfxResource {
        match self.resources.get(handle) {
            Some(resource) => resource,
            None => panic!("resource handle {handle:?} is stale or was never added"),
        }
    }

    /// # Panics
    /// 句柄为空或者已经失效
    pub fn get_mut(&mut self, handle: RgResourceHandle) -> &mut GfxResource {
        match self.resources.get_mut(handle) {
            Some(resource) => resource,
            None => panic!("resource handle {handle:?} is stale or was never added"),
        }
    }

    /// 移除资源并交还所有权，GPU 对象的销毁由调用方负责
    pub fn erase(&mut self, handle: RgResourceHandle) -> Option<GfxResource> {
        self.resources.remove(handle)
    }

    #[inline]
    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        self.resources.contains_key(handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RgResourceHandle, &GfxResource)> {
        self.resources.iter()
    }
}

/// 线程安全的资源容器
#[derive(Default)]
pub struct RgResourceContainer {
    slots: Mutex<RgResourceSlots>,
}

impl RgResourceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 独占地访问所有 slot，阻塞直到拿到锁
    ///
    /// 锁不可重入：在 `f` 内再次调用 `with_lock`（或者 adder/eraser）会死锁
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut RgResourceSlots) -> R) -> R {
        let _span = tracy_client::span!("RgResourceContainer::with_lock");
        let mut slots = self.slots.lock();
        f(&mut slots)
    }

    /// 插入资源，内部加锁
    pub fn add(&self, resource: GfxResource) -> RgResourceHandle {
        self.with_lock(|slots| slots.add(resource))
    }

    /// 移除资源，内部加锁
    pub fn erase(&self, handle: RgResourceHandle) -> Option<GfxResource> {
        self.with_lock(|slots| slots.erase(handle))
    }

    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        self.with_lock(|slots| slots.contains(handle))
    }

    pub fn len(&self) -> usize {
        self.with_lock(|slots| slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
