use std::collections::HashSet;

use crate::resource::handle::RgResourceHandle;

/// 资源访问令牌
///
/// 一个 pass 在一帧内被允许访问的句柄集合。读、写各一份，只由 [`crate::pass::builder::RgPassBuilder`]
/// 在 setup 阶段填充；setup 返回后令牌被冻结（execute 只能拿到不可变引用），下一帧 setup 前清空。
///
/// 资源管理器在取资源前检查令牌，未声明的访问直接 panic，而不是静默地产生数据竞争。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgAccessToken {
    handles: HashSet<RgResourceHandle>,
}

// new & init
impl RgAccessToken {
    pub fn new() -> Self {
        Self::default()
    }
}

// tools
impl RgAccessToken {
    /// 允许访问该句柄
    ///
    /// # Panics
    /// 句柄为空
    pub fn permit_access(&mut self, handle: RgResourceHandle) {
        assert!(handle.is_valid(), "cannot permit access to a null resource handle");
        self.handles.insert(handle);
    }

    #[inline]
    pub fn has_access(&self, handle: RgResourceHandle) -> bool {
        handle.is_valid() && self.handles.contains(&handle)
    }

    /// 用于校验和调试
    #[inline]
    pub fn accessible_handles(&self) -> &HashSet<RgResourceHandle> {
        &self.handles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
