use std::sync::Arc;

use parking_lot::Mutex;

/// 逐帧参数槽
///
/// 外部系统在 setup 之前通过 `update` 写入本帧参数（要画的 mesh、要 present 的 swapchain 等），
/// pass 的 setup 通过 `read` 声明依赖，execute 通过 `take` 取走参数并把槽重置为 `T::default()`。
/// 因为 reset 发生在取出的同时，execute 中途失败也不会把本帧参数泄漏到下一帧；
/// 没有走到 execute 的 pass 由 graph 在本帧中止时调用 `reset`。
pub struct RgFrameParams<T: Default> {
    inner: Arc<Mutex<T>>,
}

impl<T: Default> Clone for RgFrameParams<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default> Default for RgFrameParams<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(T::default())),
        }
    }
}

impl<T: Default> RgFrameParams<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock())
    }

    /// 取出本帧参数，槽被重置
    pub fn take(&self) -> T {
        std::mem::take(&mut *self.inner.lock())
    }

    /// 丢弃本帧参数
    pub fn reset(&self) {
        *self.inner.lock() = T::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct DrawList {
        meshes: Vec<u32>,
    }

    #[test]
    fn test_take_resets() {
        let params = RgFrameParams::<DrawList>::new();
        let writer = params.clone();
        writer.update(|p| p.meshes.extend([1, 2, 3]));

        assert_eq!(params.read(|p| p.meshes.len()), 3);
        let taken = params.take();
        assert_eq!(taken.meshes, vec![1, 2, 3]);
        assert!(writer.read(|p| p.meshes.is_empty()));
    }

    #[test]
    fn test_reset_discards() {
        let params = RgFrameParams::<DrawList>::new();
        params.update(|p| p.meshes.push(7));
        params.reset();
        assert!(params.take().meshes.is_empty());
    }
}
