use std::time::Duration;

use ash::vk;

use crate::error::{GfxError, GfxResult};

/// # Destroy
/// 不实现 Drop，因为可以 Clone，需要手动 destroy
///
/// 等待有上限，超时视为致命错误交给调用方处理，不做重试
#[derive(Clone)]
pub struct GfxFence {
    device: ash::Device,
    fence: vk::Fence,
    timeout: Duration,
}

// 创建与销毁
impl GfxFence {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// # param
    /// * signaled - 是否创建时就 signaled
    pub fn new(device: ash::Device, signaled: bool, timeout: Duration) -> GfxResult<Self> {
        let fence_flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default().flags(fence_flags), None)? };

        Ok(Self { device, fence, timeout })
    }

    #[inline]
    pub fn destroy(self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

// getters
impl GfxFence {
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// tools
impl GfxFence {
    /// 阻塞等待 fence，超过 timeout 返回 [`GfxError::FenceTimeout`]
    pub fn wait(&self) -> GfxResult<()> {
        let _span = tracy_client::span!("GfxFence::wait");
        let timeout_ns = u64::try_from(self.timeout.as_nanos()).unwrap_or(u64::MAX);
        let result = unsafe { self.device.wait_for_fences(std::slice::from_ref(&self.fence), true, timeout_ns) };
        Self::map_wait_result(result, self.timeout)
    }

    fn map_wait_result(result: Result<(), vk::Result>, timeout: Duration) -> GfxResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => {
                log::error!("fence wait timed out after {timeout:?}");
                Err(GfxError::FenceTimeout(timeout))
            }
            Err(e) => Err(GfxError::Vulkan(e)),
        }
    }

    #[inline]
    pub fn reset(&self) -> GfxResult<()> {
        unsafe { self.device.reset_fences(std::slice::from_ref(&self.fence))? };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_result_mapping() {
        let timeout = GfxFence::DEFAULT_TIMEOUT;
        assert!(GfxFence::map_wait_result(Ok(()), timeout).is_ok());
        assert!(matches!(
            GfxFence::map_wait_result(Err(vk::Result::TIMEOUT), timeout),
            Err(GfxError::FenceTimeout(t)) if t == timeout
        ));
        assert!(matches!(
            GfxFence::map_wait_result(Err(vk::Result::ERROR_DEVICE_LOST), timeout),
            Err(GfxError::Vulkan(vk::Result::ERROR_DEVICE_LOST))
        ));
    }
}
