//! 资源的创建与销毁入口
//!
//! 资产、材质、灯光等外部系统只通过这两个类型改变资源集合，二者都在内部加锁。

use std::sync::Arc;

use truvis_gfx::resources::resource::GfxResource;

use crate::resource::container::RgResourceContainer;
use crate::resource::handle::RgResourceHandle;

#[derive(Clone)]
pub struct RgResourceAdder {
    container: Arc<RgResourceContainer>,
}

impl RgResourceAdder {
    pub fn new(container: Arc<RgResourceContainer>) -> Self {
        Self { container }
    }

    /// 将资源移入容器，返回新的句柄
    pub fn add_resource(&self, resource: GfxResource) -> RgResourceHandle {
        let name = resource.name().to_string();
        let handle = self.container.add(resource);
        log::debug!("add resource {name} as {handle:?}");
        handle
    }
}

#[derive(Clone)]
pub struct RgResourceEraser {
    container: Arc<RgResourceContainer>,
}

impl RgResourceEraser {
    pub fn new(container: Arc<RgResourceContainer>) -> Self {
        Self { container }
    }

    /// 从容器中移除资源，返回其所有权以便平台层销毁 GPU 对象
    ///
    /// 之后该句柄的 `contains` 为 false，访问会失败
    pub fn erase_resource(&self, handle: RgResourceHandle) -> Option<GfxResource> {
        let erased = self.container.erase(handle);
        if erased.is_none() {
            log::warn!("erase of {handle:?} ignored: handle is stale");
        }
        erased
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;
    use ash::vk::Handle;
    use truvis_gfx::resources::buffer::GfxBuffer;
    use truvis_gfx::resources::resource_state::GfxResourceState;

    #[test]
    fn test_contains_follows_add_and_erase() {
        let container = Arc::new(RgResourceContainer::new());
        let adder = RgResourceAdder::new(container.clone());
        let eraser = RgResourceEraser::new(container.clone());

        let buffer = GfxBuffer::new(vk::Buffer::from_raw(9), 16, vk::BufferUsageFlags::STORAGE_BUFFER);
        let handle = adder.add_resource(GfxResource::from_buffer("b", buffer, GfxResourceState::UNDEFINED));
        assert!(container.contains(handle));

        assert!(eraser.erase_resource(handle).is_some());
        assert!(!container.contains(handle));
        assert!(eraser.erase_resource(handle).is_none());
    }
}
