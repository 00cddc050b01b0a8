use std::sync::Arc;

use crate::heap::heap_manager::{RgHeapCapacities, RgHeapManager};
use crate::resource::adder::{RgResourceAdder, RgResourceEraser};
use crate::resource::container::RgResourceContainer;
use crate::resource::resource_manager::RgResourceManager;

/// frame graph 的根上下文
///
/// 持有资源容器与 descriptor heap，并派生出 adder / eraser / 两个管理器。
/// 以引用的方式传给每个 pass 的构造函数；多个上下文之间完全独立，测试中可以同时存在多个 graph。
#[derive(Clone)]
pub struct RgFrameGraphContext {
    resource_manager: RgResourceManager,
    heap_manager: RgHeapManager,
    adder: RgResourceAdder,
    eraser: RgResourceEraser,
}

// new & init
impl RgFrameGraphContext {
    pub fn new(capacities: RgHeapCapacities) -> Self {
        Self::with_heap_manager(RgHeapManager::new(capacities))
    }

    pub fn with_heap_manager(heap_manager: RgHeapManager) -> Self {
        let container = Arc::new(RgResourceContainer::new());
        Self {
            resource_manager: RgResourceManager::new(container.clone()),
            heap_manager,
            adder: RgResourceAdder::new(container.clone()),
            eraser: RgResourceEraser::new(container),
        }
    }
}

impl Default for RgFrameGraphContext {
    fn default() -> Self {
        Self::new(RgHeapCapacities::default())
    }
}

// getters
impl RgFrameGraphContext {
    #[inline]
    pub fn resource_manager(&self) -> &RgResourceManager {
        &self.resource_manager
    }

    #[inline]
    pub fn heap_manager(&self) -> &RgHeapManager {
        &self.heap_manager
    }

    #[inline]
    pub fn adder(&self) -> &RgResourceAdder {
        &self.adder
    }

    #[inline]
    pub fn eraser(&self) -> &RgResourceEraser {
        &self.eraser
    }
}
