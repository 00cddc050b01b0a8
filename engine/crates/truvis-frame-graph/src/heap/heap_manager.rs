//! descriptor heap 管理器
//!
//! 持有 SRV / RTV / DSV 三个 heap 以及各自的分配器，与资源管理器一样由一把锁保护。

use std::sync::Arc;

use parking_lot::Mutex;
use truvis_gfx::descriptors::descriptor_heap::{GfxDescriptorHeap, GfxDescriptorHeapKind};
use truvis_gfx::descriptors::descriptor_heap_allocator::GfxDescriptorHeapAllocator;

/// 三个 heap 的容量，启动时由平台层注入
#[derive(Clone, Copy, Debug)]
pub struct RgHeapCapacities {
    pub srv: u32,
    pub rtv: u32,
    pub dsv: u32,
}

impl Default for RgHeapCapacities {
    fn default() -> Self {
        Self {
            srv: 1024,
            rtv: 64,
            dsv: 16,
        }
    }
}

struct RgHeapSlot {
    heap: GfxDescriptorHeap,
    allocator: GfxDescriptorHeapAllocator,
}

impl RgHeapSlot {
    fn new(heap: GfxDescriptorHeap) -> Self {
        let allocator = GfxDescriptorHeapAllocator::new(&heap);
        Self { heap, allocator }
    }
}

/// 锁内的 heap 视图
pub struct RgLockedHeaps {
    srv: RgHeapSlot,
    rtv: RgHeapSlot,
    dsv: RgHeapSlot,
}

// getters
impl RgLockedHeaps {
    /// shader 可见的 view heap
    #[inline]
    pub fn srv_heap(&self) -> &GfxDescriptorHeap {
        &self.srv.heap
    }

    #[inline]
    pub fn srv_heap_mut(&mut self) -> &mut GfxDescriptorHeap {
        &mut self.srv.heap
    }

    #[inline]
    pub fn srv_heap_allocator(&mut self) -> &mut GfxDescriptorHeapAllocator {
        &mut self.srv.allocator
    }

    /// render target view heap
    #[inline]
    pub fn rtv_heap(&self) -> &GfxDescriptorHeap {
        &self.rtv.heap
    }

    #[inline]
    pub fn rtv_heap_mut(&mut self) -> &mut GfxDescriptorHeap {
        &mut self.rtv.heap
    }

    #[inline]
    pub fn rtv_heap_allocator(&mut self) -> &mut GfxDescriptorHeapAllocator {
        &mut self.rtv.allocator
    }

    /// depth stencil view heap
    #[inline]
    pub fn dsv_heap(&self) -> &GfxDescriptorHeap {
        &self.dsv.heap
    }

    #[inline]
    pub fn dsv_heap_mut(&mut self) -> &mut GfxDescriptorHeap {
        &mut self.dsv.heap
    }

    #[inline]
    pub fn dsv_heap_allocator(&mut self) -> &mut GfxDescriptorHeapAllocator {
        &mut self.dsv.allocator
    }
}

/// descriptor heap 的管理器，与资源管理器一样以显式上下文的方式传递
#[derive(Clone)]
pub struct RgHeapManager {
    heaps: Arc<Mutex<RgLockedHeaps>>,
}

// new & init
impl RgHeapManager {
    pub fn new(capacities: RgHeapCapacities) -> Self {
        Self::from_heaps(
            GfxDescriptorHeap::new(GfxDescriptorHeapKind::ShaderResource, capacities.srv, "srv-heap"),
            GfxDescriptorHeap::new(GfxDescriptorHeapKind::RenderTarget, capacities.rtv, "rtv-heap"),
            GfxDescriptorHeap::new(GfxDescriptorHeapKind::DepthStencil, capacities.dsv, "dsv-heap"),
        )
    }

    /// 使用平台层创建好的 heap（例如已经绑定了 bindless descriptor set 的 SRV heap）
    pub fn from_heaps(srv: GfxDescriptorHeap, rtv: GfxDescriptorHeap, dsv: GfxDescriptorHeap) -> Self {
        assert_eq!(srv.kind(), GfxDescriptorHeapKind::ShaderResource);
        assert_eq!(rtv.kind(), GfxDescriptorHeapKind::RenderTarget);
        assert_eq!(dsv.kind(), GfxDescriptorHeapKind::DepthStencil);
        log::info!(
            "create heap manager: srv {}, rtv {}, dsv {}",
            srv.capacity(),
            rtv.capacity(),
            dsv.capacity()
        );

        Self {
            heaps: Arc::new(Mutex::new(RgLockedHeaps {
                srv: RgHeapSlot::new(srv),
                rtv: RgHeapSlot::new(rtv),
                dsv: RgHeapSlot::new(dsv),
            })),
        }
    }
}

// tools
impl RgHeapManager {
    /// 阻塞地进入临界区，所有 heap 访问都必须在 `f` 内完成
    pub fn with_unique_lock<R>(&self, f: impl FnOnce(&mut RgLockedHeaps) -> R) -> R {
        let _span = tracy_client::span!("RgHeapManager::with_unique_lock");
        let mut heaps = self.heaps.lock();
        f(&mut heaps)
    }
}
