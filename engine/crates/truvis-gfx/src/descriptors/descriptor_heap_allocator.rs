use crate::descriptors::descriptor_heap::{
    GfxDescriptorCpuHandle, GfxDescriptorGpuHandle, GfxDescriptorHeap, GfxDescriptorHeapKind,
};
use crate::error::{GfxError, GfxResult};

/// descriptor heap 上的 free-list 分配器
///
/// - 初始化时把所有 slot 逆序压栈，第一次分配得到 slot 0
/// - 释放的 slot 压回栈顶，下一次分配优先复用（LIFO）
/// - 不压缩，不扩容；耗尽时返回 [`GfxError::DescriptorHeapExhausted`]
pub struct GfxDescriptorHeapAllocator {
    kind: GfxDescriptorHeapKind,
    capacity: u32,
    free_indices: Vec<u32>,
    /// slot 是否处于已分配状态，用于检测重复释放
    allocated: Vec<bool>,
}

// new & init
impl GfxDescriptorHeapAllocator {
    pub fn new(heap: &GfxDescriptorHeap) -> Self {
        let capacity = heap.capacity();
        Self {
            kind: heap.kind(),
            capacity,
            free_indices: (0..capacity).rev().collect(),
            allocated: vec![false; capacity as usize],
        }
    }
}

// getters
impl GfxDescriptorHeapAllocator {
    #[inline]
    pub fn kind(&self) -> GfxDescriptorHeapKind {
        self.kind
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn free_count(&self) -> u32 {
        self.free_indices.len() as u32
    }

    #[inline]
    pub fn allocated_count(&self) -> u32 {
        self.capacity - self.free_count()
    }
}

// tools
impl GfxDescriptorHeapAllocator {
    /// 分配一个 cpu handle
    pub fn allocate(&mut self) -> GfxResult<GfxDescriptorCpuHandle> {
        let index = self.free_indices.pop().ok_or(GfxError::DescriptorHeapExhausted {
            kind: self.kind,
            capacity: self.capacity,
        })?;
        self.allocated[index as usize] = true;

        Ok(GfxDescriptorCpuHandle { kind: self.kind, index })
    }

    /// 分配 cpu handle 以及 shader 可见的 gpu handle，两者指向同一个 slot
    pub fn allocate_shader_visible(&mut self) -> GfxResult<(GfxDescriptorCpuHandle, GfxDescriptorGpuHandle)> {
        if !self.kind.is_shader_visible() {
            return Err(GfxError::NotShaderVisible { kind: self.kind });
        }
        let cpu = self.allocate()?;
        Ok((cpu, GfxDescriptorGpuHandle { index: cpu.index }))
    }

    /// 归还 slot
    ///
    /// # Panics
    /// slot 越界、属于其他 heap 或者已经被释放
    pub fn free(&mut self, handle: GfxDescriptorCpuHandle) {
        assert_eq!(handle.kind, self.kind, "descriptor handle belongs to another heap");
        assert!(handle.index < self.capacity, "descriptor index {} out of range ({})", handle.index, self.capacity);
        assert!(self.allocated[handle.index as usize], "descriptor index {} is already freed", handle.index);

        self.allocated[handle.index as usize] = false;
        self.free_indices.push(handle.index);
    }

    pub fn free_shader_visible(&mut self, cpu: GfxDescriptorCpuHandle, gpu: GfxDescriptorGpuHandle) {
        assert_eq!(cpu.index, gpu.index, "cpu and gpu descriptor handles refer to different slots");
        self.free(cpu);
    }
}
