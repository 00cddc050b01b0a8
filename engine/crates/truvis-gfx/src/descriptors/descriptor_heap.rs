use ash::vk;

/// descriptor heap 的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxDescriptorHeapKind {
    /// shader 可见的 view，对应 bindless descriptor set 中的 sampled image 数组
    ShaderResource,
    /// color attachment 使用的 view
    RenderTarget,
    /// depth stencil attachment 使用的 view
    DepthStencil,
}

impl GfxDescriptorHeapKind {
    /// 只有 shader resource heap 是 shader 可见的
    #[inline]
    pub fn is_shader_visible(self) -> bool {
        matches!(self, Self::ShaderResource)
    }
}

/// heap 中某个 slot 的 cpu 侧 handle，用于写入 view 以及录制 attachment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxDescriptorCpuHandle {
    pub kind: GfxDescriptorHeapKind,
    pub index: u32,
}

/// shader 可见 slot 的 gpu 侧 handle，即 shader 中 bindless 数组的下标
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxDescriptorGpuHandle {
    pub index: u32,
}

/// 固定容量的 view slot 池
///
/// 每个 slot 保存一个 `vk::ImageView`；shader resource heap 额外持有对应的 bindless descriptor set。
/// 容量在创建后不会增长。
pub struct GfxDescriptorHeap {
    kind: GfxDescriptorHeapKind,
    views: Vec<Option<vk::ImageView>>,
    descriptor_set: vk::DescriptorSet,
    name: String,
}

// new & init
impl GfxDescriptorHeap {
    pub fn new(kind: GfxDescriptorHeapKind, capacity: u32, name: impl Into<String>) -> Self {
        assert!(capacity > 0, "descriptor heap capacity must be positive");
        Self {
            kind,
            views: vec![None; capacity as usize],
            descriptor_set: vk::DescriptorSet::null(),
            name: name.into(),
        }
    }

    /// builder，仅 shader resource heap 使用
    #[inline]
    pub fn with_descriptor_set(mut self, descriptor_set: vk::DescriptorSet) -> Self {
        debug_assert!(self.kind.is_shader_visible());
        self.descriptor_set = descriptor_set;
        self
    }
}

// getters
impl GfxDescriptorHeap {
    #[inline]
    pub fn kind(&self) -> GfxDescriptorHeapKind {
        self.kind
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.views.len() as u32
    }

    #[inline]
    pub fn is_shader_visible(&self) -> bool {
        self.kind.is_shader_visible()
    }

    #[inline]
    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

// tools
impl GfxDescriptorHeap {
    /// 将 view 写入 slot
    pub fn write_view(&mut self, handle: GfxDescriptorCpuHandle, view: vk::ImageView) {
        self.check_handle(handle);
        self.views[handle.index as usize] = Some(view);
    }

    /// 读取 slot 中的 view，slot 必须已经写入过
    pub fn view(&self, handle: GfxDescriptorCpuHandle) -> vk::ImageView {
        self.check_handle(handle);
        match self.views[handle.index as usize] {
            Some(view) => view,
            None => panic!("descriptor heap {} slot {} has no view written", self.name, handle.index),
        }
    }

    /// 清空 slot，由分配器在 free 之后配合调用
    pub fn clear_view(&mut self, handle: GfxDescriptorCpuHandle) {
        self.check_handle(handle);
        self.views[handle.index as usize] = None;
    }

    fn check_handle(&self, handle: GfxDescriptorCpuHandle) {
        assert_eq!(handle.kind, self.kind, "descriptor handle belongs to another heap");
        assert!(
            (handle.index as usize) < self.views.len(),
            "descriptor index {} out of range for heap {} (capacity {})",
            handle.index,
            self.name,
            self.views.len()
        );
    }
}
