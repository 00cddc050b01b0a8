use ash::vk;

/// frame graph 使用的 buffer 描述
///
/// 只持有 Vulkan handle，内存的分配与回收由平台层负责
#[derive(Clone, Debug)]
pub struct GfxBuffer {
    vk_buffer: vk::Buffer,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    device_address: Option<vk::DeviceAddress>,
}

// new & init
impl GfxBuffer {
    pub fn new(vk_buffer: vk::Buffer, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            vk_buffer,
            size,
            usage,
            device_address: None,
        }
    }

    /// builder
    #[inline]
    pub fn with_device_address(mut self, device_address: vk::DeviceAddress) -> Self {
        self.device_address = Some(device_address);
        self
    }
}

// getters
impl GfxBuffer {
    #[inline]
    pub fn vk_buffer(&self) -> vk::Buffer {
        self.vk_buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    /// 没有 SHADER_DEVICE_ADDRESS usage 的 buffer 返回 0
    #[inline]
    pub fn device_address(&self) -> vk::DeviceAddress {
        self.device_address.unwrap_or(0)
    }
}
