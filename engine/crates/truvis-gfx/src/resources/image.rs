use ash::vk;

use crate::descriptors::descriptor_heap::{GfxDescriptorCpuHandle, GfxDescriptorGpuHandle};

/// image 在各个 descriptor heap 中占用的 slot
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxImageViews {
    /// shader resource heap 中的 slot，cpu 与 gpu(bindless) 两个 handle
    pub srv: Option<(GfxDescriptorCpuHandle, GfxDescriptorGpuHandle)>,
    /// render target heap 中的 slot
    pub rtv: Option<GfxDescriptorCpuHandle>,
    /// depth stencil heap 中的 slot
    pub dsv: Option<GfxDescriptorCpuHandle>,
}

/// frame graph 使用的 image 描述
#[derive(Clone, Debug)]
pub struct GfxImage {
    vk_image: vk::Image,
    format: vk::Format,
    extent: vk::Extent2D,
    aspect: vk::ImageAspectFlags,
    array_layers: u32,
    views: GfxImageViews,
}

// new & init
impl GfxImage {
    pub fn new(vk_image: vk::Image, format: vk::Format, extent: vk::Extent2D, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            vk_image,
            format,
            extent,
            aspect,
            array_layers: 1,
            views: GfxImageViews::default(),
        }
    }

    /// builder
    #[inline]
    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    /// builder
    #[inline]
    pub fn with_views(mut self, views: GfxImageViews) -> Self {
        self.views = views;
        self
    }
}

// getters
impl GfxImage {
    #[inline]
    pub fn vk_image(&self) -> vk::Image {
        self.vk_image
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    #[inline]
    pub fn views(&self) -> &GfxImageViews {
        &self.views
    }

    #[inline]
    pub fn views_mut(&mut self) -> &mut GfxImageViews {
        &mut self.views
    }
}

/// swapchain 的所有 image，以及本帧 acquire 到的那一张
#[derive(Clone, Debug)]
pub struct GfxSwapchainImages {
    images: Vec<GfxImage>,
    current: usize,
}

impl GfxSwapchainImages {
    pub fn new(images: Vec<GfxImage>) -> Self {
        assert!(!images.is_empty(), "swapchain must own at least one image");
        Self { images, current: 0 }
    }

    /// 由平台层在 acquire next image 之后调用
    #[inline]
    pub fn acquire(&mut self, index: usize) {
        assert!(index < self.images.len(), "swapchain image index {index} out of range");
        self.current = index;
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn current_image(&self) -> &GfxImage {
        &self.images[self.current]
    }

    #[inline]
    pub fn images(&self) -> &[GfxImage] {
        &self.images
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}
