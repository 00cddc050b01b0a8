use ash::vk;

use crate::resources::buffer::GfxBuffer;
use crate::resources::image::{GfxImage, GfxSwapchainImages};
use crate::resources::resource_state::GfxResourceState;

/// GPU 资源的具体类型
#[derive(Clone, Debug)]
pub enum GfxResourceKind {
    Buffer(GfxBuffer),
    Image(GfxImage),
    Swapchain(GfxSwapchainImages),
}

/// barrier 作用的对象
#[derive(Clone, Copy, Debug)]
pub enum GfxBarrierTarget {
    Image {
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        array_layers: u32,
    },
    Buffer {
        buffer: vk::Buffer,
        size: vk::DeviceSize,
    },
}

/// 被 frame graph 管理的 GPU 资源
///
/// 资源本身不可复制，只能通过 handle 引用；`current_state` 记录上一次 barrier 之后的状态
#[derive(Debug)]
pub struct GfxResource {
    name: String,
    kind: GfxResourceKind,
    current_state: GfxResourceState,
}

// new & init
impl GfxResource {
    pub fn new(name: impl Into<String>, kind: GfxResourceKind, initial_state: GfxResourceState) -> Self {
        Self {
            name: name.into(),
            kind,
            current_state: initial_state,
        }
    }

    #[inline]
    pub fn from_buffer(name: impl Into<String>, buffer: GfxBuffer, initial_state: GfxResourceState) -> Self {
        Self::new(name, GfxResourceKind::Buffer(buffer), initial_state)
    }

    #[inline]
    pub fn from_image(name: impl Into<String>, image: GfxImage, initial_state: GfxResourceState) -> Self {
        Self::new(name, GfxResourceKind::Image(image), initial_state)
    }

    /// swapchain 的初始状态为 PRESENT
    #[inline]
    pub fn from_swapchain(name: impl Into<String>, images: GfxSwapchainImages) -> Self {
        Self::new(name, GfxResourceKind::Swapchain(images), GfxResourceState::PRESENT)
    }
}

// getters
impl GfxResource {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &GfxResourceKind {
        &self.kind
    }

    #[inline]
    pub fn current_state(&self) -> GfxResourceState {
        self.current_state
    }

    #[inline]
    pub fn as_buffer(&self) -> Option<&GfxBuffer> {
        match &self.kind {
            GfxResourceKind::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// swapchain 返回当前 acquire 到的 image
    #[inline]
    pub fn as_image(&self) -> Option<&GfxImage> {
        match &self.kind {
            GfxResourceKind::Image(image) => Some(image),
            GfxResourceKind::Swapchain(swapchain) => Some(swapchain.current_image()),
            GfxResourceKind::Buffer(_) => None,
        }
    }

    #[inline]
    pub fn as_swapchain_mut(&mut self) -> Option<&mut GfxSwapchainImages> {
        match &mut self.kind {
            GfxResourceKind::Swapchain(swapchain) => Some(swapchain),
            _ => None,
        }
    }

    pub fn barrier_target(&self) -> GfxBarrierTarget {
        match &self.kind {
            GfxResourceKind::Buffer(buffer) => GfxBarrierTarget::Buffer {
                buffer: buffer.vk_buffer(),
                size: buffer.size(),
            },
            GfxResourceKind::Image(image) => GfxBarrierTarget::Image {
                image: image.vk_image(),
                aspect: image.aspect(),
                array_layers: image.array_layers(),
            },
            GfxResourceKind::Swapchain(swapchain) => {
                let image = swapchain.current_image();
                GfxBarrierTarget::Image {
                    image: image.vk_image(),
                    aspect: image.aspect(),
                    array_layers: 1,
                }
            }
        }
    }
}

// setters
impl GfxResource {
    /// 只记录状态，不录制 barrier
    #[inline]
    pub fn set_current_state(&mut self, state: GfxResourceState) {
        self.current_state = state;
    }
}
