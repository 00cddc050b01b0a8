use ash::vk;

/// 动态渲染的 color attachment
#[derive(Clone, Copy, Debug)]
pub struct GfxColorAttachment {
    pub view: vk::ImageView,
    /// `None` 表示 LOAD，否则以该颜色 CLEAR
    pub clear_color: Option<glam::Vec4>,
}

/// 动态渲染的 depth attachment
#[derive(Clone, Copy, Debug)]
pub struct GfxDepthAttachment {
    pub view: vk::ImageView,
    /// `None` 表示 LOAD，否则以 (depth, stencil) CLEAR
    pub clear_value: Option<(f32, u32)>,
}

/// `vkCmdBeginRendering` 所需的参数
#[derive(Clone, Debug)]
pub struct GfxRenderingInfo {
    pub render_area: vk::Rect2D,
    pub color_attachments: Vec<GfxColorAttachment>,
    pub depth_attachment: Option<GfxDepthAttachment>,
}

impl GfxRenderingInfo {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self {
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            color_attachments: Vec::new(),
            depth_attachment: None,
        }
    }

    /// builder
    #[inline]
    pub fn color(mut self, view: vk::ImageView, clear_color: Option<glam::Vec4>) -> Self {
        self.color_attachments.push(GfxColorAttachment { view, clear_color });
        self
    }

    /// builder
    #[inline]
    pub fn depth(mut self, view: vk::ImageView, clear_value: Option<(f32, u32)>) -> Self {
        self.depth_attachment = Some(GfxDepthAttachment { view, clear_value });
        self
    }

    /// 转换为 Vulkan 的 attachment 描述
    pub fn color_attachment_infos(&self) -> Vec<vk::RenderingAttachmentInfo<'static>> {
        self.color_attachments
            .iter()
            .map(|attachment| {
                let info = vk::RenderingAttachmentInfo::default()
                    .image_view(attachment.view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .store_op(vk::AttachmentStoreOp::STORE);
                match attachment.clear_color {
                    Some(color) => info.load_op(vk::AttachmentLoadOp::CLEAR).clear_value(vk::ClearValue {
                        color: vk::ClearColorValue {
                            float32: color.to_array(),
                        },
                    }),
                    None => info.load_op(vk::AttachmentLoadOp::LOAD),
                }
            })
            .collect()
    }

    pub fn depth_attachment_info(&self) -> Option<vk::RenderingAttachmentInfo<'static>> {
        self.depth_attachment.map(|attachment| {
            let info = vk::RenderingAttachmentInfo::default()
                .image_view(attachment.view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .store_op(vk::AttachmentStoreOp::STORE);
            match attachment.clear_value {
                Some((depth, stencil)) => info.load_op(vk::AttachmentLoadOp::CLEAR).clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
                }),
                None => info.load_op(vk::AttachmentLoadOp::LOAD),
            }
        })
    }
}
