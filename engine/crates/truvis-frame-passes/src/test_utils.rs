use ash::vk;
use ash::vk::Handle;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::resource::access_token::RgAccessToken;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_gfx::commands::recording_command_buffer::GfxRecordedCommand;
use truvis_gfx::resources::buffer::GfxBuffer;
use truvis_gfx::resources::resource::GfxResource;
use truvis_gfx::resources::resource_state::GfxResourceState;

use crate::render_target::{RgRenderTargetDesc, RgRenderTargetUsage, register_render_target};

/// 已经上传好的只读 buffer，device address 为 `raw << 12`
pub fn add_buffer(ctx: &RgFrameGraphContext, raw: u64) -> RgResourceHandle {
    let buffer = GfxBuffer::new(vk::Buffer::from_raw(raw), 1024, vk::BufferUsageFlags::STORAGE_BUFFER)
        .with_device_address(raw << 12);
    ctx.adder().add_resource(GfxResource::from_buffer(format!("buffer-{raw}"), buffer, GfxResourceState::SHADER_READ_GENERIC))
}

pub fn add_target(ctx: &RgFrameGraphContext, raw: u64, usage: RgRenderTargetUsage, array_layers: u32) -> RgResourceHandle {
    let format = match usage {
        RgRenderTargetUsage::Color => vk::Format::R16G16B16A16_SFLOAT,
        RgRenderTargetUsage::Depth => vk::Format::D32_SFLOAT,
    };
    register_render_target(
        ctx,
        RgRenderTargetDesc {
            name: format!("target-{raw}"),
            vk_image: vk::Image::from_raw(raw),
            attachment_view: vk::ImageView::from_raw(raw * 10),
            sampled_view: vk::ImageView::from_raw(raw * 10 + 1),
            format,
            extent: vk::Extent2D { width: 64, height: 32 },
            array_layers,
            usage,
        },
    )
    .unwrap()
}

/// 绕过 pass 直接读取资源当前状态
pub fn current_state(ctx: &RgFrameGraphContext, handle: RgResourceHandle) -> GfxResourceState {
    let mut token = RgAccessToken::new();
    token.permit_access(handle);
    ctx.resource_manager().with_lock(|resources| resources.get_read_resource(handle, &token).current_state())
}

pub fn count_commands(commands: &[GfxRecordedCommand], f: impl Fn(&GfxRecordedCommand) -> bool) -> usize {
    commands.iter().filter(|c| f(c)).count()
}
