//! 把平台层创建好的 image 注册进 frame graph
//!
//! 注册时在 descriptor heap 中分配 slot 并写入 view，释放时归还 slot。

use ash::vk;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::error::RgResult;
use truvis_frame_graph::heap::heap_manager::RgLockedHeaps;
use truvis_frame_graph::resource::access_token::RgAccessToken;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_frame_graph::resource::resource_manager::RgLockedResources;
use truvis_gfx::commands::command_recorder::GfxCommandRecorder;
use truvis_gfx::descriptors::descriptor_heap::GfxDescriptorCpuHandle;
use truvis_gfx::resources::image::{GfxImage, GfxImageViews, GfxSwapchainImages};
use truvis_gfx::resources::resource::{GfxResource, GfxResourceKind};
use truvis_gfx::resources::resource_state::GfxResourceState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgRenderTargetUsage {
    Color,
    Depth,
}

/// 需要注册的 render target
#[derive(Clone, Debug)]
pub struct RgRenderTargetDesc {
    pub name: String,
    pub vk_image: vk::Image,
    /// 作为 attachment 使用的 view
    pub attachment_view: vk::ImageView,
    /// 作为纹理采样使用的 view
    pub sampled_view: vk::ImageView,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub array_layers: u32,
    pub usage: RgRenderTargetUsage,
}

/// 注册 render target，同时占用一个 SRV slot 以及一个 RTV 或 DSV slot
///
/// heap 耗尽时返回错误，已经分配的 slot 会被归还
pub fn register_render_target(ctx: &RgFrameGraphContext, desc: RgRenderTargetDesc) -> RgResult<RgResourceHandle> {
    let views = ctx.heap_manager().with_unique_lock(|heaps| -> RgResult<GfxImageViews> {
        let (srv_cpu, srv_gpu) = heaps.srv_heap_allocator().allocate_shader_visible()?;
        heaps.srv_heap_mut().write_view(srv_cpu, desc.sampled_view);

        let attachment = match desc.usage {
            RgRenderTargetUsage::Color => heaps.rtv_heap_allocator().allocate(),
            RgRenderTargetUsage::Depth => heaps.dsv_heap_allocator().allocate(),
        };
        let attachment = match attachment {
            Ok(attachment) => attachment,
            Err(e) => {
                heaps.srv_heap_mut().clear_view(srv_cpu);
                heaps.srv_heap_allocator().free_shader_visible(srv_cpu, srv_gpu);
                return Err(e.into());
            }
        };

        let mut views = GfxImageViews {
            srv: Some((srv_cpu, srv_gpu)),
            ..Default::default()
        };
        match desc.usage {
            RgRenderTargetUsage::Color => {
                heaps.rtv_heap_mut().write_view(attachment, desc.attachment_view);
                views.rtv = Some(attachment);
            }
            RgRenderTargetUsage::Depth => {
                heaps.dsv_heap_mut().write_view(attachment, desc.attachment_view);
                views.dsv = Some(attachment);
            }
        }
        Ok(views)
    })?;

    let aspect = match desc.usage {
        RgRenderTargetUsage::Color => vk::ImageAspectFlags::COLOR,
        RgRenderTargetUsage::Depth => vk::ImageAspectFlags::DEPTH,
    };
    let image = GfxImage::new(desc.vk_image, desc.format, desc.extent, aspect)
        .with_array_layers(desc.array_layers)
        .with_views(views);

    Ok(ctx.adder().add_resource(GfxResource::from_image(desc.name, image, GfxResourceState::UNDEFINED)))
}

/// 注册 swapchain，每张 image 占用一个 RTV slot
pub fn register_swapchain(
    ctx: &RgFrameGraphContext,
    name: &str,
    images: &[(vk::Image, vk::ImageView)],
    format: vk::Format,
    extent: vk::Extent2D,
) -> RgResult<RgResourceHandle> {
    let gfx_images = ctx.heap_manager().with_unique_lock(|heaps| -> RgResult<Vec<GfxImage>> {
        let mut gfx_images: Vec<GfxImage> = Vec::with_capacity(images.len());
        for &(vk_image, view) in images {
            let rtv = match heaps.rtv_heap_allocator().allocate() {
                Ok(rtv) => rtv,
                Err(e) => {
                    gfx_images.iter().for_each(|image| free_views(heaps, image.views()));
                    return Err(e.into());
                }
            };
            heaps.rtv_heap_mut().write_view(rtv, view);
            gfx_images.push(
                GfxImage::new(vk_image, format, extent, vk::ImageAspectFlags::COLOR).with_views(GfxImageViews {
                    rtv: Some(rtv),
                    ..Default::default()
                }),
            );
        }
        Ok(gfx_images)
    })?;

    Ok(ctx.adder().add_resource(GfxResource::from_swapchain(name, GfxSwapchainImages::new(gfx_images))))
}

/// 从 graph 中移除 render target 或 swapchain，归还 descriptor slot
///
/// 返回资源的所有权，GPU 对象由平台层销毁
pub fn release_render_target(ctx: &RgFrameGraphContext, handle: RgResourceHandle) -> Option<GfxResource> {
    let resource = ctx.eraser().erase_resource(handle)?;
    ctx.heap_manager().with_unique_lock(|heaps| match resource.kind() {
        GfxResourceKind::Image(image) => free_views(heaps, image.views()),
        GfxResourceKind::Swapchain(swapchain) => {
            swapchain.images().iter().for_each(|image| free_views(heaps, image.views()));
        }
        GfxResourceKind::Buffer(_) => {}
    });
    Some(resource)
}

/// 在锁内取 image 在 bindless 数组中的下标
///
/// 资源不是 image 或者没有 SRV 时返回 `None`
pub fn sampled_index(
    resources: &RgLockedResources<'_>,
    handle: RgResourceHandle,
    read_token: &RgAccessToken,
) -> Option<u32> {
    let (_, gpu) = resources.get_read_resource(handle, read_token).as_image()?.views().srv?;
    Some(gpu.index)
}

/// 把 color target 切换到 attachment 状态，返回其 RTV 与尺寸
///
/// swapchain 使用当前 acquire 的 image；不是带 RTV 的 image 时返回 `None`，且不录制任何 barrier
pub fn prepare_color_target(
    resources: &mut RgLockedResources<'_>,
    handle: RgResourceHandle,
    write_token: &RgAccessToken,
    cmd: &mut dyn GfxCommandRecorder,
) -> Option<(GfxDescriptorCpuHandle, vk::Extent2D)> {
    let image = resources.get_write_resource(handle, write_token).as_image()?;
    let target = (image.views().rtv?, image.extent());
    resources.transition_to(handle, write_token, cmd, GfxResourceState::COLOR_ATTACHMENT_WRITE);
    Some(target)
}

/// 覆盖整个 target 的 viewport
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

fn free_views(heaps: &mut RgLockedHeaps, views: &GfxImageViews) {
    if let Some((cpu, gpu)) = views.srv {
        heaps.srv_heap_mut().clear_view(cpu);
        heaps.srv_heap_allocator().free_shader_visible(cpu, gpu);
    }
    if let Some(rtv) = views.rtv {
        heaps.rtv_heap_mut().clear_view(rtv);
        heaps.rtv_heap_allocator().free(rtv);
    }
    if let Some(dsv) = views.dsv {
        heaps.dsv_heap_mut().clear_view(dsv);
        heaps.dsv_heap_allocator().free(dsv);
    }
}
