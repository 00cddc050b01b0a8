use ash::vk;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::pass::frame_params::RgFrameParams;
use truvis_frame_graph::pass::pass_id::RgPassId;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_gfx::resources::resource_state::GfxResourceState;

use crate::pass_base::RgPassBase;

/// 单条 `vkCmdUpdateBuffer` 的上限
const UPDATE_BUFFER_CHUNK: usize = 65536;

/// `vkCmdUpdateBuffer` 的 offset 与 size 都必须是 4 的倍数
const UPDATE_BUFFER_ALIGNMENT: vk::DeviceSize = 4;

/// 一次上传
#[derive(Clone, Debug)]
pub struct RgUploadTask {
    pub target: RgResourceHandle,
    pub offset: vk::DeviceSize,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct BufferUploadFrameParams {
    tasks: Vec<RgUploadTask>,
}

/// 把 CPU 数据写入 GPU buffer
///
/// 每个目标先切换到 TRANSFER_DST，写入后切换到通用只读状态，供后续 pass 作为顶点、索引或常量读取。
pub struct BufferUploadPass {
    ctx: RgFrameGraphContext,
    params: RgFrameParams<BufferUploadFrameParams>,
}

// new & init
impl BufferUploadPass {
    pub fn new(ctx: &RgFrameGraphContext) -> Self {
        Self {
            ctx: ctx.clone(),
            params: RgFrameParams::new(),
        }
    }
}

// 本帧参数
impl BufferUploadPass {
    pub fn add_upload_task(&self, target: RgResourceHandle, data: impl Into<Vec<u8>>) {
        self.add_upload_task_at(target, 0, data);
    }

    pub fn add_upload_task_at(&self, target: RgResourceHandle, offset: vk::DeviceSize, data: impl Into<Vec<u8>>) {
        let data = data.into();
        self.params.update(|p| p.tasks.push(RgUploadTask { target, offset, data }));
    }

    /// 上传一个 POD 值，例如相机矩阵
    pub fn add_upload_pod<T: bytemuck::Pod>(&self, target: RgResourceHandle, value: &T) {
        self.add_upload_task(target, bytemuck::bytes_of(value));
    }

    pub fn pending_task_count(&self) -> usize {
        self.params.read(|p| p.tasks.len())
    }
}

impl RgPassBase for BufferUploadPass {
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool {
        let setup_params = self.params.clone();
        let execute_params = self.params.clone();
        let discard_params = self.params.clone();
        let resource_manager = self.ctx.resource_manager().clone();

        graph.add_pass_with_discard(
            RgPassId::of::<Self>(),
            move |builder| {
                setup_params.read(|p| {
                    for task in &p.tasks {
                        builder.write(task.target);
                    }
                });
                true
            },
            move |pass, pass_ctx| {
                let _span = tracy_client::span!("BufferUploadPass::execute");
                let frame = execute_params.take();
                if frame.tasks.is_empty() {
                    return true;
                }

                let cmd = pass_ctx.cmd();
                resource_manager.with_lock(|resources| {
                    // 先检查所有任务，任何一个非法时本帧不录制任何上传
                    let mut targets = Vec::with_capacity(frame.tasks.len());
                    for task in &frame.tasks {
                        let resource = resources.get_write_resource(task.target, pass.write_token());
                        let Some(buffer) = resource.as_buffer() else {
                            log::error!("upload target {} is not a buffer", resource.name());
                            return false;
                        };
                        if let Err(reason) = check_upload_range(task, buffer.size()) {
                            log::error!("upload to {} rejected: {reason}", resource.name());
                            return false;
                        }
                        targets.push(buffer.vk_buffer());
                    }

                    for (task, vk_buffer) in frame.tasks.iter().zip(targets) {
                        resources.transition_to(task.target, pass.write_token(), cmd, GfxResourceState::BUFFER_TRANSFER_DST);
                        for (i, chunk) in task.data.chunks(UPDATE_BUFFER_CHUNK).enumerate() {
                            let offset = task.offset + (i * UPDATE_BUFFER_CHUNK) as vk::DeviceSize;
                            cmd.cmd_update_buffer(vk_buffer, offset, chunk);
                        }
                        resources.transition_to(task.target, pass.write_token(), cmd, GfxResourceState::SHADER_READ_GENERIC);
                    }
                    true
                })
            },
            move || discard_params.reset(),
        )
    }
}

/// 写入范围必须落在 buffer 内，且满足 `vkCmdUpdateBuffer` 的对齐要求
fn check_upload_range(task: &RgUploadTask, buffer_size: vk::DeviceSize) -> Result<(), String> {
    let len = task.data.len() as vk::DeviceSize;
    if task.offset % UPDATE_BUFFER_ALIGNMENT != 0 || len % UPDATE_BUFFER_ALIGNMENT != 0 {
        return Err(format!(
            "{len} bytes at {} is not {UPDATE_BUFFER_ALIGNMENT}-byte aligned",
            task.offset
        ));
    }
    if task.offset.checked_add(len).is_none_or(|end| end > buffer_size) {
        return Err(format!("{len} bytes at {} overflows {buffer_size} bytes", task.offset));
    }
    Ok(())
}
