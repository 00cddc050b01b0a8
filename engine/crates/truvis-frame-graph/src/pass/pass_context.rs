use truvis_gfx::commands::command_recorder::GfxCommandRecorder;

/// Pass 执行时的上下文
///
/// 包装本帧的命令录制器，资源与 heap 通过 pass 构造时拿到的管理器访问。
pub struct RgPassContext<'a> {
    cmd: &'a mut dyn GfxCommandRecorder,
    frame_id: u64,
}

impl<'a> RgPassContext<'a> {
    pub fn new(cmd: &'a mut dyn GfxCommandRecorder, frame_id: u64) -> Self {
        Self { cmd, frame_id }
    }

    #[inline]
    pub fn cmd(&mut self) -> &mut dyn GfxCommandRecorder {
        &mut *self.cmd
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
}
