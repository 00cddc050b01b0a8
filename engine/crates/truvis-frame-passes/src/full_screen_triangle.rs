use ash::vk;
use truvis_frame_graph::pass::builder::RgPassBuilder;
use truvis_frame_graph::resource::access_token::RgAccessToken;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_frame_graph::resource::resource_manager::RgLockedResources;
use truvis_gfx::commands::command_recorder::GfxCommandRecorder;

/// 覆盖整个屏幕的三角形，合成类 pass 共用
#[derive(Clone, Copy, Debug)]
pub struct RgFullScreenTriangle {
    pub vertex_buffer: RgResourceHandle,
    pub index_buffer: RgResourceHandle,
}

impl RgFullScreenTriangle {
    pub const INDEX_COUNT: u32 = 3;

    pub fn declare_reads(&self, builder: &mut RgPassBuilder<'_>) {
        builder.read(self.vertex_buffer).read(self.index_buffer);
    }

    /// 返回 (vertex buffer, index buffer)
    pub fn resolve(&self, resources: &RgLockedResources<'_>, read_token: &RgAccessToken) -> Option<(vk::Buffer, vk::Buffer)> {
        let vertex = resources.get_read_resource(self.vertex_buffer, read_token).as_buffer()?;
        let index = resources.get_read_resource(self.index_buffer, read_token).as_buffer()?;
        Some((vertex.vk_buffer(), index.vk_buffer()))
    }

    pub fn draw(cmd: &mut dyn GfxCommandRecorder, buffers: (vk::Buffer, vk::Buffer)) {
        cmd.cmd_bind_vertex_buffer(buffers.0, 0);
        cmd.cmd_bind_index_buffer(buffers.1, 0, vk::IndexType::UINT16);
        cmd.cmd_draw_indexed(Self::INDEX_COUNT, 1, 0, 0, 0);
    }
}
