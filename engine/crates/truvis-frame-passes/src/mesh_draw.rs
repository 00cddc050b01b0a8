use truvis_frame_graph::pass::builder::RgPassBuilder;
use truvis_frame_graph::resource::access_token::RgAccessToken;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_frame_graph::resource::resource_manager::RgLockedResources;

/// 材质类型，决定使用哪条管线
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgMaterialType(pub u32);

/// 本帧要绘制的一个 mesh
#[derive(Clone, Copy, Debug)]
pub struct RgMeshDraw {
    pub vertex_buffer: RgResourceHandle,
    pub index_buffer: RgResourceHandle,
    pub index_count: u32,
    /// 物体的 world 矩阵
    pub world_buffer: RgResourceHandle,
    pub material_type: RgMaterialType,
}

impl RgMeshDraw {
    /// 在 setup 中声明对 mesh 各个 buffer 的读取
    pub fn declare_reads(&self, builder: &mut RgPassBuilder<'_>) {
        builder.read(self.vertex_buffer).read(self.index_buffer).read(self.world_buffer);
    }

    /// 在锁内解析出录制需要的 Vulkan 对象
    ///
    /// 任何一个 buffer 不是 buffer 类型时返回 `None`
    pub fn resolve(&self, resources: &RgLockedResources<'_>, read_token: &RgAccessToken) -> Option<RgResolvedMeshDraw> {
        let vertex = resources.get_read_resource(self.vertex_buffer, read_token).as_buffer()?;
        let index = resources.get_read_resource(self.index_buffer, read_token).as_buffer()?;
        let world = resources.get_read_resource(self.world_buffer, read_token).as_buffer()?;
        Some(RgResolvedMeshDraw {
            vertex_buffer: vertex.vk_buffer(),
            index_buffer: index.vk_buffer(),
            index_count: self.index_count,
            world_address: world.device_address(),
            material_type: self.material_type,
        })
    }
}

/// 解析后的绘制参数，出锁之后用于录制
#[derive(Clone, Copy, Debug)]
pub struct RgResolvedMeshDraw {
    pub vertex_buffer: ash::vk::Buffer,
    pub index_buffer: ash::vk::Buffer,
    pub index_count: u32,
    pub world_address: ash::vk::DeviceAddress,
    pub material_type: RgMaterialType,
}
