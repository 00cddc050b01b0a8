use ash::vk;

/// 外部创建好的图形管线
///
/// shader 与管线状态由平台层负责，这里只保留录制命令需要的 handle
#[derive(Clone, Copy, Debug)]
pub struct GfxGraphicsPipeline {
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    push_constant_stages: vk::ShaderStageFlags,
}

impl GfxGraphicsPipeline {
    pub fn new(pipeline: vk::Pipeline, layout: vk::PipelineLayout) -> Self {
        Self {
            pipeline,
            layout,
            push_constant_stages: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// builder
    #[inline]
    pub fn with_push_constant_stages(mut self, stages: vk::ShaderStageFlags) -> Self {
        self.push_constant_stages = stages;
        self
    }

    #[inline]
    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    #[inline]
    pub fn push_constant_stages(&self) -> vk::ShaderStageFlags {
        self.push_constant_stages
    }
}
