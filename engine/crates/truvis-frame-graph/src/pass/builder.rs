use crate::pass::render_pass::RgPassAccess;
use crate::resource::handle::RgResourceHandle;

/// Pass 构建器
///
/// 只在 setup 阶段存在，用于把 pass 要访问的句柄写入它自己的读/写令牌。
/// 构建器不能脱离 setup 闭包存活，setup 返回后令牌即被冻结。
pub struct RgPassBuilder<'a> {
    access: &'a mut RgPassAccess,
}

impl<'a> RgPassBuilder<'a> {
    pub(crate) fn new(access: &'a mut RgPassAccess) -> Self {
        Self { access }
    }

    /// 声明读取
    ///
    /// # Panics
    /// 句柄为空
    #[inline]
    pub fn read(&mut self, handle: RgResourceHandle) -> &mut Self {
        self.access.read_token.permit_access(handle);
        self
    }

    /// 声明写入
    ///
    /// # Panics
    /// 句柄为空
    #[inline]
    pub fn write(&mut self, handle: RgResourceHandle) -> &mut Self {
        self.access.write_token.permit_access(handle);
        self
    }

    /// 同时声明读写，常用于累积类操作
    #[inline]
    pub fn read_write(&mut self, handle: RgResourceHandle) -> &mut Self {
        self.read(handle).write(handle)
    }
}
