//! 资源句柄
//!
//! 句柄只是资源的身份（slot index + generation），不拥有资源。
//! 资源被擦除后 slot 的 generation 会递增，旧句柄随之失效；相等性比较基于这份身份。

use slotmap::Key;

slotmap::new_key_type! {
    /// 指向 [`super::container::RgResourceContainer`] 中某个资源的句柄
    ///
    /// `Default` 得到的是空句柄，不指向任何资源
    pub struct RgResourceHandle;
}

impl RgResourceHandle {
    /// 空句柄
    #[inline]
    pub fn null_handle() -> Self {
        <Self as Key>::null()
    }

    /// 是否为有效（非空）句柄，不代表资源仍然存在
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.is_null()
    }
}
