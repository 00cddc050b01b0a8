use std::any::TypeId;
use std::fmt;

/// pass 的身份
///
/// 每个 pass 类型对应唯一的 id，同一个 graph 中一个 id 只能注册一次。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgPassId {
    type_id: TypeId,
    name: &'static str,
}

impl RgPassId {
    /// 以类型作为 pass 的身份
    pub fn of<T: 'static + ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        Self {
            type_id: TypeId::of::<T>(),
            name: full_name.rsplit("::").next().unwrap_or(full_name),
        }
    }

    /// 类型名（去掉模块路径）
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for RgPassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
