use truvis_gfx::error::GfxError;

use crate::pass::pass_id::RgPassId;
use crate::resource::handle::RgResourceHandle;

/// 访问资源时使用的令牌种类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgAccessKind {
    Read,
    Write,
}

/// frame graph 的错误
#[derive(Debug, thiserror::Error)]
pub enum RgError {
    #[error("resource handle {0:?} is stale or was never added")]
    StaleHandle(RgResourceHandle),

    #[error("{kind:?} access to {handle:?} was not declared by the pass")]
    AccessDenied { handle: RgResourceHandle, kind: RgAccessKind },

    #[error("pass {0} is already registered")]
    DuplicatePass(RgPassId),

    #[error("pass {0} is not registered")]
    PassNotRegistered(RgPassId),

    #[error("setup of pass {0} failed")]
    SetupFailed(RgPassId),

    #[error("execute of pass {0} failed")]
    ExecuteFailed(RgPassId),

    #[error("pass {0} has not completed setup for this frame")]
    PassNotReady(RgPassId),

    #[error(transparent)]
    Gfx(#[from] GfxError),
}

pub type RgResult<T> = Result<T, RgError>;
