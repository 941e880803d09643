use std::path::PathBuf;
pub use Error::*;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// 路径无法访问，或者不是可识别的图片容器
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    /// 容器已打开但数据无法完整解析（截断、损坏、帧区域越界）
    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    /// 只有一帧，调用方应改走静态图片路径重新加载
    #[error("{} has a single frame, reload it as a static image", path.display())]
    SingleFrameHint { path: PathBuf },
    /// Congratulations, you've discovered an edge case
    #[error("unsupported image format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// 保存 png 快照失败
    #[error("failed to export {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn open(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Open {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 是否是可恢复的单帧重定向，而不是真正的错误
    pub fn is_single_frame(&self) -> bool {
        matches!(self, Self::SingleFrameHint { .. })
    }
}
