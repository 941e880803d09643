pub mod command;
pub mod error;
pub mod playback;
pub mod thread;

pub use error::{Error, Result};
pub use playback::{AnimatedImage, Image, Texture};
pub use thread::{PlaybackStatus, Status};

/// 第一帧没有声明延时时使用，百分之一秒
pub const DEFAULT_DELAY_CENTISECONDS: u16 = 10;
/// 宿主渲染循环默认刷新率
pub const REFRESH_RATE: u32 = 60;
