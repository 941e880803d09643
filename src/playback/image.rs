use std::{ffi::OsStr, fmt, path::Path, sync::Arc};
use tracing::info;

use super::{Canvas, FrameStore, Handoff, StaticImage, Texture};
use crate::error::{Error, Result};
use crate::thread::{PlaybackStatus, Scheduler, Status};

/// 按扩展名识别的格式
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Png,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<ImageFormat> {
        let extension = path.extension().and_then(OsStr::to_str)?;
        if extension.eq_ignore_ascii_case("gif") {
            Some(ImageFormat::Gif)
        } else if extension.eq_ignore_ascii_case("png") {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }
}

/// 图片基本信息
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Details {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    pub animated: bool,
}

impl fmt::Display for Details {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.width, self.height)?;
        if self.animated {
            write!(f, "\n{} frames", self.frame_count)?;
        }
        Ok(())
    }
}

/// 动画播放引擎实例。
///
/// 持有帧数据、交接画布和播放线程；丢弃时先停止并等待线程结束。
#[derive(Debug)]
pub struct AnimatedImage {
    // 声明顺序决定释放顺序：线程先停，再释放帧数据和画布
    scheduler: Option<Scheduler>,
    handoff: Arc<Handoff>,
    store: Arc<FrameStore>,
}

impl AnimatedImage {
    /// 打开并开始播放。单帧容器返回 [`Error::SingleFrameHint`]，不会启动线程。
    pub fn open(path: &Path) -> Result<AnimatedImage> {
        let store = FrameStore::open(path)?;
        Ok(AnimatedImage::from_store(store))
    }

    /// 在新画布上画好第 0 帧；多于一帧时启动播放线程
    pub fn from_store(store: FrameStore) -> AnimatedImage {
        let mut canvas = Canvas::new(u32::from(store.width()), u32::from(store.height()));
        if let Some(frame) = store.frame(0) {
            store.compositor().composite(&mut canvas, frame);
        }

        let handoff = Arc::new(Handoff::new(canvas.clone()));
        let store = Arc::new(store);
        let scheduler = (store.frame_count() > 1)
            .then(|| Scheduler::start(Arc::clone(&store), canvas, Arc::clone(&handoff)));

        AnimatedImage {
            scheduler,
            handoff,
            store,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (u32::from(self.store.width()), u32::from(self.store.height()))
    }

    pub fn frame_count(&self) -> usize {
        self.store.frame_count()
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn is_animated(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn poll_ready(&self) -> bool {
        self.handoff.poll_ready()
    }

    pub fn consume(&self) -> Texture {
        self.handoff.consume()
    }

    pub fn set_status(&self, status: Status) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.set_status(status);
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.scheduler
            .as_ref()
            .map_or(PlaybackStatus::Stopped, Scheduler::status)
    }

    /// 停止播放线程并释放所有资源
    pub fn close(mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }
}

/// 宿主持有的图片：静态或动画
#[derive(Debug)]
pub enum Image {
    Static(StaticImage),
    Animated(AnimatedImage),
}

impl Image {
    /// 按扩展名加载。GIF 只有一帧时改走静态路径。
    pub fn open(path: &Path) -> Result<Image> {
        match ImageFormat::from_path(path) {
            Some(ImageFormat::Gif) => match AnimatedImage::open(path) {
                Ok(animated) => Ok(Image::Animated(animated)),
                Err(err) if err.is_single_frame() => {
                    info!(path = %path.display(), "image better suited as static, switching");
                    StaticImage::open(path).map(Image::Static)
                }
                Err(err) => Err(err),
            },
            Some(ImageFormat::Png) => StaticImage::open(path).map(Image::Static),
            None => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Image::Static(image) => image.dimensions(),
            Image::Animated(image) => image.dimensions(),
        }
    }

    pub fn is_animated(&self) -> bool {
        match self {
            Image::Static(_) => false,
            Image::Animated(image) => image.is_animated(),
        }
    }

    pub fn poll_ready(&self) -> bool {
        match self {
            Image::Static(image) => image.poll_ready(),
            Image::Animated(image) => image.poll_ready(),
        }
    }

    pub fn consume(&self) -> Texture {
        match self {
            Image::Static(image) => image.consume(),
            Image::Animated(image) => image.consume(),
        }
    }

    /// 静态图片忽略
    pub fn set_status(&self, status: Status) {
        if let Image::Animated(image) = self {
            image.set_status(status);
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        match self {
            Image::Static(_) => PlaybackStatus::Stopped,
            Image::Animated(image) => image.status(),
        }
    }

    pub fn describe(&self) -> Details {
        let (width, height) = self.dimensions();
        Details {
            width,
            height,
            frame_count: match self {
                Image::Static(_) => 1,
                Image::Animated(image) => image.frame_count(),
            },
            animated: self.is_animated(),
        }
    }

    pub fn close(self) {
        if let Image::Animated(image) = self {
            image.close();
        }
    }
}
