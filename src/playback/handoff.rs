use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use super::{Canvas, Texture};

/// 播放线程和宿主渲染循环之间的交接点。
///
/// 播放线程在自己的后台画布上合成，完成后整块复制到前台画布再置 ready；
/// 宿主只读前台画布。锁只在复制期间持有，两边都不会看到写了一半的画面。
#[derive(Debug)]
pub struct Handoff {
    ready: AtomicBool,
    front: Mutex<Canvas>,
}

impl Handoff {
    /// 第一帧已经合成好，所以初始就是 ready
    pub fn new(canvas: Canvas) -> Handoff {
        Handoff {
            ready: AtomicBool::new(true),
            front: Mutex::new(canvas),
        }
    }

    /// 发布一帧完整画面
    pub fn publish(&self, back: &Canvas) {
        self.front
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .copy_from(back);
        self.ready.store(true, Ordering::Release);
    }

    pub fn poll_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// 取出当前画面并清除 ready。
    ///
    /// 先清标志再复制，复制期间发布的新帧会重新置位，不会丢。
    pub fn consume(&self) -> Texture {
        self.ready.store(false, Ordering::Release);
        let front = self.front.lock().unwrap_or_else(PoisonError::into_inner);
        Texture::from_canvas(&front)
    }
}
