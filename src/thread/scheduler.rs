use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

use crate::playback::{Canvas, FrameStore, Handoff};
use crate::DEFAULT_DELAY_CENTISECONDS;

/// 宿主发来的播放控制
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Play,
    Pause,
    Toggle,
}

/// 播放状态
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// 已停止（或者从未启动），不再有线程
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    /// 对 Playing/Paused 应用控制，Stopped 不受影响
    pub fn apply(self, status: Status) -> PlaybackStatus {
        match (self, status) {
            (PlaybackStatus::Stopped, _) => PlaybackStatus::Stopped,
            (_, Status::Play) => PlaybackStatus::Playing,
            (_, Status::Pause) => PlaybackStatus::Paused,
            (PlaybackStatus::Playing, Status::Toggle) => PlaybackStatus::Paused,
            (PlaybackStatus::Paused, Status::Toggle) => PlaybackStatus::Playing,
        }
    }
}

/// 帧游标：当前帧下标和缓存的延时，只由播放线程修改
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
    /// 百分之一秒
    delay: u16,
}

impl Cursor {
    /// 停在第 0 帧，延时取第 0 帧声明的值
    pub fn new(store: &FrameStore) -> Cursor {
        Cursor {
            index: 0,
            delay: store
                .frame(0)
                .and_then(|f| f.delay())
                .unwrap_or(DEFAULT_DELAY_CENTISECONDS),
        }
    }

    /// 前进一帧（取模回绕），返回在这一帧上应该停留的时间。
    ///
    /// 没有时间信息的帧沿用上一次缓存的延时。
    pub fn advance(&mut self, store: &FrameStore) -> Duration {
        self.index = (self.index + 1) % store.frame_count().max(1);
        if let Some(delay) = store.frame(self.index).and_then(|f| f.delay()) {
            self.delay = delay;
        }
        self.sleep()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn delay(&self) -> u16 {
        self.delay
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay) * 10)
    }
}

#[derive(Debug)]
struct Control {
    status: PlaybackStatus,
    quit: bool,
}

/// 控制状态，`set_status`/`shutdown` 改完后唤醒播放线程
#[derive(Debug)]
struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 暂停时阻塞，直到继续播放或退出。返回 `true` 表示应当退出。
    fn wait_while_paused(&self) -> bool {
        let control = self
            .wake
            .wait_while(self.lock(), |c| {
                c.status == PlaybackStatus::Paused && !c.quit
            })
            .unwrap_or_else(PoisonError::into_inner);
        control.quit
    }

    /// 睡 `duration`，期间收到退出信号立即返回。返回 `true` 表示应当退出。
    fn sleep(&self, duration: Duration) -> bool {
        let (control, _) = self
            .wake
            .wait_timeout_while(self.lock(), duration, |c| !c.quit)
            .unwrap_or_else(PoisonError::into_inner);
        control.quit
    }
}

/// 后台播放线程
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    /// 保存创建的线程
    thread: Option<thread::JoinHandle<()>>,
}

impl Scheduler {
    /// 启动播放线程，初始状态为播放。
    ///
    /// `canvas` 是已经画好第 0 帧的后台画布，归播放线程独占。
    ///
    /// # Panics
    ///
    /// `start` 函数在帧数不大于 1 时会 panic
    pub fn start(store: Arc<FrameStore>, canvas: Canvas, handoff: Arc<Handoff>) -> Scheduler {
        assert!(store.frame_count() > 1);

        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                status: PlaybackStatus::Playing,
                quit: false,
            }),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let thread = thread::spawn(move || run(&store, canvas, &handoff, &worker));
        debug!("playback thread started");

        Scheduler {
            shared,
            thread: Some(thread),
        }
    }

    pub fn set_status(&self, status: Status) {
        let mut control = self.shared.lock();
        let next = control.status.apply(status);
        if next != control.status {
            debug!(?status, from = ?control.status, to = ?next, "playback status changed");
            control.status = next;
            self.shared.wake.notify_all();
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.shared.lock().status
    }

    /// 发出退出信号并等待线程结束，重复调用无副作用
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            {
                let mut control = self.shared.lock();
                control.quit = true;
                control.status = PlaybackStatus::Stopped;
            }
            self.shared.wake.notify_all();
            if thread.join().is_err() {
                tracing::error!("playback thread panicked");
            }
            debug!("playback thread stopped");
        }
    }
}

impl Drop for Scheduler {
    // 在清理数据时结束线程
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 播放循环：按当前帧延时睡眠，然后前进、合成、发布。
///
/// 第 0 帧在加载时已经画好，所以第一轮先停留它的延时。
fn run(store: &FrameStore, mut canvas: Canvas, handoff: &Handoff, shared: &Shared) {
    let compositor = store.compositor();
    let mut cursor = Cursor::new(store);

    loop {
        if shared.sleep(cursor.sleep()) || shared.wait_while_paused() {
            break;
        }

        let sleep = cursor.advance(store);
        if let Some(frame) = store.frame(cursor.index()) {
            compositor.composite(&mut canvas, frame);
        }
        handoff.publish(&canvas);
        trace!(frame = cursor.index(), ?sleep, "frame ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{ColorTable, Frame, GraphicControl};
    use std::time::Instant;

    fn delayed(delay: Option<u16>) -> Frame {
        let frame = Frame::new(0, 0, 2, 2, vec![0; 4]);
        match delay {
            Some(delay) => frame.with_control(GraphicControl {
                flags: 0,
                delay,
                transparent_index: 0,
            }),
            None => frame,
        }
    }

    fn store(delays: &[Option<u16>]) -> FrameStore {
        let frames = delays.iter().map(|&d| delayed(d)).collect();
        FrameStore::new(2, 2, Some(ColorTable::from_packed(&[0, 0, 0])), frames).unwrap()
    }

    #[test]
    fn advancing_k_times_lands_on_k_mod_n() {
        for n in 1..5 {
            let store = store(&vec![Some(1); n]);
            let mut cursor = Cursor::new(&store);
            for k in 1..=12 {
                cursor.advance(&store);
                assert_eq!(cursor.index(), k % n);
            }
        }
    }

    #[test]
    fn missing_delay_reuses_last_declared_one() {
        let store = store(&[Some(7), Some(20), None, None, Some(5)]);
        let mut cursor = Cursor::new(&store);
        assert_eq!(cursor.delay(), 7);
        assert_eq!(cursor.advance(&store), Duration::from_millis(200));
        assert_eq!(cursor.advance(&store), Duration::from_millis(200));
        assert_eq!(cursor.advance(&store), Duration::from_millis(200));
        assert_eq!(cursor.advance(&store), Duration::from_millis(50));
    }

    #[test]
    fn first_frame_without_delay_uses_default() {
        let store = store(&[None, None]);
        let cursor = Cursor::new(&store);
        assert_eq!(cursor.delay(), DEFAULT_DELAY_CENTISECONDS);
    }

    #[test]
    fn toggle_twice_is_identity() {
        for status in [PlaybackStatus::Playing, PlaybackStatus::Paused] {
            assert_eq!(status.apply(Status::Toggle).apply(Status::Toggle), status);
        }
        assert_eq!(
            PlaybackStatus::Stopped.apply(Status::Play),
            PlaybackStatus::Stopped
        );
    }

    fn started(delays: &[Option<u16>]) -> (Scheduler, Arc<Handoff>) {
        let store = Arc::new(store(delays));
        let canvas = Canvas::new(2, 2);
        let handoff = Arc::new(Handoff::new(canvas.clone()));
        let scheduler = Scheduler::start(store, canvas, Arc::clone(&handoff));
        (scheduler, handoff)
    }

    #[test]
    fn thread_publishes_frames() {
        let (mut scheduler, handoff) = started(&[Some(1), Some(1)]);
        handoff.consume();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !handoff.poll_ready() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handoff.poll_ready());
        scheduler.shutdown();
        assert_eq!(scheduler.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn status_changes_are_observed() {
        let (scheduler, _handoff) = started(&[Some(1), Some(1)]);
        assert_eq!(scheduler.status(), PlaybackStatus::Playing);
        scheduler.set_status(Status::Pause);
        assert_eq!(scheduler.status(), PlaybackStatus::Paused);
        scheduler.set_status(Status::Toggle);
        assert_eq!(scheduler.status(), PlaybackStatus::Playing);
        scheduler.set_status(Status::Toggle);
        scheduler.set_status(Status::Toggle);
        assert_eq!(scheduler.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn shutdown_interrupts_a_long_sleep() {
        let (mut scheduler, _handoff) = started(&[Some(u16::MAX), Some(u16::MAX)]);
        let start = Instant::now();
        scheduler.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
        // 再调一次不会阻塞
        scheduler.shutdown();
    }

    #[test]
    fn shutdown_while_paused_returns() {
        let (mut scheduler, _handoff) = started(&[Some(1), Some(1)]);
        scheduler.set_status(Status::Pause);
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        scheduler.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn paused_thread_does_not_publish() {
        let (scheduler, handoff) = started(&[Some(1), Some(1)]);
        scheduler.set_status(Status::Pause);
        // 等正在进行的一次睡眠结束
        thread::sleep(Duration::from_millis(200));
        handoff.consume();
        thread::sleep(Duration::from_millis(200));
        assert!(!handoff.poll_ready());
    }

    #[test]
    #[should_panic]
    fn single_frame_store_cannot_start() {
        let store = Arc::new(store(&[Some(1)]));
        let canvas = Canvas::new(2, 2);
        let handoff = Arc::new(Handoff::new(canvas.clone()));
        Scheduler::start(store, canvas, handoff);
    }
}
