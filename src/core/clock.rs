use crate::player::pipeline::MediaClock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// 播放时钟 - 软件实现的媒体时钟
///
/// Clone 出来的句柄共享同一个时钟（Reader/引擎可以用它做节奏控制）。
#[derive(Clone)]
pub struct PlaybackClock {
    inner: Arc<Mutex<ClockInner>>,
}

struct ClockInner {
    base_pts: i64,              // 基准 PTS（毫秒）
    base_instant: Instant,      // 基准时刻
    playback_rate: f64,         // 播放速率（1.0 = 正常）
    paused: bool,
    paused_at: i64,             // 暂停时的位置
}

impl ClockInner {
    fn now(&self) -> i64 {
        if self.paused {
            self.paused_at
        } else {
            let elapsed = self.base_instant.elapsed().as_millis() as i64;
            self.base_pts + (elapsed as f64 * self.playback_rate) as i64
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                base_pts: 0,
                base_instant: Instant::now(),
                playback_rate: 1.0,
                paused: true,
                paused_at: 0,
            })),
        }
    }

    /// 获取当前播放时间（毫秒）
    pub fn now(&self) -> i64 {
        self.inner.lock().now()
    }

    /// 设置播放位置
    pub fn set_time(&self, pts: i64) {
        let mut inner = self.inner.lock();
        inner.base_pts = pts;
        inner.base_instant = Instant::now();
        inner.paused_at = pts;
    }

    /// 开始播放
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if inner.paused {
            inner.base_pts = inner.paused_at;
            inner.base_instant = Instant::now();
            inner.paused = false;
        }
    }

    /// 暂停播放
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            inner.paused_at = inner.now();
            inner.paused = true;
        }
    }

    /// 设置播放速率
    pub fn set_rate(&self, rate: f64) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            let current_time = inner.now();
            inner.base_pts = current_time;
            inner.base_instant = Instant::now();
        }
        inner.playback_rate = rate;
    }

    pub fn rate(&self) -> f64 {
        self.inner.lock().playback_rate
    }

    /// 是否暂停
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClock for PlaybackClock {
    fn start(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        self.pause();
    }

    fn set_speed(&mut self, multiplier: f64) {
        self.set_rate(multiplier);
    }

    fn current_position(&self) -> i64 {
        self.now()
    }

    fn reset(&mut self, position: i64) {
        self.set_time(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_paused_clock_does_not_advance() {
        let clock = PlaybackClock::new();
        clock.set_time(1200);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.now(), 1200);
        assert!(clock.is_paused());
    }

    #[test]
    fn test_clock_advances_with_rate() {
        let clock = PlaybackClock::new();
        clock.set_rate(2.0);
        clock.play();
        thread::sleep(Duration::from_millis(50));
        clock.pause();
        let pos = clock.now();
        assert!(pos >= 100, "2 倍速 50ms 后应至少 100ms，实际 {}", pos);
        assert_eq!(clock.rate(), 2.0);
    }

    #[test]
    fn test_media_clock_trait_reset() {
        let mut clock = PlaybackClock::new();
        MediaClock::start(&mut clock);
        MediaClock::reset(&mut clock, 5000);
        assert!(clock.current_position() >= 5000);
        MediaClock::stop(&mut clock);
        let frozen = clock.current_position();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(clock.current_position(), frozen);
    }
}
