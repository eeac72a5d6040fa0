use crate::core::{MediaStatus, PlaybackState};
use crate::player::events::{EventBus, PlayerEvent};
use log::info;
use std::process;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

struct StateCell {
    state: AtomicU8,
    status: AtomicU8,
}

/// 播放状态机（写端）
///
/// 只有工作线程持有写端，其它线程通过 [`StateReader`] 读取。
/// 值没有变化时什么都不做；变化时先写入再发通知，
/// 所以收到通知后任何线程读到的都是新值。
pub struct PlaybackStateMachine {
    cell: Arc<StateCell>,
    events: EventBus,
}

/// 播放状态机（只读端，可在任意线程使用）
#[derive(Clone)]
pub struct StateReader {
    cell: Arc<StateCell>,
}

impl PlaybackStateMachine {
    pub fn new(events: EventBus) -> Self {
        Self {
            cell: Arc::new(StateCell {
                state: AtomicU8::new(PlaybackState::Stopped as u8),
                status: AtomicU8::new(MediaStatus::NoMedia as u8),
            }),
            events,
        }
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            cell: self.cell.clone(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.cell.state.load(Ordering::SeqCst))
    }

    pub fn media_status(&self) -> MediaStatus {
        MediaStatus::from_u8(self.cell.status.load(Ordering::SeqCst))
    }

    /// 返回是否真的发生了变化
    pub fn set_state(&mut self, state: PlaybackState) -> bool {
        let old = self.state();
        if old == state {
            return false;
        }

        info!("{} 🔀 状态变化 {} -> {}", log_ctx(), old.as_str(), state.as_str());
        self.cell.state.store(state as u8, Ordering::SeqCst);
        self.events.emit(PlayerEvent::StateChanged(state));
        true
    }

    /// 返回是否真的发生了变化
    pub fn set_media_status(&mut self, status: MediaStatus) -> bool {
        let old = self.media_status();
        if old == status {
            return false;
        }

        info!("{} 🔀 媒体状态变化 {} -> {}", log_ctx(), old.as_str(), status.as_str());
        self.cell.status.store(status as u8, Ordering::SeqCst);
        self.events.emit(PlayerEvent::MediaStatusChanged(status));
        true
    }
}

impl StateReader {
    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.cell.state.load(Ordering::SeqCst))
    }

    pub fn media_status(&self) -> MediaStatus {
        MediaStatus::from_u8(self.cell.status.load(Ordering::SeqCst))
    }
}
