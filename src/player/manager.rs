use crate::core::{
    MediaDescriptor, MediaStatus, PlaybackState, PlayerErrorKind, ProcessorConfig, Result,
};
use crate::player::command_gate::CommandKind;
use crate::player::events::{EventBus, PlayerEvent};
use crate::player::pipeline::Pipeline;
use crate::player::state_machine::{PlaybackStateMachine, StateReader};
use crate::player::volume::{gain_to_level, level_to_gain};
use crate::player::worker::{Shared, WorkerJob, WorkerThread};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

/// 媒体处理器 - 对外的播放控制接口
///
/// 所有方法都可以从任意线程调用。play/pause/stop/seek/set_source/set_speed
/// 会阻塞到工作线程处理完毕；状态、位置、元数据、音量的读写不阻塞。
/// 不要在事件回调里调用阻塞方法（回调运行在工作线程上），这种调用会返回 false
/// 并发出 `WrongThread` 错误通知。
pub struct MediaProcessor {
    shared: Arc<Shared>,
    state: StateReader,
    worker: WorkerThread,
}

impl MediaProcessor {
    pub fn new(pipeline: Pipeline) -> Result<Self> {
        Self::with_config(pipeline, ProcessorConfig::default())
    }

    pub fn with_config(pipeline: Pipeline, config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        info!("{} 🎮 创建媒体处理器...", log_ctx());

        let events = EventBus::new(config.event_channel_capacity);
        let shared = Arc::new(Shared::new(&config, events.clone()));
        let state_machine = PlaybackStateMachine::new(events);
        let state = state_machine.reader();
        let worker = WorkerThread::spawn(shared.clone(), pipeline, state_machine, config)?;

        info!("{} ✅ 媒体处理器创建完成", log_ctx());
        Ok(Self {
            shared,
            state,
            worker,
        })
    }

    // ==================== 通知 ====================

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// 订阅事件通道
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    /// 注册回调（在工作线程上执行）
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.shared.events.add_listener(listener);
    }

    // ==================== 阻塞命令 ====================

    /// 打开媒体源，成功后状态为 Inactive / Loaded
    pub fn set_source(&self, uri: &str) -> bool {
        info!("{} 📂 设置媒体源: {}", log_ctx(), uri);
        let uri = uri.to_string();
        let order = self.shared.gate.next_order();
        self.invoke("set_source", move |reply| WorkerJob::Open { uri, order, reply })
    }

    /// 播放
    pub fn play(&self) -> bool {
        info!("{} 🎬 播放", log_ctx());
        let order = self.shared.gate.next_order();
        self.invoke("play", move |reply| WorkerJob::Play { order, reply })
    }

    /// 暂停播放
    pub fn pause(&self) -> bool {
        info!("{} ⏸️  暂停", log_ctx());
        self.command(CommandKind::Pause, 0)
    }

    /// 停止播放（任何状态下都会回到 Stopped）
    pub fn stop(&self) -> bool {
        info!("{} ⏹️  停止", log_ctx());
        self.command(CommandKind::Stop, 0)
    }

    /// 跳转到指定位置（毫秒）
    pub fn seek(&self, position_ms: i64) -> bool {
        info!("{} 🎯 Seek 到: {} ms", log_ctx(), position_ms);
        self.command(CommandKind::Seek, position_ms)
    }

    /// 设置播放速率（1.0 = 正常）
    pub fn set_speed(&self, multiplier: f64) -> bool {
        self.invoke("set_speed", move |reply| WorkerJob::SetSpeed { multiplier, reply })
    }

    // ==================== 非阻塞查询 ====================

    pub fn state(&self) -> PlaybackState {
        self.state.state()
    }

    pub fn media_status(&self) -> MediaStatus {
        self.state.media_status()
    }

    /// 当前媒体的完整快照
    pub fn descriptor(&self) -> Arc<MediaDescriptor> {
        self.shared.descriptor()
    }

    pub fn source(&self) -> String {
        self.descriptor().source.clone()
    }

    pub fn streams(&self) -> Vec<String> {
        self.descriptor().stream_names()
    }

    /// 当前播放位置（毫秒）
    pub fn stream_position(&self) -> i64 {
        self.shared.position.load(Ordering::SeqCst)
    }

    /// 总时长（毫秒）
    pub fn stream_length(&self) -> i64 {
        self.descriptor().duration
    }

    pub fn has_audio(&self) -> bool {
        self.descriptor().has_audio
    }

    pub fn has_video(&self) -> bool {
        self.descriptor().has_video
    }

    pub fn has_subtitle(&self) -> bool {
        self.descriptor().has_subtitle
    }

    pub fn is_seekable(&self) -> bool {
        self.descriptor().seekable
    }

    pub fn metadata(&self) -> BTreeMap<String, Value> {
        self.descriptor().metadata.clone()
    }

    // ==================== 音量 ====================

    /// 设置音量：linear 为 true 时 0 - 100，否则为毫贝（-6000 - 0）
    pub fn set_volume(&self, level: i64, linear: bool) {
        let gain = level_to_gain(level, linear);
        self.shared.audio.lock().gain = gain;
        self.shared.audio_dirty.store(true, Ordering::SeqCst);
        self.worker.wake();
    }

    pub fn volume(&self, linear: bool) -> i64 {
        gain_to_level(self.shared.audio.lock().gain, linear)
    }

    pub fn set_mute(&self, muted: bool) {
        self.shared.audio.lock().muted = muted;
        self.shared.audio_dirty.store(true, Ordering::SeqCst);
        self.worker.wake();
    }

    pub fn muted(&self) -> bool {
        self.shared.audio.lock().muted
    }

    // ==================== 内部 ====================

    /// 阻塞方法在工作线程上调用会死锁，直接拒绝
    fn on_worker_thread(&self, operation: &'static str) -> bool {
        if thread::current().id() != self.worker.thread_id() {
            return false;
        }
        let message = format!("{} 不能在工作线程上调用", operation);
        error!("{} ❌ {}", log_ctx(), message);
        self.shared.events.emit(PlayerEvent::Error {
            kind: PlayerErrorKind::WrongThread,
            message,
        });
        true
    }

    /// 经命令门的握手
    fn command(&self, kind: CommandKind, seek_target: i64) -> bool {
        if self.on_worker_thread(kind.as_str()) {
            return false;
        }
        let Some(ticket) = self.shared.gate.post(kind, seek_target) else {
            return false;
        };
        self.worker.wake();
        self.shared.gate.wait(kind, ticket)
    }

    /// 阻塞的队列调用
    fn invoke<F>(&self, operation: &'static str, make_job: F) -> bool
    where
        F: FnOnce(Sender<bool>) -> WorkerJob,
    {
        if self.on_worker_thread(operation) {
            return false;
        }
        let (reply_tx, reply_rx) = bounded(1);
        if let Err(e) = self.worker.send(make_job(reply_tx)) {
            error!("{} ❌ {} 失败: {}", log_ctx(), operation, e);
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }
}

impl Drop for MediaProcessor {
    fn drop(&mut self) {
        self.worker.shutdown();
    }
}
