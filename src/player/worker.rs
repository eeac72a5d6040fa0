use crate::core::{
    MediaDescriptor, MediaSource, MediaStatus, PlaybackState, PlayerError, PlayerErrorKind,
    ProcessorConfig, Result, StreamKind, TimeRange,
};
use crate::player::command_gate::{CommandGate, CommandKind, Order};
use crate::player::events::{EventBus, PlayerEvent};
use crate::player::metadata::convert_metadata;
use crate::player::pipeline::{EngineConfig, EngineReport, Pipeline, ReadResult};
use crate::player::state_machine::PlaybackStateMachine;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::process;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

const ENGINE_KINDS: [StreamKind; 3] = [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle];

/// 音量/静音（UI 线程随时读写，工作线程下一轮应用到音频引擎）
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AudioControl {
    pub gain: f64,
    pub muted: bool,
}

/// 调用线程和工作线程之间共享的数据
pub(crate) struct Shared {
    pub gate: CommandGate,
    pub descriptor: RwLock<Arc<MediaDescriptor>>,
    pub position: AtomicI64,
    pub audio: Mutex<AudioControl>,
    pub audio_dirty: AtomicBool,
    pub events: EventBus,
}

impl Shared {
    pub fn new(config: &ProcessorConfig, events: EventBus) -> Self {
        Self {
            gate: CommandGate::new(),
            descriptor: RwLock::new(Arc::new(MediaDescriptor::default())),
            position: AtomicI64::new(0),
            audio: Mutex::new(AudioControl {
                gain: config.initial_volume,
                muted: config.initial_muted,
            }),
            audio_dirty: AtomicBool::new(false),
            events,
        }
    }

    pub fn descriptor(&self) -> Arc<MediaDescriptor> {
        self.descriptor.read().clone()
    }
}

/// 投递到工作线程的阻塞调用
///
/// Open/Play 带提交顺序：比已执行的 stop（Play 还有 pause）更早提交的调用直接作废。
pub(crate) enum WorkerJob {
    Open { uri: String, order: Order, reply: Sender<bool> },
    Play { order: Order, reply: Sender<bool> },
    SetSpeed { multiplier: f64, reply: Sender<bool> },
    /// 只用来唤醒工作线程（有新命令或音量变化）
    Wake,
    Shutdown,
}

/// 工作线程内部的生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerPhase {
    Idle,
    Opening,
    Loaded,
    Running,
    Paused,
    Closing,
}

impl WorkerPhase {
    fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Idle => "Idle",
            WorkerPhase::Opening => "Opening",
            WorkerPhase::Loaded => "Loaded",
            WorkerPhase::Running => "Running",
            WorkerPhase::Paused => "Paused",
            WorkerPhase::Closing => "Closing",
        }
    }
}

/// 工作线程句柄
///
/// 构造时启动，drop 时发送 Shutdown 并 join。
pub(crate) struct WorkerThread {
    thread_handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    job_tx: Sender<WorkerJob>,
}

impl WorkerThread {
    pub fn spawn(
        shared: Arc<Shared>,
        pipeline: Pipeline,
        state_machine: PlaybackStateMachine,
        config: ProcessorConfig,
    ) -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<WorkerJob>();
        let name = config.worker_thread_name.clone();

        let worker = Worker {
            speed: config.default_speed,
            shared,
            jobs: job_rx,
            pipeline,
            sm: state_machine,
            config,
            phase: WorkerPhase::Idle,
            alive: true,
            last_uri: None,
            active: Vec::new(),
            reader_exhausted: false,
            started: false,
            last_buffer_percent: None,
            packet_count: 0,
            last_stop_order: 0,
            last_pause_order: 0,
        };

        let thread_handle = thread::Builder::new()
            .name(name)
            .spawn(move || worker.run())?;
        let thread_id = thread_handle.thread().id();

        Ok(Self {
            thread_handle: Some(thread_handle),
            thread_id,
            job_tx,
        })
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn send(&self, job: WorkerJob) -> Result<()> {
        self.job_tx.send(job).map_err(|_| PlayerError::WorkerGone)
    }

    /// 唤醒工作线程（非阻塞）
    pub fn wake(&self) {
        let _ = self.job_tx.send(WorkerJob::Wake);
    }

    /// 停止线程并等待退出
    ///
    /// 在工作线程自身上调用时不能 join，只发退出命令并分离线程。
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            info!("{} 🛑 WorkerThread::shutdown() called", log_ctx());
            let _ = self.job_tx.send(WorkerJob::Shutdown);
            if thread::current().id() == self.thread_id {
                error!(
                    "{} ❌ 处理器在工作线程上被释放（多半是事件回调持有最后一个引用），线程处理完当前任务后自行退出",
                    log_ctx()
                );
                drop(handle);
                return;
            }
            if handle.join().is_err() {
                error!("{} ❌ 工作线程异常退出", log_ctx());
            }
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            warn!("{} ⚠ WorkerThread 被 drop，但可能未调用 shutdown()，正在尝试优雅停止", log_ctx());
            self.shutdown();
        }
    }
}

/// 工作线程本体：持有外部协作者和状态机写端
struct Worker {
    shared: Arc<Shared>,
    jobs: Receiver<WorkerJob>,
    pipeline: Pipeline,
    sm: PlaybackStateMachine,
    config: ProcessorConfig,
    phase: WorkerPhase,
    alive: bool,
    last_uri: Option<String>,
    /// 已经打开的引擎
    active: Vec<StreamKind>,
    reader_exhausted: bool,
    /// 本次打开后是否已经发过 PlaybackStarted
    started: bool,
    last_buffer_percent: Option<u8>,
    speed: f64,
    packet_count: usize,
    /// 最近执行的 stop / pause 的提交顺序
    last_stop_order: Order,
    last_pause_order: Order,
}

impl Worker {
    fn run(mut self) {
        info!("{} 🎬 工作线程启动: {}", log_ctx(), self.pipeline.reader.description());

        while self.alive {
            // 每个工作单元之间先处理握手命令
            self.service_commands();
            self.apply_audio_settings(false);

            if !self.alive {
                break;
            }

            if self.phase == WorkerPhase::Running {
                while let Ok(job) = self.jobs.try_recv() {
                    self.handle_job(job);
                    if !self.alive {
                        break;
                    }
                }
                if self.phase == WorkerPhase::Running && !self.shared.gate.has_pending() {
                    self.decode_step();
                }
            } else {
                // 没有在解码：阻塞等待调用或唤醒
                match self.jobs.recv() {
                    Ok(job) => self.handle_job(job),
                    Err(_) => self.alive = false,
                }
            }
        }

        if self.phase != WorkerPhase::Idle {
            self.close_media(None);
        }
        self.shared.gate.close();
        info!("{} 🛑 工作线程退出（共处理 {} 个包）", log_ctx(), self.packet_count);
    }

    fn enter(&mut self, phase: WorkerPhase) {
        if self.phase != phase {
            debug!("{} 🔁 {} -> {}", log_ctx(), self.phase.as_str(), phase.as_str());
            self.phase = phase;
        }
    }

    fn emit_error(&self, kind: PlayerErrorKind, message: String) {
        error!("{} ❌ {}: {}", log_ctx(), kind.as_str(), message);
        self.shared.events.emit(PlayerEvent::Error { kind, message });
    }

    // ==================== 队列调用 ====================

    fn handle_job(&mut self, job: WorkerJob) {
        match job {
            WorkerJob::Open { uri, order, reply } => {
                // 先处理已挂起的命令，再和它们比较提交顺序
                self.service_commands();
                let ok = if order < self.last_stop_order {
                    info!("{} 🚫 open 早于已执行的 stop，作废: {}", log_ctx(), uri);
                    false
                } else {
                    self.open_source(&uri)
                };
                let _ = reply.send(ok);
            }
            WorkerJob::Play { order, reply } => {
                self.service_commands();
                let ok = if order < self.last_stop_order.max(self.last_pause_order) {
                    info!("{} 🚫 play 早于已执行的 stop/pause，作废", log_ctx());
                    false
                } else {
                    self.play()
                };
                let _ = reply.send(ok);
            }
            WorkerJob::SetSpeed { multiplier, reply } => {
                let ok = self.set_speed(multiplier);
                let _ = reply.send(ok);
            }
            WorkerJob::Wake => {}
            WorkerJob::Shutdown => {
                info!("{} ⏹ 工作线程收到退出命令", log_ctx());
                self.alive = false;
            }
        }
    }

    fn open_source(&mut self, uri: &str) -> bool {
        if self.phase != WorkerPhase::Idle {
            info!("{} 🔄 打开新媒体前关闭当前媒体", log_ctx());
            self.close_media(None);
        }

        let source = match MediaSource::parse(uri) {
            Some(source) => source,
            None => {
                self.last_uri = None;
                self.emit_error(PlayerErrorKind::SourceOpenFailure, "媒体源为空".to_string());
                self.sm.set_state(PlaybackState::Stopped);
                self.sm.set_media_status(MediaStatus::NoMedia);
                return false;
            }
        };

        self.enter(WorkerPhase::Opening);
        self.sm.set_media_status(MediaStatus::Loading);
        info!("{} 📂 打开{}: {}", log_ctx(), source.kind_str(), uri);

        let info = match self.pipeline.reader.open(uri) {
            Ok(info) => info,
            Err(e) => {
                self.last_uri = None;
                self.emit_error(PlayerErrorKind::SourceOpenFailure, e.to_string());
                self.sm.set_state(PlaybackState::Stopped);
                self.sm.set_media_status(MediaStatus::InvalidMedia);
                self.enter(WorkerPhase::Idle);
                return false;
            }
        };

        // 按流类型打开引擎
        self.active.clear();
        for kind in ENGINE_KINDS {
            let Some(stream) = info.first_stream(kind) else {
                continue;
            };
            let engine_config = EngineConfig {
                stream: stream.clone(),
                fps: info.fps,
                speed: self.speed,
            };
            match self.pipeline.engine_mut(kind) {
                Some(engine) => {
                    if let Err(e) = engine.open(&engine_config) {
                        self.abort_open(format!("{} 引擎打开失败: {}", kind.as_str(), e));
                        return false;
                    }
                    self.active.push(kind);
                }
                None => warn!("{} ⚠️  没有 {} 引擎，忽略该流", log_ctx(), kind.as_str()),
            }
        }

        self.pipeline.clock.stop();
        self.pipeline.clock.set_speed(self.speed);
        self.pipeline.clock.reset(0);
        self.shared.position.store(0, Ordering::SeqCst);
        self.apply_audio_settings(true);

        let descriptor = MediaDescriptor {
            source: uri.to_string(),
            streams: info.streams.clone(),
            duration: info.duration,
            seekable: info.seekable,
            has_video: info.first_stream(StreamKind::Video).is_some(),
            has_audio: info.first_stream(StreamKind::Audio).is_some(),
            has_subtitle: info.first_stream(StreamKind::Subtitle).is_some(),
            audio_index: info.first_stream(StreamKind::Audio).map(|s| s.index),
            subtitle_index: info.first_stream(StreamKind::Subtitle).map(|s| s.index),
            speed: self.speed,
            fps: info.fps,
            metadata: convert_metadata(&info),
        };
        self.publish(descriptor);

        self.last_uri = Some(uri.to_string());
        self.reader_exhausted = false;
        self.started = false;
        self.last_buffer_percent = None;
        self.sm.set_media_status(MediaStatus::Loaded);
        self.sm.set_state(PlaybackState::Inactive);
        self.enter(WorkerPhase::Loaded);
        info!(
            "{} ✅ 媒体已加载: {}ms, {} 条流, 可 seek: {}",
            log_ctx(),
            info.duration,
            info.streams.len(),
            info.seekable
        );
        true
    }

    /// 引擎打开失败：回滚已打开的引擎和 Reader
    fn abort_open(&mut self, message: String) {
        for kind in std::mem::take(&mut self.active) {
            if let Some(engine) = self.pipeline.engine_mut(kind) {
                engine.close();
            }
        }
        self.pipeline.reader.close();
        self.last_uri = None;
        self.emit_error(PlayerErrorKind::EngineFailure, message);
        self.sm.set_state(PlaybackState::Stopped);
        self.sm.set_media_status(MediaStatus::InvalidMedia);
        self.enter(WorkerPhase::Idle);
    }

    fn play(&mut self) -> bool {
        match self.phase {
            WorkerPhase::Running => true,
            WorkerPhase::Paused => {
                info!("{} ▶️  恢复播放", log_ctx());
                self.pipeline.clock.start();
                self.enter(WorkerPhase::Running);
                self.sm.set_state(PlaybackState::Playing);
                self.announce_started();
                true
            }
            WorkerPhase::Loaded => {
                info!("{} 🎬 开始播放", log_ctx());
                self.pipeline.clock.start();
                self.enter(WorkerPhase::Running);
                self.sm.set_state(PlaybackState::Playing);
                self.announce_started();
                true
            }
            WorkerPhase::Idle => match self.last_uri.clone() {
                Some(uri) => {
                    info!("{} 从停止状态恢复播放，重新打开: {}", log_ctx(), uri);
                    self.open_source(&uri) && self.play()
                }
                None => {
                    warn!("{} ⚠️  没有已加载的媒体，无法播放", log_ctx());
                    false
                }
            },
            WorkerPhase::Opening | WorkerPhase::Closing => false,
        }
    }

    fn announce_started(&mut self) {
        if !self.started {
            self.started = true;
            self.shared.events.emit(PlayerEvent::PlaybackStarted);
        }
    }

    fn set_speed(&mut self, multiplier: f64) -> bool {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            warn!("{} ⚠️  无效的播放速率: {}", log_ctx(), multiplier);
            return false;
        }

        info!("{} ⏩ 播放速率: {}", log_ctx(), multiplier);
        self.speed = multiplier;
        self.pipeline.clock.set_speed(multiplier);
        let current = self.shared.descriptor();
        if !current.is_empty() {
            let mut updated = (*current).clone();
            updated.speed = multiplier;
            self.publish(updated);
        }
        true
    }

    // ==================== 握手命令 ====================

    fn service_commands(&mut self) {
        let taken = self.shared.gate.take();
        if taken.is_empty() {
            return;
        }

        if let Some(stop_ticket) = taken.stop {
            // stop 优先：同时挂起的 seek/pause 直接丢弃
            if let Some((ticket, target)) = taken.seek {
                info!("{} 🚫 stop 挂起，丢弃 seek {}ms", log_ctx(), target);
                self.shared.gate.resolve(CommandKind::Seek, ticket, false);
            }
            if let Some(ticket) = taken.pause {
                self.shared.gate.resolve(CommandKind::Pause, ticket, false);
            }
            self.apply_stop();
            self.last_stop_order = self.last_stop_order.max(taken.stop_order);
            self.shared.gate.resolve(CommandKind::Stop, stop_ticket, true);
            return;
        }

        // pause 和 seek 同时挂起：先 seek 再 pause
        if let Some((ticket, target)) = taken.seek {
            let ok = self.apply_seek(target);
            self.shared.gate.resolve(CommandKind::Seek, ticket, ok);
        }
        if let Some(ticket) = taken.pause {
            let ok = self.apply_pause();
            if ok {
                self.last_pause_order = self.last_pause_order.max(taken.pause_order);
            }
            self.shared.gate.resolve(CommandKind::Pause, ticket, ok);
        }
    }

    fn apply_stop(&mut self) {
        info!("{} ⏹️  停止播放（当前 {}）", log_ctx(), self.phase.as_str());
        if self.phase == WorkerPhase::Idle {
            self.sm.set_state(PlaybackState::Stopped);
        } else {
            self.close_media(Some(MediaStatus::NoMedia));
        }
    }

    fn apply_pause(&mut self) -> bool {
        match self.phase {
            WorkerPhase::Running | WorkerPhase::Loaded => {
                info!("{} ⏸️  暂停", log_ctx());
                self.pipeline.clock.stop();
                self.shared
                    .position
                    .store(self.pipeline.clock.current_position(), Ordering::SeqCst);
                self.enter(WorkerPhase::Paused);
                self.sm.set_state(PlaybackState::Paused);
                true
            }
            WorkerPhase::Paused => true,
            _ => {
                warn!("{} ⚠️  没有已加载的媒体，忽略暂停", log_ctx());
                false
            }
        }
    }

    fn apply_seek(&mut self, target: i64) -> bool {
        if !matches!(
            self.phase,
            WorkerPhase::Loaded | WorkerPhase::Running | WorkerPhase::Paused
        ) {
            warn!("{} ⚠️  没有已加载的媒体，忽略 seek", log_ctx());
            return false;
        }

        let descriptor = self.shared.descriptor();
        if !descriptor.seekable {
            warn!("{} ⚠️  当前媒体不支持 seek", log_ctx());
            return false;
        }

        let target = if descriptor.duration > 0 {
            target.clamp(0, descriptor.duration)
        } else {
            target.max(0)
        };
        info!("{} 🎯 Seek 到: {} ms", log_ctx(), target);

        if let Err(e) = self.pipeline.reader.flush(target) {
            self.fail(e);
            return false;
        }
        for kind in self.active.clone() {
            if let Some(engine) = self.pipeline.engine_mut(kind) {
                engine.flush();
            }
        }
        self.pipeline.clock.reset(target);
        self.shared.position.store(target, Ordering::SeqCst);
        self.reader_exhausted = false;
        info!("{} ✅ Seek 完成: {}ms", log_ctx(), target);
        true
    }

    // ==================== 解码循环 ====================

    fn decode_step(&mut self) {
        const LOG_FIRST_N: usize = 5;

        if self.reader_exhausted {
            if self.engines_drained() {
                self.finish_playback();
            } else {
                self.idle_wait(self.config.drain_poll_ms);
                self.after_unit();
            }
            return;
        }

        match self.pipeline.reader.next_packet() {
            Ok(ReadResult::Packet(packet)) => {
                self.packet_count += 1;
                if self.packet_count <= LOG_FIRST_N || self.packet_count % 100 == 0 {
                    debug!(
                        "{} 📦 读取 {} 包 #{} pts={}ms",
                        log_ctx(),
                        packet.kind.as_str(),
                        self.packet_count,
                        packet.pts
                    );
                }

                if !self.active.contains(&packet.kind) {
                    // 没有对应引擎的流直接丢弃
                } else if let Some(engine) = self.pipeline.engine_mut(packet.kind) {
                    if let Err(e) = engine.submit(packet) {
                        self.fail(e);
                        return;
                    }
                }
            }
            Ok(ReadResult::Pending) => self.idle_wait(self.config.pending_backoff_ms),
            Ok(ReadResult::EndOfStream) => {
                info!("{} 📄 Reader 到达文件末尾，等待引擎排空...", log_ctx());
                self.reader_exhausted = true;
            }
            Err(e) => {
                self.fail(e);
                return;
            }
        }

        self.after_unit();
    }

    /// 每个单元之后：处理引擎上报，更新位置
    fn after_unit(&mut self) {
        if self.phase != WorkerPhase::Running {
            return;
        }
        if let Err(e) = self.poll_engine_reports() {
            self.fail(e);
            return;
        }
        self.shared
            .position
            .store(self.pipeline.clock.current_position(), Ordering::SeqCst);
    }

    /// 等待一段时间，有调用或命令到来时提前返回
    fn idle_wait(&mut self, ms: u64) {
        match self.jobs.recv_timeout(Duration::from_millis(ms)) {
            Ok(job) => self.handle_job(job),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.alive = false,
        }
    }

    fn engines_drained(&mut self) -> bool {
        let mut drained = true;
        for kind in self.active.clone() {
            if let Some(engine) = self.pipeline.engine_mut(kind) {
                drained &= engine.is_drained();
            }
        }
        drained
    }

    fn poll_engine_reports(&mut self) -> Result<()> {
        let mut reports = Vec::new();
        for kind in self.active.clone() {
            if let Some(engine) = self.pipeline.engine_mut(kind) {
                while let Some(report) = engine.poll_report() {
                    reports.push((kind, report));
                }
            }
        }

        for (kind, report) in reports {
            match report {
                EngineReport::Buffering(percent) => {
                    self.sm.set_media_status(MediaStatus::Buffering);
                    self.announce_buffer(percent.min(100));
                }
                EngineReport::Buffered => {
                    self.sm.set_media_status(MediaStatus::Buffered);
                    self.announce_buffer(100);
                }
                EngineReport::Stalled => {
                    warn!("{} ⚠️  {} 引擎断流", log_ctx(), kind.as_str());
                    self.sm.set_media_status(MediaStatus::Stalled);
                }
                EngineReport::Failed(message) => {
                    return Err(PlayerError::EngineError(format!(
                        "{} 引擎: {}",
                        kind.as_str(),
                        message
                    )));
                }
            }
        }
        Ok(())
    }

    fn announce_buffer(&mut self, percent: u8) {
        if self.last_buffer_percent != Some(percent) {
            self.last_buffer_percent = Some(percent);
            self.shared.events.emit(PlayerEvent::BufferStatusChanged(percent));
        }
    }

    fn apply_audio_settings(&mut self, force: bool) {
        let dirty = self.shared.audio_dirty.swap(false, Ordering::SeqCst);
        if !(force || dirty) || !self.active.contains(&StreamKind::Audio) {
            return;
        }
        let audio = *self.shared.audio.lock();
        if let Some(engine) = self.pipeline.engine_mut(StreamKind::Audio) {
            engine.set_volume(audio.gain);
            engine.set_muted(audio.muted);
        }
    }

    /// 文件读完且引擎排空
    fn finish_playback(&mut self) {
        info!("{} 🏁 播放完成", log_ctx());
        self.shared.events.emit(PlayerEvent::PlaybackCompleted);
        self.sm.set_media_status(MediaStatus::EndOfMedia);
        self.close_media(None);
    }

    /// 引擎或 Reader 运行中出错：关闭并停在 InvalidMedia
    fn fail(&mut self, e: PlayerError) {
        self.emit_error(PlayerErrorKind::EngineFailure, e.to_string());
        self.close_media(Some(MediaStatus::InvalidMedia));
    }

    // ==================== 关闭 ====================

    fn close_media(&mut self, final_status: Option<MediaStatus>) {
        self.enter(WorkerPhase::Closing);

        let mut buffers = Vec::new();
        for kind in std::mem::take(&mut self.active) {
            if let Some(engine) = self.pipeline.engine_mut(kind) {
                engine.flush();
                buffers.extend(engine.take_render_buffers());
                engine.close();
            }
        }
        self.pipeline.reader.close();
        self.pipeline.clock.stop();
        self.pipeline.clock.reset(0);
        self.shared.position.store(0, Ordering::SeqCst);

        // 渲染缓冲只能在渲染线程释放，这里只排队
        if let Some(bridge) = &self.pipeline.release_bridge {
            let count = buffers.len();
            let queued = buffers
                .into_iter()
                .try_for_each(|b| bridge.request_release(b))
                .and_then(|_| bridge.request_release_all());
            match queued {
                Ok(()) => debug!("{} 🗑️  已排队释放 {} 个渲染缓冲", log_ctx(), count),
                Err(e) => warn!("{} ⚠️  {}", log_ctx(), e),
            }
        } else if !buffers.is_empty() {
            warn!("{} ⚠️  没有释放桥，丢弃 {} 个渲染缓冲句柄", log_ctx(), buffers.len());
        }

        self.publish(MediaDescriptor::default());
        self.reader_exhausted = false;
        self.last_buffer_percent = None;
        self.sm.set_state(PlaybackState::Stopped);
        if let Some(status) = final_status {
            self.sm.set_media_status(status);
        }
        self.enter(WorkerPhase::Idle);
        info!("{} ✅ 媒体已关闭", log_ctx());
    }

    /// 整体替换媒体描述，并对变化的部分发通知
    fn publish(&mut self, descriptor: MediaDescriptor) {
        let previous = {
            let mut slot = self.shared.descriptor.write();
            std::mem::replace(&mut *slot, Arc::new(descriptor))
        };
        let current = self.shared.descriptor();

        if previous.duration != current.duration {
            self.shared
                .events
                .emit(PlayerEvent::StreamLengthChanged(current.duration));
        }
        if previous.metadata != current.metadata {
            self.shared
                .events
                .emit(PlayerEvent::MetadataChanged(current.metadata.clone()));
        }
        let ranges = |d: &MediaDescriptor| {
            if d.seekable {
                vec![TimeRange {
                    start: 0,
                    end: d.duration,
                }]
            } else {
                Vec::new()
            }
        };
        if ranges(previous.as_ref()) != ranges(current.as_ref()) {
            self.shared
                .events
                .emit(PlayerEvent::AvailableRangesChanged(ranges(current.as_ref())));
        }
    }
}
