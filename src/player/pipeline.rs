use crate::core::{RenderBuffer, Result, StreamInfo, StreamKind};
use crate::player::buffer_bridge::BufferReleaseBridge;
use std::collections::BTreeMap;

/// 媒体包（可跨线程传递）
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: StreamKind,
    pub stream_index: usize,
    pub pts: i64,           // 显示时间戳（毫秒）
    pub duration: i64,      // 持续时间（毫秒）
    pub data: Vec<u8>,
}

/// Reader 每次读取的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult {
    /// 读到一个包
    Packet(Packet),
    /// 暂时没有数据（网络缓冲中或已经读得足够超前）
    Pending,
    /// 到达文件末尾
    EndOfStream,
}

/// Reader 打开成功后给出的源信息
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceInfo {
    pub streams: Vec<StreamInfo>,
    pub duration: i64,          // 总时长（毫秒）
    pub seekable: bool,
    pub fps: f64,
    /// 容器里的原始标签（键名由 Reader 决定，通常是小写）
    pub tags: BTreeMap<String, String>,
}

impl SourceInfo {
    /// 指定类型的第一条流
    pub fn first_stream(&self, kind: StreamKind) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == kind)
    }
}

/// 媒体源读取器（解封装器）抽象接口
///
/// 所有方法只会在工作线程上被调用。
pub trait MediaReader: Send {
    /// 打开媒体源
    fn open(&mut self, uri: &str) -> Result<SourceInfo>;

    /// 读取下一个媒体包
    fn next_packet(&mut self) -> Result<ReadResult>;

    /// 跳转到指定位置（毫秒）并丢弃已缓冲的包
    fn flush(&mut self, position: i64) -> Result<()>;

    /// 关闭媒体源
    fn close(&mut self);

    /// 获取描述信息（用于调试）
    fn description(&self) -> String {
        "MediaReader".to_string()
    }
}

/// 硬件/软件媒体时钟
pub trait MediaClock: Send {
    fn start(&mut self);
    fn stop(&mut self);
    fn set_speed(&mut self, multiplier: f64);
    /// 当前流位置（毫秒）
    fn current_position(&self) -> i64;
    /// 重置到指定位置（seek 和关闭时使用）
    fn reset(&mut self, position: i64);
}

/// 引擎打开参数
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub stream: StreamInfo,
    pub fps: f64,
    pub speed: f64,
}

/// 引擎异步上报的状态
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReport {
    /// 缓冲中（百分比 0 - 100）
    Buffering(u8),
    /// 缓冲完成
    Buffered,
    /// 数据断流
    Stalled,
    /// 不可恢复的错误
    Failed(String),
}

/// 视频/音频/字幕 解码渲染引擎
///
/// 所有方法只会在工作线程上被调用。
pub trait StreamEngine: Send {
    fn open(&mut self, config: &EngineConfig) -> Result<()>;

    fn submit(&mut self, packet: Packet) -> Result<()>;

    /// 丢弃所有已缓冲的数据
    fn flush(&mut self);

    fn close(&mut self);

    /// 取出一条异步上报（没有则返回 None）
    fn poll_report(&mut self) -> Option<EngineReport> {
        None
    }

    /// 已提交的数据是否全部渲染完毕
    fn is_drained(&mut self) -> bool {
        true
    }

    /// 关闭时交出仍持有的渲染缓冲，由编排器送回渲染线程释放
    fn take_render_buffers(&mut self) -> Vec<RenderBuffer> {
        Vec::new()
    }

    /// 音频引擎：设置线性增益（0.0 - 1.0）
    fn set_volume(&mut self, _gain: f64) {}

    /// 音频引擎：静音
    fn set_muted(&mut self, _muted: bool) {}
}

/// 渲染缓冲提供者
///
/// release 只能在拥有渲染上下文的线程上调用，由 BufferReleaseBridge 保证。
pub trait BufferProvider: Send + Sync {
    fn allocate(&self) -> Result<RenderBuffer>;

    fn release(&self, buffer: RenderBuffer);

    /// 释放全部缓冲
    fn release_all(&self) {}
}

/// 交给编排器的外部协作者集合
///
/// 构造编排器时整体移入工作线程。
pub struct Pipeline {
    pub reader: Box<dyn MediaReader>,
    pub clock: Box<dyn MediaClock>,
    pub video: Option<Box<dyn StreamEngine>>,
    pub audio: Option<Box<dyn StreamEngine>>,
    pub subtitle: Option<Box<dyn StreamEngine>>,
    pub release_bridge: Option<BufferReleaseBridge>,
}

impl Pipeline {
    pub fn new(reader: Box<dyn MediaReader>, clock: Box<dyn MediaClock>) -> Self {
        Self {
            reader,
            clock,
            video: None,
            audio: None,
            subtitle: None,
            release_bridge: None,
        }
    }

    pub fn with_engine(mut self, kind: StreamKind, engine: Box<dyn StreamEngine>) -> Self {
        match kind {
            StreamKind::Video => self.video = Some(engine),
            StreamKind::Audio => self.audio = Some(engine),
            StreamKind::Subtitle => self.subtitle = Some(engine),
        }
        self
    }

    pub fn with_release_bridge(mut self, bridge: BufferReleaseBridge) -> Self {
        self.release_bridge = Some(bridge);
        self
    }

    pub(crate) fn engine_mut(&mut self, kind: StreamKind) -> Option<&mut Box<dyn StreamEngine>> {
        match kind {
            StreamKind::Video => self.video.as_mut(),
            StreamKind::Audio => self.audio.as_mut(),
            StreamKind::Subtitle => self.subtitle.as_mut(),
        }
    }
}
