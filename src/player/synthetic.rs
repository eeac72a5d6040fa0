//! 合成媒体管线
//!
//! 不依赖 FFmpeg 的 Reader / 引擎 / 缓冲提供者实现，按播放时钟节奏产生数据。
//! 演示程序和测试都用它驱动编排器。

use crate::core::{
    PlaybackClock, PlayerError, RenderBuffer, Result, StreamInfo, StreamKind,
};
use crate::player::pipeline::{
    BufferProvider, EngineConfig, EngineReport, MediaReader, Packet, Pipeline, ReadResult,
    SourceInfo, StreamEngine,
};
use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Reader 最多领先时钟多少毫秒
const LOOKAHEAD_MS: i64 = 200;
/// 视频引擎持有的渲染缓冲数
const RENDER_RING: usize = 4;

/// 一条合成媒体的描述
#[derive(Debug, Clone)]
pub struct SyntheticMedia {
    /// 时长（毫秒），0 表示无限长的直播流
    pub duration: i64,
    pub seekable: bool,
    pub video: bool,
    pub audio: bool,
    pub subtitle: bool,
    pub packet_interval: i64,
    pub tags: BTreeMap<String, String>,
    pub open_delay: Duration,
}

impl SyntheticMedia {
    pub fn new(duration: i64) -> Self {
        Self {
            duration,
            seekable: true,
            video: true,
            audio: true,
            subtitle: false,
            packet_interval: 40,
            tags: BTreeMap::new(),
            open_delay: Duration::ZERO,
        }
    }

    pub fn seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    pub fn audio_only(mut self) -> Self {
        self.video = false;
        self.audio = true;
        self
    }

    pub fn with_subtitles(mut self) -> Self {
        self.subtitle = true;
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    fn streams(&self) -> Vec<StreamInfo> {
        let mut streams = Vec::new();
        let mut push = |kind: StreamKind, codec: &str, language: Option<&str>| {
            let index = streams.len();
            streams.push(StreamInfo {
                index,
                kind,
                codec: codec.to_string(),
                language: language.map(str::to_string),
            });
        };
        if self.video {
            push(StreamKind::Video, "h264", None);
        }
        if self.audio {
            push(StreamKind::Audio, "aac", Some("und"));
        }
        if self.subtitle {
            push(StreamKind::Subtitle, "subrip", Some("eng"));
        }
        streams
    }
}

/// 调用记录（测试里用来断言工作线程做了什么）
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
    reads: Arc<AtomicU64>,
}

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// 以 prefix 开头的记录条数
    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.contains(needle))
    }

    /// next_packet 被调用的次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

struct OpenMedia {
    media: SyntheticMedia,
    kinds: Vec<(StreamKind, usize)>,
    next_pts: i64,
    next_kind: usize,
}

/// 合成 Reader：按 uri 在目录里查找媒体，按时钟节奏吐包
pub struct SyntheticReader {
    catalog: BTreeMap<String, SyntheticMedia>,
    clock: PlaybackClock,
    log: CallLog,
    current: Option<OpenMedia>,
}

impl SyntheticReader {
    pub fn new(catalog: Vec<(&str, SyntheticMedia)>, clock: PlaybackClock, log: CallLog) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|(uri, media)| (uri.to_string(), media))
                .collect(),
            clock,
            log,
            current: None,
        }
    }

    /// 组装一条完整的合成管线（视频/音频/字幕引擎共享同一个时钟）
    pub fn pipeline(
        catalog: Vec<(&str, SyntheticMedia)>,
        clock: PlaybackClock,
        log: CallLog,
    ) -> Pipeline {
        let reader = SyntheticReader::new(catalog, clock.clone(), log.clone());
        let mut pipeline = Pipeline::new(Box::new(reader), Box::new(clock.clone()));
        for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
            pipeline = pipeline.with_engine(
                kind,
                Box::new(SyntheticEngine::new(kind, clock.clone(), log.clone())),
            );
        }
        pipeline
    }
}

impl MediaReader for SyntheticReader {
    fn open(&mut self, uri: &str) -> Result<SourceInfo> {
        self.log.push(format!("reader.open:{}", uri));
        let media = self
            .catalog
            .get(uri)
            .cloned()
            .ok_or_else(|| PlayerError::OpenError(format!("找不到媒体源: {}", uri)))?;

        if !media.open_delay.is_zero() {
            thread::sleep(media.open_delay);
        }

        let streams = media.streams();
        let info = SourceInfo {
            streams: streams.clone(),
            duration: media.duration,
            seekable: media.seekable,
            fps: if media.video {
                1000.0 / media.packet_interval as f64
            } else {
                0.0
            },
            tags: media.tags.clone(),
        };
        self.current = Some(OpenMedia {
            kinds: streams.iter().map(|s| (s.kind, s.index)).collect(),
            media,
            next_pts: 0,
            next_kind: 0,
        });
        Ok(info)
    }

    fn next_packet(&mut self) -> Result<ReadResult> {
        self.log.reads.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| PlayerError::Other("Reader 未打开".to_string()))?;

        if open.media.duration > 0 && open.next_pts >= open.media.duration {
            return Ok(ReadResult::EndOfStream);
        }
        if open.kinds.is_empty() {
            return Ok(ReadResult::EndOfStream);
        }
        if open.next_pts > now + LOOKAHEAD_MS {
            return Ok(ReadResult::Pending);
        }

        let (kind, stream_index) = open.kinds[open.next_kind];
        let packet = Packet {
            kind,
            stream_index,
            pts: open.next_pts,
            duration: open.media.packet_interval,
            data: vec![0u8; 16],
        };
        open.next_kind += 1;
        if open.next_kind == open.kinds.len() {
            open.next_kind = 0;
            open.next_pts += open.media.packet_interval;
        }
        Ok(ReadResult::Packet(packet))
    }

    fn flush(&mut self, position: i64) -> Result<()> {
        self.log.push(format!("reader.flush:{}", position));
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| PlayerError::Other("Reader 未打开".to_string()))?;
        let interval = open.media.packet_interval.max(1);
        open.next_pts = position / interval * interval;
        open.next_kind = 0;
        Ok(())
    }

    fn close(&mut self) {
        if self.current.take().is_some() {
            self.log.push("reader.close");
        }
    }

    fn description(&self) -> String {
        format!("SyntheticReader({} 条媒体)", self.catalog.len())
    }
}

/// 合成引擎：记录调用，按时钟判断是否排空
pub struct SyntheticEngine {
    kind: StreamKind,
    clock: PlaybackClock,
    log: CallLog,
    reports: VecDeque<EngineReport>,
    submitted: usize,
    /// 已提交数据的结束时间（毫秒）
    last_end: i64,
    buffers: VecDeque<RenderBuffer>,
    next_buffer_id: u64,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
}

impl SyntheticEngine {
    pub fn new(kind: StreamKind, clock: PlaybackClock, log: CallLog) -> Self {
        Self {
            kind,
            clock,
            log,
            reports: VecDeque::new(),
            submitted: 0,
            last_end: 0,
            buffers: VecDeque::new(),
            next_buffer_id: 1,
            fail_after: None,
            stall_after: None,
        }
    }

    /// 第 n 个包提交时返回错误
    pub fn with_failure_after(mut self, packets: usize) -> Self {
        self.fail_after = Some(packets);
        self
    }

    /// 第 n 个包提交后上报断流
    pub fn with_stall_after(mut self, packets: usize) -> Self {
        self.stall_after = Some(packets);
        self
    }

    fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl StreamEngine for SyntheticEngine {
    fn open(&mut self, config: &EngineConfig) -> Result<()> {
        self.log.push(format!("{}.open:{}", self.name(), config.stream.codec));
        self.reports.push_back(EngineReport::Buffering(0));
        self.submitted = 0;
        self.last_end = 0;
        Ok(())
    }

    fn submit(&mut self, packet: Packet) -> Result<()> {
        self.submitted += 1;
        if self.fail_after.is_some_and(|n| self.submitted >= n) {
            return Err(PlayerError::EngineError(format!(
                "{} 解码失败 pts={}",
                self.name(),
                packet.pts
            )));
        }
        if self.submitted == 1 {
            self.reports.push_back(EngineReport::Buffered);
        }
        if self.stall_after == Some(self.submitted) {
            self.reports.push_back(EngineReport::Stalled);
        }
        self.last_end = self.last_end.max(packet.pts + packet.duration);

        if self.kind == StreamKind::Video {
            if self.buffers.len() < RENDER_RING {
                let id = self.next_buffer_id;
                self.next_buffer_id += 1;
                self.buffers.push_back(RenderBuffer {
                    id,
                    texture: id as u32,
                    width: 320,
                    height: 180,
                });
            } else if let Some(front) = self.buffers.pop_front() {
                // 环形复用
                self.buffers.push_back(front);
            }
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.log.push(format!("{}.flush", self.name()));
        self.last_end = 0;
    }

    fn close(&mut self) {
        self.log.push(format!("{}.close", self.name()));
        self.reports.clear();
    }

    fn poll_report(&mut self) -> Option<EngineReport> {
        self.reports.pop_front()
    }

    fn is_drained(&mut self) -> bool {
        self.clock.now() >= self.last_end
    }

    fn take_render_buffers(&mut self) -> Vec<RenderBuffer> {
        self.buffers.drain(..).collect()
    }

    fn set_volume(&mut self, gain: f64) {
        self.log.push(format!("{}.volume:{:.2}", self.name(), gain));
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.push(format!("{}.muted:{}", self.name(), muted));
    }
}

/// 合成缓冲提供者：记录每次释放发生在哪个线程
#[derive(Default)]
pub struct SyntheticProvider {
    next_id: AtomicU64,
    released: Mutex<Vec<(u64, ThreadId)>>,
    release_all_calls: Mutex<Vec<ThreadId>>,
}

impl SyntheticProvider {
    pub fn released_count(&self) -> usize {
        self.released.lock().len()
    }

    pub fn release_all_count(&self) -> usize {
        self.release_all_calls.lock().len()
    }

    /// 所有释放是否都发生在指定线程上
    pub fn all_released_on(&self, owner: ThreadId) -> bool {
        self.released.lock().iter().all(|(_, tid)| *tid == owner)
            && self.release_all_calls.lock().iter().all(|tid| *tid == owner)
    }
}

impl BufferProvider for SyntheticProvider {
    fn allocate(&self) -> Result<RenderBuffer> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RenderBuffer {
            id,
            texture: id as u32,
            width: 320,
            height: 180,
        })
    }

    fn release(&self, buffer: RenderBuffer) {
        debug!("🗑️  SyntheticProvider 释放 #{}", buffer.id);
        self.released.lock().push((buffer.id, thread::current().id()));
    }

    fn release_all(&self) {
        self.release_all_calls.lock().push(thread::current().id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::pipeline::MediaClock;

    fn open_reader(media: SyntheticMedia) -> (SyntheticReader, PlaybackClock, CallLog) {
        let clock = PlaybackClock::new();
        let log = CallLog::default();
        let mut reader = SyntheticReader::new(vec![("demo://a", media)], clock.clone(), log.clone());
        reader.open("demo://a").unwrap();
        (reader, clock, log)
    }

    #[test]
    fn test_reader_interleaves_streams_and_paces_on_clock() {
        let (mut reader, _clock, log) = open_reader(SyntheticMedia::new(10_000));

        let mut kinds = Vec::new();
        loop {
            match reader.next_packet().unwrap() {
                ReadResult::Packet(p) => kinds.push((p.kind, p.pts)),
                ReadResult::Pending => break,
                ReadResult::EndOfStream => panic!("不应该读完"),
            }
        }
        // 时钟停在 0：读到 LOOKAHEAD 就暂停
        assert_eq!(kinds[0], (StreamKind::Video, 0));
        assert_eq!(kinds[1], (StreamKind::Audio, 0));
        assert!(kinds.iter().all(|(_, pts)| *pts <= LOOKAHEAD_MS));
        assert_eq!(log.reads(), kinds.len() as u64 + 1);
    }

    #[test]
    fn test_reader_flush_and_end_of_stream() {
        let (mut reader, mut clock, log) = open_reader(SyntheticMedia::new(400).audio_only());
        reader.flush(390).unwrap();
        assert!(log.contains("reader.flush:390"));

        clock.reset(1000);
        match reader.next_packet().unwrap() {
            ReadResult::Packet(p) => assert_eq!(p.pts, 360),
            other => panic!("期望数据包，实际 {:?}", other),
        }
        assert_eq!(reader.next_packet().unwrap(), ReadResult::EndOfStream);
    }

    #[test]
    fn test_unknown_uri_fails_to_open() {
        let mut reader = SyntheticReader::new(vec![], PlaybackClock::new(), CallLog::default());
        assert!(matches!(reader.open("demo://nope"), Err(PlayerError::OpenError(_))));
    }

    #[test]
    fn test_engine_reports_and_drain() {
        let clock = PlaybackClock::new();
        let log = CallLog::default();
        let mut engine = SyntheticEngine::new(StreamKind::Video, clock.clone(), log.clone());
        let stream = StreamInfo {
            index: 0,
            kind: StreamKind::Video,
            codec: "h264".into(),
            language: None,
        };
        engine
            .open(&EngineConfig {
                stream,
                fps: 25.0,
                speed: 1.0,
            })
            .unwrap();
        for i in 0..6 {
            engine
                .submit(Packet {
                    kind: StreamKind::Video,
                    stream_index: 0,
                    pts: i * 40,
                    duration: 40,
                    data: Vec::new(),
                })
                .unwrap();
        }
        assert_eq!(engine.poll_report(), Some(EngineReport::Buffering(0)));
        assert_eq!(engine.poll_report(), Some(EngineReport::Buffered));
        assert_eq!(engine.poll_report(), None);

        assert!(!engine.is_drained());
        clock.set_time(240);
        assert!(engine.is_drained());

        assert_eq!(engine.take_render_buffers().len(), RENDER_RING);
        assert!(engine.take_render_buffers().is_empty());
        assert_eq!(log.count("video.open"), 1);
    }
}
