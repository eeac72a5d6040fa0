use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 媒体源类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// 本地文件路径
    LocalFile(PathBuf),

    /// 网络流 URL
    NetworkStream {
        url: String,
        protocol: StreamProtocol,
    },
}

impl MediaSource {
    /// 从 URI 字符串解析媒体源，空字符串返回 None
    pub fn parse(uri: &str) -> Option<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return None;
        }

        let protocol = if uri.starts_with("rtsp://") {
            Some(StreamProtocol::RTSP)
        } else if uri.starts_with("rtmp://") {
            Some(StreamProtocol::RTMP)
        } else if uri.ends_with(".m3u8") || uri.contains("/hls/") {
            Some(StreamProtocol::HLS)
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            Some(StreamProtocol::HTTP)
        } else {
            None
        };

        Some(match protocol {
            Some(protocol) => MediaSource::NetworkStream {
                url: uri.to_string(),
                protocol,
            },
            None => {
                // file:// 前缀去掉，其余当作本地路径
                let path = uri.strip_prefix("file://").unwrap_or(uri);
                MediaSource::LocalFile(PathBuf::from(path))
            }
        })
    }

    /// 日志用的源类型描述
    pub fn kind_str(&self) -> &'static str {
        match self {
            MediaSource::LocalFile(_) => "本地文件",
            MediaSource::NetworkStream { protocol, .. } => protocol.as_str(),
        }
    }
}

/// 流媒体协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProtocol {
    /// RTSP - 实时流协议（监控摄像头）
    RTSP,
    /// RTMP - 实时消息协议（直播流）
    RTMP,
    /// HLS - HTTP Live Streaming
    HLS,
    /// HTTP - 普通 HTTP 流
    HTTP,
}

impl StreamProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamProtocol::RTSP => "RTSP",
            StreamProtocol::RTMP => "RTMP",
            StreamProtocol::HLS => "HLS",
            StreamProtocol::HTTP => "HTTP",
        }
    }
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PlaybackState {
    Stopped = 0,
    Inactive = 1,
    Paused = 2,
    Playing = 3,
}

impl PlaybackState {
    const NAMES: [&'static str; 4] = ["STATE_STOPPED", "STATE_INACTIVE", "STATE_PAUSED", "STATE_PLAYING"];

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackState::Inactive,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Playing,
            _ => PlaybackState::Stopped,
        }
    }
}

/// 媒体状态（与播放状态相互独立，例如 Playing + Buffering）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MediaStatus {
    Unknown = 0,
    NoMedia = 1,
    Loading = 2,
    Loaded = 3,
    Stalled = 4,
    Buffering = 5,
    Buffered = 6,
    EndOfMedia = 7,
    InvalidMedia = 8,
}

impl MediaStatus {
    const NAMES: [&'static str; 9] = [
        "MEDIA_STATUS_UNKNOWN",
        "MEDIA_STATUS_NO_MEDIA",
        "MEDIA_STATUS_LOADING",
        "MEDIA_STATUS_LOADED",
        "MEDIA_STATUS_STALLED",
        "MEDIA_STATUS_BUFFERING",
        "MEDIA_STATUS_BUFFERED",
        "MEDIA_STATUS_END_OF_MEDIA",
        "MEDIA_STATUS_INVALID_MEDIA",
    ];

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => MediaStatus::NoMedia,
            2 => MediaStatus::Loading,
            3 => MediaStatus::Loaded,
            4 => MediaStatus::Stalled,
            5 => MediaStatus::Buffering,
            6 => MediaStatus::Buffered,
            7 => MediaStatus::EndOfMedia,
            8 => MediaStatus::InvalidMedia,
            _ => MediaStatus::Unknown,
        }
    }
}

/// 流类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Subtitle => "subtitle",
        }
    }
}

/// 单条流的描述（由 Reader 在 open 时给出）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: String,
    pub language: Option<String>,
}

impl StreamInfo {
    /// 形如 `video:0:h264` / `audio:1:aac:eng`
    pub fn describe(&self) -> String {
        match &self.language {
            Some(lang) => format!("{}:{}:{}:{}", self.kind.as_str(), self.index, self.codec, lang),
            None => format!("{}:{}:{}", self.kind.as_str(), self.index, self.codec),
        }
    }
}

/// 可播放时间区间（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// 当前媒体的快照
///
/// 由工作线程完整构建后整体发布，调用方只会看到空快照或完整快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub source: String,
    pub streams: Vec<StreamInfo>,
    pub duration: i64,          // 总时长（毫秒）
    pub seekable: bool,
    pub has_video: bool,
    pub has_audio: bool,
    pub has_subtitle: bool,
    pub audio_index: Option<usize>,
    pub subtitle_index: Option<usize>,
    pub speed: f64,             // 播放速率（1.0 = 正常）
    pub fps: f64,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MediaDescriptor {
    /// 是否为空快照（没有加载媒体）
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn stream_names(&self) -> Vec<String> {
        self.streams.iter().map(StreamInfo::describe).collect()
    }
}

impl Default for MediaDescriptor {
    fn default() -> Self {
        Self {
            source: String::new(),
            streams: Vec::new(),
            duration: 0,
            seekable: false,
            has_video: false,
            has_audio: false,
            has_subtitle: false,
            audio_index: None,
            subtitle_index: None,
            speed: 1.0,
            fps: 0.0,
            metadata: BTreeMap::new(),
        }
    }
}

/// 渲染缓冲句柄（不透明）
///
/// 存储归引擎/渲染上下文所有，编排器只负责把释放请求送回渲染线程。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderBuffer {
    pub id: u64,
    pub texture: u32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_source() {
        assert_eq!(MediaSource::parse("   "), None);
        assert_eq!(
            MediaSource::parse("file:///tmp/a.mkv"),
            Some(MediaSource::LocalFile(PathBuf::from("/tmp/a.mkv")))
        );
        assert!(matches!(
            MediaSource::parse("rtsp://cam/1"),
            Some(MediaSource::NetworkStream {
                protocol: StreamProtocol::RTSP,
                ..
            })
        ));
        assert_eq!(
            MediaSource::parse("https://host/live/index.m3u8").unwrap().kind_str(),
            "HLS"
        );
    }

    #[test]
    fn test_state_name_tables() {
        assert_eq!(PlaybackState::Paused.as_str(), "STATE_PAUSED");
        assert_eq!(MediaStatus::EndOfMedia.as_str(), "MEDIA_STATUS_END_OF_MEDIA");
        for v in 0..4u8 {
            assert_eq!(PlaybackState::from_u8(v) as u8, v);
        }
        for v in 0..9u8 {
            assert_eq!(MediaStatus::from_u8(v) as u8, v);
        }
    }

    #[test]
    fn test_stream_describe() {
        let s = StreamInfo {
            index: 1,
            kind: StreamKind::Audio,
            codec: "aac".into(),
            language: Some("eng".into()),
        };
        assert_eq!(s.describe(), "audio:1:aac:eng");
    }
}
