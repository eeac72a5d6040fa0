use crate::core::{MediaSource, PlayerError, Result, StreamInfo, StreamKind, StreamProtocol};
use crate::player::pipeline::{MediaReader, Packet, ReadResult, SourceInfo};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media, Rational};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// 基于 FFmpeg 的 Reader（需要 `ffmpeg` feature）
pub struct FfmpegReader {
    input_ctx: Option<format::context::Input>,
    /// 流索引 -> (类型, 时间基)
    streams: HashMap<usize, (StreamKind, Rational)>,
    source_path: String,
}

impl FfmpegReader {
    pub fn new() -> Result<Self> {
        ffmpeg::init()?;
        Ok(Self {
            input_ctx: None,
            streams: HashMap::new(),
            source_path: String::new(),
        })
    }

    /// 网络流的打开选项
    fn network_options(url: &str, protocol: StreamProtocol) -> ffmpeg::Dictionary<'static> {
        let mut options = ffmpeg::Dictionary::new();

        // 丢弃损坏帧、生成 PTS、降低缓冲延迟
        options.set("fflags", "+discardcorrupt+genpts+nobuffer+igndts");
        options.set("analyzeduration", "5000000");
        options.set("probesize", "10000000");
        options.set("timeout", "15000000");
        options.set("buffer_size", "8388608");
        options.set("max_delay", "500000");
        options.set("rw_timeout", "8000000");

        match protocol {
            StreamProtocol::HTTP | StreamProtocol::HLS => {
                options.set("reconnect", "1");
                options.set("reconnect_streamed", "1");
                options.set("reconnect_delay_max", "4");
            }
            StreamProtocol::RTSP => {
                options.set("rtsp_transport", "tcp");
            }
            StreamProtocol::RTMP => {}
        }

        if protocol == StreamProtocol::HLS || url.contains(".m3u8") {
            info!("🎬 HLS 流检测，应用 HLS 优化");
            options.set("live_start_index", "-1");
            options.set("max_reload", "10");
            options.set("http_persistent", "1");
        }
        options
    }
}

fn to_millis(ts: i64, time_base: Rational) -> i64 {
    if time_base.denominator() == 0 {
        return 0;
    }
    (ts as f64 * time_base.numerator() as f64 * 1000.0 / time_base.denominator() as f64) as i64
}

impl MediaReader for FfmpegReader {
    fn open(&mut self, uri: &str) -> Result<SourceInfo> {
        info!("正在打开: {}", uri);
        self.close();

        let source = MediaSource::parse(uri)
            .ok_or_else(|| PlayerError::OpenError("媒体源为空".to_string()))?;

        let input_ctx = match &source {
            MediaSource::NetworkStream { url, protocol } => {
                info!("🌐 检测到网络流（{}），应用优化选项", protocol.as_str());
                format::input_with_dictionary(url, Self::network_options(url, *protocol))
                    .map_err(|e| PlayerError::OpenError(format!("无法打开网络流: {}", e)))?
            }
            MediaSource::LocalFile(path) => format::input(path)
                .map_err(|e| PlayerError::OpenError(format!("无法打开文件: {}", e)))?,
        };

        let mut info = SourceInfo::default();
        self.streams.clear();

        for stream in input_ctx.streams() {
            let kind = match stream.parameters().medium() {
                media::Type::Video => StreamKind::Video,
                media::Type::Audio => StreamKind::Audio,
                media::Type::Subtitle => StreamKind::Subtitle,
                _ => continue,
            };
            let index = stream.index();
            let codec = stream.parameters().id().name().to_string();
            let language = stream.metadata().get("language").map(str::to_string);

            if kind == StreamKind::Video && info.fps == 0.0 {
                let fps = stream.avg_frame_rate();
                if fps.denominator() != 0 {
                    info.fps = fps.numerator() as f64 / fps.denominator() as f64;
                }
            }

            debug!("流 #{}: {} {}", index, kind.as_str(), codec);
            self.streams.insert(index, (kind, stream.time_base()));
            info.streams.push(StreamInfo {
                index,
                kind,
                codec,
                language,
            });
        }

        if info.streams.is_empty() {
            return Err(PlayerError::OpenError("没有可播放的音视频流".to_string()));
        }

        // 微秒转毫秒
        info.duration = (input_ctx.duration() / 1000).max(0);
        info.seekable = info.duration > 0
            && !matches!(
                source,
                MediaSource::NetworkStream {
                    protocol: StreamProtocol::RTSP | StreamProtocol::RTMP,
                    ..
                }
            );
        info.tags = input_ctx
            .metadata()
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect::<BTreeMap<_, _>>();

        self.input_ctx = Some(input_ctx);
        self.source_path = uri.to_string();
        Ok(info)
    }

    fn next_packet(&mut self) -> Result<ReadResult> {
        let input_ctx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| PlayerError::Other("Reader 未打开".to_string()))?;

        loop {
            let Some((stream, packet)) = input_ctx.packets().next() else {
                return Ok(ReadResult::EndOfStream);
            };
            // 其它类型的流直接跳过
            let Some(&(kind, time_base)) = self.streams.get(&stream.index()) else {
                continue;
            };
            let pts = packet.pts().or(packet.dts()).unwrap_or(0);
            return Ok(ReadResult::Packet(Packet {
                kind,
                stream_index: stream.index(),
                pts: to_millis(pts, time_base),
                duration: to_millis(packet.duration(), time_base),
                data: packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
            }));
        }
    }

    fn flush(&mut self, position: i64) -> Result<()> {
        let input_ctx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| PlayerError::Other("Reader 未打开".to_string()))?;
        // 毫秒转微秒
        let timestamp = position * 1000;
        input_ctx.seek(timestamp, ..timestamp)?;
        Ok(())
    }

    fn close(&mut self) {
        if self.input_ctx.take().is_some() {
            info!("关闭: {}", self.source_path);
        }
        self.streams.clear();
    }

    fn description(&self) -> String {
        if self.source_path.is_empty() {
            "FFmpeg Reader".to_string()
        } else {
            format!("FFmpeg Reader: {}", self.source_path)
        }
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if self.input_ctx.is_some() {
            warn!("⚠ FfmpegReader 被 drop 时仍有打开的媒体");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_millis_rescales_time_base() {
        assert_eq!(to_millis(90_000, Rational::new(1, 90_000)), 1000);
        assert_eq!(to_millis(48, Rational::new(1, 48_000)), 1);
        assert_eq!(to_millis(5, Rational::new(0, 0)), 0);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let mut reader = FfmpegReader::new().unwrap();
        assert!(matches!(
            reader.open("/definitely/not/here.mp4"),
            Err(PlayerError::OpenError(_))
        ));
        assert!(matches!(reader.next_packet(), Err(PlayerError::Other(_))));
    }
}
