use anyhow::{Context, Result};
use log::{info, warn};
use myy_media_processor::core::{MediaStatus, PlaybackClock, ProcessorConfig};
use myy_media_processor::player::synthetic::{
    CallLog, SyntheticMedia, SyntheticProvider, SyntheticReader,
};
use myy_media_processor::player::{MediaProcessor, Pipeline, PlayerEvent, RenderContext};
use std::sync::Arc;
use std::time::Duration;

const DEMO_URI: &str = "demo://clip";

struct Args {
    config: Option<String>,
    seek: Option<i64>,
    uri: String,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        seek: None,
        uri: DEMO_URI.to_string(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(iter.next().context("--config 需要一个路径")?),
            "--seek" => {
                let value = iter.next().context("--seek 需要一个毫秒数")?;
                args.seek = Some(value.parse().with_context(|| format!("无效的 seek 位置: {}", value))?);
            }
            _ => args.uri = arg,
        }
    }
    Ok(args)
}

/// 演示片段走合成管线
fn build_pipeline(uri: &str) -> Result<Pipeline> {
    let catalog = vec![(
        DEMO_URI,
        SyntheticMedia::new(3_000)
            .with_subtitles()
            .with_tag("title", "喜洋洋演示片段")
            .with_tag("artist", "MYY"),
    )];
    let pipeline = SyntheticReader::pipeline(catalog, PlaybackClock::new(), CallLog::default());
    attach_reader(uri, pipeline)
}

/// 启用 ffmpeg 特性后，非演示 uri 改用 FFmpeg 读取
#[cfg(feature = "ffmpeg")]
fn attach_reader(uri: &str, pipeline: Pipeline) -> Result<Pipeline> {
    use myy_media_processor::player::FfmpegReader;

    if uri.starts_with("demo://") {
        return Ok(pipeline);
    }
    info!("🎞️  使用 FFmpeg Reader");
    let reader = FfmpegReader::new().context("FFmpeg 初始化失败")?;
    Ok(Pipeline {
        reader: Box::new(reader),
        ..pipeline
    })
}

#[cfg(not(feature = "ffmpeg"))]
fn attach_reader(_uri: &str, pipeline: Pipeline) -> Result<Pipeline> {
    Ok(pipeline)
}

fn main() -> Result<()> {
    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("🎬 MYY Media Processor 演示启动");

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ProcessorConfig::from_file(path)
            .with_context(|| format!("加载配置失败: {}", path))?,
        None => ProcessorConfig::default(),
    };

    // 主线程充当渲染线程
    let provider = Arc::new(SyntheticProvider::default());
    let render_ctx = RenderContext::bind_current(provider.clone());

    let pipeline = build_pipeline(&args.uri)?.with_release_bridge(render_ctx.bridge());

    let processor = MediaProcessor::with_config(pipeline, config)?;
    let events = processor.subscribe();

    if !processor.set_source(&args.uri) {
        warn!("⚠️  无法打开: {}", args.uri);
        for event in events.try_iter() {
            info!("📣 {:?}", event);
        }
        return Ok(());
    }
    info!(
        "✅ 已加载: 时长 {}ms, 流 {:?}",
        processor.stream_length(),
        processor.streams()
    );
    for (key, value) in processor.metadata() {
        info!("   {} = {}", key, value);
    }

    processor.play();
    if let Some(position) = args.seek {
        processor.seek(position);
    }

    // 渲染线程事件循环：处理释放请求，直到播放结束或出错
    'render: loop {
        render_ctx.process_blocking(Duration::from_millis(16))?;
        for event in events.try_iter() {
            match event {
                PlayerEvent::PlaybackCompleted => info!("🏁 播放完成"),
                PlayerEvent::Error { kind, message } => {
                    warn!("❌ {}: {}", kind.as_str(), message);
                    break 'render;
                }
                PlayerEvent::MediaStatusChanged(MediaStatus::EndOfMedia) => break 'render,
                other => info!("📣 {:?} (位置 {}ms)", other, processor.stream_position()),
            }
        }
    }

    processor.stop();
    drop(processor);
    let released = render_ctx.process_pending()?;
    info!(
        "✅ 演示结束，最后一批释放 {} 个请求，共释放 {} 个渲染缓冲",
        released,
        provider.released_count()
    );
    Ok(())
}
