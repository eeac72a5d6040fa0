// 播放编排核心模块

pub mod pipeline;        // 外部协作者抽象（Reader / 时钟 / 引擎 / 缓冲提供者）
pub mod events;
pub mod state_machine;
pub mod command_gate;    // pause/stop/seek 的握手
pub mod buffer_bridge;   // 渲染缓冲跨线程释放
pub mod volume;
pub mod metadata;
pub mod worker;          // 工作线程 + 解码循环
pub mod manager;
pub mod synthetic;       // 合成管线（演示和测试）
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_reader;

pub use pipeline::{
    BufferProvider, EngineConfig, EngineReport, MediaClock, MediaReader, Packet, Pipeline,
    ReadResult, SourceInfo, StreamEngine,
};
pub use events::{EventBus, PlayerEvent};
pub use state_machine::{PlaybackStateMachine, StateReader};
pub use command_gate::{CommandGate, CommandKind};
pub use buffer_bridge::{BufferReleaseBridge, ReleaseRequest, RenderContext};
pub use manager::MediaProcessor;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_reader::FfmpegReader;
