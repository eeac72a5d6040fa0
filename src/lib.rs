// 喜洋洋播放器 - 媒体播放编排核心

pub mod core;
pub mod player;

pub use crate::core::{
    MediaDescriptor, MediaStatus, PlaybackState, PlayerError, PlayerErrorKind, ProcessorConfig,
    Result,
};
pub use crate::player::{MediaProcessor, Pipeline, PlayerEvent};
