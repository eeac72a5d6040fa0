use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("无法打开媒体源: {0}")]
    OpenError(String),

    #[error("线程错误: {0} 必须在所属线程上调用")]
    WrongThread(&'static str),

    #[error("解码/渲染引擎错误: {0}")]
    EngineError(String),

    #[error("工作线程已退出")]
    WorkerGone,

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg 错误: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    #[error("其他错误: {0}")]
    Other(String),
}

/// 错误通知的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerErrorKind {
    /// 无法打开或解封装媒体源（可通过重新 set_source 恢复）
    SourceOpenFailure,
    /// 在错误的线程上调用（集成错误）
    WrongThread,
    /// 解码/渲染引擎不可恢复的错误
    EngineFailure,
}

impl PlayerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerErrorKind::SourceOpenFailure => "SOURCE_OPEN_FAILURE",
            PlayerErrorKind::WrongThread => "WRONG_THREAD",
            PlayerErrorKind::EngineFailure => "ENGINE_FAILURE",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_and_kind_names() {
        assert_eq!(
            PlayerError::WrongThread("stop").to_string(),
            "线程错误: stop 必须在所属线程上调用"
        );
        assert_eq!(PlayerErrorKind::SourceOpenFailure.as_str(), "SOURCE_OPEN_FAILURE");
        assert_eq!(PlayerErrorKind::EngineFailure.as_str(), "ENGINE_FAILURE");
        assert_eq!(
            serde_json::to_string(&PlayerErrorKind::WrongThread).unwrap(),
            "\"wrong_thread\""
        );
    }
}
