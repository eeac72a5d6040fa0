use crate::core::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 编排器配置
///
/// 所有字段都有默认值，JSON 中缺失的字段取默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// 工作线程名称
    pub worker_thread_name: String,
    /// Reader 暂无数据时的等待间隔（毫秒），命令到达会提前唤醒
    pub pending_backoff_ms: u64,
    /// 文件读完后等待引擎排空的轮询间隔（毫秒）
    pub drain_poll_ms: u64,
    /// 初始音量（线性 0.0 - 1.0）
    pub initial_volume: f64,
    /// 初始是否静音
    pub initial_muted: bool,
    /// 打开媒体时的默认播放速率
    pub default_speed: f64,
    /// 每个事件订阅通道的容量（0 = 无界）
    pub event_channel_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: "media-processor".to_string(),
            pending_backoff_ms: 5,
            drain_poll_ms: 10,
            initial_volume: 1.0,
            initial_muted: false,
            default_speed: 1.0,
            event_channel_capacity: 0,
        }
    }
}

impl ProcessorConfig {
    /// 从 JSON 字符串解析
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_thread_name.is_empty() {
            return Err(PlayerError::ConfigError("worker_thread_name 不能为空".to_string()));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlayerError::ConfigError(format!(
                "initial_volume 超出范围 [0, 1]: {}",
                self.initial_volume
            )));
        }
        if !(self.default_speed > 0.0) {
            return Err(PlayerError::ConfigError(format!(
                "default_speed 必须大于 0: {}",
                self.default_speed
            )));
        }
        if self.pending_backoff_ms == 0 || self.drain_poll_ms == 0 {
            return Err(PlayerError::ConfigError("轮询间隔必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProcessorConfig::from_json_str(r#"{ "initial_volume": 0.5 }"#).unwrap();
        assert_eq!(config.initial_volume, 0.5);
        assert_eq!(config.worker_thread_name, "media-processor");
        assert_eq!(config.default_speed, 1.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            ProcessorConfig::from_json_str(r#"{ "default_speed": 0.0 }"#),
            Err(PlayerError::ConfigError(_))
        ));
        assert!(matches!(
            ProcessorConfig::from_json_str(r#"{ "initial_volume": 3 }"#),
            Err(PlayerError::ConfigError(_))
        ));
        assert!(matches!(
            ProcessorConfig::from_json_str("not json"),
            Err(PlayerError::JsonError(_))
        ));
    }
}
