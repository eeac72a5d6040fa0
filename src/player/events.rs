use crate::core::{MediaStatus, PlaybackState, PlayerErrorKind, TimeRange};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 编排器发出的通知
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StreamLengthChanged(i64),
    MetadataChanged(BTreeMap<String, Value>),
    PlaybackStarted,
    PlaybackCompleted,
    Error { kind: PlayerErrorKind, message: String },
    StateChanged(PlaybackState),
    MediaStatusChanged(MediaStatus),
    BufferStatusChanged(u8),
    AvailableRangesChanged(Vec<TimeRange>),
}

type Listener = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: Vec<Listener>,
    subscribers: Vec<Sender<PlayerEvent>>,
}

/// 通知分发
///
/// - 回调在发出通知的线程（工作线程）上同步执行，按发出顺序
/// - 订阅通道给其它线程按顺序消费；有界通道满了丢弃这条通知，不阻塞发送方
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    channel_capacity: usize,
}

impl EventBus {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            channel_capacity,
        }
    }

    /// 注册回调
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.registry.lock().listeners.push(Arc::new(listener));
    }

    /// 订阅事件通道
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = if self.channel_capacity == 0 {
            unbounded()
        } else {
            bounded(self.channel_capacity)
        };
        self.registry.lock().subscribers.push(tx);
        rx
    }

    pub fn emit(&self, event: PlayerEvent) {
        // 锁内只复制列表，发送和回调都在锁外进行
        let (subscribers, listeners) = {
            let registry = self.registry.lock();
            (registry.subscribers.clone(), registry.listeners.clone())
        };

        debug!("📣 事件: {:?}", event);
        let mut dead = Vec::new();
        for tx in subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("⚠️  事件订阅通道已满，丢弃通知: {:?}", event);
                }
                Err(TrySendError::Disconnected(_)) => dead.push(tx),
            }
        }
        if !dead.is_empty() {
            // 接收端已 drop 的订阅者移除
            self.registry
                .lock()
                .subscribers
                .retain(|tx| !dead.iter().any(|d| d.same_channel(tx)));
        }

        for listener in listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_and_subscriber_see_same_order() {
        let bus = EventBus::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.add_listener(move |e| seen_clone.lock().push(e.clone()));
        let rx = bus.subscribe();

        bus.emit(PlayerEvent::StateChanged(PlaybackState::Inactive));
        bus.emit(PlayerEvent::PlaybackStarted);
        bus.emit(PlayerEvent::StateChanged(PlaybackState::Playing));

        let from_channel: Vec<_> = rx.try_iter().collect();
        assert_eq!(from_channel, *seen.lock());
        assert_eq!(from_channel[1], PlayerEvent::PlaybackStarted);
    }

    #[test]
    fn test_dropped_subscriber_is_removed() {
        let bus = EventBus::new(0);
        let rx = bus.subscribe();
        drop(rx);
        bus.emit(PlayerEvent::PlaybackCompleted);
        assert!(bus.registry.lock().subscribers.is_empty());
    }

    #[test]
    fn test_listener_may_subscribe_while_emitting() {
        let bus = EventBus::new(0);
        let inner = bus.clone();
        bus.add_listener(move |_| {
            let _ = inner.subscribe();
        });
        bus.emit(PlayerEvent::PlaybackStarted);
        assert_eq!(bus.registry.lock().subscribers.len(), 1);
    }

    #[test]
    fn test_full_subscriber_does_not_block_emit_or_subscribe() {
        let bus = EventBus::new(1);
        let stalled = bus.subscribe();

        for _ in 0..3 {
            bus.emit(PlayerEvent::PlaybackStarted);
        }
        assert_eq!(stalled.len(), 1);

        // 另一个线程订阅不会被卡住的通道阻塞
        let other = bus.clone();
        let (done_tx, done_rx) = bounded(1);
        std::thread::spawn(move || {
            let rx = other.subscribe();
            let _ = done_tx.send(rx);
        });
        let fresh = done_rx
            .recv_timeout(std::time::Duration::from_millis(500))
            .unwrap();

        bus.emit(PlayerEvent::PlaybackCompleted);
        assert_eq!(fresh.try_recv().unwrap(), PlayerEvent::PlaybackCompleted);
        assert_eq!(bus.registry.lock().subscribers.len(), 2);
    }
}
