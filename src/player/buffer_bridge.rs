use crate::core::{PlayerError, RenderBuffer, Result};
use crate::player::pipeline::BufferProvider;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};
use std::process;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

/// 发往渲染线程的释放请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseRequest {
    /// 释放单个渲染缓冲
    Buffer(RenderBuffer),
    /// 释放提供者持有的全部缓冲
    All,
}

/// 渲染上下文端
///
/// 在拥有图形上下文的线程上创建，该线程的事件循环定期调用
/// [`RenderContext::process_pending`]（或阻塞版本）执行释放。
pub struct RenderContext {
    owner: ThreadId,
    provider: Arc<dyn BufferProvider>,
    tx: Sender<ReleaseRequest>,
    rx: Receiver<ReleaseRequest>,
}

impl RenderContext {
    /// 绑定到当前线程
    pub fn bind_current(provider: Arc<dyn BufferProvider>) -> Self {
        let (tx, rx) = unbounded();
        let owner = thread::current().id();
        info!("{} 🎨 渲染上下文已绑定", log_ctx());
        Self {
            owner,
            provider,
            tx,
            rx,
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// 创建一个发往本上下文的释放桥
    pub fn bridge(&self) -> BufferReleaseBridge {
        BufferReleaseBridge {
            owner: self.owner,
            tx: self.tx.clone(),
        }
    }

    /// 排队中的请求数
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// 非阻塞处理所有排队的释放请求，返回处理条数
    pub fn process_pending(&self) -> Result<usize> {
        self.check_thread()?;
        let mut handled = 0;
        while let Ok(request) = self.rx.try_recv() {
            self.handle(request);
            handled += 1;
        }
        Ok(handled)
    }

    /// 最多等待 timeout 直到有请求到来，然后处理所有排队的请求
    pub fn process_blocking(&self, timeout: Duration) -> Result<usize> {
        self.check_thread()?;
        match self.rx.recv_timeout(timeout) {
            Ok(request) => {
                self.handle(request);
                Ok(1 + self.process_pending()?)
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            // 本结构自己持有一个发送端，不会断开
            Err(RecvTimeoutError::Disconnected) => Ok(0),
        }
    }

    fn check_thread(&self) -> Result<()> {
        if thread::current().id() != self.owner {
            error!(
                "{} ❌ 渲染缓冲只能在渲染线程 {:?} 上释放",
                log_ctx(),
                self.owner
            );
            return Err(PlayerError::WrongThread("RenderContext::process"));
        }
        Ok(())
    }

    fn handle(&self, request: ReleaseRequest) {
        debug_assert_eq!(thread::current().id(), self.owner);
        match request {
            ReleaseRequest::Buffer(buffer) => {
                debug!("{} 🗑️  释放渲染缓冲 #{}", log_ctx(), buffer.id);
                self.provider.release(buffer);
            }
            ReleaseRequest::All => {
                debug!("{} 🗑️  释放全部渲染缓冲", log_ctx());
                self.provider.release_all();
            }
        }
    }
}

/// 渲染缓冲释放桥
///
/// 任何线程都可以发请求；请求只排队，不会在发送线程上执行释放。
/// 同一个上下文的请求按发送顺序执行。
#[derive(Clone)]
pub struct BufferReleaseBridge {
    owner: ThreadId,
    tx: Sender<ReleaseRequest>,
}

impl BufferReleaseBridge {
    /// 渲染线程 ID
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn request_release(&self, buffer: RenderBuffer) -> Result<()> {
        self.send(ReleaseRequest::Buffer(buffer))
    }

    pub fn request_release_all(&self) -> Result<()> {
        self.send(ReleaseRequest::All)
    }

    fn send(&self, request: ReleaseRequest) -> Result<()> {
        self.tx
            .send(request)
            .map_err(|_| PlayerError::Other("渲染上下文已关闭，无法释放缓冲".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        released: Mutex<Vec<(u64, ThreadId)>>,
        release_all_calls: Mutex<Vec<ThreadId>>,
    }

    impl BufferProvider for RecordingProvider {
        fn allocate(&self) -> Result<RenderBuffer> {
            Ok(RenderBuffer {
                id: 0,
                texture: 0,
                width: 1,
                height: 1,
            })
        }

        fn release(&self, buffer: RenderBuffer) {
            self.released.lock().push((buffer.id, thread::current().id()));
        }

        fn release_all(&self) {
            self.release_all_calls.lock().push(thread::current().id());
        }
    }

    fn buffer(id: u64) -> RenderBuffer {
        RenderBuffer {
            id,
            texture: id as u32,
            width: 16,
            height: 16,
        }
    }

    #[test]
    fn test_release_runs_on_owner_thread_in_order() {
        let provider = Arc::new(RecordingProvider::default());
        let ctx = RenderContext::bind_current(provider.clone());
        let bridge = ctx.bridge();

        let sender = thread::spawn(move || {
            for id in 1..=5 {
                bridge.request_release(buffer(id)).unwrap();
            }
            bridge.request_release_all().unwrap();
            thread::current().id()
        });
        let sender_id = sender.join().unwrap();

        // 发送线程上什么都没释放
        assert!(provider.released.lock().is_empty());
        assert_eq!(ctx.pending(), 6);

        assert_eq!(ctx.process_pending().unwrap(), 6);
        let released = provider.released.lock();
        let ids: Vec<u64> = released.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        for (_, tid) in released.iter() {
            assert_eq!(*tid, ctx.owner());
            assert_ne!(*tid, sender_id);
        }
        assert_eq!(*provider.release_all_calls.lock(), vec![ctx.owner()]);
    }

    #[test]
    fn test_processing_on_foreign_thread_is_refused() {
        let provider = Arc::new(RecordingProvider::default());
        let ctx = RenderContext::bind_current(provider.clone());
        ctx.bridge().request_release(buffer(7)).unwrap();

        let result = thread::spawn(move || {
            let r = ctx.process_pending();
            (r, ctx)
        })
        .join()
        .unwrap();

        assert!(matches!(result.0, Err(PlayerError::WrongThread(_))));
        assert!(provider.released.lock().is_empty());
        assert_eq!(result.1.pending(), 1);
    }

    #[test]
    fn test_process_blocking_times_out_when_idle() {
        let provider = Arc::new(RecordingProvider::default());
        let ctx = RenderContext::bind_current(provider);
        assert_eq!(ctx.process_blocking(Duration::from_millis(5)).unwrap(), 0);
    }
}
