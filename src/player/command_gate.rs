use log::debug;
use parking_lot::{Condvar, Mutex};
use std::process;
use std::thread;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

/// 需要握手的命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Stop,
    Pause,
    Seek,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Stop => "stop",
            CommandKind::Pause => "pause",
            CommandKind::Seek => "seek",
        }
    }
}

/// 请求编号，用于等待自己的请求被处理
pub type Ticket = u64;

/// 提交顺序号：命令和队列调用共用一个计数器
pub type Order = u64;

#[derive(Debug, Default)]
struct Slot<T> {
    requested: Option<T>,
    issued: Ticket,
    resolved: Ticket,
    outcome: bool,
    /// 最近一次请求的提交顺序
    order: Order,
}

impl<T> Slot<T> {
    fn post(&mut self, value: T, order: Order) -> Ticket {
        // 同类请求合并：新请求覆盖还没被取走的旧请求
        self.issued += 1;
        self.order = order;
        self.requested = Some(value);
        self.issued
    }

    fn take(&mut self) -> Option<(Ticket, T)> {
        self.requested.take().map(|v| (self.issued, v))
    }

    fn resolve(&mut self, ticket: Ticket, outcome: bool) {
        if ticket > self.resolved {
            self.resolved = ticket;
            self.outcome = outcome;
        }
    }
}

#[derive(Debug, Default)]
struct Pending {
    stop: Slot<()>,
    pause: Slot<()>,
    seek: Slot<i64>,
    next_order: Order,
    closed: bool,
}

impl Pending {
    fn next_order(&mut self) -> Order {
        self.next_order += 1;
        self.next_order
    }
}

/// 工作线程一次取走的全部命令
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TakenCommands {
    pub stop: Option<Ticket>,
    pub pause: Option<Ticket>,
    pub seek: Option<(Ticket, i64)>,
    /// 取走的 stop/pause 的提交顺序（没有时为 0）
    pub stop_order: Order,
    pub pause_order: Order,
}

impl TakenCommands {
    pub fn is_empty(&self) -> bool {
        self.stop.is_none() && self.pause.is_none() && self.seek.is_none()
    }
}

/// 命令握手门
///
/// 调用线程：加锁写入意图 -> 解锁 -> 在条件变量上等待自己的请求被处理。
/// 工作线程：每个工作单元之间取走意图、执行、标记完成并唤醒所有等待者。
/// 等待没有超时，依赖工作线程总会回到轮询点。
pub struct CommandGate {
    pending: Mutex<Pending>,
    applied: Condvar,
}

impl CommandGate {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            applied: Condvar::new(),
        }
    }

    /// 写入一个命令意图，门已关闭时返回 None
    pub fn post(&self, kind: CommandKind, seek_target: i64) -> Option<Ticket> {
        let mut pending = self.pending.lock();
        if pending.closed {
            return None;
        }

        let order = pending.next_order();
        let ticket = match kind {
            CommandKind::Stop => pending.stop.post((), order),
            CommandKind::Pause => pending.pause.post((), order),
            CommandKind::Seek => pending.seek.post(seek_target, order),
        };
        debug!("{} 📮 命令 {} #{} 已登记", log_ctx(), kind.as_str(), ticket);
        Some(ticket)
    }

    /// 给队列调用分配提交顺序，和命令的顺序可以直接比较
    pub fn next_order(&self) -> Order {
        self.pending.lock().next_order()
    }

    /// 阻塞等待指定请求被处理，返回执行结果
    ///
    /// 别的命令完成引起的唤醒不会让这里提前返回。
    pub fn wait(&self, kind: CommandKind, ticket: Ticket) -> bool {
        let mut pending = self.pending.lock();
        loop {
            let (resolved, outcome) = match kind {
                CommandKind::Stop => (pending.stop.resolved, pending.stop.outcome),
                CommandKind::Pause => (pending.pause.resolved, pending.pause.outcome),
                CommandKind::Seek => (pending.seek.resolved, pending.seek.outcome),
            };
            if resolved >= ticket {
                return outcome;
            }
            if pending.closed {
                return false;
            }
            self.applied.wait(&mut pending);
        }
    }

    /// 工作线程：非阻塞取走当前所有意图
    pub fn take(&self) -> TakenCommands {
        let mut pending = self.pending.lock();
        let stop = pending.stop.take().map(|(t, _)| t);
        let pause = pending.pause.take().map(|(t, _)| t);
        TakenCommands {
            stop_order: if stop.is_some() { pending.stop.order } else { 0 },
            pause_order: if pause.is_some() { pending.pause.order } else { 0 },
            stop,
            pause,
            seek: pending.seek.take(),
        }
    }

    /// 是否有尚未取走的意图
    pub fn has_pending(&self) -> bool {
        let pending = self.pending.lock();
        pending.stop.requested.is_some()
            || pending.pause.requested.is_some()
            || pending.seek.requested.is_some()
    }

    /// 工作线程：标记请求已处理并唤醒所有等待者
    pub fn resolve(&self, kind: CommandKind, ticket: Ticket, outcome: bool) {
        {
            let mut pending = self.pending.lock();
            match kind {
                CommandKind::Stop => pending.stop.resolve(ticket, outcome),
                CommandKind::Pause => pending.pause.resolve(ticket, outcome),
                CommandKind::Seek => pending.seek.resolve(ticket, outcome),
            }
        }
        debug!(
            "{} ✅ 命令 {} #{} 已处理: {}",
            log_ctx(),
            kind.as_str(),
            ticket,
            outcome
        );
        self.applied.notify_all();
    }

    /// 关闭门：之后的请求和仍在等待的请求都立即返回 false
    pub fn close(&self) {
        let mut pending = self.pending.lock();
        pending.closed = true;
        pending.stop.requested = None;
        pending.pause.requested = None;
        pending.seek.requested = None;
        drop(pending);
        self.applied.notify_all();
    }
}

impl Default for CommandGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_take_and_resolve_round_trip() {
        let gate = Arc::new(CommandGate::new());
        let ticket = gate.post(CommandKind::Seek, 5000).unwrap();

        let worker_gate = gate.clone();
        let worker = thread::spawn(move || loop {
            let taken = worker_gate.take();
            if let Some((t, target)) = taken.seek {
                assert_eq!(target, 5000);
                worker_gate.resolve(CommandKind::Seek, t, true);
                break;
            }
            thread::sleep(Duration::from_millis(1));
        });

        assert!(gate.wait(CommandKind::Seek, ticket));
        worker.join().unwrap();
        assert!(!gate.has_pending());
    }

    #[test]
    fn test_unrelated_wakeup_does_not_return_early() {
        let gate = Arc::new(CommandGate::new());
        let stop_ticket = gate.post(CommandKind::Stop, 0).unwrap();
        let pause_ticket = gate.post(CommandKind::Pause, 0).unwrap();

        let waiter_gate = gate.clone();
        let waiter = thread::spawn(move || waiter_gate.wait(CommandKind::Stop, stop_ticket));

        // 只处理 pause，stop 的等待者必须继续等
        thread::sleep(Duration::from_millis(20));
        gate.resolve(CommandKind::Pause, pause_ticket, true);
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        gate.resolve(CommandKind::Stop, stop_ticket, true);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_same_kind_requests_coalesce() {
        let gate = CommandGate::new();
        let first = gate.post(CommandKind::Seek, 1000).unwrap();
        let second = gate.post(CommandKind::Seek, 2000).unwrap();
        assert!(second > first);

        let taken = gate.take();
        assert_eq!(taken.seek, Some((second, 2000)));
        gate.resolve(CommandKind::Seek, second, true);

        // 被覆盖的旧请求也算处理完成
        assert!(gate.wait(CommandKind::Seek, first));
    }

    #[test]
    fn test_dropped_command_reports_false() {
        let gate = CommandGate::new();
        let ticket = gate.post(CommandKind::Seek, 10).unwrap();
        let taken = gate.take();
        gate.resolve(CommandKind::Seek, taken.seek.unwrap().0, false);
        assert!(!gate.wait(CommandKind::Seek, ticket));
    }

    #[test]
    fn test_commands_and_jobs_share_one_order() {
        let gate = CommandGate::new();
        let play_order = gate.next_order();
        gate.post(CommandKind::Pause, 0).unwrap();
        gate.post(CommandKind::Stop, 0).unwrap();

        let taken = gate.take();
        assert!(taken.pause_order > play_order);
        assert!(taken.stop_order > taken.pause_order);
        assert!(gate.next_order() > taken.stop_order);
        assert_eq!(gate.take().stop_order, 0);
    }

    #[test]
    fn test_close_releases_waiters() {
        let gate = Arc::new(CommandGate::new());
        let ticket = gate.post(CommandKind::Stop, 0).unwrap();
        let waiter_gate = gate.clone();
        let waiter = thread::spawn(move || waiter_gate.wait(CommandKind::Stop, ticket));

        thread::sleep(Duration::from_millis(10));
        gate.close();
        assert!(!waiter.join().unwrap());
        assert!(gate.post(CommandKind::Pause, 0).is_none());
        assert!(gate.take().is_empty());
    }
}
