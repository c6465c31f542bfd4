//! 连接注册表
//!
//! 进程级 providerId -> 实时通道 的映射。所有读写都经过这里的
//! 窄接口，不对外暴露底层map。表项只反映连接的尽力而为的存活状态，
//! 不作为业务状态的依据。

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use dispatch_domain::events::RequestEvent;

pub type EventSender = mpsc::UnboundedSender<RequestEvent>;

#[derive(Default)]
pub struct ConnectionRegistry {
    channels: RwLock<HashMap<i64, EventSender>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// 注册服务商通道。重复注册采用后写覆盖，不关闭旧通道，
    /// 旧连接由其自身任务在断开时清理。
    pub fn register(&self, provider_id: i64, sender: EventSender) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if channels.insert(provider_id, sender).is_some() {
            debug!("服务商 {} 重新连接，覆盖旧通道", provider_id);
        } else {
            debug!("服务商 {} 已连接", provider_id);
        }
    }

    pub fn unregister(&self, provider_id: i64) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if channels.remove(&provider_id).is_some() {
            debug!("服务商 {} 已断开", provider_id);
        }
    }

    pub fn lookup(&self, provider_id: i64) -> Option<EventSender> {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels.get(&provider_id).cloned()
    }

    /// 定向推送。服务商不在线或发送失败返回 false，由调用方决定是否记录。
    pub fn notify(&self, provider_id: i64, event: RequestEvent) -> bool {
        match self.lookup(provider_id) {
            Some(sender) => match sender.send(event) {
                Ok(()) => true,
                Err(_) => {
                    warn!("服务商 {} 的通道已关闭，发送失败", provider_id);
                    false
                }
            },
            None => false,
        }
    }

    /// 向所有在线服务商广播，返回成功送达的数量
    pub fn broadcast(&self, event: RequestEvent) -> usize {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut delivered = 0;
        for (provider_id, sender) in channels.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!("广播到服务商 {} 失败，通道已关闭", provider_id);
            }
        }
        delivered
    }

    pub fn connected_count(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(request_id: i64) -> RequestEvent {
        RequestEvent::Ongoing { request_id }
    }

    #[test]
    fn test_register_lookup_unregister() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register(7, tx);
        assert!(registry.lookup(7).is_some());
        assert_eq!(registry.connected_count(), 1);

        assert!(registry.notify(7, event(1)));
        assert_eq!(rx.try_recv().unwrap(), event(1));

        registry.unregister(7);
        assert!(registry.lookup(7).is_none());
        assert!(!registry.notify(7, event(2)));
    }

    #[test]
    fn test_reconnect_overwrites_stale_entry() {
        let registry = ConnectionRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        registry.register(7, old_tx);
        registry.register(7, new_tx);
        assert_eq!(registry.connected_count(), 1);

        assert!(registry.notify(7, event(1)));
        assert!(old_rx.try_recv().is_err());
        assert_eq!(new_rx.try_recv().unwrap(), event(1));
    }

    #[test]
    fn test_notify_closed_channel_returns_false() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(7, tx);
        drop(rx);

        assert!(!registry.notify(7, event(1)));
    }

    #[test]
    fn test_broadcast_counts_deliveries() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        registry.register(1, tx1);
        registry.register(2, tx2);
        drop(rx2); // 异常断开未清理的脏表项

        assert_eq!(registry.broadcast(event(5)), 1);
        assert_eq!(rx1.try_recv().unwrap(), event(5));
    }

    #[test]
    fn test_concurrent_register_unregister() {
        use std::sync::Arc;

        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for i in 0..16i64 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let (tx, _rx) = mpsc::unbounded_channel();
                    registry.register(i, tx);
                    registry.lookup(i);
                    registry.unregister(i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.connected_count(), 0);
    }
}
