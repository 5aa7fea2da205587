//! 维护模式闸门
//!
//! 备份/恢复等运维操作进行时，所有业务写入必须暂停。
//! 深度计数支持嵌套进入；guard 析构时自动退出。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Maintenance gate — business operations check this before touching the DB
#[derive(Debug, Clone, Default)]
pub struct MaintenanceGate {
    depth: Arc<AtomicUsize>,
}

impl MaintenanceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入维护模式，返回 RAII guard
    pub fn enter(&self) -> MaintenanceGuard {
        let prev = self.depth.fetch_add(1, Ordering::SeqCst);
        if prev == 0 {
            tracing::warn!("Maintenance mode entered, business operations suspended");
        }
        MaintenanceGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    /// 当前是否处于维护模式
    pub fn is_active(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

/// Dropping the guard leaves maintenance mode (last one out re-opens the gate)
pub struct MaintenanceGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for MaintenanceGuard {
    fn drop(&mut self) {
        let prev = self.depth.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            tracing::info!("Maintenance mode exited, business operations resumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_is_open_by_default() {
        let gate = MaintenanceGate::new();
        assert!(!gate.is_active());
    }

    #[test]
    fn nested_guards_keep_gate_closed_until_all_drop() {
        let gate = MaintenanceGate::new();
        let g1 = gate.enter();
        let g2 = gate.enter();
        assert!(gate.is_active());
        drop(g1);
        assert!(gate.is_active());
        drop(g2);
        assert!(!gate.is_active());
    }
}
