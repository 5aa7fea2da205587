//! POS Server - 餐厅门店点单核心
//!
//! # 架构概述
//!
//! 本模块实现桌台会话的订单生命周期核心：
//!
//! - **会话状态机** (`services::sessions`): 开台 → DINING ⇄ PENDING_CHECKOUT → CLOSED
//! - **订单台账** (`services::tickets`): 下单、改量、整退，快照定价
//! - **传菜队列** (`services::serving`): 待上/已上投影，上菜/退菜
//! - **结账** (`services::checkout`): 幂等结账与会话关闭
//! - **历史账单** (`services::history`): 查询、恢复、删除
//! - **数据库** (`db`): SQLite (WAL) 存储与仓储层
//! - **事件** (`events`): 变更广播
//!
//! # 模块结构
//!
//! ```text
//! pos-server/src/
//! ├── core/          # 配置、状态、维护闸门
//! ├── services/      # 业务服务（状态机与事务边界）
//! ├── db/            # 数据库层与仓储
//! ├── events/        # 事件广播
//! └── utils/         # 错误、日志、时间
//! ```

pub mod core;
pub mod db;
pub mod events;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{AppContext, Config, MaintenanceGate};
pub use events::{EventKind, Notification, Notifier};
pub use utils::{AppError, AppResult, ConflictCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
