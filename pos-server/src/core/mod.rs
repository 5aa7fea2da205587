//! 核心模块 - 服务器配置、状态和维护闸门
//!
//! # 模块结构
//!
//! - [`Config`] - 服务器配置
//! - [`AppContext`] - 应用状态
//! - [`MaintenanceGate`] - 维护模式闸门

pub mod config;
pub mod maintenance;
pub mod state;

pub use config::Config;
pub use maintenance::{MaintenanceGate, MaintenanceGuard};
pub use state::AppContext;
