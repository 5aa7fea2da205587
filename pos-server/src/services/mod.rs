//! 业务服务层
//!
//! 状态机规则、事务边界与事件发射都在这里；仓储层只执行 SQL。
//! 每个操作先过维护闸门，再进事务。

pub mod checkout;
pub mod history;
pub mod serving;
pub mod sessions;
pub mod tables;
pub mod tickets;
