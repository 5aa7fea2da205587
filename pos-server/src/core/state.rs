use chrono::NaiveTime;
use chrono_tz::Tz;
use sqlx::SqlitePool;

use crate::core::Config;
use crate::core::maintenance::MaintenanceGate;
use crate::db::DbService;
use crate::events::Notifier;
use crate::utils::{AppError, AppResult, time};

/// 服务器状态 - 持有所有服务的单例引用
///
/// AppContext 是门店节点的核心数据结构，持有所有服务的共享引用。
/// Clone 是浅拷贝（连接池与通道句柄），所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | notifier | Notifier | 事件广播器 |
/// | maintenance | MaintenanceGate | 维护模式闸门 |
#[derive(Clone)]
pub struct AppContext {
    /// 服务器配置
    pub config: Config,
    /// 数据库服务 (SQLite WAL)
    pub db: DbService,
    /// 事件广播器
    pub notifier: Notifier,
    /// 维护模式闸门
    pub maintenance: MaintenanceGate,
    /// 营业日时区 (启动时解析一次)
    business_tz: Tz,
    /// 营业日切换时刻
    business_cutoff: NaiveTime,
}

impl AppContext {
    /// 初始化所有服务组件
    pub async fn initialize(config: Config) -> AppResult<Self> {
        let business_tz: Tz = config
            .business_timezone
            .parse()
            .map_err(|_| {
                AppError::validation(format!(
                    "Invalid BUSINESS_TIMEZONE: {}",
                    config.business_timezone
                ))
            })?;
        let business_cutoff = time::parse_cutoff(&config.business_day_cutoff);

        let db = DbService::new(&config.db_path).await?;
        let notifier = Notifier::with_capacity(config.event_channel_capacity);

        tracing::info!(
            timezone = %business_tz,
            cutoff = %business_cutoff,
            "Application context initialized"
        );

        Ok(Self {
            config,
            db,
            notifier,
            maintenance: MaintenanceGate::new(),
            business_tz,
            business_cutoff,
        })
    }

    /// 从已有组件构造（测试用）
    pub fn from_parts(config: Config, pool: SqlitePool, notifier: Notifier) -> AppResult<Self> {
        let business_tz: Tz = config
            .business_timezone
            .parse()
            .map_err(|_| AppError::validation("Invalid BUSINESS_TIMEZONE"))?;
        let business_cutoff = time::parse_cutoff(&config.business_day_cutoff);
        Ok(Self {
            config,
            db: DbService { pool },
            notifier,
            maintenance: MaintenanceGate::new(),
            business_tz,
            business_cutoff,
        })
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }

    /// 维护模式下拒绝业务操作
    pub fn ensure_available(&self) -> AppResult<()> {
        if self.maintenance.is_active() {
            return Err(AppError::Maintenance);
        }
        Ok(())
    }

    /// 营业日时区
    pub fn business_tz(&self) -> Tz {
        self.business_tz
    }

    /// 当前营业日 (YYYY-MM-DD)
    pub fn business_day(&self) -> String {
        time::current_business_date(self.business_cutoff, self.business_tz).to_string()
    }
}
