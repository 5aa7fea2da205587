/// 服务器配置 - 门店节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (数据库、日志) |
/// | DB_PATH | {WORK_DIR}/pos.db | SQLite 数据库文件路径 |
/// | BUSINESS_TIMEZONE | Asia/Shanghai | 营业日所用时区 |
/// | BUSINESS_DAY_CUTOFF | 00:00 | 营业日切换时刻 (HH:MM) |
/// | LOG_LEVEL | info | 日志级别 |
/// | ENVIRONMENT | development | 运行环境 |
/// | EVENT_CHANNEL_CAPACITY | 1024 | 事件广播通道容量 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/pos BUSINESS_DAY_CUTOFF=04:00 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// SQLite 数据库文件路径
    pub db_path: String,
    /// 营业日时区 (IANA 名称)
    pub business_timezone: String,
    /// 营业日切换时刻 (HH:MM，当地时间早于该时刻算前一营业日)
    pub business_day_cutoff: String,
    /// 日志级别
    pub log_level: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 事件广播通道容量
    pub event_channel_capacity: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into());
        let db_path =
            std::env::var("DB_PATH").unwrap_or_else(|_| format!("{work_dir}/pos.db"));
        Self {
            work_dir,
            db_path,
            business_timezone: std::env::var("BUSINESS_TIMEZONE")
                .unwrap_or_else(|_| "Asia/Shanghai".into()),
            business_day_cutoff: std::env::var("BUSINESS_DAY_CUTOFF")
                .unwrap_or_else(|_| "00:00".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
        }
    }

    /// 是否生产环境 (决定日志格式)
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 日志目录
    pub fn log_dir(&self) -> String {
        format!("{}/logs", self.work_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
