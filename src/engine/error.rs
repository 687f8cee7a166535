// ==========================================
// 检验员分配系统 - 引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播: 单记录 / 单批次问题在本地恢复并汇总到报表，
//       只有配置级问题会中止运行
// ==========================================

use thiserror::Error;

/// 单条输入记录的校验错误（跳过该记录，不中止运行）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("不足数必须为正数 (品番 {product_id}): {quantity}")]
    NonPositiveQuantity { product_id: String, quantity: i64 },

    #[error("製品マスタに品番がありません: {0}")]
    UnknownProduct(String),

    #[error("检验时间无效 (品番 {product_id}): {seconds_per_unit}")]
    InvalidThroughput {
        product_id: String,
        seconds_per_unit: f64,
    },

    #[error("单批容量无效 (品番 {0}): 0")]
    InvalidLotCapacity(String),

    #[error("批次ID重复: {0}")]
    DuplicateLotId(String),
}

/// 配置错误（运行开始前即中止）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("同品番工时上限必须为正数: {0}")]
    NonPositiveHourCap(f64),

    #[error("每人工时阈值必须为正数: {0}")]
    NonPositiveThreshold(f64),

    #[error("配置值无效 (key: {key}): {value}")]
    InvalidWeight { key: String, value: f64 },
}

/// 引擎运行错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("配置读取失败: {0}")]
    ConfigRead(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
