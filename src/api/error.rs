// ==========================================
// 商品目录导入 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换导入层/仓储层错误为用户友好的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("文件读取失败 (path={path}): {message}")]
    FileReadError { path: String, message: String },

    // ==========================================
    // 导入错误
    // ==========================================
    /// 必填列缺失 / 配置无效，整次导入未执行
    #[error("配置错误: {0}")]
    ConfigurationError(String),

    #[error("已有导入正在进行")]
    ImportInProgress,

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),
}

impl ApiError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ApiError::ConfigurationError(_))
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::AlreadyRunning => ApiError::ImportInProgress,
            other @ (ImportError::MissingRequiredColumns { .. }
            | ImportError::InvalidConfig(_)
            | ImportError::UnitRulesError(_)) => ApiError::ConfigurationError(other.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            other @ (RepositoryError::DatabaseQueryError(_)
            | RepositoryError::UniqueConstraintViolation(_)
            | RepositoryError::DuplicateProduct { .. }
            | RepositoryError::WriteAbandoned { .. }) => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
