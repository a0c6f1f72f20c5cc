// ==========================================
// 商品目录导入 - 应用状态
// ==========================================
// 职责: 装配仓储、导入管道与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ApiResult, ImportApi};
use crate::config::{config_keys, ImportConfig};
use crate::importer::ProductImportPipeline;
use crate::repository::SqliteProductRepository;

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的导入配置
    pub config: ImportConfig,

    /// 商品仓储（同时是管道的 ProductCreator）
    pub product_repo: Arc<SqliteProductRepository>,

    /// 导入管道
    pub pipeline: Arc<ProductImportPipeline>,

    /// 商品导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - config: 已加载并校验的导入配置
    pub fn new(db_path: String, config: ImportConfig) -> ApiResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let product_repo = Arc::new(SqliteProductRepository::new(&db_path)?);
        let pipeline = Arc::new(ProductImportPipeline::with_config(
            product_repo.clone(),
            config.clone(),
        )?);
        let import_api = Arc::new(ImportApi::new(pipeline.clone()));

        tracing::info!(
            batch_size = config.batch_size,
            call_timeout_ms = config.call_timeout_ms,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            config,
            product_repo,
            pipeline,
            import_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 CATALOG_IMPORT_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(config_keys::ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_app_state_wiring() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone(), ImportConfig::default()).unwrap();

        assert_eq!(state.db_path, db_path);
        assert_eq!(state.product_repo.count().unwrap(), 0);
        assert!(!state.pipeline.is_running());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db").to_string_lossy().to_string();
        let config = ImportConfig {
            batch_size: 0,
            ..ImportConfig::default()
        };

        let err = AppState::new(db_path, config).err().unwrap();
        assert!(err.is_configuration_error());
    }
}
