// ==========================================
// 商品目录导入 - 导入配置
// ==========================================
// 加载顺序: 默认值 → JSON 配置文件 → 环境变量 → 命令行参数（由调用方覆写）
// ==========================================

use crate::importer::batch_importer::{BatchImporterOptions, DEFAULT_BATCH_SIZE};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::ColumnAliases;
use crate::importer::unit_inference::{UnitRuleSet, DEFAULT_UNIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// 配置键（JSON 字段名 / 环境变量）
pub mod config_keys {
    pub const BATCH_SIZE: &str = "batch_size";
    pub const INTER_BATCH_DELAY_MS: &str = "inter_batch_delay_ms";
    pub const CALL_TIMEOUT_MS: &str = "call_timeout_ms";
    pub const PARSE_SLICE_SIZE: &str = "parse_slice_size";
    pub const DEFAULT_UNIT: &str = "default_unit";
    pub const UNIT_RULES_PATH: &str = "unit_rules_path";

    pub const ENV_BATCH_SIZE: &str = "CATALOG_IMPORT_BATCH_SIZE";
    pub const ENV_BATCH_DELAY_MS: &str = "CATALOG_IMPORT_BATCH_DELAY_MS";
    pub const ENV_CALL_TIMEOUT_MS: &str = "CATALOG_IMPORT_CALL_TIMEOUT_MS";
    pub const ENV_DB_PATH: &str = "CATALOG_IMPORT_DB_PATH";
}

/// 首段同步处理的数据行数
pub const DEFAULT_PARSE_SLICE_SIZE: usize = 100;

/// 单次 create 调用默认超时（毫秒）
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

// ==========================================
// ImportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 每批并发提交数（>= 1）
    pub batch_size: usize,
    /// 批间间隔（毫秒），0 表示不等待
    pub inter_batch_delay_ms: u64,
    /// 单次调用超时（毫秒），0 表示不限时
    pub call_timeout_ms: u64,
    /// 解析首段行数（>= 1）
    pub parse_slice_size: usize,
    /// 无法推断/识别时的默认单位
    pub default_unit: String,
    /// 自定义单位规则表（JSON）
    pub unit_rules_path: Option<PathBuf>,
    /// 列名别名表
    pub column_aliases: ColumnAliases,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay_ms: 0,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            parse_slice_size: DEFAULT_PARSE_SLICE_SIZE,
            default_unit: DEFAULT_UNIT.to_string(),
            unit_rules_path: None,
            column_aliases: ColumnAliases::default(),
        }
    }
}

impl ImportConfig {
    /// 加载配置: 可选 JSON 文件 + 环境变量覆写 + 校验
    pub fn load(path: Option<&Path>) -> ImportResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取（缺省字段取默认值）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ImportError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ImportError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// 按键查找覆写值（生产环境传入 std::env::var）
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ImportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override::<usize, _>(&lookup, config_keys::ENV_BATCH_SIZE)? {
            self.batch_size = v;
        }
        if let Some(v) = parse_override::<u64, _>(&lookup, config_keys::ENV_BATCH_DELAY_MS)? {
            self.inter_batch_delay_ms = v;
        }
        if let Some(v) = parse_override::<u64, _>(&lookup, config_keys::ENV_CALL_TIMEOUT_MS)? {
            self.call_timeout_ms = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.batch_size == 0 {
            return Err(ImportError::InvalidConfig(format!(
                "{} 必须 >= 1",
                config_keys::BATCH_SIZE
            )));
        }
        if self.parse_slice_size == 0 {
            return Err(ImportError::InvalidConfig(format!(
                "{} 必须 >= 1",
                config_keys::PARSE_SLICE_SIZE
            )));
        }
        if self.default_unit.trim().is_empty() {
            return Err(ImportError::InvalidConfig(format!(
                "{} 不能为空",
                config_keys::DEFAULT_UNIT
            )));
        }
        Ok(())
    }

    pub fn batch_options(&self) -> BatchImporterOptions {
        BatchImporterOptions {
            batch_size: self.batch_size,
            inter_batch_delay: Duration::from_millis(self.inter_batch_delay_ms),
            call_timeout: (self.call_timeout_ms > 0)
                .then(|| Duration::from_millis(self.call_timeout_ms)),
        }
    }

    /// 单位规则表: 自定义文件优先，否则内置表；default_unit 以本配置为准
    pub fn unit_rules(&self) -> ImportResult<UnitRuleSet> {
        let mut rules = match &self.unit_rules_path {
            Some(path) => UnitRuleSet::from_json_file(path)?,
            None => UnitRuleSet::bakery_default(),
        };
        rules.default_unit = self.default_unit.clone();
        Ok(rules)
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> ImportResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Ok(None),
    };
    debug!(key, value = %raw, "配置覆写");
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ImportError::InvalidConfig(format!("{}={} 无法解析", key, raw)))
}
