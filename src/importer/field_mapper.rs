// ==========================================
// 商品目录导入 - 列映射器实现
// ==========================================
// 职责: 表头 → 标准字段列位置（别名匹配，大小写不敏感）
// 红线: name / category 任一无法解析 → 整体失败，不做部分导入
// ==========================================

use crate::domain::product::{HeaderMap, RawRow};
use crate::domain::types::CanonicalField;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

// ==========================================
// 默认列名别名表
// ==========================================
pub const ID_ALIASES: &[&str] = &["#", "id", "product id", "product_id"];
pub const NAME_ALIASES: &[&str] = &["product name", "product_name", "name", "product"];
pub const CATEGORY_ALIASES: &[&str] = &[
    "category",
    "type",
    "product category",
    "product_category",
];
pub const UNIT_ALIASES: &[&str] = &["unit", "units", "measure", "unit_of_measure"];
pub const DESCRIPTION_ALIASES: &[&str] = &["description", "desc", "notes", "details"];

/// 在表头中查找首个匹配任一别名的列位置
///
/// 表头 trim + 小写后与别名做精确比较；无匹配返回 None
pub fn find_column_index<S: AsRef<str>>(headers: &[String], aliases: &[S]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = header.trim().to_lowercase();
        aliases
            .iter()
            .any(|alias| alias.as_ref().trim().to_lowercase() == normalized)
    })
}

// ==========================================
// ColumnAliases - 可替换的别名表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    pub id: Vec<String>,
    pub name: Vec<String>,
    pub category: Vec<String>,
    pub unit: Vec<String>,
    pub description: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        let own = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            id: own(ID_ALIASES),
            name: own(NAME_ALIASES),
            category: own(CATEGORY_ALIASES),
            unit: own(UNIT_ALIASES),
            description: own(DESCRIPTION_ALIASES),
        }
    }
}

impl ColumnAliases {
    pub fn for_field(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Id => &self.id,
            CanonicalField::Name => &self.name,
            CanonicalField::Category => &self.category,
            CanonicalField::Unit => &self.unit,
            CanonicalField::Description => &self.description,
        }
    }
}

// ==========================================
// FieldMapper - 列解析 + 行取值
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    aliases: ColumnAliases,
}

impl FieldMapper {
    pub fn new(aliases: ColumnAliases) -> Self {
        Self { aliases }
    }

    /// 解析表头
    ///
    /// # 返回
    /// - Ok(HeaderMap): 必填列均已解析（可选列可能为 None）
    /// - Err(MissingRequiredColumns): name 或 category 未解析
    pub fn resolve(&self, headers: &[String]) -> ImportResult<HeaderMap> {
        let mut map = HeaderMap::default();
        for field in CanonicalField::ALL {
            let index = find_column_index(headers, self.aliases.for_field(field));
            debug!(field = %field, index = ?index, "列映射");
            map.set(field, index);
        }

        let missing = map.missing_required();
        if !missing.is_empty() {
            error!(headers = ?headers, missing = ?missing, "必填列无法解析");
            return Err(ImportError::MissingRequiredColumns { missing });
        }

        Ok(map)
    }

    /// 按列位置取值；列未解析、行过短或值为空均返回 None
    pub fn get_field(&self, row: &RawRow, map: &HeaderMap, field: CanonicalField) -> Option<String> {
        let index = map.index_of(field)?;
        row.get(index)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}
