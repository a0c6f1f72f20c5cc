// ==========================================
// 商品目录导入 - 计量单位推断
// ==========================================
// 职责: unit 已提供 → 同义词表标准化；未提供 → 按分类/名称关键字规则表推断
// 红线: 规则表严格有序，首条命中即返回，不可重排或合并
// ==========================================

use crate::domain::product::CandidateRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::product_importer_trait::UnitInferencer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认计量单位
pub const DEFAULT_UNIT: &str = "piece";

// ==========================================
// 单位同义词表
// ==========================================
const UNIT_SYNONYMS: &[(&str, &str)] = &[
    ("unit", "unit"),
    ("units", "unit"),
    ("piece", "piece"),
    ("pieces", "piece"),
    ("pc", "piece"),
    ("pcs", "piece"),
    ("loaf", "loaf"),
    ("loaves", "loaf"),
    ("kg", "kg"),
    ("kilograms", "kg"),
    ("g", "g"),
    ("gram", "g"),
    ("grams", "g"),
    ("dozen", "dozen"),
    ("box", "box"),
    ("boxes", "box"),
    ("pack", "pack"),
    ("package", "pack"),
    ("cup", "cup"),
    ("cups", "cup"),
    ("slice", "slice"),
    ("slices", "slice"),
    ("cake", "cake"),
    ("cakes", "cake"),
];

/// 标准化单位写法（trim + 小写后查同义词表），未知或空 → "piece"
pub fn normalize_unit_token(token: &str) -> String {
    normalize_unit_token_or(token, DEFAULT_UNIT)
}

/// 同 normalize_unit_token，未知时回退到指定默认单位
pub fn normalize_unit_token_or(token: &str, default_unit: &str) -> String {
    let key = token.trim().to_lowercase();
    UNIT_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, unit)| unit.to_string())
        .unwrap_or_else(|| default_unit.to_string())
}

// ==========================================
// 规则表
// ==========================================

/// 名称关键字 → 单位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRule {
    pub keywords: Vec<String>,
    pub unit: String,
}

/// 分类关键字命中后，按 name_rules 顺序匹配，均未命中取 fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRule {
    pub category_keywords: Vec<String>,
    #[serde(default)]
    pub name_rules: Vec<NameRule>,
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRuleSet {
    pub rules: Vec<UnitRule>,
    #[serde(default = "default_unit")]
    pub default_unit: String,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| haystack.contains(k.to_lowercase().as_str()))
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn name_rule(keywords: &[&str], unit: &str) -> NameRule {
    NameRule {
        keywords: words(keywords),
        unit: unit.to_string(),
    }
}

impl UnitRuleSet {
    /// 内置烘焙品类规则表
    pub fn bakery_default() -> Self {
        Self {
            rules: vec![
                // 1. 冷藏
                UnitRule {
                    category_keywords: words(&["refrigerado"]),
                    name_rules: vec![
                        name_rule(&["bolo"], "cake"),
                        name_rule(&["mousse", "copo"], "cup"),
                        name_rule(&["torta", "pudim"], "slice"),
                    ],
                    fallback: "piece".to_string(),
                },
                // 2. 预包装
                UnitRule {
                    category_keywords: words(&["embalado"]),
                    name_rules: vec![
                        name_rule(&["bolo"], "cake"),
                        name_rule(&["pão"], "loaf"),
                        name_rule(&["biscoito"], "pack"),
                    ],
                    fallback: "piece".to_string(),
                },
                // 3. 咸点
                UnitRule {
                    category_keywords: words(&["salgados"]),
                    name_rules: Vec::new(),
                    fallback: "piece".to_string(),
                },
                // 4. 展柜
                UnitRule {
                    category_keywords: words(&["exposição", "display"]),
                    name_rules: vec![name_rule(&["bolo"], "slice")],
                    fallback: "piece".to_string(),
                },
            ],
            default_unit: default_unit(),
        }
    }

    /// 从 JSON 文件加载规则表
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ImportError::UnitRulesError(format!("{}: {}", path.display(), e))
        })?;
        let rules: UnitRuleSet = serde_json::from_str(&raw)?;
        rules.validate()?;
        Ok(rules)
    }

    /// 单位不得为空
    pub fn validate(&self) -> ImportResult<()> {
        if self.default_unit.trim().is_empty() {
            return Err(ImportError::UnitRulesError("default_unit 为空".to_string()));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            let empty_unit = rule.fallback.trim().is_empty()
                || rule.name_rules.iter().any(|r| r.unit.trim().is_empty());
            if empty_unit {
                return Err(ImportError::UnitRulesError(format!(
                    "第 {} 条规则包含空单位",
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// 按规则表推断（category 取首个 '/' 之前部分，均小写）
    pub fn infer(&self, category: &str, name: &str) -> String {
        let category = category
            .split('/')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let name = name.to_lowercase();

        for rule in &self.rules {
            if !contains_any(&category, &rule.category_keywords) {
                continue;
            }
            return rule
                .name_rules
                .iter()
                .find(|r| contains_any(&name, &r.keywords))
                .map(|r| r.unit.clone())
                .unwrap_or_else(|| rule.fallback.clone());
        }

        self.default_unit.clone()
    }
}

impl Default for UnitRuleSet {
    fn default() -> Self {
        Self::bakery_default()
    }
}

// ==========================================
// RuleTableUnitInferencer - 默认单位推断实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RuleTableUnitInferencer {
    rules: UnitRuleSet,
}

impl RuleTableUnitInferencer {
    pub fn new(rules: UnitRuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &UnitRuleSet {
        &self.rules
    }
}

impl UnitInferencer for RuleTableUnitInferencer {
    fn determine_unit(&self, record: &CandidateRecord) -> String {
        match record.unit.as_deref() {
            Some(unit) if !unit.trim().is_empty() => {
                normalize_unit_token_or(unit, &self.rules.default_unit)
            }
            _ => self.rules.infer(&record.category, &record.name),
        }
    }
}
