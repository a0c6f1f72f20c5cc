// ==========================================
// 商品目录导入 - 行校验器实现
// ==========================================
// 职责: RawRow → CandidateRecord | ValidationError
// 规则（按顺序，命中即拒绝该行）:
//   1. name 缺失
//   2. category 缺失
//   3. name 少于 2 个字符
// 行号: 数据区 1 起（不含表头）
// ==========================================

use crate::domain::product::{CandidateRecord, HeaderMap, RawRow, ValidationError};
use crate::domain::types::CanonicalField;
use crate::importer::field_mapper::FieldMapper;
use tracing::warn;

pub const MSG_NAME_MISSING: &str = "Product name is missing";
pub const MSG_CATEGORY_MISSING: &str = "Category is missing";
pub const MSG_NAME_TOO_SHORT: &str = "Product name must be at least 2 characters";

/// 商品名最小字符数
pub const MIN_NAME_CHARS: usize = 2;

/// 解析阶段占总进度的上限
pub const PARSING_PROGRESS_CAP: u8 = 50;

/// 解析阶段进度: floor(processed / total * 50)
pub fn parsing_progress(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return PARSING_PROGRESS_CAP;
    }
    let processed = processed.min(total);
    (processed * PARSING_PROGRESS_CAP as usize / total) as u8
}

/// 校验输出（记录与错误各自保持行序）
#[derive(Debug, Clone, Default)]
pub struct RowValidationOutput {
    pub records: Vec<CandidateRecord>,
    pub errors: Vec<ValidationError>,
}

impl RowValidationOutput {
    pub fn processed(&self) -> usize {
        self.records.len() + self.errors.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RowValidator {
    mapper: FieldMapper,
}

impl RowValidator {
    pub fn new(mapper: FieldMapper) -> Self {
        Self { mapper }
    }

    /// 校验单行
    pub fn validate_row(
        &self,
        row: &RawRow,
        row_number: usize,
        map: &HeaderMap,
    ) -> Result<CandidateRecord, ValidationError> {
        let name = self
            .mapper
            .get_field(row, map, CanonicalField::Name)
            .ok_or_else(|| ValidationError::new(row_number, MSG_NAME_MISSING))?;

        let category = self
            .mapper
            .get_field(row, map, CanonicalField::Category)
            .ok_or_else(|| ValidationError::new(row_number, MSG_CATEGORY_MISSING))?;

        if name.chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::new(row_number, MSG_NAME_TOO_SHORT));
        }

        Ok(CandidateRecord {
            id: self.mapper.get_field(row, map, CanonicalField::Id),
            name,
            category,
            unit: self.mapper.get_field(row, map, CanonicalField::Unit),
            description: self.mapper.get_field(row, map, CanonicalField::Description),
            row_number,
        })
    }

    /// 校验一段连续数据行
    ///
    /// # 参数
    /// - rows: 本段数据行
    /// - first_row_number: 本段首行的行号
    /// - output: 累积输出
    /// - on_row: 每处理一行回调一次，参数为累计已处理行数
    pub fn validate_slice<F>(
        &self,
        rows: &[RawRow],
        first_row_number: usize,
        map: &HeaderMap,
        output: &mut RowValidationOutput,
        mut on_row: F,
    ) where
        F: FnMut(usize),
    {
        for (offset, row) in rows.iter().enumerate() {
            let row_number = first_row_number + offset;
            match self.validate_row(row, row_number, map) {
                Ok(record) => output.records.push(record),
                Err(e) => {
                    warn!(row_number, reason = %e.message, "行校验未通过");
                    output.errors.push(e);
                }
            }
            on_row(output.processed());
        }
    }

    /// 一次性校验全部数据行（无进度回调）
    pub fn validate_all(&self, rows: &[RawRow], map: &HeaderMap) -> RowValidationOutput {
        let mut output = RowValidationOutput::default();
        self.validate_slice(rows, 1, map, &mut output, |_| {});
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> RawRow {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn full_map() -> HeaderMap {
        FieldMapper::default()
            .resolve(&row(&["id", "name", "category", "unit", "description"]))
            .unwrap()
    }

    #[test]
    fn test_valid_row() {
        let validator = RowValidator::default();
        let record = validator
            .validate_row(&row(&["1", "Bolo de Milho", "Refrigerado", "", ""]), 1, &full_map())
            .unwrap();
        assert_eq!(record.id, Some("1".to_string()));
        assert_eq!(record.name, "Bolo de Milho");
        assert_eq!(record.category, "Refrigerado");
        assert_eq!(record.unit, None);
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_name_missing() {
        let err = RowValidator::default()
            .validate_row(&row(&["1", "", "Doces"]), 4, &full_map())
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 4: Product name is missing");
    }

    #[test]
    fn test_category_missing_short_row() {
        // 行比表头短 → category 视为缺失
        let err = RowValidator::default()
            .validate_row(&row(&["1", "Bolo"]), 2, &full_map())
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 2: Category is missing");
    }

    #[test]
    fn test_name_missing_checked_before_category() {
        let err = RowValidator::default()
            .validate_row(&row(&["1"]), 1, &full_map())
            .unwrap_err();
        assert_eq!(err.message, MSG_NAME_MISSING);
    }

    #[test]
    fn test_name_too_short() {
        let err = RowValidator::default()
            .validate_row(&row(&["1", "B", "Doces"]), 7, &full_map())
            .unwrap_err();
        assert_eq!(err.to_string(), "Row 7: Product name must be at least 2 characters");
    }

    #[test]
    fn test_two_char_multibyte_name_accepted() {
        // 按字符计数，而非字节
        let record = RowValidator::default()
            .validate_row(&row(&["", "Pã", "Padaria"]), 1, &full_map())
            .unwrap();
        assert_eq!(record.name, "Pã");
    }

    #[test]
    fn test_validate_all_keeps_row_numbers() {
        let rows = vec![
            row(&["1", "Bolo", "Doces"]),
            row(&["2", "", "Doces"]),
            row(&["3", "Torta", "Refrigerado"]),
        ];
        let output = RowValidator::default().validate_all(&rows, &full_map());
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[1].row_number, 3);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].row_number, 2);
    }

    #[test]
    fn test_validate_slice_progress_callback() {
        let rows = vec![row(&["1", "Bolo", "Doces"]); 4];
        let mut output = RowValidationOutput::default();
        let mut seen = Vec::new();
        RowValidator::default().validate_slice(&rows, 1, &full_map(), &mut output, |n| {
            seen.push(n)
        });
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parsing_progress() {
        assert_eq!(parsing_progress(0, 10), 0);
        assert_eq!(parsing_progress(3, 10), 15);
        assert_eq!(parsing_progress(1, 3), 16);
        assert_eq!(parsing_progress(10, 10), 50);
        assert_eq!(parsing_progress(0, 0), 50);
    }
}
