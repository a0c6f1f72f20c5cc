// ==========================================
// 商品目录导入 - CSV 文本切分器
// ==========================================
// 阶段 0: 文本 → 物理行 → 字段
// 规则: 引号内逗号不分隔；"" 转义为单个引号；未闭合引号宽松处理
// ==========================================

use crate::domain::product::RawRow;

/// 按 CRLF / LF / CR 切分，丢弃 trim 后为空的行
pub fn split_document(text: &str) -> Vec<&str> {
    text.split(|c| c == '\r' || c == '\n')
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// 切分单行为字段
///
/// 逐字符扫描并维护 in_quotes 标记：
/// - `"` 翻转标记（字符保留，后续统一剥离外层引号）
/// - 引号外的 `,` 结束当前字段
/// - 其他字符（包括引号内的 `,`）追加到当前字段
///
/// 未闭合的引号不会报错，行尾之前始终视为引号内
pub fn parse_row(line: &str) -> RawRow {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    // 末尾逗号 → 末尾空字段
    fields.push(current);

    fields.into_iter().map(|f| clean_field(&f)).collect()
}

/// trim + 剥离外层引号 + "" → "
fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let inner = &trimmed[1..trimmed.len() - 1];
        inner.replace("\"\"", "\"").trim().to_string()
    } else {
        trimmed.to_string()
    }
}

// ==========================================
// TokenizedDocument - 表头 + 数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedDocument {
    pub header: RawRow,
    pub rows: Vec<RawRow>,
}

impl TokenizedDocument {
    /// 切分整份文档；无任何非空行时返回 None
    pub fn parse(text: &str) -> Option<Self> {
        let lines = split_document(text);
        let (header_line, data_lines) = lines.split_first()?;

        Some(Self {
            header: parse_row(header_line),
            rows: data_lines.iter().map(|line| parse_row(line)).collect(),
        })
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len()
    }
}
