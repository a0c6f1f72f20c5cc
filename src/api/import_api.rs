// ==========================================
// 商品目录导入API
// ==========================================
// 职责: 读取文件 → 字符集解码 → 调用导入管道
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::importer::product_importer_impl::ProductImportPipeline;
use crate::importer::progress::ImportSession;
use crate::importer::report::ImportReport;
use encoding_rs::{UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 输入文件字符集
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    /// ISO-8859-1 / windows-1252（表格软件导出的默认编码）
    #[default]
    Latin1,
    Utf8,
}

impl fmt::Display for FileEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEncoding::Latin1 => write!(f, "latin1"),
            FileEncoding::Utf8 => write!(f, "utf8"),
        }
    }
}

impl FromStr for FileEncoding {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "windows-1252" | "cp1252" => {
                Ok(FileEncoding::Latin1)
            }
            "utf8" | "utf-8" => Ok(FileEncoding::Utf8),
            other => Err(ApiError::InvalidInput(format!("不支持的字符集: {}", other))),
        }
    }
}

/// 按字符集解码文件内容（去除 UTF-8 BOM）
pub fn decode_bytes(bytes: &[u8], encoding: FileEncoding) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let (text, had_errors) = match encoding {
        FileEncoding::Latin1 => WINDOWS_1252.decode_without_bom_handling(bytes),
        FileEncoding::Utf8 => UTF_8.decode_without_bom_handling(bytes),
    };
    if had_errors {
        warn!(encoding = %encoding, "文件包含无法解码的字节，已替换为 U+FFFD");
    }
    text.into_owned()
}

/// 导入API
pub struct ImportApi {
    pipeline: Arc<ProductImportPipeline>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(pipeline: Arc<ProductImportPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<ProductImportPipeline> {
        &self.pipeline
    }

    /// 订阅导入进度
    pub fn subscribe(&self) -> watch::Receiver<ImportSession> {
        self.pipeline.subscribe()
    }

    /// 导入商品文件
    ///
    /// # 参数
    /// - file_path: CSV 文件路径
    /// - encoding: 文件字符集
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入结果（含部分失败）
    /// - Err(ApiError): 文件不可读 / 配置错误 / 已有导入在运行
    pub async fn import_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        encoding: FileEncoding,
    ) -> ApiResult<ImportReport> {
        self.import_file_with_cancel(file_path, encoding, CancellationToken::new())
            .await
    }

    /// 导入商品文件（可取消，取消只在批次之间生效）
    pub async fn import_file_with_cancel<P: AsRef<Path>>(
        &self,
        file_path: P,
        encoding: FileEncoding,
        cancel: CancellationToken,
    ) -> ApiResult<ImportReport> {
        let path = file_path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::FileReadError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        info!(path = %path.display(), bytes = bytes.len(), encoding = %encoding, "读取导入文件");

        let text = decode_bytes(&bytes, encoding);
        self.import_text_with_cancel(&text, cancel).await
    }

    /// 导入已解码的 CSV 文本
    pub async fn import_text(&self, text: &str) -> ApiResult<ImportReport> {
        self.import_text_with_cancel(text, CancellationToken::new())
            .await
    }

    pub async fn import_text_with_cancel(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> ApiResult<ImportReport> {
        let report = self.pipeline.run_with_cancel(text, cancel).await?;
        Ok(report)
    }
}
