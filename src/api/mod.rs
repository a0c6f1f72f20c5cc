// ==========================================
// 商品目录导入 - API 层
// ==========================================
// 职责: 提供文件级导入接口,供命令行/上层应用调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{decode_bytes, FileEncoding, ImportApi};
