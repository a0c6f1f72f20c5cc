// ==========================================
// 商品目录导入 - 应用层
// ==========================================
// 职责: 组件装配,连接命令行与后端
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
