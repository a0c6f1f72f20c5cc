// ==========================================
// 商品目录导入 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道与外部协作方之间的接口（不包含实现）
// ==========================================

use crate::domain::product::{CandidateRecord, NewProduct};
use async_trait::async_trait;

// ==========================================
// ProductCreator Trait
// ==========================================
// 用途: 外部 "create product" 能力（远程调用/存储层），逐条成功或失败
// 实现者: SqliteProductRepository，或调用方自带的远程客户端
#[async_trait]
pub trait ProductCreator: Send + Sync {
    /// 创建单个商品
    ///
    /// # 参数
    /// - product: 下游调用参数 { name, category, unit, description }
    ///
    /// # 返回
    /// - Ok(()): 创建成功
    /// - Err: 记录级失败（错误文本进入失败清单，不影响同批次其他记录）
    async fn create_product(&self, product: NewProduct) -> anyhow::Result<()>;
}

// ==========================================
// UnitInferencer Trait
// ==========================================
// 用途: 计量单位推断（可按部署替换规则）
// 实现者: RuleTableUnitInferencer
pub trait UnitInferencer: Send + Sync {
    /// 确定记录的计量单位
    ///
    /// # 规则
    /// - record.unit 非空 → 同义词标准化
    /// - 否则 → 按有序规则表推断
    ///
    /// # 返回
    /// - 非空单位字符串
    fn determine_unit(&self, record: &CandidateRecord) -> String;
}
