// ==========================================
// 商品目录导入 - 分批导入器
// ==========================================
// 职责: 将已确定单位的记录按固定批量并发提交给外部 create 能力
// 红线:
//   - 批内并发，批间严格串行（第 i 批全部结算后才开始第 i+1 批）
//   - 单条失败/超时/panic 只记为该记录失败，不影响同批或后续批次
//   - 统计与进度只在整批结算后写入
//   - 取消只在批次之间检查，绝不打断进行中的批次
//   - 不自动重试
// ==========================================

use crate::domain::product::{ImportFailure, ImportOutcome, ImportStats, NewProduct, ResolvedProduct};
use crate::importer::product_importer_trait::ProductCreator;
use crate::importer::progress::SessionReporter;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 默认批量
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// 批次数
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    let size = batch_size.max(1);
    (total + size - 1) / size
}

#[derive(Debug, Clone)]
pub struct BatchImporterOptions {
    pub batch_size: usize,
    /// 批间让步间隔；无界面场景可为 0
    pub inter_batch_delay: Duration,
    /// 单次调用超时；None 表示不限时
    pub call_timeout: Option<Duration>,
}

impl Default for BatchImporterOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: Duration::ZERO,
            call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// 分批导入结果
#[derive(Debug, Clone, Default)]
pub struct BatchImportSummary {
    pub stats: ImportStats,
    pub outcomes: Vec<ImportOutcome>,
    pub failures: Vec<ImportFailure>,
    pub batches_completed: usize,
    pub cancelled: bool,
}

// ==========================================
// BatchImporter
// ==========================================
pub struct BatchImporter {
    creator: Arc<dyn ProductCreator>,
    options: BatchImporterOptions,
}

impl BatchImporter {
    pub fn new(creator: Arc<dyn ProductCreator>, options: BatchImporterOptions) -> Self {
        Self { creator, options }
    }

    pub fn options(&self) -> &BatchImporterOptions {
        &self.options
    }

    /// 分批提交
    ///
    /// # 参数
    /// - records: 已校验、已确定单位的记录（按行序）
    /// - reporter: 会话上报（每批结算后写入一次）
    /// - cancel: 协作式取消令牌（批次之间检查）
    pub async fn import(
        &self,
        records: Vec<ResolvedProduct>,
        reporter: &SessionReporter,
        cancel: &CancellationToken,
    ) -> BatchImportSummary {
        let total = records.len();
        let batch_size = self.options.batch_size.max(1);
        let batches = batch_count(total, batch_size);

        let mut summary = BatchImportSummary {
            stats: ImportStats::with_total(total),
            ..BatchImportSummary::default()
        };

        info!(total, batch_size, batches, "开始分批提交");

        let mut pending = records.into_iter().peekable();
        let mut batch_no = 0usize;

        while pending.peek().is_some() {
            if batch_no > 0 && !self.options.inter_batch_delay.is_zero() {
                // 批间停顿期间收到取消立即结束等待
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.options.inter_batch_delay) => {}
                }
            }

            if cancel.is_cancelled() {
                warn!(
                    completed_batches = batch_no,
                    remaining = total - summary.stats.processed(),
                    "导入已取消，停止派发后续批次"
                );
                summary.cancelled = true;
                break;
            }

            batch_no += 1;
            let batch: Vec<ResolvedProduct> = pending.by_ref().take(batch_size).collect();
            debug!(batch_no, size = batch.len(), "派发批次");

            let outcomes = self.submit_batch(batch).await;

            let successes = outcomes.iter().filter(|o| o.success).count();
            let failures: Vec<ImportFailure> =
                outcomes.iter().filter_map(ImportOutcome::to_failure).collect();
            for failure in &failures {
                warn!(batch_no, name = %failure.name, error = %failure.error, "商品创建失败");
            }

            summary.stats.record_batch(successes, failures.len());
            reporter.record_batch(successes, failures.clone());
            summary.failures.extend(failures);
            summary.outcomes.extend(outcomes);
            summary.batches_completed = batch_no;

            info!(
                batch_no,
                batches,
                success = summary.stats.success,
                failed = summary.stats.failed,
                "批次结算完成"
            );
        }

        summary
    }

    /// 并发提交一个批次并等待全部结算
    async fn submit_batch(&self, batch: Vec<ResolvedProduct>) -> Vec<ImportOutcome> {
        let (records, handles): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .map(|record| {
                let creator = Arc::clone(&self.creator);
                let product = record.to_new_product();
                let timeout = self.options.call_timeout;
                let handle = tokio::spawn(create_one(creator, product, timeout));
                (record, handle)
            })
            .unzip();

        let results = join_all(handles).await;

        records
            .into_iter()
            .zip(results)
            .map(|(record, result)| match result {
                Ok(Ok(())) => ImportOutcome::succeeded(record),
                Ok(Err(message)) => ImportOutcome::failed(record, message),
                // 任务 panic 或被中止，同样只记为该记录失败
                Err(join_err) => {
                    ImportOutcome::failed(record, format!("unexpected error: {}", join_err))
                }
            })
            .collect()
    }
}

/// 单条创建（带可选超时），错误统一转为文本
async fn create_one(
    creator: Arc<dyn ProductCreator>,
    product: NewProduct,
    timeout: Option<Duration>,
) -> Result<(), String> {
    let call = creator.create_product(product);
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(|e| format!("{:#}", e)),
            Err(_) => Err(format!("timed out after {} ms", limit.as_millis())),
        },
        None => call.await.map_err(|e| format!("{:#}", e)),
    }
}
