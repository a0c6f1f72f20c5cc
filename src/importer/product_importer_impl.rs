// ==========================================
// 商品目录导入 - 导入管道实现
// ==========================================
// 职责: 整合导入流程，从 CSV 文本到外部 create 能力
// 流程: 切行/分词 → 列解析 → 行校验 → 单位推断 → 分批提交 → 汇总
// 状态: Idle → Parsing → Validated → Importing → Completed
//       Parsing → Failed（必填列缺失，未解析任何数据行）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::product::ResolvedProduct;
use crate::domain::types::ImportPhase;
use crate::importer::batch_importer::BatchImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::product_importer_trait::{ProductCreator, UnitInferencer};
use crate::importer::progress::{ImportSession, SessionReporter};
use crate::importer::report::ImportReport;
use crate::importer::row_validator::{parsing_progress, RowValidationOutput, RowValidator};
use crate::importer::tokenizer::TokenizedDocument;
use crate::importer::unit_inference::RuleTableUnitInferencer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, Span};
use uuid::Uuid;

// ==========================================
// RunningGuard - 单实例单运行
// ==========================================
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ==========================================
// ProductImportPipeline - 商品导入管道
// ==========================================
pub struct ProductImportPipeline {
    // 外部能力
    creator: Arc<dyn ProductCreator>,
    inferencer: Arc<dyn UnitInferencer>,

    config: ImportConfig,

    // 会话状态（watch 广播）
    reporter: SessionReporter,
    running: AtomicBool,
}

impl ProductImportPipeline {
    /// 创建导入管道
    ///
    /// # 参数
    /// - creator: 外部商品创建能力
    /// - inferencer: 单位推断器
    /// - config: 导入配置（会先校验）
    pub fn new(
        creator: Arc<dyn ProductCreator>,
        inferencer: Arc<dyn UnitInferencer>,
        config: ImportConfig,
    ) -> ImportResult<Self> {
        config.validate()?;
        Ok(Self {
            creator,
            inferencer,
            config,
            reporter: SessionReporter::new(),
            running: AtomicBool::new(false),
        })
    }

    /// 使用配置中的单位规则表构建推断器
    pub fn with_config(creator: Arc<dyn ProductCreator>, config: ImportConfig) -> ImportResult<Self> {
        let rules = config.unit_rules()?;
        rules.validate()?;
        let inferencer = Arc::new(RuleTableUnitInferencer::new(rules));
        Self::new(creator, inferencer, config)
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 订阅会话快照（phase / progress / stats）
    pub fn subscribe(&self) -> watch::Receiver<ImportSession> {
        self.reporter.subscribe()
    }

    /// 当前会话快照
    pub fn session(&self) -> ImportSession {
        self.reporter.snapshot()
    }

    /// 导入（不可取消）
    pub async fn run(&self, text: &str) -> ImportResult<ImportReport> {
        self.run_with_cancel(text, CancellationToken::new()).await
    }

    /// 导入 CSV 文本
    ///
    /// # 返回
    /// - Ok(ImportReport): 完成（含部分失败/取消）
    /// - Err(MissingRequiredColumns): 必填列缺失，未导入任何记录
    /// - Err(AlreadyRunning): 本实例已有运行中的导入
    #[instrument(skip(self, text, cancel), fields(run_id))]
    pub async fn run_with_cancel(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> ImportResult<ImportReport> {
        let _guard = RunningGuard::acquire(&self.running).ok_or(ImportError::AlreadyRunning)?;

        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        Span::current().record("run_id", run_id.as_str());
        self.reporter.begin(&run_id);
        info!(bytes = text.len(), "开始导入商品目录");

        // === 步骤 1: 切行/分词 ===
        let document = match TokenizedDocument::parse(text) {
            Some(doc) => doc,
            None => {
                info!("文档为空，无需导入");
                self.reporter.mark_validated(0, Vec::new());
                self.reporter.complete(false);
                return Ok(ImportReport {
                    run_id,
                    elapsed_ms: elapsed_ms(started),
                    ..ImportReport::default()
                });
            }
        };
        let total_rows = document.data_row_count();
        debug!(total_rows, columns = document.header.len(), "分词完成");

        // === 步骤 2: 列解析 ===
        let mapper = FieldMapper::new(self.config.column_aliases.clone());
        let header_map = match mapper.resolve(&document.header) {
            Ok(map) => map,
            Err(e) => {
                error!(error = %e, "列解析失败，导入中止");
                self.reporter.fail();
                return Err(e);
            }
        };
        // 列解析通过后才进入 Parsing；配置错误保持 Idle → Failed
        self.reporter.set_phase(ImportPhase::Parsing);

        // === 步骤 3: 行校验（首段 + 剩余段，段间让出调度） ===
        let validator = RowValidator::new(mapper);
        let mut output = RowValidationOutput::default();
        let split = self.config.parse_slice_size.min(total_rows);
        let (head, tail) = document.rows.split_at(split);

        let on_row = |processed: usize| {
            self.reporter
                .advance_progress(parsing_progress(processed, total_rows));
        };
        validator.validate_slice(head, 1, &header_map, &mut output, on_row);
        if !tail.is_empty() {
            tokio::task::yield_now().await;
            validator.validate_slice(tail, split + 1, &header_map, &mut output, on_row);
        }

        // === 步骤 4: 单位推断 ===
        let records: Vec<ResolvedProduct> = output
            .records
            .into_iter()
            .map(|record| {
                let unit = self.inferencer.determine_unit(&record);
                debug!(row_number = record.row_number, unit = %unit, "单位已确定");
                record.resolve(unit)
            })
            .collect();

        let validation_errors = output.errors;
        info!(
            valid = records.len(),
            rejected = validation_errors.len(),
            "行校验完成"
        );
        self.reporter
            .mark_validated(records.len(), validation_errors.clone());

        // === 步骤 5: 分批提交 ===
        self.reporter.set_phase(ImportPhase::Importing);
        let importer = BatchImporter::new(Arc::clone(&self.creator), self.config.batch_options());
        let summary = importer.import(records, &self.reporter, &cancel).await;

        // === 步骤 6: 汇总 ===
        self.reporter.complete(summary.cancelled);
        let report = ImportReport {
            run_id,
            stats: summary.stats,
            validation_errors,
            failures: summary.failures,
            cancelled: summary.cancelled,
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            total = report.stats.total,
            success = report.stats.success,
            failed = report.stats.failed,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "导入完成"
        );
        Ok(report)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::NewProduct;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingCreator {
        created: Mutex<Vec<NewProduct>>,
    }

    #[async_trait]
    impl ProductCreator for CollectingCreator {
        async fn create_product(&self, product: NewProduct) -> anyhow::Result<()> {
            self.created.lock().unwrap().push(product);
            Ok(())
        }
    }

    fn pipeline(creator: Arc<CollectingCreator>) -> ProductImportPipeline {
        ProductImportPipeline::with_config(creator, ImportConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_document_completes() {
        let creator = Arc::new(CollectingCreator::default());
        let pipeline = pipeline(creator.clone());

        let report = pipeline.run("  \n\n").await.unwrap();

        assert_eq!(report.stats.total, 0);
        let session = pipeline.session();
        assert_eq!(session.phase, ImportPhase::Completed);
        assert_eq!(session.progress, 100);
        assert!(creator.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_category_column_fails() {
        let creator = Arc::new(CollectingCreator::default());
        let pipeline = pipeline(creator.clone());

        let err = pipeline.run("name,price\nBolo,10").await.unwrap_err();

        assert!(matches!(err, ImportError::MissingRequiredColumns { .. }));
        let session = pipeline.session();
        assert_eq!(session.phase, ImportPhase::Failed);
        assert!(session.progress < 100);
        assert!(creator.created.lock().unwrap().is_empty());
        assert!(!pipeline.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_column_failure_never_enters_parsing() {
        let creator = Arc::new(CollectingCreator::default());
        let pipeline = Arc::new(pipeline(creator));
        let mut rx = pipeline.subscribe();

        let observer = tokio::spawn(async move {
            let mut phases = Vec::new();
            while rx.changed().await.is_ok() {
                let phase = rx.borrow_and_update().phase;
                phases.push(phase);
                if phase.is_terminal() {
                    break;
                }
            }
            phases
        });

        pipeline.run("sku,category\nA1,Doces\n").await.unwrap_err();
        let phases = observer.await.unwrap();

        assert!(!phases.contains(&ImportPhase::Parsing), "phases: {:?}", phases);
        assert!(phases.iter().all(|p| matches!(p, ImportPhase::Idle | ImportPhase::Failed)));
        assert_eq!(phases.last(), Some(&ImportPhase::Failed));
    }

    #[tokio::test]
    async fn test_rows_beyond_first_slice_keep_numbering() {
        let creator = Arc::new(CollectingCreator::default());
        let config = ImportConfig {
            parse_slice_size: 2,
            ..ImportConfig::default()
        };
        let pipeline = ProductImportPipeline::with_config(creator.clone(), config).unwrap();

        let text = "name,category\nBolo,Doces\nPão,Padaria\nX,Doces\nTorta,Doces";
        let report = pipeline.run(text).await.unwrap();

        assert_eq!(report.stats.total, 3);
        assert_eq!(report.validation_messages(), vec![
            "Row 3: Product name must be at least 2 characters".to_string()
        ]);
        assert_eq!(creator.created.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_running_guard_releases() {
        let flag = AtomicBool::new(false);
        {
            let _guard = RunningGuard::acquire(&flag).unwrap();
            assert!(RunningGuard::acquire(&flag).is_none());
        }
        assert!(RunningGuard::acquire(&flag).is_some());
    }
}
