// ==========================================
// 商品目录导入 - 进度/统计上报
// ==========================================
// 职责: 维护 ImportSession 并通过 watch 通道对外广播快照
// 红线:
//   - 同一次运行内 progress 只增不减，范围 0..=100
//   - 解析阶段占 0..=50，导入阶段占 50..=100
//   - 完成（含部分失败/取消）时 progress 恰为 100
// ==========================================

use crate::domain::product::{ImportFailure, ImportStats, ValidationError};
use crate::domain::types::ImportPhase;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

pub const PROGRESS_MAX: u8 = 100;

/// 导入阶段进度: 50 + floor(completed / total * 50)
pub fn importing_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_MAX;
    }
    let completed = completed.min(total);
    (50 + completed * 50 / total) as u8
}

// ==========================================
// ImportSession - 单次运行的聚合状态
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSession {
    pub run_id: Option<String>,
    pub phase: ImportPhase,
    pub progress: u8,
    pub stats: ImportStats,
    pub validation_errors: Vec<ValidationError>,
    pub failures: Vec<ImportFailure>,
    pub cancelled: bool,
}

// ==========================================
// SessionReporter - 会话写入端
// ==========================================
// 只有导入管道持有写入端；外部通过 subscribe() 观察
#[derive(Debug, Clone)]
pub struct SessionReporter {
    tx: Arc<watch::Sender<ImportSession>>,
}

impl Default for SessionReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ImportSession::default());
        Self { tx: Arc::new(tx) }
    }

    /// 订阅会话快照
    pub fn subscribe(&self) -> watch::Receiver<ImportSession> {
        self.tx.subscribe()
    }

    /// 当前快照
    pub fn snapshot(&self) -> ImportSession {
        self.tx.borrow().clone()
    }

    /// 开始新一轮运行（重置会话，停留在 Idle，列解析成功后才进入 Parsing）
    pub fn begin(&self, run_id: &str) {
        self.tx.send_replace(ImportSession {
            run_id: Some(run_id.to_string()),
            ..ImportSession::default()
        });
    }

    pub fn set_phase(&self, phase: ImportPhase) {
        self.tx.send_modify(|s| s.phase = phase);
    }

    /// 推进进度（低于当前值的更新被忽略）
    pub fn advance_progress(&self, progress: u8) {
        let progress = progress.min(PROGRESS_MAX);
        self.tx.send_if_modified(|s| {
            if progress > s.progress {
                s.progress = progress;
                true
            } else {
                false
            }
        });
    }

    /// 校验完成: 固定 total，记录校验错误，进入 Validated
    pub fn mark_validated(&self, total: usize, validation_errors: Vec<ValidationError>) {
        self.tx.send_modify(|s| {
            s.stats = ImportStats::with_total(total);
            s.validation_errors = validation_errors;
            s.phase = ImportPhase::Validated;
            s.progress = s.progress.max(50);
        });
    }

    /// 批次结算后一次性写入（单批次单写者）
    pub fn record_batch(&self, successes: usize, failures: Vec<ImportFailure>) {
        self.tx.send_modify(|s| {
            s.stats.record_batch(successes, failures.len());
            s.failures.extend(failures);
            let progress = importing_progress(s.stats.processed(), s.stats.total);
            s.progress = s.progress.max(progress);
        });
    }

    /// 完成（含部分失败/取消）: phase=Completed，progress=100
    pub fn complete(&self, cancelled: bool) {
        self.tx.send_modify(|s| {
            s.phase = ImportPhase::Completed;
            s.progress = PROGRESS_MAX;
            s.cancelled = cancelled;
        });
    }

    /// 配置错误: phase=Failed，progress 保持不变
    pub fn fail(&self) {
        self.tx.send_modify(|s| s.phase = ImportPhase::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str) -> ImportFailure {
        ImportFailure {
            name: name.to_string(),
            error: "boom".to_string(),
        }
    }

    #[test]
    fn test_importing_progress() {
        assert_eq!(importing_progress(0, 7), 50);
        assert_eq!(importing_progress(5, 7), 85);
        assert_eq!(importing_progress(7, 7), 100);
        assert_eq!(importing_progress(9, 7), 100);
        assert_eq!(importing_progress(0, 0), 100);
    }

    #[test]
    fn test_progress_never_decreases() {
        let reporter = SessionReporter::new();
        reporter.begin("run-1");
        reporter.advance_progress(30);
        reporter.advance_progress(10);
        assert_eq!(reporter.snapshot().progress, 30);
        reporter.advance_progress(250);
        assert_eq!(reporter.snapshot().progress, 100);
    }

    #[test]
    fn test_lifecycle() {
        let reporter = SessionReporter::new();
        reporter.begin("run-2");
        assert_eq!(reporter.snapshot().phase, ImportPhase::Idle);
        reporter.set_phase(ImportPhase::Parsing);
        assert_eq!(reporter.snapshot().phase, ImportPhase::Parsing);

        reporter.mark_validated(7, vec![ValidationError::new(2, "Category is missing")]);
        let s = reporter.snapshot();
        assert_eq!(s.phase, ImportPhase::Validated);
        assert_eq!(s.progress, 50);
        assert_eq!(s.stats.total, 7);

        reporter.set_phase(ImportPhase::Importing);
        reporter.record_batch(4, vec![failure("Torta")]);
        let s = reporter.snapshot();
        assert_eq!(s.stats.success, 4);
        assert_eq!(s.stats.failed, 1);
        assert_eq!(s.progress, 85);
        assert_eq!(s.failures.len(), 1);

        reporter.record_batch(2, Vec::new());
        reporter.complete(false);
        let s = reporter.snapshot();
        assert_eq!(s.phase, ImportPhase::Completed);
        assert_eq!(s.progress, 100);
        assert_eq!(s.stats.processed(), 7);
    }

    #[test]
    fn test_begin_resets_previous_run() {
        let reporter = SessionReporter::new();
        reporter.begin("run-a");
        reporter.complete(true);
        reporter.begin("run-b");
        let s = reporter.snapshot();
        assert_eq!(s.run_id.as_deref(), Some("run-b"));
        assert_eq!(s.progress, 0);
        assert!(!s.cancelled);
    }

    #[test]
    fn test_fail_keeps_progress_below_100() {
        let reporter = SessionReporter::new();
        reporter.begin("run-c");
        reporter.fail();
        let s = reporter.snapshot();
        assert_eq!(s.phase, ImportPhase::Failed);
        assert_eq!(s.progress, 0);
    }

    #[tokio::test]
    async fn test_subscriber_sees_updates() {
        let reporter = SessionReporter::new();
        let mut rx = reporter.subscribe();
        reporter.begin("run-d");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().run_id.as_deref(), Some("run-d"));
        reporter.set_phase(ImportPhase::Parsing);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().phase, ImportPhase::Parsing);
    }
}
