// ==========================================
// 商品目录导入 - 命令行主入口
// ==========================================
// 用法: catalog-import <FILE> [--db PATH] [--config PATH] [--encoding latin1|utf8] ...
// 退出码: 0 完成（含部分失败/取消）；1 运行错误；2 配置错误
// ==========================================

use std::path::PathBuf;

use anyhow::Context;
use catalog_import::api::FileEncoding;
use catalog_import::app::{get_default_db_path, AppState};
use catalog_import::config::ImportConfig;
use catalog_import::importer::{ImportReport, ImportSession, DEFAULT_ERROR_PREVIEW};
use catalog_import::{i18n, logging};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const EXIT_OK: i32 = 0;
const EXIT_CONFIG_ERROR: i32 = 2;

/// 批量导入商品目录 CSV
#[derive(Parser, Debug)]
#[command(name = "catalog-import")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 待导入的 CSV 文件
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// SQLite 数据库路径（默认: CATALOG_IMPORT_DB_PATH 或用户数据目录）
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 文件字符集
    #[arg(long, default_value = "latin1")]
    encoding: FileEncoding,

    /// 每批并发提交数
    #[arg(long)]
    batch_size: Option<usize>,

    /// 批间间隔（毫秒）
    #[arg(long)]
    batch_delay_ms: Option<u64>,

    /// 单次提交超时（毫秒，0 表示不限时）
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 导出失败清单（CSV）
    #[arg(long, value_name = "PATH")]
    failures_csv: Option<PathBuf>,

    /// 输出语言（en / zh-CN）
    #[arg(long)]
    locale: Option<String>,

    /// 以 JSON 输出报告与日志
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ImportConfig) {
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.batch_delay_ms {
            config.inter_batch_delay_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            config.call_timeout_ms = v;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.json {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(locale) = &cli.locale {
        i18n::set_locale(locale);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    info!("{} v{}", catalog_import::APP_NAME, catalog_import::VERSION);

    // === 配置: 默认值 → 文件 → 环境变量 → 命令行 ===
    let mut config = match ImportConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(EXIT_CONFIG_ERROR);
        }
    };
    cli.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return Ok(EXIT_CONFIG_ERROR);
    }

    let db_path = cli
        .db
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path, config) {
        Ok(state) => state,
        Err(e) if e.is_configuration_error() => {
            eprintln!("{}", e);
            return Ok(EXIT_CONFIG_ERROR);
        }
        Err(e) => return Err(e.into()),
    };

    // === Ctrl-C → 协作式取消（当前批次结算后停止） ===
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，当前批次结算后停止导入");
            interrupt.cancel();
        }
    });

    // === 进度显示 ===
    let done = CancellationToken::new();
    let watcher = if cli.json {
        None
    } else {
        let mut rx = state.import_api.subscribe();
        let done = done.clone();
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let session = rx.borrow_and_update().clone();
                        render_progress(&session);
                        if session.phase.is_terminal() {
                            break;
                        }
                    }
                    _ = done.cancelled() => break,
                }
            }
            eprintln!();
        }))
    };

    let result = state
        .import_api
        .import_file_with_cancel(&cli.file, cli.encoding, cancel)
        .await;

    done.cancel();
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }

    let report = match result {
        Ok(report) => report,
        Err(e) if e.is_configuration_error() => {
            eprintln!("{}", e);
            return Ok(EXIT_CONFIG_ERROR);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &cli.failures_csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("无法创建失败清单文件: {}", path.display()))?;
        report
            .write_failures_csv(file)
            .with_context(|| format!("写入失败清单失败: {}", path.display()))?;
        info!(path = %path.display(), failures = report.failures.len(), "失败清单已导出");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(EXIT_OK)
}

fn render_progress(session: &ImportSession) {
    eprint!(
        "\r[{:>3}%] {:<10} {}/{}",
        session.progress,
        session.phase,
        session.stats.processed(),
        session.stats.total
    );
}

fn print_report(report: &ImportReport) {
    println!("{}", report.summary_line());

    if report.cancelled {
        println!("{}", i18n::t("import.cancelled"));
    }

    if !report.validation_errors.is_empty() {
        println!();
        println!("{}", i18n::t("import.validation_header"));
        for line in report.preview_validation_messages(DEFAULT_ERROR_PREVIEW) {
            println!("  {}", line);
        }
    }

    if report.has_failures() {
        println!();
        println!("{}", i18n::t("import.failure_header"));
        for failure in &report.failures {
            println!("  {}: {}", failure.name, failure.error);
        }
    }
}
