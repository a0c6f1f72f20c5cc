// ==========================================
// 仓储与文件导入集成测试
// ==========================================
// 测试目标: SQLite 仓储作为 ProductCreator 与 ImportApi 文件入口
// ==========================================


use catalog_import::api::{ApiError, FileEncoding};
use catalog_import::app::AppState;
use catalog_import::config::ImportConfig;
use catalog_import::db::{init_schema, open_sqlite_connection};
use catalog_import::importer::ProductImportPipeline;
use catalog_import::logging;
use catalog_import::repository::SqliteProductRepository;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_helpers::{create_test_db, write_temp_csv};

#[tokio::test]
async fn test_latin1_file_imported_into_sqlite() {
    logging::init_test();
    let (_db_file, db_path) = create_test_db();
    let state = AppState::new(db_path, ImportConfig::default()).unwrap();

    // ISO-8859-1 编码: "Pão de Queijo", "Exposição"
    let mut bytes = b"Product Name,Category,Unit\n".to_vec();
    bytes.extend_from_slice(b"P\xE3o de Queijo,Salgados,\n");
    bytes.extend_from_slice(b"Bolo de Fub\xE1,Exposi\xE7\xE3o,\n");
    let csv = write_temp_csv(&bytes);

    let report = state
        .import_api
        .import_file(csv.path(), FileEncoding::Latin1)
        .await
        .unwrap();

    assert_eq!(report.stats.success, 2);
    let pao = state.product_repo.find_by_name("Pão de Queijo").unwrap().unwrap();
    assert_eq!(pao.unit, "piece");
    assert_eq!(pao.description, "Salgados - Pão de Queijo");

    let bolo = state.product_repo.find_by_name("Bolo de Fubá").unwrap().unwrap();
    assert_eq!(bolo.category, "Exposição");
    assert_eq!(bolo.unit, "slice");
}

#[tokio::test]
async fn test_duplicate_names_become_record_failures() {
    let (_db_file, db_path) = create_test_db();
    let state = AppState::new(db_path, ImportConfig::default()).unwrap();

    let text = "name,category\nCoxinha,Salgados\nEmpada,Salgados\nCoxinha,Salgados\n";
    let report = state.import_api.import_text(text).await.unwrap();

    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.success, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.failures[0].name, "Coxinha");
    assert!(report.failures[0].error.contains("Coxinha"));
    assert_eq!(state.product_repo.count().unwrap(), 2);

    let mut buf = Vec::new();
    report.write_failures_csv(&mut buf).unwrap();
    let exported = String::from_utf8(buf).unwrap();
    assert!(exported.starts_with("name,error\n"));
    assert!(exported.contains("Coxinha,"));
}

#[tokio::test]
async fn test_utf8_file_with_bom() {
    let (_db_file, db_path) = create_test_db();
    let state = AppState::new(db_path, ImportConfig::default()).unwrap();

    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("product_name,type\nBiscoito Amanteigado,Embalados\n".as_bytes());
    let csv = write_temp_csv(&bytes);

    let report = state
        .import_api
        .import_file(csv.path(), FileEncoding::Utf8)
        .await
        .unwrap();

    assert_eq!(report.stats.success, 1);
    let biscoito = state
        .product_repo
        .find_by_name("Biscoito Amanteigado")
        .unwrap()
        .unwrap();
    assert_eq!(biscoito.unit, "pack");
}

#[tokio::test]
async fn test_missing_columns_is_configuration_error() {
    let (_db_file, db_path) = create_test_db();
    let state = AppState::new(db_path, ImportConfig::default()).unwrap();

    let err = state
        .import_api
        .import_text("sku,price\nA1,10\n")
        .await
        .unwrap_err();

    assert!(err.is_configuration_error());
    assert_eq!(state.product_repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_unreadable_file() {
    let (_db_file, db_path) = create_test_db();
    let state = AppState::new(db_path, ImportConfig::default()).unwrap();

    let err = state
        .import_api
        .import_file("/nonexistent/catalog.csv", FileEncoding::Latin1)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::FileReadError { .. }));
}

#[tokio::test]
async fn test_timed_out_write_is_not_persisted() {
    let (_db_file, db_path) = create_test_db();
    let conn = open_sqlite_connection(&db_path).unwrap();
    init_schema(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    let repo = Arc::new(SqliteProductRepository::from_connection(Arc::clone(&conn)));

    let config = ImportConfig {
        call_timeout_ms: 50,
        ..ImportConfig::default()
    };
    let pipeline = ProductImportPipeline::with_config(repo.clone(), config).unwrap();

    // 连接被占用 300ms，超过单次调用超时
    let holder = {
        let conn = Arc::clone(&conn);
        std::thread::spawn(move || {
            let _held = conn.lock().unwrap();
            std::thread::sleep(Duration::from_millis(300));
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let report = pipeline.run("name,category\nCoxinha,Salgados\n").await.unwrap();
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.failures[0].name, "Coxinha");
    assert_eq!(report.failures[0].error, "timed out after 50 ms");

    holder.join().unwrap();
    // 阻塞写入任务拿到锁后应直接放弃
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(repo.count().unwrap(), 0);

    // 重新导入同一文件不会因残留记录报重复
    let again = pipeline.run("name,category\nCoxinha,Salgados\n").await.unwrap();
    assert_eq!(again.stats.success, 1);
    assert_eq!(repo.count().unwrap(), 1);
}
