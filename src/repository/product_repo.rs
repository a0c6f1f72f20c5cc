// ==========================================
// 商品目录导入 - 商品数据仓储
// ==========================================
// 职责: products 表读写；作为管道的默认 ProductCreator
// 红线: Repository 不含业务逻辑（不做去重合并，唯一约束冲突原样上报）
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::product::NewProduct;
use crate::importer::product_importer_trait::ProductCreator;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// 已落库的商品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntity {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// SqliteProductRepository
// ==========================================
pub struct SqliteProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProductRepository {
    /// 打开（必要时创建）数据库并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        lock_conn(&self.conn)
    }

    /// 插入商品，返回生成的 product_id
    pub fn insert(&self, product: &NewProduct) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_product(&conn, product)
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ProductEntity>> {
        let conn = self.get_conn()?;
        let entity = conn
            .query_row(
                r#"
                SELECT product_id, name, category, unit, description, created_at
                FROM products
                WHERE name = ?1
                "#,
                params![name],
                map_product_row,
            )
            .optional()?;
        Ok(entity)
    }

    /// 按创建顺序列出全部商品
    pub fn list_all(&self) -> RepositoryResult<Vec<ProductEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT product_id, name, category, unit, description, created_at
            FROM products
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([], map_product_row)?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

#[async_trait]
impl ProductCreator for SqliteProductRepository {
    async fn create_product(&self, product: NewProduct) -> anyhow::Result<()> {
        let conn = Arc::clone(&self.conn);
        let abandoned = Arc::new(AtomicBool::new(false));
        // future 被丢弃（调用方超时/取消）时置位，阻塞任务据此放弃写入
        let _abandon_on_drop = AbandonOnDrop(Arc::clone(&abandoned));

        // rusqlite 为同步 API，放到阻塞线程池执行
        tokio::task::spawn_blocking(move || {
            let guard = lock_conn(&conn)?;
            if abandoned.load(Ordering::Acquire) {
                debug!(name = %product.name, "调用方已放弃，跳过写入");
                return Err(RepositoryError::WriteAbandoned { name: product.name });
            }
            insert_product(&guard, &product)
        })
        .await
        .map_err(|e| anyhow::anyhow!("写入任务异常终止: {}", e))??;
        Ok(())
    }
}

/// Drop 时标记写入已被放弃
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

fn insert_product(conn: &Connection, product: &NewProduct) -> RepositoryResult<String> {
    let product_id = Uuid::new_v4().to_string();
    let result = conn.execute(
        r#"
        INSERT INTO products (product_id, name, category, unit, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            product_id,
            product.name,
            product.category,
            product.unit,
            product.description,
            Utc::now().to_rfc3339(),
        ],
    );

    match result.map_err(RepositoryError::from) {
        Ok(_) => Ok(product_id),
        Err(RepositoryError::UniqueConstraintViolation(_)) => Err(RepositoryError::DuplicateProduct {
            name: product.name.clone(),
        }),
        Err(e) => Err(e),
    }
}

fn map_product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductEntity> {
    let created_at: String = row.get(5)?;
    Ok(ProductEntity {
        product_id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        unit: row.get(3)?,
        description: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
