//! Database Connection Pool Module
//!
//! This module provides PostgreSQL connection pooling using deadpool-postgres
//! and a [`DbClient`] that implements the [`BoardStore`] trait with real
//! transactions.
//!
//! Concurrency: every card placement runs in a transaction that takes
//! `SELECT ... FOR UPDATE` on the destination column row before re-checking
//! the WIP headroom. Two concurrent placements into the same column therefore
//! serialize on that row lock, and the second one sees the first one's card
//! when counting.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use kanban_core::{
    admits, Board, BoardColumn, Card, CardEvent, EntityId, EntityType, KanbanError, KanbanResult,
    MoveHistory, User,
};
use kanban_storage::{BoardStore, BoardUpdate, CardUpdate, ColumnCardStats, ColumnUpdate};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "kanban".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("KANBAN_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("KANBAN_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("KANBAN_DB_NAME").unwrap_or_else(|_| "kanban".to_string()),
            user: std::env::var("KANBAN_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("KANBAN_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("KANBAN_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("KANBAN_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts = Timeouts {
            wait: Some(self.timeout),
            create: Some(self.timeout),
            recycle: Some(self.timeout),
        };
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and implements the
/// [`BoardStore`] trait against the kanban schema.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Round-trip a trivial query, for readiness checks.
    pub async fn ping(&self) -> KanbanResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(db_err)?;
        Ok(())
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        let status = self.pool.status();
        status.size
    }

    /// Get a connection from the pool.
    pub(crate) async fn get_conn(&self) -> KanbanResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| KanbanError::storage(format!("Failed to acquire connection: {}", e)))
    }
}

pub(crate) fn db_err(err: tokio_postgres::Error) -> KanbanError {
    KanbanError::storage(err.to_string())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

pub(crate) const USER_COLS: &str = "user_id, name, email, password_hash, password_salt, \
     created_at, updated_at";
const BOARD_COLS: &str = "board_id, title, description, owner_id, created_at, updated_at";
const COLUMN_COLS: &str =
    "column_id, board_id, name, col_order, wip_limit, created_at, updated_at";
const CARD_COLS: &str = "card_id, board_id, column_id, title, description, position, \
     created_by, created_at, updated_at";
const HISTORY_COLS: &str = "history_id, card_id, event_kind, from_column_id, to_column_id, \
     actor_id, card_title, at";

pub(crate) fn row_to_user(row: &Row) -> User {
    User {
        user_id: row.get("user_id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_board(row: &Row) -> Board {
    Board {
        board_id: row.get("board_id"),
        title: row.get("title"),
        description: row.get("description"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_column(row: &Row) -> BoardColumn {
    BoardColumn {
        column_id: row.get("column_id"),
        board_id: row.get("board_id"),
        name: row.get("name"),
        order: row.get("col_order"),
        wip_limit: row.get("wip_limit"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_card(row: &Row) -> Card {
    Card {
        card_id: row.get("card_id"),
        board_id: row.get("board_id"),
        column_id: row.get("column_id"),
        title: row.get("title"),
        description: row.get("description"),
        position: row.get("position"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_history(row: &Row) -> KanbanResult<MoveHistory> {
    let kind: String = row.get("event_kind");
    let from_column_id: Option<EntityId> = row.get("from_column_id");
    let to_column_id: EntityId = row.get("to_column_id");
    let event = CardEvent::from_columns(&kind, from_column_id, to_column_id)
        .ok_or_else(|| KanbanError::storage(format!("Malformed history event kind: {}", kind)))?;
    Ok(MoveHistory {
        history_id: row.get("history_id"),
        card_id: row.get("card_id"),
        event,
        actor_id: row.get("actor_id"),
        card_title: row.get("card_title"),
        at: row.get("at"),
    })
}

/// Lock a column row and return it. Serializes concurrent placements into
/// the same column for the remainder of the transaction.
async fn lock_column(
    tx: &deadpool_postgres::Transaction<'_>,
    column_id: EntityId,
) -> KanbanResult<BoardColumn> {
    let row = tx
        .query_opt(
            &format!("SELECT {COLUMN_COLS} FROM board_columns WHERE column_id = $1 FOR UPDATE"),
            &[&column_id],
        )
        .await
        .map_err(db_err)?
        .ok_or(KanbanError::not_found(EntityType::Column, column_id))?;
    Ok(row_to_column(&row))
}

async fn count_cards_in_column(
    tx: &deadpool_postgres::Transaction<'_>,
    column_id: EntityId,
) -> KanbanResult<i64> {
    let row = tx
        .query_one(
            "SELECT COUNT(*) FROM cards WHERE column_id = $1",
            &[&column_id],
        )
        .await
        .map_err(db_err)?;
    Ok(row.get(0))
}

async fn insert_history(
    tx: &deadpool_postgres::Transaction<'_>,
    history: &MoveHistory,
) -> KanbanResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO move_histories ({HISTORY_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ),
        &[
            &history.history_id,
            &history.card_id,
            &history.event.kind(),
            &history.event.from_column_id(),
            &history.event.to_column_id(),
            &history.actor_id,
            &history.card_title,
            &history.at,
        ],
    )
    .await
    .map_err(db_err)?;
    Ok(())
}

// ============================================================================
// STORAGE TRAIT IMPLEMENTATION
// ============================================================================

#[async_trait]
impl BoardStore for DbClient {
    // === User Operations ===

    async fn user_get(&self, id: EntityId) -> KanbanResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {USER_COLS} FROM users WHERE user_id = $1"),
                &[&id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn user_get_by_email(&self, email: &str) -> KanbanResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {USER_COLS} FROM users WHERE email = $1"),
                &[&email],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    // === Board Operations ===

    async fn board_insert(&self, board: &Board, columns: &[BoardColumn]) -> KanbanResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        tx.execute(
            &format!("INSERT INTO boards ({BOARD_COLS}) VALUES ($1, $2, $3, $4, $5, $6)"),
            &[
                &board.board_id,
                &board.title,
                &board.description,
                &board.owner_id,
                &board.created_at,
                &board.updated_at,
            ],
        )
        .await
        .map_err(db_err)?;

        for column in columns {
            tx.execute(
                &format!(
                    "INSERT INTO board_columns ({COLUMN_COLS}) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)"
                ),
                &[
                    &column.column_id,
                    &column.board_id,
                    &column.name,
                    &column.order,
                    &column.wip_limit,
                    &column.created_at,
                    &column.updated_at,
                ],
            )
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn board_get(&self, id: EntityId) -> KanbanResult<Option<Board>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {BOARD_COLS} FROM boards WHERE board_id = $1"),
                &[&id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_board))
    }

    async fn board_list(&self) -> KanbanResult<Vec<Board>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                &format!("SELECT {BOARD_COLS} FROM boards ORDER BY board_id DESC"),
                &[],
            )
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_board).collect())
    }

    async fn board_update(&self, id: EntityId, update: BoardUpdate) -> KanbanResult<Board> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!(
                    "UPDATE boards SET \
                         title = COALESCE($2, title), \
                         description = COALESCE($3, description), \
                         updated_at = NOW() \
                     WHERE board_id = $1 RETURNING {BOARD_COLS}"
                ),
                &[&id, &update.title, &update.description],
            )
            .await
            .map_err(db_err)?
            .ok_or(KanbanError::not_found(EntityType::Board, id))?;
        Ok(row_to_board(&row))
    }

    async fn board_delete(&self, id: EntityId) -> KanbanResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        // History rows are weak references and are deliberately not touched.
        tx.execute("DELETE FROM cards WHERE board_id = $1", &[&id])
            .await
            .map_err(db_err)?;
        tx.execute("DELETE FROM board_columns WHERE board_id = $1", &[&id])
            .await
            .map_err(db_err)?;
        let deleted = tx
            .execute("DELETE FROM boards WHERE board_id = $1", &[&id])
            .await
            .map_err(db_err)?;
        if deleted == 0 {
            return Err(KanbanError::not_found(EntityType::Board, id));
        }

        tx.commit().await.map_err(db_err)
    }

    // === Column Operations ===

    async fn column_get(&self, id: EntityId) -> KanbanResult<Option<BoardColumn>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {COLUMN_COLS} FROM board_columns WHERE column_id = $1"),
                &[&id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_column))
    }

    async fn column_list_by_board(&self, board_id: EntityId) -> KanbanResult<Vec<BoardColumn>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {COLUMN_COLS} FROM board_columns \
                     WHERE board_id = $1 ORDER BY col_order ASC"
                ),
                &[&board_id],
            )
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_column).collect())
    }

    async fn column_max_order(&self, board_id: EntityId) -> KanbanResult<Option<i32>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "SELECT MAX(col_order) FROM board_columns WHERE board_id = $1",
                &[&board_id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.get(0))
    }

    async fn column_insert(&self, column: &BoardColumn) -> KanbanResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            &format!(
                "INSERT INTO board_columns ({COLUMN_COLS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ),
            &[
                &column.column_id,
                &column.board_id,
                &column.name,
                &column.order,
                &column.wip_limit,
                &column.created_at,
                &column.updated_at,
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn column_update(&self, id: EntityId, update: ColumnUpdate) -> KanbanResult<BoardColumn> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!(
                    "UPDATE board_columns SET \
                         name = COALESCE($2, name), \
                         wip_limit = COALESCE($3, wip_limit), \
                         updated_at = NOW() \
                     WHERE column_id = $1 RETURNING {COLUMN_COLS}"
                ),
                &[&id, &update.name, &update.wip_limit],
            )
            .await
            .map_err(db_err)?
            .ok_or(KanbanError::not_found(EntityType::Column, id))?;
        Ok(row_to_column(&row))
    }

    async fn column_delete_and_reorder(&self, id: EntityId) -> KanbanResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let column = lock_column(&tx, id).await?;
        let card_count = count_cards_in_column(&tx, id).await?;
        if card_count > 0 {
            return Err(KanbanError::ColumnNotEmpty {
                column_name: column.name,
                card_count,
            });
        }

        tx.execute("DELETE FROM board_columns WHERE column_id = $1", &[&id])
            .await
            .map_err(db_err)?;
        tx.execute(
            "UPDATE board_columns SET col_order = col_order - 1 \
             WHERE board_id = $1 AND col_order > $2",
            &[&column.board_id, &column.order],
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    async fn column_card_stats(&self, column_id: EntityId) -> KanbanResult<ColumnCardStats> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*), MAX(position) FROM cards WHERE column_id = $1",
                &[&column_id],
            )
            .await
            .map_err(db_err)?;
        Ok(ColumnCardStats {
            card_count: row.get(0),
            max_position: row.get(1),
        })
    }

    // === Card Operations ===

    async fn card_get(&self, id: EntityId) -> KanbanResult<Option<Card>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                &format!("SELECT {CARD_COLS} FROM cards WHERE card_id = $1"),
                &[&id],
            )
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_card))
    }

    async fn card_list_by_column(&self, column_id: EntityId) -> KanbanResult<Vec<Card>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {CARD_COLS} FROM cards \
                     WHERE column_id = $1 ORDER BY position ASC, card_id ASC"
                ),
                &[&column_id],
            )
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_card).collect())
    }

    async fn card_count_by_board(&self, board_id: EntityId) -> KanbanResult<i64> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM cards WHERE board_id = $1", &[&board_id])
            .await
            .map_err(db_err)?;
        Ok(row.get(0))
    }

    async fn card_insert(&self, card: &Card, history: &MoveHistory) -> KanbanResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        // Row lock on the destination column, then re-count under the lock.
        let column = lock_column(&tx, card.column_id).await?;
        let card_count = count_cards_in_column(&tx, card.column_id).await?;
        if !admits(card_count, column.wip_limit) {
            return Err(KanbanError::WipLimitReached {
                column_name: column.name,
                wip_limit: column.wip_limit,
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO cards ({CARD_COLS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ),
            &[
                &card.card_id,
                &card.board_id,
                &card.column_id,
                &card.title,
                &card.description,
                &card.position,
                &card.created_by,
                &card.created_at,
                &card.updated_at,
            ],
        )
        .await
        .map_err(db_err)?;
        insert_history(&tx, history).await?;

        tx.commit().await.map_err(db_err)
    }

    async fn card_update(
        &self,
        id: EntityId,
        update: CardUpdate,
        history: &MoveHistory,
    ) -> KanbanResult<Card> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let row = tx
            .query_opt(
                &format!("SELECT {CARD_COLS} FROM cards WHERE card_id = $1 FOR UPDATE"),
                &[&id],
            )
            .await
            .map_err(db_err)?
            .ok_or(KanbanError::not_found(EntityType::Card, id))?;
        let current = row_to_card(&row);

        if let Some(destination_id) = update.column_id {
            if destination_id != current.column_id {
                let destination = lock_column(&tx, destination_id).await?;
                let card_count = count_cards_in_column(&tx, destination_id).await?;
                if !admits(card_count, destination.wip_limit) {
                    return Err(KanbanError::WipLimitReached {
                        column_name: destination.name,
                        wip_limit: destination.wip_limit,
                    });
                }
            }
        }

        let row = tx
            .query_one(
                &format!(
                    "UPDATE cards SET \
                         title = COALESCE($2, title), \
                         description = COALESCE($3, description), \
                         column_id = COALESCE($4, column_id), \
                         position = COALESCE($5, position), \
                         updated_at = NOW() \
                     WHERE card_id = $1 RETURNING {CARD_COLS}"
                ),
                &[
                    &id,
                    &update.title,
                    &update.description,
                    &update.column_id,
                    &update.position,
                ],
            )
            .await
            .map_err(db_err)?;
        let updated = row_to_card(&row);

        // The caller built the move event from a pre-transaction read; the
        // locked row is authoritative for where the card actually came from.
        let mut history = history.clone();
        if let CardEvent::Moved { to_column_id, .. } = history.event {
            history.event = CardEvent::Moved {
                from_column_id: current.column_id,
                to_column_id,
            };
        }
        insert_history(&tx, &history).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn card_delete(&self, id: EntityId, history: &MoveHistory) -> KanbanResult<()> {
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(db_err)?;

        let deleted = tx
            .execute("DELETE FROM cards WHERE card_id = $1", &[&id])
            .await
            .map_err(db_err)?;
        if deleted == 0 {
            return Err(KanbanError::not_found(EntityType::Card, id));
        }
        insert_history(&tx, history).await?;

        tx.commit().await.map_err(db_err)
    }

    // === Move History Operations ===

    async fn history_for_card(
        &self,
        card_id: EntityId,
        limit: i64,
    ) -> KanbanResult<Vec<MoveHistory>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {HISTORY_COLS} FROM move_histories \
                     WHERE card_id = $1 ORDER BY at DESC, history_id DESC LIMIT $2"
                ),
                &[&card_id, &limit],
            )
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_history).collect()
    }
}
