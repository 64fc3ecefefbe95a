use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// データベース接続を開き、接続設定とテーブル作成を行う
///
/// # 引数
/// * `database_path` - データベースファイルのパス
/// * `busy_timeout` - 書き込みロック待ちのタイムアウト
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. データベース接続の開設
/// 2. ビジータイムアウトとWALモードの設定
/// 3. テーブル作成
pub fn open_database(database_path: &Path, busy_timeout: Duration) -> AppResult<Connection> {
    let conn = Connection::open(database_path)?;
    configure_connection(&conn, busy_timeout)?;
    create_tables(&conn)?;

    log::info!("データベースを初期化しました: {:?}", database_path);

    Ok(conn)
}

/// ワーカー用にデータベース接続を開く（テーブル作成は行わない）
///
/// # 引数
/// * `database_path` - データベースファイルのパス
/// * `busy_timeout` - 書き込みロック待ちのタイムアウト
pub fn open_worker_connection(database_path: &Path, busy_timeout: Duration) -> AppResult<Connection> {
    let conn = Connection::open(database_path)?;
    configure_connection(&conn, busy_timeout)?;
    Ok(conn)
}

/// 接続ごとの設定を適用する
fn configure_connection(conn: &Connection, busy_timeout: Duration) -> AppResult<()> {
    conn.busy_timeout(busy_timeout)?;

    // journal_modeは結果行を返すためquery_rowで設定する
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    log::debug!("journal_mode={mode}");

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// データベーステーブルを作成する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    // 外部キー制約は接続ごとの設定のため、ここでも有効化する
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    create_templates_table(conn)?;
    create_generation_records_table(conn)?;
    create_issued_documents_table(conn)?;
    create_obligations_table(conn)?;

    Ok(())
}

/// 定期請求テンプレートテーブルを作成する
fn create_templates_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS recurring_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            amount REAL NOT NULL CHECK(amount >= 0),
            interval_unit TEXT NOT NULL CHECK(interval_unit IN ('monthly', 'annual')),
            billing_month INTEGER CHECK(billing_month IS NULL OR billing_month BETWEEN 1 AND 12),
            due_rule TEXT NOT NULL CHECK(due_rule IN (
                'specific_day', 'first_calendar_day', 'first_business_day',
                'last_calendar_day', 'last_business_day'
            )),
            due_day INTEGER CHECK(
                (due_rule = 'specific_day' AND due_day IS NOT NULL AND due_day BETWEEN 1 AND 31)
                OR (due_rule <> 'specific_day' AND due_day IS NULL)
            ),
            start_date TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'paused', 'cancelled')),
            pause_reason TEXT,
            last_generated_document_id INTEGER,
            auto_send INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_templates_status ON recurring_templates(status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_templates_user ON recurring_templates(user_id)",
        [],
    )?;

    Ok(())
}

/// 生成履歴テーブルを作成する
///
/// 成功済みの（テンプレート, 期日）は部分一意インデックスで1行に制限する。
/// 失敗記録は同じ期日に対して複数行を許容する。
fn create_generation_records_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS generation_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id INTEGER NOT NULL REFERENCES recurring_templates(id) ON DELETE CASCADE,
            due_date TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('succeeded', 'failed')),
            document_id INTEGER,
            error_detail TEXT,
            attempted_at TEXT NOT NULL,
            CHECK(status = 'failed' OR document_id IS NOT NULL)
        )",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_generation_records_succeeded
         ON generation_records(template_id, due_date) WHERE status = 'succeeded'",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_generation_records_template ON generation_records(template_id)",
        [],
    )?;

    Ok(())
}

/// 発行済み書類台帳テーブルを作成する
fn create_issued_documents_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS issued_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_number TEXT NOT NULL UNIQUE,
            user_id INTEGER NOT NULL,
            template_id INTEGER REFERENCES recurring_templates(id) ON DELETE SET NULL,
            due_date TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            origin TEXT NOT NULL CHECK(origin IN ('recurring', 'manual')),
            paid INTEGER NOT NULL DEFAULT 0,
            paid_on TEXT,
            paid_via TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_issued_documents_template ON issued_documents(template_id)",
        [],
    )?;

    Ok(())
}

/// 汎用債務台帳テーブルを作成する
///
/// `issued_document_id` が発行済み書類台帳への相互参照となる。
fn create_obligations_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS obligations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            issued_document_id INTEGER UNIQUE REFERENCES issued_documents(id) ON DELETE SET NULL,
            user_id INTEGER NOT NULL,
            template_id INTEGER REFERENCES recurring_templates(id) ON DELETE SET NULL,
            due_date TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            paid INTEGER NOT NULL DEFAULT 0,
            paid_on TEXT,
            paid_via TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}
