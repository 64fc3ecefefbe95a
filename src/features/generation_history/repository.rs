use super::models::{AttemptOutcome, AttemptStatus, GenerationRecord};
use crate::shared::errors::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Tokyo;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_row(row: &Row<'_>) -> rusqlite::Result<GenerationRecord> {
    let status: String = row.get(3)?;
    Ok(GenerationRecord {
        id: row.get(0)?,
        template_id: row.get(1)?,
        due_date: row.get(2)?,
        status: AttemptStatus::parse(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        document_id: row.get(4)?,
        error_detail: row.get(5)?,
        attempted_at: row.get(6)?,
    })
}

/// 指定テンプレート・期日の成功済み記録が存在するかを確認する
///
/// # 引数
/// * `conn` - データベース接続
/// * `template_id` - テンプレートID
/// * `due_date` - 期日
pub fn has_succeeded(conn: &Connection, template_id: i64, due_date: NaiveDate) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM generation_records
         WHERE template_id = ?1 AND due_date = ?2 AND status = 'succeeded'",
        params![template_id, due_date],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// 生成試行を記録する
///
/// 成功記録の一意性はストレージの部分一意インデックスで保証される。
/// 同じ（テンプレート, 期日）の成功記録が既に存在する場合は
/// DuplicateGenerationエラーとなり、行は追加されない。
///
/// # 引数
/// * `conn` - データベース接続（トランザクションでも可）
/// * `template_id` - テンプレートID
/// * `due_date` - 期日
/// * `outcome` - 試行結果
///
/// # 戻り値
/// 記録された生成履歴、または失敗時はエラー
pub fn record_attempt(
    conn: &Connection,
    template_id: i64,
    due_date: NaiveDate,
    outcome: &AttemptOutcome,
) -> AppResult<GenerationRecord> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    let (document_id, error_detail) = match outcome {
        AttemptOutcome::Succeeded { document_id } => (Some(*document_id), None),
        AttemptOutcome::Failed { detail } => (None, Some(detail.as_str())),
    };

    let result = conn.execute(
        "INSERT INTO generation_records (template_id, due_date, status, document_id, error_detail, attempted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            template_id,
            due_date,
            outcome.status().as_str(),
            document_id,
            error_detail,
            now
        ],
    );

    match result {
        Ok(_) => {}
        Err(e) if AppError::is_unique_violation(&e) => {
            log::warn!(
                "生成済みの期日への成功記録を検出しました: template_id={template_id}, due_date={due_date}"
            );
            return Err(AppError::DuplicateGeneration {
                template_id,
                due_date,
            });
        }
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            return Err(AppError::NotFound(format!(
                "ID {template_id} のテンプレートが見つかりません"
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    find_by_id(conn, id)
}

/// IDで生成履歴を取得する
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<GenerationRecord> {
    conn.query_row(
        "SELECT id, template_id, due_date, status, document_id, error_detail, attempted_at
         FROM generation_records WHERE id = ?1",
        params![id],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::not_found("生成履歴"),
        _ => AppError::Database(e.to_string()),
    })
}

/// 指定テンプレート・期日の成功記録を取得する
pub fn find_succeeded(
    conn: &Connection,
    template_id: i64,
    due_date: NaiveDate,
) -> AppResult<Option<GenerationRecord>> {
    conn.query_row(
        "SELECT id, template_id, due_date, status, document_id, error_detail, attempted_at
         FROM generation_records
         WHERE template_id = ?1 AND due_date = ?2 AND status = 'succeeded'",
        params![template_id, due_date],
        map_row,
    )
    .optional()
    .map_err(|e| AppError::Database(e.to_string()))
}

/// テンプレートの生成履歴を新しい順に取得する
pub fn find_by_template(conn: &Connection, template_id: i64) -> AppResult<Vec<GenerationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, due_date, status, document_id, error_detail, attempted_at
         FROM generation_records WHERE template_id = ?1
         ORDER BY due_date DESC, id DESC",
    )?;
    let records = stmt.query_map(params![template_id], map_row)?;

    records
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}
