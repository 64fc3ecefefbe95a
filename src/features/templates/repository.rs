use super::lifecycle::{self, TemplateAction};
use super::models::{CreateTemplateDto, IntervalUnit, RecurringTemplate, TemplateStatus};
use crate::features::due_dates::DueDateRule;
use crate::shared::errors::{AppError, AppResult};
use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

const TEMPLATE_COLUMNS: &str = "id, user_id, name, description, amount, interval_unit, billing_month,
     due_rule, due_day, start_date, status, pause_reason, last_generated_document_id, auto_send,
     created_at, updated_at";

/// 行データをテンプレートに変換する
fn map_row(row: &Row<'_>) -> rusqlite::Result<RecurringTemplate> {
    let interval: String = row.get(5)?;
    let due_rule: String = row.get(7)?;
    let due_day: Option<u32> = row.get(8)?;
    let status: String = row.get(10)?;

    Ok(RecurringTemplate {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        interval_unit: IntervalUnit::parse(&interval).map_err(|e| conversion_error(5, e))?,
        billing_month: row.get(6)?,
        due_date_rule: DueDateRule::from_parts(&due_rule, due_day)
            .map_err(|e| conversion_error(7, e))?,
        start_date: row.get(9)?,
        status: TemplateStatus::parse(&status).map_err(|e| conversion_error(10, e))?,
        pause_reason: row.get(11)?,
        last_generated_document_id: row.get(12)?,
        auto_send: row.get::<_, i64>(13)? != 0,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn conversion_error(column: usize, error: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

/// テンプレートを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `dto` - テンプレート作成用DTO
///
/// # 戻り値
/// 作成されたテンプレート（状態はACTIVE）、または失敗時はエラー
pub fn create(conn: &Connection, dto: CreateTemplateDto) -> AppResult<RecurringTemplate> {
    dto.validate()?;

    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    conn.execute(
        "INSERT INTO recurring_templates (user_id, name, description, amount, interval_unit, billing_month,
             due_rule, due_day, start_date, status, pause_reason, last_generated_document_id, auto_send,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', NULL, NULL, ?10, ?11, ?12)",
        params![
            dto.user_id,
            dto.name.trim(),
            dto.description,
            dto.amount,
            dto.interval_unit.as_str(),
            dto.billing_month,
            dto.due_date_rule.kind(),
            dto.due_date_rule.day(),
            dto.start_date,
            dto.auto_send,
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    log::info!(
        "定期請求テンプレートを作成しました: id={id}, rule={}",
        dto.due_date_rule
    );
    find_by_id(conn, id)
}

/// IDでテンプレートを取得する
pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<RecurringTemplate> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE id = ?1"),
        params![id],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::NotFound(format!("ID {id} のテンプレートが見つかりません"))
        }
        _ => AppError::Database(e.to_string()),
    })
}

/// ユーザーのテンプレート一覧を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - 所有ユーザーID
/// * `status` - 状態フィルター（オプション）
pub fn find_all(
    conn: &Connection,
    user_id: i64,
    status: Option<TemplateStatus>,
) -> AppResult<Vec<RecurringTemplate>> {
    let mut query = format!("SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE user_id = ?");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

    if let Some(s) = status {
        query.push_str(" AND status = ?");
        params.push(Box::new(s.as_str()));
    }

    query.push_str(" ORDER BY name, id");

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let templates = stmt.query_map(param_refs.as_slice(), map_row)?;

    templates
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// 生成サイクルの対象となるACTIVEなテンプレートをすべて取得する
pub fn find_active(conn: &Connection) -> AppResult<Vec<RecurringTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE status = 'active' ORDER BY id"
    ))?;
    let templates = stmt.query_map([], map_row)?;

    templates
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// テンプレートにライフサイクル操作を適用する
///
/// 読み取った状態と一致する場合のみ更新するため、並行した操作と競合した場合は
/// Concurrencyエラーとなる。
pub fn apply_action(
    conn: &Connection,
    id: i64,
    action: TemplateAction,
) -> AppResult<RecurringTemplate> {
    let existing = find_by_id(conn, id)?;
    let transition = lifecycle::apply(existing.status, &action)?;

    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    let rows_affected = conn.execute(
        "UPDATE recurring_templates SET status = ?1, pause_reason = ?2, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![
            transition.status.as_str(),
            transition.pause_reason,
            now,
            id,
            existing.status.as_str()
        ],
    )?;

    if rows_affected == 0 {
        return Err(AppError::concurrency(format!(
            "ID {id} のテンプレートは他の操作で更新されました"
        )));
    }

    log::info!(
        "テンプレートの状態を変更しました: id={id}, {} -> {}",
        existing.status,
        transition.status
    );

    find_by_id(conn, id)
}

/// テンプレートを一時停止する（理由必須）
pub fn pause(conn: &Connection, id: i64, reason: &str) -> AppResult<RecurringTemplate> {
    apply_action(
        conn,
        id,
        TemplateAction::Pause {
            reason: reason.to_string(),
        },
    )
}

/// 一時停止中のテンプレートを再開する（停止理由はクリアされる）
pub fn resume(conn: &Connection, id: i64) -> AppResult<RecurringTemplate> {
    apply_action(conn, id, TemplateAction::Resume)
}

/// テンプレートを解約する（以後ACTIVEには戻せない）
pub fn cancel(conn: &Connection, id: i64) -> AppResult<RecurringTemplate> {
    apply_action(conn, id, TemplateAction::Cancel)
}

/// 最後に生成された書類の参照を更新する
pub fn set_last_generated(conn: &Connection, id: i64, document_id: i64) -> AppResult<()> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    let rows_affected = conn.execute(
        "UPDATE recurring_templates SET last_generated_document_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![document_id, now, id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のテンプレートが見つかりません"
        )));
    }

    Ok(())
}

/// テンプレートの説明と自動送信フラグを更新する
pub fn update_details(
    conn: &Connection,
    id: i64,
    description: Option<String>,
    auto_send: bool,
) -> AppResult<RecurringTemplate> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    let description = description.filter(|d| !d.trim().is_empty());

    let rows_affected = conn.execute(
        "UPDATE recurring_templates SET description = ?1, auto_send = ?2, updated_at = ?3 WHERE id = ?4",
        params![description, auto_send, now, id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のテンプレートが見つかりません"
        )));
    }

    find_by_id(conn, id)
}

/// テンプレートを削除する（生成履歴も連鎖削除される）
pub fn delete(conn: &Connection, id: i64) -> AppResult<()> {
    let rows_affected = conn.execute("DELETE FROM recurring_templates WHERE id = ?1", params![id])?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "ID {id} のテンプレートが見つかりません"
        )));
    }

    log::info!("テンプレートを削除しました: id={id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_tables;
    use chrono::NaiveDate;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn rent_dto() -> CreateTemplateDto {
        CreateTemplateDto::monthly(1, "事務所家賃", 120000.0, DueDateRule::SpecificDay(27))
    }

    #[test]
    fn test_template_crud_operations() {
        let conn = create_test_db();

        let mut dto = rent_dto();
        dto.description = Some("4月分以降".to_string());
        dto.start_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let template = create(&conn, dto).unwrap();

        assert_eq!(template.status, TemplateStatus::Active);
        assert_eq!(template.due_date_rule, DueDateRule::SpecificDay(27));
        assert_eq!(template.start_date, NaiveDate::from_ymd_opt(2026, 4, 1));
        assert_eq!(template.last_generated_document_id, None);

        let retrieved = find_by_id(&conn, template.id).unwrap();
        assert_eq!(retrieved.name, "事務所家賃");

        let updated = update_details(&conn, template.id, Some("更新".to_string()), true).unwrap();
        assert_eq!(updated.description.as_deref(), Some("更新"));
        assert!(updated.auto_send);

        set_last_generated(&conn, template.id, 42).unwrap();
        assert_eq!(
            find_by_id(&conn, template.id).unwrap().last_generated_document_id,
            Some(42)
        );

        delete(&conn, template.id).unwrap();
        assert!(matches!(
            find_by_id(&conn, template.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_rejects_invalid_dto() {
        let conn = create_test_db();

        let mut dto = rent_dto();
        dto.due_date_rule = DueDateRule::SpecificDay(0);
        assert!(matches!(create(&conn, dto), Err(AppError::InvalidRule(_))));

        let mut dto = rent_dto();
        dto.name = String::new();
        assert!(matches!(create(&conn, dto), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_lifecycle_operations() {
        let conn = create_test_db();
        let template = create(&conn, rent_dto()).unwrap();

        let paused = pause(&conn, template.id, "顧客都合で休止").unwrap();
        assert_eq!(paused.status, TemplateStatus::Paused);
        assert_eq!(paused.pause_reason.as_deref(), Some("顧客都合で休止"));
        assert!(find_active(&conn).unwrap().is_empty());

        let resumed = resume(&conn, template.id).unwrap();
        assert_eq!(resumed.status, TemplateStatus::Active);
        assert_eq!(resumed.pause_reason, None);
        assert_eq!(find_active(&conn).unwrap().len(), 1);

        let cancelled = cancel(&conn, template.id).unwrap();
        assert_eq!(cancelled.status, TemplateStatus::Cancelled);

        let result = resume(&conn, template.id);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert_eq!(
            find_by_id(&conn, template.id).unwrap().status,
            TemplateStatus::Cancelled
        );
    }

    #[test]
    fn test_pause_without_reason_is_rejected() {
        let conn = create_test_db();
        let template = create(&conn, rent_dto()).unwrap();

        assert!(matches!(
            pause(&conn, template.id, ""),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            find_by_id(&conn, template.id).unwrap().status,
            TemplateStatus::Active
        );
    }

    #[test]
    fn test_find_all_with_status_filter() {
        let conn = create_test_db();
        let first = create(&conn, rent_dto()).unwrap();
        create(
            &conn,
            CreateTemplateDto::monthly(1, "顧問料", 30000.0, DueDateRule::LastBusinessDay),
        )
        .unwrap();
        create(
            &conn,
            CreateTemplateDto::monthly(2, "他ユーザー", 500.0, DueDateRule::FirstCalendarDay),
        )
        .unwrap();

        pause(&conn, first.id, "休止").unwrap();

        assert_eq!(find_all(&conn, 1, None).unwrap().len(), 2);
        assert_eq!(
            find_all(&conn, 1, Some(TemplateStatus::Paused)).unwrap().len(),
            1
        );
        assert_eq!(
            find_all(&conn, 1, Some(TemplateStatus::Active)).unwrap().len(),
            1
        );
        assert_eq!(find_active(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_not_found_errors() {
        let conn = create_test_db();

        assert!(matches!(find_by_id(&conn, 999), Err(AppError::NotFound(_))));
        assert!(matches!(cancel(&conn, 999), Err(AppError::NotFound(_))));
        assert!(matches!(
            set_last_generated(&conn, 999, 1),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete(&conn, 999), Err(AppError::NotFound(_))));
    }
}
