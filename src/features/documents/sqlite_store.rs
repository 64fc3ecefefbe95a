use super::models::{
    CreatedDocument, IssuedDocument, LedgerKind, LedgerRef, NewDocumentRequest, Obligation,
    OriginMarker, PaymentFact,
};
use super::store::{CrossReferenceResolver, DocumentStore};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::generate_document_number;
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Tokyo;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite上の2つの台帳（発行済み書類・債務）を扱う書類ストア
///
/// 定期請求から作成された書類は両方の台帳に登録され、
/// `obligations.issued_document_id` で相互に参照される。
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDocumentStore;

impl SqliteDocumentStore {
    pub fn new() -> Self {
        Self
    }

    /// 発行済み書類台帳のみに書類を登録する（定期請求以外の経路）
    pub fn create_standalone_document(
        &self,
        conn: &Connection,
        user_id: i64,
        due_date: NaiveDate,
        amount: f64,
        description: Option<&str>,
    ) -> AppResult<i64> {
        insert_issued_document(conn, user_id, None, due_date, amount, description, OriginMarker::Manual)
            .map(|(id, _)| id)
    }

    /// 債務台帳のみにレコードを登録する（書類を伴わない債務）
    pub fn create_standalone_obligation(
        &self,
        conn: &Connection,
        user_id: i64,
        due_date: NaiveDate,
        amount: f64,
        description: Option<&str>,
    ) -> AppResult<i64> {
        insert_obligation(conn, None, user_id, None, due_date, amount, description)
    }

    /// IDで発行済み書類を取得する
    pub fn find_issued_document(&self, conn: &Connection, id: i64) -> AppResult<IssuedDocument> {
        conn.query_row(
            "SELECT id, document_number, user_id, template_id, due_date, amount, description, origin,
                    paid, paid_on, paid_via, created_at, updated_at
             FROM issued_documents WHERE id = ?1",
            params![id],
            |row| {
                Ok(IssuedDocument {
                    id: row.get(0)?,
                    document_number: row.get(1)?,
                    user_id: row.get(2)?,
                    template_id: row.get(3)?,
                    due_date: row.get(4)?,
                    amount: row.get(5)?,
                    description: row.get(6)?,
                    origin: row.get(7)?,
                    payment: PaymentFact {
                        paid: row.get::<_, i64>(8)? != 0,
                        paid_on: row.get(9)?,
                        paid_via: row.get(10)?,
                    },
                    created_at: row.get(11)?,
                    updated_at: row.get(12)?,
                })
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound(format!("ID {id} の発行済み書類が見つかりません"))
            }
            _ => AppError::Database(e.to_string()),
        })
    }

    /// IDで債務を取得する
    pub fn find_obligation(&self, conn: &Connection, id: i64) -> AppResult<Obligation> {
        conn.query_row(
            "SELECT id, issued_document_id, user_id, template_id, due_date, amount, description,
                    paid, paid_on, paid_via, created_at, updated_at
             FROM obligations WHERE id = ?1",
            params![id],
            |row| {
                Ok(Obligation {
                    id: row.get(0)?,
                    issued_document_id: row.get(1)?,
                    user_id: row.get(2)?,
                    template_id: row.get(3)?,
                    due_date: row.get(4)?,
                    amount: row.get(5)?,
                    description: row.get(6)?,
                    payment: PaymentFact {
                        paid: row.get::<_, i64>(7)? != 0,
                        paid_on: row.get(8)?,
                        paid_via: row.get(9)?,
                    },
                    created_at: row.get(10)?,
                    updated_at: row.get(11)?,
                })
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound(format!("ID {id} の債務が見つかりません"))
            }
            _ => AppError::Database(e.to_string()),
        })
    }

    /// テンプレートから生成された発行済み書類の件数を数える
    pub fn count_documents_for_template(&self, conn: &Connection, template_id: i64) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM issued_documents WHERE template_id = ?1",
            params![template_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn insert_issued_document(
    conn: &Connection,
    user_id: i64,
    template_id: Option<i64>,
    due_date: NaiveDate,
    amount: f64,
    description: Option<&str>,
    origin: OriginMarker,
) -> AppResult<(i64, String)> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();
    let document_number = generate_document_number();

    conn.execute(
        "INSERT INTO issued_documents (document_number, user_id, template_id, due_date, amount, description,
             origin, paid, paid_on, paid_via, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, NULL, ?8, ?9)",
        params![
            document_number,
            user_id,
            template_id,
            due_date,
            amount,
            description,
            origin.as_str(),
            now,
            now
        ],
    )?;

    Ok((conn.last_insert_rowid(), document_number))
}

fn insert_obligation(
    conn: &Connection,
    issued_document_id: Option<i64>,
    user_id: i64,
    template_id: Option<i64>,
    due_date: NaiveDate,
    amount: f64,
    description: Option<&str>,
) -> AppResult<i64> {
    // JSTで現在時刻を取得
    let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

    conn.execute(
        "INSERT INTO obligations (issued_document_id, user_id, template_id, due_date, amount, description,
             paid, paid_on, paid_via, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, NULL, ?7, ?8)",
        params![
            issued_document_id,
            user_id,
            template_id,
            due_date,
            amount,
            description,
            now,
            now
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

impl DocumentStore for SqliteDocumentStore {
    fn create_document(
        &self,
        conn: &Connection,
        request: &NewDocumentRequest,
    ) -> AppResult<CreatedDocument> {
        let (document_id, document_number) = insert_issued_document(
            conn,
            request.user_id,
            Some(request.template_id),
            request.due_date,
            request.amount,
            request.description.as_deref(),
            request.origin,
        )?;

        let obligation_id = insert_obligation(
            conn,
            Some(document_id),
            request.user_id,
            Some(request.template_id),
            request.due_date,
            request.amount,
            request.description.as_deref(),
        )?;

        log::debug!(
            "書類を作成しました: document_id={document_id}, obligation_id={obligation_id}, number={document_number}"
        );

        Ok(CreatedDocument {
            document_id,
            obligation_id: Some(obligation_id),
            document_number,
        })
    }

    fn get_payment_fact(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
    ) -> AppResult<PaymentFact> {
        conn.query_row(
            &format!(
                "SELECT paid, paid_on, paid_via FROM {} WHERE id = ?1",
                ledger.table()
            ),
            params![document_id],
            |row| {
                Ok(PaymentFact {
                    paid: row.get::<_, i64>(0)? != 0,
                    paid_on: row.get(1)?,
                    paid_via: row.get(2)?,
                })
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound(format!("{ledger} ID {document_id} が見つかりません"))
            }
            _ => AppError::Database(e.to_string()),
        })
    }

    fn set_payment_fact(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
        fact: &PaymentFact,
    ) -> AppResult<()> {
        // JSTで現在時刻を取得
        let now = Utc::now().with_timezone(&Tokyo).to_rfc3339();

        let rows_affected = conn.execute(
            &format!(
                "UPDATE {} SET paid = ?1, paid_on = ?2, paid_via = ?3, updated_at = ?4 WHERE id = ?5",
                ledger.table()
            ),
            params![fact.paid, fact.paid_on, fact.paid_via, now, document_id],
        )?;

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "{ledger} ID {document_id} が見つかりません"
            )));
        }

        Ok(())
    }
}

impl CrossReferenceResolver for SqliteDocumentStore {
    fn find_equivalent(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
    ) -> AppResult<Option<LedgerRef>> {
        let other_id: Option<i64> = match ledger {
            LedgerKind::IssuedDocument => conn
                .query_row(
                    "SELECT id FROM obligations WHERE issued_document_id = ?1",
                    params![document_id],
                    |row| row.get(0),
                )
                .optional()?,
            LedgerKind::Obligation => conn
                .query_row(
                    "SELECT issued_document_id FROM obligations WHERE id = ?1",
                    params![document_id],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()?
                .flatten(),
        };

        Ok(other_id.map(|id| LedgerRef::new(ledger.other(), id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::due_dates::DueDateRule;
    use crate::features::templates::{self, CreateTemplateDto};
    use crate::shared::database::create_tables;
    use crate::shared::utils::is_valid_document_number;

    fn create_test_db() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let template = templates::create(
            &conn,
            CreateTemplateDto::monthly(1, "顧問料", 30000.0, DueDateRule::LastBusinessDay),
        )
        .unwrap();
        (conn, template.id)
    }

    fn request(template_id: i64) -> NewDocumentRequest {
        NewDocumentRequest {
            template_id,
            user_id: 1,
            due_date: NaiveDate::from_ymd_opt(2026, 5, 29).unwrap(),
            amount: 30000.0,
            description: Some("5月分顧問料".to_string()),
            origin: OriginMarker::Recurring,
        }
    }

    #[test]
    fn test_create_document_writes_both_ledgers() {
        let (conn, template_id) = create_test_db();
        let store = SqliteDocumentStore::new();

        let created = store.create_document(&conn, &request(template_id)).unwrap();
        assert!(is_valid_document_number(&created.document_number));

        let issued = store.find_issued_document(&conn, created.document_id).unwrap();
        assert_eq!(issued.template_id, Some(template_id));
        assert_eq!(issued.origin, "recurring");
        assert_eq!(issued.payment, PaymentFact::unpaid());

        let obligation = store
            .find_obligation(&conn, created.obligation_id.unwrap())
            .unwrap();
        assert_eq!(obligation.issued_document_id, Some(created.document_id));
        assert_eq!(obligation.amount, 30000.0);
    }

    #[test]
    fn test_find_equivalent_in_both_directions() {
        let (conn, template_id) = create_test_db();
        let store = SqliteDocumentStore::new();
        let created = store.create_document(&conn, &request(template_id)).unwrap();
        let obligation_id = created.obligation_id.unwrap();

        assert_eq!(
            store
                .find_equivalent(&conn, LedgerKind::IssuedDocument, created.document_id)
                .unwrap(),
            Some(LedgerRef::new(LedgerKind::Obligation, obligation_id))
        );
        assert_eq!(
            store
                .find_equivalent(&conn, LedgerKind::Obligation, obligation_id)
                .unwrap(),
            Some(LedgerRef::new(LedgerKind::IssuedDocument, created.document_id))
        );
    }

    #[test]
    fn test_standalone_records_have_no_equivalent() {
        let (conn, _) = create_test_db();
        let store = SqliteDocumentStore::new();
        let due = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

        let document_id = store
            .create_standalone_document(&conn, 1, due, 1000.0, None)
            .unwrap();
        let obligation_id = store
            .create_standalone_obligation(&conn, 1, due, 2000.0, Some("立替"))
            .unwrap();

        assert_eq!(
            store
                .find_equivalent(&conn, LedgerKind::IssuedDocument, document_id)
                .unwrap(),
            None
        );
        assert_eq!(
            store
                .find_equivalent(&conn, LedgerKind::Obligation, obligation_id)
                .unwrap(),
            None
        );
        assert_eq!(
            store
                .find_equivalent(&conn, LedgerKind::Obligation, 999)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_payment_fact_read_write() {
        let (conn, template_id) = create_test_db();
        let store = SqliteDocumentStore::new();
        let created = store.create_document(&conn, &request(template_id)).unwrap();

        let fact = PaymentFact::paid(NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(), "card");
        store
            .set_payment_fact(&conn, LedgerKind::IssuedDocument, created.document_id, &fact)
            .unwrap();

        assert_eq!(
            store
                .get_payment_fact(&conn, LedgerKind::IssuedDocument, created.document_id)
                .unwrap(),
            fact
        );
        // 直接書き込みは相手側の台帳に影響しない
        assert_eq!(
            store
                .get_payment_fact(&conn, LedgerKind::Obligation, created.obligation_id.unwrap())
                .unwrap(),
            PaymentFact::unpaid()
        );

        assert!(matches!(
            store.set_payment_fact(&conn, LedgerKind::Obligation, 999, &fact),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.get_payment_fact(&conn, LedgerKind::IssuedDocument, 999),
            Err(AppError::NotFound(_))
        ));
    }
}
