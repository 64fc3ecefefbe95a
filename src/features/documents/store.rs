use super::models::{CreatedDocument, LedgerKind, LedgerRef, NewDocumentRequest, PaymentFact};
use crate::shared::errors::AppResult;
use rusqlite::Connection;

/// 書類ストア
///
/// 書類の作成と、台帳ごとの支払状態の読み書きを行う外部連携先。
/// すべての操作は呼び出し元の接続（トランザクション）上で実行されるため、
/// 呼び出し元がロールバックすれば書き込みも取り消される。
pub trait DocumentStore {
    /// 定期請求テンプレートの期日に対応する書類を作成する
    fn create_document(
        &self,
        conn: &Connection,
        request: &NewDocumentRequest,
    ) -> AppResult<CreatedDocument>;

    /// 台帳上の支払状態を取得する（レコードがない場合はNotFound）
    fn get_payment_fact(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
    ) -> AppResult<PaymentFact>;

    /// 台帳上の支払状態を書き込む（レコードがない場合はNotFound）
    fn set_payment_fact(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
        fact: &PaymentFact,
    ) -> AppResult<()>;
}

/// 相互参照リゾルバー
///
/// 一方の台帳のレコードに対応する、もう一方の台帳のレコードを探す。
pub trait CrossReferenceResolver {
    /// 対応するレコードを返す（存在しない場合はNone）
    fn find_equivalent(
        &self,
        conn: &Connection,
        ledger: LedgerKind,
        document_id: i64,
    ) -> AppResult<Option<LedgerRef>>;
}
