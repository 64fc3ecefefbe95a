use super::models::SyncOutcome;
use crate::features::documents::{
    CrossReferenceResolver, DocumentStore, LedgerKind, LedgerRef, PaymentFact,
};
use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// 一方の台帳の支払状態を変更し、対応するもう一方の台帳へ同じ状態を反映する
///
/// 起点の書き込みと同期先の書き込みは1つのトランザクションで行う。
/// 同期先への書き込み自体は再度の同期を引き起こさないため、循環は発生しない。
/// 対応するレコードがない場合は起点のみを更新し、エラーにはしない。
///
/// # 引数
/// * `conn` - データベース接続
/// * `store` - 支払状態を読み書きする書類ストア
/// * `resolver` - 対応レコードを探す相互参照リゾルバー
/// * `source` - 変更の起点となる台帳種別
/// * `document_id` - 起点の台帳上のレコードID
/// * `new_fact` - 新しい支払状態
///
/// # 戻り値
/// 同期結果。同期先の書き込みに失敗した場合はSyncWriteFailedとなり、起点の変更もロールバックされる
pub fn on_payment_fact_changed<S, R>(
    conn: &Connection,
    store: &S,
    resolver: &R,
    source: LedgerKind,
    document_id: i64,
    new_fact: &PaymentFact,
) -> AppResult<SyncOutcome>
where
    S: DocumentStore + ?Sized,
    R: CrossReferenceResolver + ?Sized,
{
    new_fact.validate()?;

    let source_ref = LedgerRef::new(source, document_id);
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    // 起点レコードの存在確認と書き込み（NotFound等はそのまま返し、トランザクションは破棄される）
    let current = store.get_payment_fact(&tx, source, document_id)?;
    let source_changed = current != *new_fact;
    if source_changed {
        store.set_payment_fact(&tx, source, document_id, new_fact)?;
    }

    let target = resolver
        .find_equivalent(&tx, source, document_id)
        .map_err(|e| sync_failure(source_ref, None, e))?;

    let target_changed = match target {
        Some(target_ref) => propagate(&tx, store, source_ref, target_ref, new_fact)?,
        None => {
            log::debug!("対応する台帳レコードがないため同期をスキップ: {source_ref}");
            false
        }
    };

    tx.commit()
        .map_err(|e| sync_failure(source_ref, target, AppError::from(e)))?;

    let outcome = SyncOutcome {
        source: source_ref,
        target,
        source_changed,
        target_changed,
    };

    if outcome.is_noop() {
        log::debug!("支払状態に変化はありません: {source_ref}");
    } else {
        log::info!(
            "支払状態を更新しました: {source_ref} -> {:?}, paid={}",
            target.map(|t| t.to_string()),
            new_fact.paid
        );
    }

    Ok(outcome)
}

/// 同期先の台帳へ支払状態を書き込む（変化がない場合は書き込まない）
fn propagate<S>(
    conn: &Connection,
    store: &S,
    source_ref: LedgerRef,
    target_ref: LedgerRef,
    fact: &PaymentFact,
) -> AppResult<bool>
where
    S: DocumentStore + ?Sized,
{
    let existing = store
        .get_payment_fact(conn, target_ref.ledger, target_ref.id)
        .map_err(|e| sync_failure(source_ref, Some(target_ref), e))?;

    if existing == *fact {
        return Ok(false);
    }

    store
        .set_payment_fact(conn, target_ref.ledger, target_ref.id, fact)
        .map_err(|e| sync_failure(source_ref, Some(target_ref), e))?;

    Ok(true)
}

fn sync_failure(source: LedgerRef, target: Option<LedgerRef>, cause: AppError) -> AppError {
    let target = target
        .map(|t| t.to_string())
        .unwrap_or_else(|| "不明".to_string());
    log::error!("支払状態の同期に失敗したためロールバックします: {source} -> {target}: {cause}");
    AppError::SyncWriteFailed(format!("{source} -> {target}: {cause}"))
}

/// 支払済みにする
pub fn mark_paid<S, R>(
    conn: &Connection,
    store: &S,
    resolver: &R,
    ledger: LedgerKind,
    document_id: i64,
    paid_on: NaiveDate,
    paid_via: &str,
) -> AppResult<SyncOutcome>
where
    S: DocumentStore + ?Sized,
    R: CrossReferenceResolver + ?Sized,
{
    on_payment_fact_changed(
        conn,
        store,
        resolver,
        ledger,
        document_id,
        &PaymentFact::paid(paid_on, paid_via),
    )
}

/// 未払いに戻す
pub fn mark_unpaid<S, R>(
    conn: &Connection,
    store: &S,
    resolver: &R,
    ledger: LedgerKind,
    document_id: i64,
) -> AppResult<SyncOutcome>
where
    S: DocumentStore + ?Sized,
    R: CrossReferenceResolver + ?Sized,
{
    on_payment_fact_changed(conn, store, resolver, ledger, document_id, &PaymentFact::unpaid())
}
