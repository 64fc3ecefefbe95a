use super::models::{CycleReport, GenerationOutcome, GenerationResult, SkipReason};
use crate::features::documents::{DocumentStore, NewDocumentRequest, OriginMarker};
use crate::features::due_dates::resolve;
use crate::features::generation_history::{self, AttemptOutcome};
use crate::features::templates::{self, RecurringTemplate, TemplateStatus};
use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tokio_util::sync::CancellationToken;

/// 基準日時点の生成サイクルを実行する
///
/// ACTIVEなテンプレートごとに期日を計算し、期日到来済みかつ未生成の場合のみ
/// 書類を1件作成する。同じ基準日で何度呼び出しても追加の書類は作成されない。
///
/// # 引数
/// * `conn` - データベース接続
/// * `store` - 書類ストア
/// * `as_of` - 基準日（呼び出し元が指定する「今日」）
///
/// # 戻り値
/// テンプレートごとの生成結果
pub fn run_cycle<S>(conn: &Connection, store: &S, as_of: NaiveDate) -> AppResult<Vec<GenerationOutcome>>
where
    S: DocumentStore + ?Sized,
{
    run_cycle_with_cancel(conn, store, as_of, &CancellationToken::new()).map(|r| r.outcomes)
}

/// 中断可能な生成サイクルを実行する
///
/// 中断はテンプレートとテンプレートの間でのみ反映され、
/// 処理中のテンプレートは完了または失敗まで進む。
/// テンプレート単位のエラーは失敗結果として報告し、残りのテンプレートの処理を続ける。
pub fn run_cycle_with_cancel<S>(
    conn: &Connection,
    store: &S,
    as_of: NaiveDate,
    token: &CancellationToken,
) -> AppResult<CycleReport>
where
    S: DocumentStore + ?Sized,
{
    let active = templates::find_active(conn)?;
    log::info!(
        "生成サイクルを開始します: as_of={as_of}, 対象テンプレート={}件",
        active.len()
    );

    let mut report = CycleReport::new(as_of);
    for template in &active {
        if token.is_cancelled() {
            log::warn!("生成サイクルが中断されました: 残り{}件", active.len() - report.outcomes.len());
            report.cancelled = true;
            break;
        }
        report.outcomes.push(isolate(template, run_template(conn, store, template, as_of)));
    }

    log::info!(
        "生成サイクルが完了しました: 生成={}, スキップ={}, 失敗={}",
        report.generated_count(),
        report.skipped_count(),
        report.failed_count()
    );

    Ok(report)
}

/// テンプレート1件分のエラーを結果に閉じ込め、サイクル全体を止めない
///
/// トランザクション内で発生したエラーはロールバック済みのため、
/// 当該テンプレートは何も生成していない状態で失敗として報告される。
pub(crate) fn isolate(
    template: &RecurringTemplate,
    result: AppResult<GenerationOutcome>,
) -> GenerationOutcome {
    result.unwrap_or_else(|e| {
        let level = match e.severity() {
            ErrorSeverity::High | ErrorSeverity::Critical => log::Level::Error,
            ErrorSeverity::Low | ErrorSeverity::Medium => log::Level::Warn,
        };
        log::log!(
            level,
            "テンプレートの処理に失敗しました: template_id={}, error={}",
            template.id,
            e.details()
        );
        GenerationOutcome::failed(template.id, None, e.to_string())
    })
}

/// テンプレート1件分の生成を行う
///
/// # 処理内容
/// 1. 基準月の期日を計算（期日ルールが不正な場合はInvalidRuleエラーを返す）
/// 2. 期日未到来・開始日前・生成済みの場合はスキップ
/// 3. 書き込みトランザクション内で書類作成、成功記録、最終生成書類の更新を行う
/// 4. 書類作成に失敗した場合はロールバックし、失敗記録のみを残す
pub fn run_template<S>(
    conn: &Connection,
    store: &S,
    template: &RecurringTemplate,
    as_of: NaiveDate,
) -> AppResult<GenerationOutcome>
where
    S: DocumentStore + ?Sized,
{
    if !template.is_active() {
        return Ok(GenerationOutcome::skipped(template.id, None, SkipReason::NotActive));
    }

    let month = template.reference_month(as_of)?;
    let due_date = resolve(&template.due_date_rule, month)?;

    if due_date > as_of {
        log::debug!("期日未到来のためスキップ: template_id={}, due_date={due_date}", template.id);
        return Ok(GenerationOutcome::skipped(template.id, Some(due_date), SkipReason::NotYetDue));
    }

    if let Some(start_date) = template.start_date {
        if due_date < start_date {
            log::debug!(
                "開始日前の期日のためスキップ: template_id={}, due_date={due_date}, start_date={start_date}",
                template.id
            );
            return Ok(GenerationOutcome::skipped(
                template.id,
                Some(due_date),
                SkipReason::BeforeStartDate,
            ));
        }
    }

    if generation_history::has_succeeded(conn, template.id, due_date)? {
        log::debug!("生成済みのためスキップ: template_id={}, due_date={due_date}", template.id);
        return Ok(GenerationOutcome::skipped(
            template.id,
            Some(due_date),
            SkipReason::AlreadyGenerated,
        ));
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    // 一覧取得後に一時停止・解約・削除された場合は生成しない
    if current_status(&tx, template.id)? != Some(TemplateStatus::Active) {
        tx.rollback()?;
        return Ok(GenerationOutcome::skipped(template.id, Some(due_date), SkipReason::NotActive));
    }

    let request = NewDocumentRequest {
        template_id: template.id,
        user_id: template.user_id,
        due_date,
        amount: template.amount,
        description: template.description.clone().or_else(|| Some(template.name.clone())),
        origin: OriginMarker::Recurring,
    };

    let created = match store.create_document(&tx, &request) {
        Ok(created) => created,
        Err(e) => {
            tx.rollback()?;
            let detail = e.to_string();
            log::warn!(
                "書類作成に失敗しました（次回のサイクルで再試行）: template_id={}, due_date={due_date}, error={detail}",
                template.id
            );
            generation_history::record_attempt(
                conn,
                template.id,
                due_date,
                &AttemptOutcome::Failed {
                    detail: detail.clone(),
                },
            )?;
            return Ok(GenerationOutcome {
                template_id: template.id,
                due_date: Some(due_date),
                result: GenerationResult::Failed { detail },
            });
        }
    };

    let record = match generation_history::record_attempt(
        &tx,
        template.id,
        due_date,
        &AttemptOutcome::Succeeded {
            document_id: created.document_id,
        },
    ) {
        Ok(record) => record,
        Err(AppError::DuplicateGeneration { .. }) => {
            // 並行した別のワーカーが先に生成した。作成した書類ごと取り消す
            tx.rollback()?;
            log::info!(
                "並行実行で生成済みのため取り消しました: template_id={}, due_date={due_date}",
                template.id
            );
            return Ok(GenerationOutcome::skipped(
                template.id,
                Some(due_date),
                SkipReason::AlreadyGenerated,
            ));
        }
        Err(e) => return Err(e),
    };

    templates::set_last_generated(&tx, template.id, created.document_id)?;
    tx.commit()?;

    log::info!(
        "定期請求書類を生成しました: template_id={}, due_date={due_date}, document_id={}, number={}",
        template.id,
        created.document_id,
        created.document_number
    );

    Ok(GenerationOutcome {
        template_id: template.id,
        due_date: Some(due_date),
        result: GenerationResult::Generated {
            document_id: created.document_id,
            record_id: record.id,
        },
    })
}

fn current_status(conn: &Connection, template_id: i64) -> AppResult<Option<TemplateStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM recurring_templates WHERE id = ?1",
            params![template_id],
            |row| row.get(0),
        )
        .optional()?;
    status.as_deref().map(TemplateStatus::parse).transpose()
}
