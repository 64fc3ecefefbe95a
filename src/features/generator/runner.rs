use super::models::{CycleReport, GenerationOutcome};
use super::service::{isolate, run_template};
use crate::features::documents::DocumentStore;
use crate::features::templates::{self, RecurringTemplate};
use crate::shared::database::open_worker_connection;
use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 並行生成サイクルの設定
#[derive(Debug, Clone)]
pub struct ConcurrentCycleConfig {
    /// データベースファイルのパス（ワーカーごとに接続を開く）
    pub database_path: PathBuf,
    /// 書き込みロック待ちのタイムアウト
    pub busy_timeout: Duration,
    /// ワーカー数
    pub workers: usize,
}

/// ACTIVEなテンプレートを複数ワーカーに分配して生成サイクルを実行する
///
/// テンプレート同士は可変状態を共有しないため、各ワーカーは独自の接続で
/// 担当テンプレートを順に処理する。同一テンプレートの二重生成は
/// 生成履歴の一意制約によって防がれる。
/// テンプレート単位・ワーカー単位のエラーは該当テンプレートの失敗結果として報告し、
/// 他のテンプレートの結果は失わない。
///
/// # 引数
/// * `config` - 並行実行の設定
/// * `store` - 書類ストア（全ワーカーで共有）
/// * `as_of` - 基準日
/// * `token` - 中断トークン（テンプレート間でのみ反映）
///
/// # 戻り値
/// テンプレートID順に並べた全ワーカーの結果
pub async fn run_cycle_concurrently<S>(
    config: &ConcurrentCycleConfig,
    store: Arc<S>,
    as_of: NaiveDate,
    token: CancellationToken,
) -> AppResult<CycleReport>
where
    S: DocumentStore + Send + Sync + 'static,
{
    if config.workers == 0 {
        return Err(AppError::validation("ワーカー数は1以上である必要があります"));
    }

    let path = config.database_path.clone();
    let busy_timeout = config.busy_timeout;
    let active = tokio::task::spawn_blocking(move || -> AppResult<Vec<RecurringTemplate>> {
        let conn = open_worker_connection(&path, busy_timeout)?;
        templates::find_active(&conn)
    })
    .await
    .map_err(|e| AppError::concurrency(format!("テンプレート取得タスクが異常終了しました: {e}")))??;

    log::info!(
        "並行生成サイクルを開始します: as_of={as_of}, 対象テンプレート={}件, ワーカー={}",
        active.len(),
        config.workers
    );

    let buckets = partition(active, config.workers);
    let bucket_ids: Vec<Vec<i64>> = buckets
        .iter()
        .map(|bucket| bucket.iter().map(|t| t.id).collect())
        .collect();

    let handles = buckets
        .into_iter()
        .map(|bucket| {
            let path = config.database_path.clone();
            let store = Arc::clone(&store);
            let token = token.clone();
            tokio::task::spawn_blocking(move || -> CycleReport {
                let mut report = CycleReport::new(as_of);
                let conn = match open_worker_connection(&path, busy_timeout) {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::error!("ワーカーの接続を開けませんでした: {}", e.details());
                        report.outcomes = bucket
                            .iter()
                            .map(|t| GenerationOutcome::failed(t.id, None, e.to_string()))
                            .collect();
                        return report;
                    }
                };
                for template in &bucket {
                    if token.is_cancelled() {
                        report.cancelled = true;
                        break;
                    }
                    let result = run_template(&conn, store.as_ref(), template, as_of);
                    report.outcomes.push(isolate(template, result));
                }
                report
            })
        })
        .collect::<Vec<_>>();

    // 異常終了したワーカーがあっても、他のワーカーの結果はすべて統合する
    let mut report = CycleReport::new(as_of);
    let joined = futures::future::join_all(handles).await;
    for (result, ids) in joined.into_iter().zip(bucket_ids) {
        match result {
            Ok(worker_report) => report.merge(worker_report),
            Err(e) => {
                log::error!("生成ワーカーが異常終了しました: {e}");
                let detail = AppError::concurrency(format!("生成ワーカーが異常終了しました: {e}"))
                    .to_string();
                report.outcomes.extend(
                    ids.into_iter()
                        .map(|id| GenerationOutcome::failed(id, None, detail.clone())),
                );
            }
        }
    }
    report.outcomes.sort_by_key(|o| o.template_id);

    if report.cancelled {
        log::warn!("並行生成サイクルが中断されました: 処理済み={}件", report.outcomes.len());
    }
    log::info!(
        "並行生成サイクルが完了しました: 生成={}, スキップ={}, 失敗={}",
        report.generated_count(),
        report.skipped_count(),
        report.failed_count()
    );

    Ok(report)
}

/// テンプレートをワーカー数以下のグループに均等に分配する
fn partition(templates: Vec<RecurringTemplate>, workers: usize) -> Vec<Vec<RecurringTemplate>> {
    let bucket_count = workers.min(templates.len()).max(1);
    let mut buckets: Vec<Vec<RecurringTemplate>> = vec![Vec::new(); bucket_count];
    for (index, template) in templates.into_iter().enumerate() {
        buckets[index % bucket_count].push(template);
    }
    buckets.retain(|b| !b.is_empty());
    buckets
}
