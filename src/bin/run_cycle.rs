use chrono::Utc;
use log::{error, info, warn};
use recurring_billing::features::documents::SqliteDocumentStore;
use recurring_billing::features::generator::{run_cycle_concurrently, ConcurrentCycleConfig};
use recurring_billing::shared::config::{
    initialize_logging_system, load_environment_variables, EnvironmentConfig,
};
use recurring_billing::shared::database::open_database;
use recurring_billing::shared::errors::AppResult;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 生成サイクルを1回実行し、結果をJSONで標準出力へ書き出す
#[tokio::main]
async fn main() -> ExitCode {
    load_environment_variables();

    let config = match EnvironmentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.details());
            return ExitCode::FAILURE;
        }
    };
    initialize_logging_system(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                "生成サイクルの実行に失敗しました: severity={:?}, {}",
                e.severity(),
                e.details()
            );
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: EnvironmentConfig) -> AppResult<()> {
    // テーブル作成のみ行い、接続は各ワーカーが個別に開く
    drop(open_database(&config.database_path, config.busy_timeout)?);

    let as_of = Utc::now().with_timezone(&config.billing_timezone).date_naive();
    info!(
        "基準日を決定しました: {as_of} ({})",
        config.billing_timezone
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("中断要求を受け付けました。処理中のテンプレート完了後に停止します");
            signal_token.cancel();
        }
    });

    let cycle_config = ConcurrentCycleConfig {
        database_path: config.database_path.clone(),
        busy_timeout: config.busy_timeout,
        workers: config.generator_workers,
    };
    let report = run_cycle_concurrently(
        &cycle_config,
        Arc::new(SqliteDocumentStore::new()),
        as_of,
        token,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed_count() > 0 {
        warn!("失敗したテンプレートがあります: {}件", report.failed_count());
    }

    Ok(())
}
