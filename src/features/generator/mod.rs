/// 定期請求書類の生成機能モジュール
///
/// このモジュールは定期請求の生成サイクルを提供します：
/// - ACTIVEなテンプレートごとの期日計算と書類生成
/// - 生成履歴による重複防止（同じ基準日での再実行は何も生成しない）
/// - 書類作成失敗時の失敗記録と次回サイクルでの再試行
/// - テンプレート間での中断と、複数ワーカーによる並行実行
pub mod models;
pub mod runner;
pub mod service;

pub use models::{CycleReport, GenerationOutcome, GenerationResult, SkipReason};
pub use runner::{run_cycle_concurrently, ConcurrentCycleConfig};
pub use service::{run_cycle, run_cycle_with_cancel, run_template};
