/// 生成履歴機能モジュール
///
/// テンプレートと期日ごとの書類生成試行を記録し、
/// 同じ期日に対する成功記録が2件以上存在しないことを保証します。
pub mod models;
pub mod repository;

pub use models::{AttemptOutcome, AttemptStatus, GenerationRecord};
pub use repository::{find_by_id, find_by_template, find_succeeded, has_succeeded, record_attempt};
