/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するモデル、データベース操作、サービスを
/// 含む自己完結型のユニットです。
pub mod documents;
pub mod due_dates;
pub mod generation_history;
pub mod generator;
pub mod payment_sync;
pub mod templates;
