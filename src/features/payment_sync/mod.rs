/// 支払状態同期機能モジュール
///
/// 発行済み書類台帳と債務台帳の支払状態（支払済み, 支払日, 支払方法）を
/// 1つのトランザクションで揃えて更新します。
pub mod models;
pub mod service;

pub use models::SyncOutcome;
pub use service::{mark_paid, mark_unpaid, on_payment_fact_changed};
