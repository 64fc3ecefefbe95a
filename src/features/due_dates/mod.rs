/// 支払期日計算機能モジュール
///
/// このモジュールは支払期日ルールの計算を提供します：
/// - 5種類の支払期日ルール（指定日、月初日、第1営業日、月末日、最終営業日）
/// - 基準月からの期日計算（純粋関数、永続化なし）
/// - 営業日判定（土日のみ、祝日は対象外）
pub mod models;
pub mod resolver;

pub use models::{DueDateRule, ReferenceMonth};
pub use resolver::{is_business_day, resolve};
