/// 定期請求テンプレート機能モジュール
///
/// このモジュールは定期請求テンプレートに関連するすべての機能を提供します：
/// - テンプレートの作成、読み取り、更新、削除
/// - ライフサイクル操作（一時停止、再開、解約）と許可された遷移表
/// - 生成サイクルが参照するACTIVEテンプレートの取得
pub mod lifecycle;
pub mod models;
pub mod repository;

pub use lifecycle::{TemplateAction, Transition};
pub use models::{CreateTemplateDto, IntervalUnit, RecurringTemplate, TemplateStatus};
pub use repository::{
    apply_action, cancel, create, delete, find_active, find_all, find_by_id, pause, resume,
    set_last_generated, update_details,
};
