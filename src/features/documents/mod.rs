/// 書類ストア機能モジュール
///
/// このモジュールは書類作成と支払状態台帳への連携を提供します：
/// - 書類ストアと相互参照リゾルバーのトレイト
/// - 発行済み書類台帳・債務台帳のSQLite実装
/// - 支払状態（支払済み, 支払日, 支払方法）のモデル
pub mod models;
pub mod sqlite_store;
pub mod store;

pub use models::{
    CreatedDocument, IssuedDocument, LedgerKind, LedgerRef, NewDocumentRequest, Obligation,
    OriginMarker, PaymentFact,
};
pub use sqlite_store::SqliteDocumentStore;
pub use store::{CrossReferenceResolver, DocumentStore};
