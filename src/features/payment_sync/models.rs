use crate::features::documents::LedgerRef;
use serde::Serialize;

/// 支払状態同期の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// 変更の起点となった台帳レコード
    pub source: LedgerRef,
    /// 同期先の台帳レコード（対応レコードがない場合はNone）
    pub target: Option<LedgerRef>,
    /// 起点レコードの支払状態が実際に変わったか
    pub source_changed: bool,
    /// 同期先レコードの支払状態が実際に変わったか
    pub target_changed: bool,
}

impl SyncOutcome {
    /// どちらの台帳にも変化がなかった場合はtrue
    pub fn is_noop(&self) -> bool {
        !self.source_changed && !self.target_changed
    }
}
