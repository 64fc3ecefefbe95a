use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 支払状態を保持する台帳の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// 発行済み書類台帳
    IssuedDocument,
    /// 汎用債務台帳
    Obligation,
}

impl LedgerKind {
    /// 相手側の台帳種別
    pub fn other(&self) -> LedgerKind {
        match self {
            LedgerKind::IssuedDocument => LedgerKind::Obligation,
            LedgerKind::Obligation => LedgerKind::IssuedDocument,
        }
    }

    /// 台帳のテーブル名
    pub(crate) fn table(&self) -> &'static str {
        match self {
            LedgerKind::IssuedDocument => "issued_documents",
            LedgerKind::Obligation => "obligations",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LedgerKind::IssuedDocument => "発行済み書類",
            LedgerKind::Obligation => "債務",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 台帳上のレコード参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    pub ledger: LedgerKind,
    pub id: i64,
}

impl LedgerRef {
    pub fn new(ledger: LedgerKind, id: i64) -> Self {
        Self { ledger, id }
    }
}

impl fmt::Display for LedgerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.ledger, self.id)
    }
}

/// 支払状態（支払済みフラグ, 支払日, 支払方法）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFact {
    pub paid: bool,
    pub paid_on: Option<NaiveDate>,
    pub paid_via: Option<String>,
}

impl PaymentFact {
    /// 支払済みの状態
    pub fn paid(paid_on: NaiveDate, paid_via: &str) -> Self {
        Self {
            paid: true,
            paid_on: Some(paid_on),
            paid_via: Some(paid_via.to_string()),
        }
    }

    /// 未払いの状態
    pub fn unpaid() -> Self {
        Self {
            paid: false,
            paid_on: None,
            paid_via: None,
        }
    }

    /// 支払状態の整合性を検証する
    ///
    /// - 支払済みの場合は支払日が必須
    /// - 未払いの場合は支払日・支払方法を持たない
    /// - 支払方法は空白のみであってはならない
    pub fn validate(&self) -> AppResult<()> {
        if let Some(via) = &self.paid_via {
            if via.trim().is_empty() {
                return Err(AppError::validation("支払方法が空です"));
            }
        }

        if self.paid && self.paid_on.is_none() {
            return Err(AppError::validation("支払済みの場合は支払日が必要です"));
        }

        if !self.paid && (self.paid_on.is_some() || self.paid_via.is_some()) {
            return Err(AppError::validation(
                "未払いの場合は支払日と支払方法を指定できません",
            ));
        }

        Ok(())
    }
}

impl Default for PaymentFact {
    fn default() -> Self {
        Self::unpaid()
    }
}

/// 書類の作成経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMarker {
    /// 定期請求テンプレートから生成
    Recurring,
    /// 手動作成
    Manual,
}

impl OriginMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginMarker::Recurring => "recurring",
            OriginMarker::Manual => "manual",
        }
    }
}

/// 書類作成依頼
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocumentRequest {
    pub template_id: i64,
    pub user_id: i64,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub origin: OriginMarker,
}

/// 作成された書類の参照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedDocument {
    /// 生成履歴とテンプレートが参照する書類ID
    pub document_id: i64,
    /// 対応する債務台帳のレコード（存在する場合）
    pub obligation_id: Option<i64>,
    pub document_number: String,
}

/// 発行済み書類台帳のレコード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedDocument {
    pub id: i64,
    pub document_number: String,
    pub user_id: i64,
    pub template_id: Option<i64>,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub origin: String,
    pub payment: PaymentFact,
    pub created_at: String,
    pub updated_at: String,
}

/// 債務台帳のレコード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    pub id: i64,
    pub issued_document_id: Option<i64>,
    pub user_id: i64,
    pub template_id: Option<i64>,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub payment: PaymentFact,
    pub created_at: String,
    pub updated_at: String,
}
