use crate::shared::errors::{AppError, AppResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 生成試行の結果状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Succeeded,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "succeeded" => Ok(AttemptStatus::Succeeded),
            "failed" => Ok(AttemptStatus::Failed),
            other => Err(AppError::validation(format!("不明な生成結果です: {other}"))),
        }
    }
}

/// 記録する生成試行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 書類の作成に成功した
    Succeeded { document_id: i64 },
    /// 書類の作成に失敗した（次のサイクルで再試行される）
    Failed { detail: String },
}

impl AttemptOutcome {
    pub fn status(&self) -> AttemptStatus {
        match self {
            AttemptOutcome::Succeeded { .. } => AttemptStatus::Succeeded,
            AttemptOutcome::Failed { .. } => AttemptStatus::Failed,
        }
    }
}

/// 生成履歴レコード（テンプレートと期日ごとの試行記録）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub template_id: i64,
    pub due_date: NaiveDate,
    pub status: AttemptStatus,
    /// 成功時に作成された書類
    pub document_id: Option<i64>,
    /// 失敗時のエラー詳細
    pub error_detail: Option<String>,
    pub attempted_at: String,
}
