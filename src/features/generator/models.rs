use chrono::NaiveDate;
use serde::Serialize;

/// 生成をスキップした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 期日がまだ来ていない
    NotYetDue,
    /// 同じ期日の書類が既に生成されている
    AlreadyGenerated,
    /// 期日がテンプレートの開始日より前
    BeforeStartDate,
    /// 処理中にテンプレートが一時停止・解約された
    NotActive,
}

/// テンプレート1件分の生成結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GenerationResult {
    /// 書類を1件生成した
    Generated { document_id: i64, record_id: i64 },
    /// 生成しなかった
    Skipped { reason: SkipReason },
    /// 書類作成に失敗した、またはテンプレートを処理できなかった（次のサイクルで再試行する）
    Failed { detail: String },
}

/// 生成サイクルにおけるテンプレートごとの結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    pub template_id: i64,
    /// 計算された期日（期日計算前に打ち切った場合はNone）
    pub due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub result: GenerationResult,
}

impl GenerationOutcome {
    pub fn skipped(template_id: i64, due_date: Option<NaiveDate>, reason: SkipReason) -> Self {
        Self {
            template_id,
            due_date,
            result: GenerationResult::Skipped { reason },
        }
    }

    /// 処理を完了できなかったテンプレートの結果
    pub fn failed(template_id: i64, due_date: Option<NaiveDate>, detail: String) -> Self {
        Self {
            template_id,
            due_date,
            result: GenerationResult::Failed { detail },
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.result, GenerationResult::Generated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, GenerationResult::Failed { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.result {
            GenerationResult::Skipped { reason } => Some(reason),
            _ => None,
        }
    }
}

/// 生成サイクル全体の結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub as_of: Option<NaiveDate>,
    pub outcomes: Vec<GenerationOutcome>,
    /// テンプレート間で中断された場合はtrue
    pub cancelled: bool,
}

impl CycleReport {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of: Some(as_of),
            outcomes: Vec::new(),
            cancelled: false,
        }
    }

    pub fn generated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_generated()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.skip_reason().is_some())
            .count()
    }

    /// 別ワーカーの結果を統合する
    pub fn merge(&mut self, other: CycleReport) {
        self.outcomes.extend(other.outcomes);
        self.cancelled |= other.cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome = GenerationOutcome {
            template_id: 3,
            due_date: NaiveDate::from_ymd_opt(2026, 4, 27),
            result: GenerationResult::Skipped {
                reason: SkipReason::NotYetDue,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["template_id"], 3);
        assert_eq!(json["due_date"], "2026-04-27");
        assert_eq!(json["result"], "skipped");
        assert_eq!(json["reason"], "not_yet_due");
    }

    #[test]
    fn test_report_counts_and_merge() {
        let as_of = NaiveDate::from_ymd_opt(2026, 4, 27).unwrap();
        let mut report = CycleReport::new(as_of);
        report.outcomes.push(GenerationOutcome {
            template_id: 1,
            due_date: Some(as_of),
            result: GenerationResult::Generated {
                document_id: 10,
                record_id: 20,
            },
        });

        let mut other = CycleReport::new(as_of);
        other.outcomes.push(GenerationOutcome {
            template_id: 2,
            due_date: Some(as_of),
            result: GenerationResult::Failed {
                detail: "timeout".to_string(),
            },
        });
        other
            .outcomes
            .push(GenerationOutcome::skipped(3, None, SkipReason::NotActive));
        other.cancelled = true;

        report.merge(other);
        assert_eq!(report.generated_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(report.cancelled);
    }
}
