use super::models::TemplateStatus;
use crate::shared::errors::{AppError, AppResult};

/// テンプレートに対するライフサイクル操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateAction {
    /// 一時停止（理由必須）
    Pause { reason: String },
    /// 再開
    Resume,
    /// 解約（終端）
    Cancel,
}

/// 遷移表で使用する操作の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Pause,
    Resume,
    Cancel,
}

impl TemplateAction {
    fn kind(&self) -> ActionKind {
        match self {
            TemplateAction::Pause { .. } => ActionKind::Pause,
            TemplateAction::Resume => ActionKind::Resume,
            TemplateAction::Cancel => ActionKind::Cancel,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TemplateAction::Pause { .. } => "一時停止",
            TemplateAction::Resume => "再開",
            TemplateAction::Cancel => "解約",
        }
    }
}

/// 許可された状態遷移（現在の状態, 操作, 遷移後の状態）
const ALLOWED_TRANSITIONS: [(TemplateStatus, ActionKind, TemplateStatus); 4] = [
    (TemplateStatus::Active, ActionKind::Pause, TemplateStatus::Paused),
    (TemplateStatus::Paused, ActionKind::Resume, TemplateStatus::Active),
    (TemplateStatus::Active, ActionKind::Cancel, TemplateStatus::Cancelled),
    (TemplateStatus::Paused, ActionKind::Cancel, TemplateStatus::Cancelled),
];

/// 操作適用後の状態と一時停止理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: TemplateStatus,
    pub pause_reason: Option<String>,
}

/// 現在の状態に操作を適用した結果を計算する
///
/// # 引数
/// * `current` - 現在の状態
/// * `action` - 適用する操作
///
/// # 戻り値
/// 遷移後の状態と一時停止理由、または許可されていない遷移の場合はエラー
pub fn apply(current: TemplateStatus, action: &TemplateAction) -> AppResult<Transition> {
    let kind = action.kind();
    let next = ALLOWED_TRANSITIONS
        .iter()
        .find(|(from, k, _)| *from == current && *k == kind)
        .map(|(_, _, to)| *to)
        .ok_or_else(|| {
            AppError::invalid_transition(format!(
                "状態 {current} のテンプレートは{}できません",
                action.label()
            ))
        })?;

    // 一時停止理由は停止中のみ保持し、再開・解約でクリアする
    let pause_reason = match action {
        TemplateAction::Pause { reason } => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(AppError::validation("一時停止には理由が必要です"));
            }
            Some(reason.to_string())
        }
        TemplateAction::Resume | TemplateAction::Cancel => None,
    };

    Ok(Transition {
        status: next,
        pause_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause(reason: &str) -> TemplateAction {
        TemplateAction::Pause {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_pause_and_resume() {
        let paused = apply(TemplateStatus::Active, &pause("顧客の休業")).unwrap();
        assert_eq!(paused.status, TemplateStatus::Paused);
        assert_eq!(paused.pause_reason.as_deref(), Some("顧客の休業"));

        let resumed = apply(TemplateStatus::Paused, &TemplateAction::Resume).unwrap();
        assert_eq!(resumed.status, TemplateStatus::Active);
        assert_eq!(resumed.pause_reason, None);
    }

    #[test]
    fn test_pause_requires_reason() {
        let result = apply(TemplateStatus::Active, &pause("   "));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_cancel_is_terminal() {
        let cancelled = apply(TemplateStatus::Paused, &TemplateAction::Cancel).unwrap();
        assert_eq!(cancelled.status, TemplateStatus::Cancelled);

        for action in [pause("理由"), TemplateAction::Resume, TemplateAction::Cancel] {
            let result = apply(TemplateStatus::Cancelled, &action);
            assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(matches!(
            apply(TemplateStatus::Active, &TemplateAction::Resume),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            apply(TemplateStatus::Paused, &pause("二重停止")),
            Err(AppError::InvalidTransition(_))
        ));
    }
}
