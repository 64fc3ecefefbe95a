use super::models::{DueDateRule, ReferenceMonth};
use crate::shared::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, Weekday};

/// 支払期日ルールと基準月から期日を計算する
///
/// 副作用はなく、生成済みかどうかは考慮しない。
/// 営業日は土日のみを除外し、祝日は考慮しない。
///
/// # 引数
/// * `rule` - 支払期日ルール
/// * `month` - 基準月
///
/// # 戻り値
/// 基準月内の期日、またはルールが不正な場合はInvalidRuleエラー
pub fn resolve(rule: &DueDateRule, month: ReferenceMonth) -> AppResult<NaiveDate> {
    rule.validate()?;

    let first = month.first_day()?;
    let last = month.last_day()?;

    let date = match rule {
        DueDateRule::SpecificDay(day) => {
            // 月の日数を超える指定日は月末に丸める
            let clamped = (*day).min(last.day());
            NaiveDate::from_ymd_opt(month.year(), month.month(), clamped).ok_or_else(|| {
                AppError::invalid_rule(format!("{month} に {day} 日は存在しません"))
            })?
        }
        DueDateRule::FirstCalendarDay => first,
        DueDateRule::FirstBusinessDay => {
            let mut date = first;
            while !is_business_day(date) {
                date = date
                    .succ_opt()
                    .ok_or_else(|| AppError::invalid_rule(format!("{month} の営業日を計算できません")))?;
            }
            date
        }
        DueDateRule::LastCalendarDay => last,
        DueDateRule::LastBusinessDay => {
            let mut date = last;
            while !is_business_day(date) {
                date = date
                    .pred_opt()
                    .ok_or_else(|| AppError::invalid_rule(format!("{month} の営業日を計算できません")))?;
            }
            date
        }
    };

    log::debug!("期日を計算しました: rule={}, month={month}, due_date={date}", rule.kind());

    Ok(date)
}

/// 営業日（土日以外）かどうかを判定する
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
