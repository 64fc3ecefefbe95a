use crate::shared::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 支払期日ルール
///
/// 5種類の記号的なルールのいずれか。永続化時は `kind()` と `day()` の2カラムに分解される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "day", rename_all = "snake_case")]
pub enum DueDateRule {
    /// 指定日（月の日数を超える場合は月末に丸める）
    SpecificDay(u32),
    /// 月初日
    FirstCalendarDay,
    /// 第1営業日（土日を除く）
    FirstBusinessDay,
    /// 月末日
    LastCalendarDay,
    /// 最終営業日（土日を除く）
    LastBusinessDay,
}

impl DueDateRule {
    /// 永続化用のルール種別名を取得する
    pub fn kind(&self) -> &'static str {
        match self {
            DueDateRule::SpecificDay(_) => "specific_day",
            DueDateRule::FirstCalendarDay => "first_calendar_day",
            DueDateRule::FirstBusinessDay => "first_business_day",
            DueDateRule::LastCalendarDay => "last_calendar_day",
            DueDateRule::LastBusinessDay => "last_business_day",
        }
    }

    /// 指定日ルールの日付を取得する（それ以外はNone）
    pub fn day(&self) -> Option<u32> {
        match self {
            DueDateRule::SpecificDay(day) => Some(*day),
            _ => None,
        }
    }

    /// 種別名と日付からルールを復元する
    ///
    /// # 引数
    /// * `kind` - ルール種別名
    /// * `day` - 指定日ルールの日付
    ///
    /// # 戻り値
    /// 検証済みのルール、または不正な組み合わせの場合はInvalidRuleエラー
    pub fn from_parts(kind: &str, day: Option<u32>) -> AppResult<Self> {
        let rule = match (kind, day) {
            ("specific_day", Some(day)) => DueDateRule::SpecificDay(day),
            ("specific_day", None) => {
                return Err(AppError::invalid_rule("指定日ルールには日付が必要です"));
            }
            ("first_calendar_day", None) => DueDateRule::FirstCalendarDay,
            ("first_business_day", None) => DueDateRule::FirstBusinessDay,
            ("last_calendar_day", None) => DueDateRule::LastCalendarDay,
            ("last_business_day", None) => DueDateRule::LastBusinessDay,
            (other, Some(day)) if Self::is_known_kind(other) => {
                return Err(AppError::invalid_rule(format!(
                    "ルール {other} に日付 {day} は指定できません"
                )));
            }
            (other, _) => {
                return Err(AppError::invalid_rule(format!("不明なルール種別です: {other}")));
            }
        };

        rule.validate()?;
        Ok(rule)
    }

    /// ルールの妥当性を検証する
    ///
    /// 指定日は1〜31の範囲である必要がある。
    pub fn validate(&self) -> AppResult<()> {
        if let DueDateRule::SpecificDay(day) = self {
            if !(1..=31).contains(day) {
                return Err(AppError::invalid_rule(format!(
                    "指定日は1〜31の範囲である必要があります: {day}"
                )));
            }
        }
        Ok(())
    }

    fn is_known_kind(kind: &str) -> bool {
        matches!(
            kind,
            "specific_day"
                | "first_calendar_day"
                | "first_business_day"
                | "last_calendar_day"
                | "last_business_day"
        )
    }
}

impl fmt::Display for DueDateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDateRule::SpecificDay(day) => write!(f, "毎月{day}日"),
            DueDateRule::FirstCalendarDay => write!(f, "月初日"),
            DueDateRule::FirstBusinessDay => write!(f, "第1営業日"),
            DueDateRule::LastCalendarDay => write!(f, "月末日"),
            DueDateRule::LastBusinessDay => write!(f, "最終営業日"),
        }
    }
}

/// 期日計算の基準月
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceMonth {
    year: i32,
    month: u32,
}

impl ReferenceMonth {
    /// 基準月を作成する
    ///
    /// # 戻り値
    /// 基準月、または日付を生成できない年月の場合はInvalidRuleエラー
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(AppError::invalid_rule(format!(
                "日付を生成できない基準月です: {year}-{month:02}"
            )));
        }
        // 翌月初日も計算できる必要がある（月末日の算出に使用）
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        if NaiveDate::from_ymd_opt(next_year, next_month, 1).is_none() {
            return Err(AppError::invalid_rule(format!(
                "日付を生成できない基準月です: {year}-{month:02}"
            )));
        }
        Ok(Self { year, month })
    }

    /// 日付が属する月を基準月とする
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 基準月の初日
    pub fn first_day(&self) -> AppResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| AppError::invalid_rule(format!("{self} の初日を計算できません")))
    }

    /// 基準月の末日（28〜31日）
    pub fn last_day(&self) -> AppResult<NaiveDate> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| AppError::invalid_rule(format!("{self} の末日を計算できません")))
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
