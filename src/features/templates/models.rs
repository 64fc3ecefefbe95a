use crate::features::due_dates::{DueDateRule, ReferenceMonth};
use crate::shared::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 請求周期の単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    /// 毎月
    Monthly,
    /// 毎年（請求月を指定）
    Annual,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Monthly => "monthly",
            IntervalUnit::Annual => "annual",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "monthly" => Ok(IntervalUnit::Monthly),
            "annual" => Ok(IntervalUnit::Annual),
            other => Err(AppError::validation(format!("不明な請求周期です: {other}"))),
        }
    }
}

/// テンプレートのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    /// 有効（生成対象）
    Active,
    /// 一時停止中（理由が必須）
    Paused,
    /// 解約済み（終端状態）
    Cancelled,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Paused => "paused",
            TemplateStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "active" => Ok(TemplateStatus::Active),
            "paused" => Ok(TemplateStatus::Paused),
            "cancelled" => Ok(TemplateStatus::Cancelled),
            other => Err(AppError::validation(format!("不明なテンプレート状態です: {other}"))),
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 定期請求テンプレート
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecurringTemplate {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub amount: f64,
    pub interval_unit: IntervalUnit,
    /// 年次テンプレートの請求月（1〜12）
    pub billing_month: Option<u32>,
    pub due_date_rule: DueDateRule,
    pub start_date: Option<NaiveDate>,
    pub status: TemplateStatus,
    /// 一時停止中のみ設定される
    pub pause_reason: Option<String>,
    /// 最後に生成された書類（非所有の参照）
    pub last_generated_document_id: Option<i64>,
    /// 外部の通知処理が参照する自動送信フラグ
    pub auto_send: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RecurringTemplate {
    /// 基準日に対応する基準月を取得する
    ///
    /// 毎月のテンプレートは基準日の月、年次のテンプレートは基準日の年の請求月となる。
    pub fn reference_month(&self, as_of: NaiveDate) -> AppResult<ReferenceMonth> {
        match self.interval_unit {
            IntervalUnit::Monthly => Ok(ReferenceMonth::from_date(as_of)),
            IntervalUnit::Annual => {
                let month = self.billing_month.ok_or_else(|| {
                    AppError::validation(format!(
                        "年次テンプレート {} に請求月が設定されていません",
                        self.id
                    ))
                })?;
                ReferenceMonth::new(as_of.year(), month)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TemplateStatus::Active
    }
}

/// テンプレート作成用DTO
#[derive(Debug, Deserialize, Clone)]
pub struct CreateTemplateDto {
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub amount: f64,
    pub interval_unit: IntervalUnit,
    pub billing_month: Option<u32>,
    pub due_date_rule: DueDateRule,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub auto_send: bool,
}

impl CreateTemplateDto {
    /// 毎月請求のテンプレート作成DTOを組み立てる
    pub fn monthly(user_id: i64, name: &str, amount: f64, due_date_rule: DueDateRule) -> Self {
        Self {
            user_id,
            name: name.to_string(),
            description: None,
            amount,
            interval_unit: IntervalUnit::Monthly,
            billing_month: None,
            due_date_rule,
            start_date: None,
            auto_send: false,
        }
    }

    /// 作成DTOを検証する
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("テンプレート名は必須です"));
        }

        if self.name.chars().count() > 100 {
            return Err(AppError::validation(
                "テンプレート名は100文字以内で入力してください",
            ));
        }

        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppError::validation("金額は0以上の数値である必要があります"));
        }

        self.due_date_rule.validate()?;

        match (self.interval_unit, self.billing_month) {
            (IntervalUnit::Monthly, Some(_)) => Err(AppError::validation(
                "毎月のテンプレートに請求月は指定できません",
            )),
            (IntervalUnit::Annual, None) => {
                Err(AppError::validation("年次テンプレートには請求月が必要です"))
            }
            (IntervalUnit::Annual, Some(month)) if !(1..=12).contains(&month) => Err(
                AppError::validation(format!("請求月は1〜12の範囲である必要があります: {month}")),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_create_dto() {
        let dto = CreateTemplateDto::monthly(1, "家賃", 80000.0, DueDateRule::SpecificDay(27));
        assert!(dto.validate().is_ok());

        let mut blank = dto.clone();
        blank.name = "  ".to_string();
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let mut negative = dto.clone();
        negative.amount = -1.0;
        assert!(matches!(negative.validate(), Err(AppError::Validation(_))));

        let mut bad_rule = dto.clone();
        bad_rule.due_date_rule = DueDateRule::SpecificDay(45);
        assert!(matches!(bad_rule.validate(), Err(AppError::InvalidRule(_))));

        let mut annual = dto;
        annual.interval_unit = IntervalUnit::Annual;
        assert!(annual.validate().is_err());
        annual.billing_month = Some(13);
        assert!(annual.validate().is_err());
        annual.billing_month = Some(3);
        assert!(annual.validate().is_ok());
    }

    #[test]
    fn test_status_parse() {
        for status in [
            TemplateStatus::Active,
            TemplateStatus::Paused,
            TemplateStatus::Cancelled,
        ] {
            assert_eq!(TemplateStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TemplateStatus::parse("archived").is_err());
        assert!(IntervalUnit::parse("weekly").is_err());
    }

    #[test]
    fn test_reference_month_for_annual_template() {
        let template = RecurringTemplate {
            id: 1,
            user_id: 1,
            name: "年会費".to_string(),
            description: None,
            amount: 12000.0,
            interval_unit: IntervalUnit::Annual,
            billing_month: Some(3),
            due_date_rule: DueDateRule::FirstBusinessDay,
            start_date: None,
            status: TemplateStatus::Active,
            pause_reason: None,
            last_generated_document_id: None,
            auto_send: false,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let month = template.reference_month(ymd(2026, 10, 18)).unwrap();
        assert_eq!((month.year(), month.month()), (2026, 3));

        let monthly = RecurringTemplate {
            interval_unit: IntervalUnit::Monthly,
            billing_month: None,
            ..template
        };
        let month = monthly.reference_month(ymd(2026, 10, 18)).unwrap();
        assert_eq!((month.year(), month.month()), (2026, 10));
    }
}
