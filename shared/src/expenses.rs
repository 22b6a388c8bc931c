//! `GET /expenses-summary` 响应模型

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 低于该置信度的分类需要人工复核
pub const REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// "YYYY-MM"
    pub ym: String,
    #[serde(default)]
    pub total: f64,
}

impl MonthlyTotal {
    pub fn month(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&format!("{}-01", self.ym), "%Y-%m-%d").ok()
    }

    /// 图表横轴标签："MM"，无法解析时原样返回
    pub fn label(&self) -> String {
        self.month()
            .map(|d| format!("{:02}", d.month()))
            .unwrap_or_else(|| self.ym.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub total: f64,
}

impl CategoryTotal {
    pub fn name(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("Uncategorized")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub category_confidence: Option<f64>,
}

impl Transaction {
    pub fn needs_review(&self) -> bool {
        self.category_confidence
            .is_none_or(|c| c < REVIEW_CONFIDENCE_THRESHOLD)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDeltas {
    #[serde(default)]
    pub month_delta_pct: Option<f64>,
    #[serde(default)]
    pub week_delta_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryBody {
    pub total_all_time: f64,
    pub total_this_month: f64,
    pub total_this_week: Option<f64>,
    pub periods: Option<PeriodDeltas>,
    pub monthly: Vec<MonthlyTotal>,
    pub breakdown_by_category: Vec<CategoryTotal>,
    pub recent_transactions: Vec<Transaction>,
    pub needs_review_count: u32,
}

impl SummaryBody {
    pub fn top_category(&self) -> Option<&CategoryTotal> {
        self.breakdown_by_category.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensesSummary {
    /// 后端在业务失败时返回 `ok: false` + `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub summary: SummaryBody,
}

/// 百分比变化描述，例如 "↑ 12.5% from last month"
pub fn format_delta(pct: Option<f64>, period: &str) -> String {
    match pct {
        None => "—".to_string(),
        Some(p) => {
            let arrow = if p >= 0.0 { "↑" } else { "↓" };
            format!("{} {:.1}% from last {}", arrow, p.abs(), period)
        }
    }
}
