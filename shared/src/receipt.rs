//! `POST /analyze-receipt` 的识别结果

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qty: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

impl Receipt {
    /// 明细行价格之和；没有明细（或全为 0）时为 None
    pub fn items_total(&self) -> Option<f64> {
        let sum: f64 = self.items.iter().filter_map(|i| i.price).sum();
        (sum != 0.0).then_some(sum)
    }

    /// 后端未给出 subtotal 时退回到明细之和
    pub fn effective_subtotal(&self) -> Option<f64> {
        self.subtotal.or_else(|| self.items_total())
    }

    /// total > subtotal + tax > 明细之和
    pub fn effective_total(&self) -> Option<f64> {
        if self.total.is_some() {
            return self.total;
        }
        match (self.effective_subtotal(), self.tax) {
            (Some(subtotal), Some(tax)) => Some(subtotal + tax),
            _ => self.items_total(),
        }
    }

    pub fn currency_prefix(&self) -> &str {
        currency_prefix(self.currency.as_deref())
    }

    /// 带货币前缀的金额，缺失时为 "—"
    pub fn format_money(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{}{:.2}", self.currency_prefix(), v),
            None => "—".to_string(),
        }
    }
}

/// 货币代码到显示前缀；后端已经给出符号时原样使用
pub fn currency_prefix(code_or_symbol: Option<&str>) -> &str {
    let Some(raw) = code_or_symbol else {
        return "";
    };
    match raw.to_ascii_uppercase().as_str() {
        "SGD" => "S$",
        "USD" => "$",
        "MYR" => "RM",
        "EUR" => "€",
        "GBP" => "£",
        _ if matches!(raw, "$" | "€" | "£") => raw,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f64) -> ReceiptItem {
        ReceiptItem {
            name: "x".into(),
            qty: Some(1.0),
            unit_price: Some(price),
            price: Some(price),
        }
    }

    #[test]
    fn test_totals_prefer_backend_values() {
        let receipt = Receipt {
            items: vec![item(2.0), item(3.0)],
            subtotal: Some(4.5),
            tax: Some(0.5),
            total: Some(5.25),
            ..Default::default()
        };
        assert_eq!(receipt.effective_subtotal(), Some(4.5));
        assert_eq!(receipt.effective_total(), Some(5.25));
    }

    #[test]
    fn test_totals_fall_back_to_items() {
        let receipt = Receipt {
            items: vec![item(2.0), item(3.0)],
            tax: Some(0.5),
            ..Default::default()
        };
        assert_eq!(receipt.effective_subtotal(), Some(5.0));
        assert_eq!(receipt.effective_total(), Some(5.5));

        let no_tax = Receipt {
            items: vec![item(2.0)],
            ..Default::default()
        };
        assert_eq!(no_tax.effective_total(), Some(2.0));
        assert_eq!(Receipt::default().effective_total(), None);
    }

    #[test]
    fn test_currency_prefix() {
        assert_eq!(currency_prefix(Some("sgd")), "S$");
        assert_eq!(currency_prefix(Some("MYR")), "RM");
        assert_eq!(currency_prefix(Some("€")), "€");
        assert_eq!(currency_prefix(Some("JPY")), "");
        assert_eq!(currency_prefix(None), "");
    }

    #[test]
    fn test_format_money() {
        let receipt = Receipt {
            currency: Some("USD".into()),
            ..Default::default()
        };
        assert_eq!(receipt.format_money(Some(12.5)), "$12.50");
        assert_eq!(receipt.format_money(None), "—");
    }
}
