use serde::{Deserialize, Serialize};

pub mod expenses;
pub mod protocol;
pub mod receipt;

pub use expenses::{CategoryTotal, ExpensesSummary, MonthlyTotal, SummaryBody, Transaction};
pub use receipt::{Receipt, ReceiptItem};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_USER_EMAIL: &str = "X-User-Email";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// `GET /me/preferences` 中的个人资料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// "First Last"，两者都为空时为 None
    pub fn full_name(&self) -> Option<String> {
        let name = [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayPrefs {
    pub timezone: String,
    pub currency: String,
    pub locale: String,
    pub theme: String,
    pub number_format: String,
    pub date_format: String,
}

impl Default for DisplayPrefs {
    fn default() -> Self {
        Self {
            timezone: "Asia/Singapore".to_string(),
            currency: "SGD".to_string(),
            locale: "en-SG".to_string(),
            theme: "system".to_string(),
            number_format: "1,234.56".to_string(),
            date_format: "YYYY-MM-DD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPrefs {
    pub processing: bool,
    pub failed: bool,
    pub digest: String,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            processing: true,
            failed: true,
            digest: "instant".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseConfig {
    pub auto_categorize: bool,
    pub confidence_threshold: f64,
    pub default_category: String,
    pub rules: Vec<serde_json::Value>,
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self {
            auto_categorize: true,
            confidence_threshold: 0.7,
            default_category: "Uncategorized".to_string(),
            rules: Vec::new(),
        }
    }
}

/// `GET /me/preferences` 响应；缺失的部分使用默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub prefs: DisplayPrefs,
    #[serde(default)]
    pub notifications: NotificationPrefs,
    #[serde(rename = "expenseCfg", default)]
    pub expense_cfg: ExpenseConfig,
}

/// `PUT /me/profile` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
}

/// `POST /me/profile/avatar-url` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploadRequest {
    pub file_name: String,
    pub content_type: String,
}

/// 预签名上传地址
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploadTarget {
    pub upload_url: String,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_fill_missing_sections() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"profile":{"firstName":"Ada","email":"ada@example.com","email_verified":true}}"#)
                .unwrap();
        assert_eq!(prefs.profile.first_name, "Ada");
        assert!(prefs.profile.email_verified);
        assert_eq!(prefs.prefs.currency, "SGD");
        assert_eq!(prefs.notifications.digest, "instant");
        assert_eq!(prefs.expense_cfg.confidence_threshold, 0.7);
    }

    #[test]
    fn test_full_name() {
        let mut profile = Profile::default();
        assert_eq!(profile.full_name(), None);

        profile.last_name = " Lovelace ".to_string();
        assert_eq!(profile.full_name().as_deref(), Some("Lovelace"));

        profile.first_name = "Ada".to_string();
        assert_eq!(profile.full_name().as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_profile_update_wire_names() {
        let body = serde_json::to_value(ProfileUpdate {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            avatar_url: String::new(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "firstName": "Ada", "lastName": "Lovelace", "avatarUrl": "" })
        );
    }
}
