use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::approval::AuditStamp;
use crate::utils::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Json,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "STRING",
            SettingType::Number => "NUMBER",
            SettingType::Boolean => "BOOLEAN",
            SettingType::Json => "JSON",
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(SettingType::String),
            "NUMBER" => Ok(SettingType::Number),
            "BOOLEAN" => Ok(SettingType::Boolean),
            "JSON" => Ok(SettingType::Json),
            other => Err(AppError::validation(format!("unknown setting type: {other}"))),
        }
    }
}

/// A key/value setting owned by one tenant. Keys are unique per tenant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Setting {
    pub id: Uuid,
    pub tenant_id: String,
    pub key: String,
    pub value: Option<String>,
    pub setting_type: SettingType,
    pub description: Option<String>,
    pub category: Option<String>,
    pub editable: bool,
    pub audit: AuditStamp,
}

impl Setting {
    pub fn new(
        tenant_id: impl Into<String>,
        key: impl Into<String>,
        value: Option<String>,
        setting_type: SettingType,
        created_by: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Setting {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            key: key.into(),
            value,
            setting_type,
            description: None,
            category: None,
            editable: true,
            audit: AuditStamp::created(Some(created_by), at),
        }
    }

    pub fn with_details(mut self, description: &str, category: &str) -> Self {
        self.description = Some(description.to_string());
        self.category = Some(category.to_string());
        self
    }

    pub fn set_value(&mut self, value: Option<String>, by: &str, at: DateTime<Utc>) {
        self.value = value;
        self.audit.touch(by, at);
    }
}

/// `"true"` in any case is true, any other stored text is false; no value
/// falls back to `default`.
pub fn bool_or(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => v.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}

/// Unparseable or missing values fall back to `default`.
pub fn int_or(value: Option<&str>, default: i64) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Defaults seeded for a tenant that has no settings yet.
pub fn default_settings(tenant_id: &str, created_by: &str, at: DateTime<Utc>) -> Vec<Setting> {
    const DEFAULTS: &[(&str, &str, SettingType, &str, &str)] = &[
        ("company.name", "Your Company Name", SettingType::String, "Company name", "GENERAL"),
        ("company.website", "https://example.com", SettingType::String, "Company website", "GENERAL"),
        ("company.email", "info@example.com", SettingType::String, "Company email", "GENERAL"),
        ("email.smtp.host", "smtp.gmail.com", SettingType::String, "SMTP host", "EMAIL"),
        ("email.smtp.port", "587", SettingType::Number, "SMTP port", "EMAIL"),
        ("email.smtp.ssl", "true", SettingType::Boolean, "Use SSL", "EMAIL"),
        ("notifications.email.enabled", "true", SettingType::Boolean, "Enable email notifications", "NOTIFICATIONS"),
        ("notifications.sms.enabled", "false", SettingType::Boolean, "Enable SMS notifications", "NOTIFICATIONS"),
        ("notifications.push.enabled", "true", SettingType::Boolean, "Enable push notifications", "NOTIFICATIONS"),
        ("security.password.minLength", "8", SettingType::Number, "Minimum password length", "SECURITY"),
        ("security.session.timeout", "3600", SettingType::Number, "Session timeout in seconds", "SECURITY"),
        ("security.mfa.enabled", "false", SettingType::Boolean, "Enable multi-factor authentication", "SECURITY"),
    ];

    DEFAULTS
        .iter()
        .map(|(key, value, setting_type, description, category)| {
            Setting::new(tenant_id, *key, Some(value.to_string()), *setting_type, created_by, at)
                .with_details(description, category)
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSettingRequest {
    pub key: String,
    pub value: Option<String>,
    pub setting_type: Option<SettingType>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub editable: Option<bool>,
}

impl CreateSettingRequest {
    pub fn into_setting(self, tenant_id: &str, created_by: &str, at: DateTime<Utc>) -> Result<Setting, AppError> {
        let key = non_blank(&self.key)
            .ok_or_else(|| AppError::validation("setting key must not be empty"))?
            .to_string();
        let mut setting = Setting::new(
            tenant_id,
            key,
            self.value,
            self.setting_type.unwrap_or(SettingType::String),
            created_by,
            at,
        );
        setting.description = self.description;
        setting.category = self.category.as_deref().and_then(non_blank).map(str::to_string);
        setting.editable = self.editable.unwrap_or(true);
        Ok(setting)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSettingRequest {
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SettingsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SettingDefaultQuery {
    /// Returned when the key is missing or its value is unusable
    pub default: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingValue {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BooleanSettingValue {
    pub key: String,
    pub value: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntegerSettingValue {
    pub key: String,
    pub value: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitializedSettings {
    pub created: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_readers_fall_back_to_default() {
        assert!(bool_or(Some("TRUE"), false));
        assert!(!bool_or(Some("yes"), true));
        assert!(bool_or(None, true));

        assert_eq!(int_or(Some(" 587 "), 0), 587);
        assert_eq!(int_or(Some("lots"), 25), 25);
        assert_eq!(int_or(None, -1), -1);
    }

    #[test]
    fn defaults_cover_each_category() {
        let settings = default_settings("acme", "system", Utc::now());
        assert_eq!(settings.len(), 12);
        for category in ["GENERAL", "EMAIL", "NOTIFICATIONS", "SECURITY"] {
            assert!(settings.iter().any(|s| s.category.as_deref() == Some(category)));
        }
        assert!(settings.iter().all(|s| s.editable && s.tenant_id == "acme"));
    }

    #[test]
    fn create_request_requires_key() {
        let request = CreateSettingRequest {
            key: "  ".to_string(),
            value: None,
            setting_type: None,
            description: None,
            category: None,
            editable: None,
        };
        assert!(matches!(
            request.into_setting("acme", "admin@acme.test", Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn setting_type_parse_rejects_unknown() {
        assert_eq!("BOOLEAN".parse::<SettingType>().unwrap(), SettingType::Boolean);
        assert!(matches!("bool".parse::<SettingType>(), Err(AppError::Validation(_))));
    }
}
