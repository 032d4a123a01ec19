//! Request and response bodies for the backend endpoints that have a fixed
//! shape. Everything else is passed through as `serde_json::Value`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response of `GET /microsoft/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Body of `POST /microsoft/auth/callback`.
#[derive(Debug, Clone, Serialize)]
pub struct CodeExchangeRequest<'a> {
    pub code: &'a str,
}

/// Response of `POST /microsoft/auth/callback`. The backend may or may not
/// issue a bearer credential from this entry point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeExchangeResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Classification bucket assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Urgent,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [Urgency::Urgent, Urgency::High, Urgency::Medium, Urgency::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Urgent => "urgent",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination and filter parameters for email listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

impl EmailQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_wire_format() {
        for urgency in Urgency::ALL {
            let json = serde_json::to_string(&urgency).unwrap();
            assert_eq!(json, format!("\"{}\"", urgency.as_str()));
        }
    }

    #[test]
    fn test_email_query_skips_unset_fields() {
        let query = EmailQuery {
            urgency: Some(Urgency::High),
            ..EmailQuery::page(2, 25)
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({ "page": 2, "per_page": 25, "urgency": "high" }));
    }

    #[test]
    fn test_code_exchange_response_tolerates_missing_fields() {
        let resp: CodeExchangeResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(resp.token.is_none());
        assert!(resp.user.is_none());
    }
}
