//! Request and response bodies of the template registry

use crate::command::FactMap;
use crate::Template;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Body of `POST /templates/search`
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub command: &'a str,

    /// Trailing arguments joined with spaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_facts: Option<&'a FactMap>,
}

/// Response of `POST /templates/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub templates: Option<Vec<TemplateRecord>>,
}

/// One ranked search result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateRecord {
    /// The template document itself
    #[serde(default)]
    pub json: Option<Template>,

    /// Remaining server-side fields (id, name, tags, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /templates`
#[derive(Debug, Clone, Serialize)]
pub struct PostTemplateRequest<'a> {
    pub command: &'a str,
    pub name: &'a str,
    pub json: Option<&'a Template>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_facts: Option<&'a FactMap>,
}

/// Body of `POST /auth/login` and `POST /auth/resend`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Body of `POST /auth/reset`
#[derive(Debug, Clone, Serialize)]
pub struct ResetRequest<'a> {
    pub email: &'a str,
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Expiry in milliseconds since the epoch, sent as a number or a numeric string
    #[serde(default, deserialize_with = "millis_from_number_or_string")]
    pub expiration_time: Option<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn millis_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(i64),
        Text(String),
    }

    match Option::<Millis>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Millis::Number(ms)) => Ok(Some(ms)),
        Some(Millis::Text(text)) => text.trim().parse().map(Some).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&text), &"milliseconds since the epoch")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_omits_empty_fields() {
        let body = SearchRequest {
            command: "ls",
            command_args: None,
            command_facts: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"command": "ls"}));
    }

    #[test]
    fn test_search_response_first_template() {
        let body = json!({
            "templates": [
                {"id": 7, "name": "ls", "json": {"parser": "ls-la"}},
                {"id": 8, "json": {"parser": "other"}}
            ]
        });
        let resp: SearchResponse = serde_json::from_value(body).unwrap();
        let templates = resp.templates.unwrap();
        assert_eq!(templates[0].json, Some(json!({"parser": "ls-la"})));
        assert_eq!(templates[0].extra.get("id"), Some(&json!(7)));
    }

    #[test]
    fn test_login_response_camel_case() {
        let resp: LoginResponse = serde_json::from_value(json!({
            "token": "abc",
            "refreshToken": "def",
            "expirationTime": 1700000000000i64
        }))
        .unwrap();
        assert_eq!(resp.refresh_token.as_deref(), Some("def"));
        assert_eq!(resp.expiration_time, Some(1_700_000_000_000));
    }

    #[test]
    fn test_login_response_expiration_as_string() {
        let resp: LoginResponse = serde_json::from_value(json!({
            "token": "abc",
            "refreshToken": "def",
            "expirationTime": "1700000000000"
        }))
        .unwrap();
        assert_eq!(resp.expiration_time, Some(1_700_000_000_000));

        let resp: LoginResponse = serde_json::from_value(json!({"expirationTime": null})).unwrap();
        assert_eq!(resp.expiration_time, None);

        let bad = serde_json::from_value::<LoginResponse>(json!({"expirationTime": "soon"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_register_request_field_names() {
        let body = RegisterRequest {
            email: "a@b.c",
            password: "pw",
            first_name: "Ada",
            last_name: "Lovelace",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["firstName"], json!("Ada"));
        assert_eq!(value["lastName"], json!("Lovelace"));
    }
}
