use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}

/// Article labels, normalized when they are built: split on `,`, trimmed,
/// empty labels dropped.
///
/// On the wire this is the comma-joined string; arrays are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn parse(raw: &str) -> Self {
        Self::from_labels(raw.split(','))
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            labels
                .into_iter()
                .map(|label| label.as_ref().trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
        )
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for Tags {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTags {
            Joined(String),
            List(Vec<String>),
            Missing(()),
        }

        Ok(match RawTags::deserialize(deserializer)? {
            RawTags::Joined(raw) => Tags::parse(&raw),
            RawTags::List(labels) => Tags::from_labels(labels),
            RawTags::Missing(()) => Tags::default(),
        })
    }
}

/// Partial article update; absent fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Opaque query-parameter bag forwarded verbatim to listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    params: Vec<(String, String)>,
}

impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        self.params.retain(|(k, _)| *k != key);
        self.params.push((key, value.to_string()));
        self
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page)
    }

    pub fn page_size(self, page_size: u32) -> Self {
        self.param("pageSize", page_size)
    }

    pub fn tag(self, tag: &str) -> Self {
        self.param("tag", tag.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<(String, String)> {
        self.params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub wx_open_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }
}

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Federated (WeChat) login payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WxLoginRequest {
    pub code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub open_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nickname: String,
}

#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Option<User>,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.nickname.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_are_trimmed_on_parse() {
        let tags = Tags::parse(" rust, async ,, web ,");
        assert_eq!(tags.labels(), &["rust", "async", "web"]);
        assert!(tags.contains(" async"));
        assert_eq!(tags.to_string(), "rust,async,web");
        assert!(Tags::parse("  ,  ").is_empty());
    }

    #[test]
    fn test_article_accepts_both_tag_encodings() {
        let joined: Article = serde_json::from_value(json!({
            "id": 1,
            "title": "Ownership",
            "tags": "rust, memory",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(joined.tags.labels(), &["rust", "memory"]);
        assert!(joined.created_at.is_some());
        assert!(!joined.has_summary());

        let listed: Article = serde_json::from_value(json!({
            "id": 2,
            "title": "Lifetimes",
            "tags": ["rust ", "", "borrowck"]
        }))
        .unwrap();
        assert_eq!(listed.tags.labels(), &["rust", "borrowck"]);

        let missing: Article = serde_json::from_value(json!({
            "id": 3,
            "title": "No tags",
            "tags": null
        }))
        .unwrap();
        assert!(missing.tags.is_empty());
    }

    #[test]
    fn test_article_update_skips_absent_fields() {
        let update = ArticleUpdate {
            title: Some("New title".to_string()),
            tags: Some(Tags::parse("a, b")),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "title": "New title", "tags": "a,b" })
        );
    }

    #[test]
    fn test_query_replaces_repeated_keys() {
        let query = ArticleQuery::new().page(1).tag(" rust ").page(2).page_size(20);
        assert_eq!(
            query.into_params(),
            vec![
                ("tag".to_string(), "rust".to_string()),
                ("page".to_string(), "2".to_string()),
                ("pageSize".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_credentials_are_redacted() {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", request);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut user: User = serde_json::from_value(json!({ "id": 7, "username": "alice" })).unwrap();
        assert_eq!(user.display_name(), "alice");
        user.nickname = "Al".to_string();
        assert_eq!(user.display_name(), "Al");
    }
}
