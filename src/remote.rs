//! Client side of the remote entry API.
//!
//! `POST /entries` creates, `PATCH /entries/{id}` updates, `DELETE
//! /entries/{id}` removes and `GET /entries` lists. A bearer token is sent
//! when one is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Deserializer, Serialize};

use crate::entry::DiaryEntry;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Invalid remote base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Remote answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Acknowledgement of a successful push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushAck {
    /// Identifier the remote assigned or echoed, if it sent one.
    pub remote_id: Option<String>,
}

/// Entry shape returned by the remote. Only the identifier is required by
/// the sync path; the rest is echoed content.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteRecord {
    #[serde(default, deserialize_with = "loose_id")]
    id: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "loose_id")]
    object_id: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl RemoteRecord {
    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_id.as_deref())
    }

    /// Text body, whichever field name the server used.
    pub fn text(&self) -> Option<&str> {
        self.notes.as_deref().or(self.content.as_deref())
    }
}

/// Accepts `"abc"`, `42` or `{"$oid": "abc"}`; anything else is treated as absent.
fn loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(map) => map
            .get("$oid")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
struct EntryPayload<'a> {
    notes: &'a str,
    content: &'a str,
    mood: &'a str,
    intensity: u8,
    date: String,
}

impl<'a> From<&'a DiaryEntry> for EntryPayload<'a> {
    fn from(entry: &'a DiaryEntry) -> Self {
        EntryPayload {
            notes: &entry.notes,
            content: &entry.notes,
            mood: entry.mood.as_str(),
            intensity: entry.intensity,
            date: entry.date.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// The transport the sync path pushes through.
#[async_trait]
pub trait RemoteEntries: Send + Sync {
    /// Create the entry remotely, or patch it when `remote_id` is known.
    async fn push(&self, entry: &DiaryEntry) -> Result<PushAck, RemoteError>;

    async fn delete(&self, remote_id: &str) -> Result<(), RemoteError>;

    async fn list(&self) -> Result<Vec<RemoteRecord>, RemoteError>;

    /// Cheap reachability check: the server answered at all.
    async fn probe(&self) -> bool {
        true
    }
}

pub struct HttpRemote {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let invalid = |reason: String| RemoteError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("cannot be a base URL".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpRemote {
            client,
            base_url: parsed,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn create(&self, entry: &DiaryEntry) -> Result<PushAck, RemoteError> {
        let response = self
            .request(Method::POST, self.url(&["entries"]))
            .json(&EntryPayload::from(entry))
            .send()
            .await?;
        let record: RemoteRecord = parse_body(ensure_success(response).await?).await?;
        let remote_id = record.identifier().ok_or_else(|| {
            RemoteError::MalformedResponse("create response carries no id".to_string())
        })?;
        Ok(PushAck {
            remote_id: Some(remote_id.to_string()),
        })
    }

    async fn update(&self, remote_id: &str, entry: &DiaryEntry) -> Result<PushAck, RemoteError> {
        let response = self
            .request(Method::PATCH, self.url(&["entries", remote_id]))
            .json(&EntryPayload::from(entry))
            .send()
            .await?;
        let text = ensure_success(response).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(PushAck::default());
        }
        let record: RemoteRecord = serde_json::from_str(&text)
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
        Ok(PushAck {
            remote_id: record.identifier().map(str::to_string),
        })
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn parse_body<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, RemoteError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl RemoteEntries for HttpRemote {
    async fn push(&self, entry: &DiaryEntry) -> Result<PushAck, RemoteError> {
        match entry.remote_id.as_deref() {
            Some(remote_id) => self.update(remote_id, entry).await,
            None => self.create(entry).await,
        }
    }

    async fn delete(&self, remote_id: &str) -> Result<(), RemoteError> {
        let response = self
            .request(Method::DELETE, self.url(&["entries", remote_id]))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RemoteRecord>, RemoteError> {
        let response = self
            .request(Method::GET, self.url(&["entries"]))
            .send()
            .await?;
        parse_body(ensure_success(response).await?).await
    }

    /// Any HTTP answer counts as reachable: a base URL with a path prefix
    /// may well 404 at its root while the entry routes work.
    async fn probe(&self) -> bool {
        match self.request(Method::GET, self.base_url.clone()).send().await {
            Ok(response) => {
                tracing::trace!(status = %response.status(), "Remote probe answered");
                true
            }
            Err(e) => {
                tracing::trace!(error = %e, "Remote probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodLabel;

    #[test]
    fn accepts_either_identifier_field() {
        let a: RemoteRecord = serde_json::from_str(r#"{"id": "r1"}"#).unwrap();
        assert_eq!(a.identifier(), Some("r1"));
        let b: RemoteRecord = serde_json::from_str(r#"{"_id": "64ab", "content": "x"}"#).unwrap();
        assert_eq!(b.identifier(), Some("64ab"));
        assert_eq!(b.text(), Some("x"));
        let c: RemoteRecord = serde_json::from_str(r#"{"id": 17}"#).unwrap();
        assert_eq!(c.identifier(), Some("17"));
        let d: RemoteRecord = serde_json::from_str(r#"{"_id": {"$oid": "ff01"}}"#).unwrap();
        assert_eq!(d.identifier(), Some("ff01"));
    }

    #[test]
    fn missing_identifier_is_none() {
        let r: RemoteRecord = serde_json::from_str(r#"{"mood": "Happy", "id": null}"#).unwrap();
        assert_eq!(r.identifier(), None);
    }

    #[test]
    fn payload_mirrors_notes_into_content() {
        let entry = DiaryEntry::new("hello".into(), MoodLabel::Excited, None);
        let json = serde_json::to_value(EntryPayload::from(&entry)).unwrap();
        assert_eq!(json["notes"], "hello");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["mood"], "Excited");
        assert!(json["date"].as_str().unwrap().starts_with(&entry.date.format("%Y-%m-%d").to_string()));
    }

    #[test]
    fn builds_entry_urls() {
        let remote = HttpRemote::new("http://localhost:3001/api/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(remote.url(&["entries"]).as_str(), "http://localhost:3001/api/entries");
        assert_eq!(
            remote.url(&["entries", "a b"]).as_str(),
            "http://localhost:3001/api/entries/a%20b"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = HttpRemote::new("not a url", None, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, RemoteError::InvalidBaseUrl { .. }));
    }
}
