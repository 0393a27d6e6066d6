use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AdminKeyError, PublishError};
use crate::post::{PostDraft, PostStatus};
use crate::PostPublishing;

pub const DEFAULT_API_VERSION: &str = "v5.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ghost tokens are only accepted for five minutes.
const TOKEN_LIFETIME_SECS: i64 = 5 * 60;

/// An Admin API key as shown in Ghost's integrations screen: `<id>:<hex secret>`.
#[derive(Clone)]
pub struct AdminApiKey {
    id: String,
    mac: Hmac<Sha256>,
}

impl FromStr for AdminApiKey {
    type Err = AdminKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, secret) = s.trim().split_once(':').ok_or(AdminKeyError::Format)?;
        if id.is_empty() || secret.is_empty() {
            return Err(AdminKeyError::Format);
        }
        let secret = hex::decode(secret).map_err(|_| AdminKeyError::Secret)?;
        let mac = Hmac::<Sha256>::new_from_slice(&secret).map_err(|_| AdminKeyError::Secret)?;

        Ok(Self {
            id: id.to_string(),
            mac,
        })
    }
}

impl std::fmt::Debug for AdminApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminApiKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl AdminApiKey {
    /// Signs a short-lived HS256 JWT for the given audience.
    pub fn token(&self, audience: &str, issued_at: i64) -> String {
        let header = json!({ "alg": "HS256", "typ": "JWT", "kid": self.id });
        let claims = json!({
            "iat": issued_at,
            "exp": issued_at + TOKEN_LIFETIME_SECS,
            "aud": audience,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

/// Where the Admin API lives for a given version.
///
/// Ghost 2-4 serve it under a versioned prefix; 5 and later use a bare
/// `/admin/` prefix and negotiate through `Accept-Version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    version: String,
    legacy: bool,
}

impl ApiVersion {
    pub fn parse(version: &str) -> Self {
        let version = version.trim();
        let short = version.strip_suffix(".0").unwrap_or(version);
        let legacy = matches!(short, "v2" | "v3" | "v4" | "canary");

        Self {
            version: if legacy { short } else { version }.to_string(),
            legacy,
        }
    }

    fn path_prefix(&self) -> String {
        if self.legacy {
            format!("/ghost/api/{}/admin", self.version)
        } else {
            "/ghost/api/admin".to_string()
        }
    }

    fn audience(&self) -> String {
        if self.legacy {
            format!("/{}/admin/", self.version)
        } else {
            "/admin/".to_string()
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPostRequest<'a> {
    posts: [NewPost<'a>; 1],
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    html: &'a str,
    tags: [TagRef<'a>; 1],
    status: PostStatus,
}

#[derive(Debug, Serialize)]
struct TagRef<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    posts: Vec<PublishedPost>,
}

#[derive(Debug, Deserialize)]
struct ErrorsResponse {
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    context: Option<String>,
}

/// The parts of Ghost's created-post representation worth reporting.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

pub struct GhostPublisher {
    client: Client,
    base_url: String,
    key: AdminApiKey,
    version: ApiVersion,
}

impl GhostPublisher {
    pub fn new(
        base_url: &str,
        key: AdminApiKey,
        version: ApiVersion,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            version,
        })
    }

    fn posts_url(&self) -> String {
        format!("{}{}/posts/", self.base_url, self.version.path_prefix())
    }
}

#[async_trait]
impl PostPublishing for GhostPublisher {
    async fn publish(&self, draft: &PostDraft) -> Result<PublishedPost, PublishError> {
        let token = self
            .key
            .token(&self.version.audience(), chrono::Utc::now().timestamp());

        let payload = NewPostRequest {
            posts: [NewPost {
                title: draft.title(),
                html: draft.html(),
                tags: [TagRef { name: draft.tag() }],
                status: draft.status(),
            }],
        };

        let mut request = self
            .client
            .post(self.posts_url())
            .query(&[("source", "html")])
            .header("Authorization", format!("Ghost {}", token))
            .json(&payload);
        if !self.version.legacy {
            request = request.header("Accept-Version", &self.version.version);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let created: PostsResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;
        created
            .posts
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::InvalidResponse("response contained no posts".into()))
    }
}

fn api_error(status: StatusCode, body: &str) -> PublishError {
    let message = serde_json::from_str::<ErrorsResponse>(body)
        .ok()
        .and_then(|payload| payload.errors.into_iter().next())
        .map(|detail| match detail.context {
            Some(context) => format!("{} ({})", detail.message, context),
            None => detail.message,
        })
        .unwrap_or_else(|| body.trim().to_string());

    PublishError::Api {
        status: status.as_u16(),
        message,
    }
}
