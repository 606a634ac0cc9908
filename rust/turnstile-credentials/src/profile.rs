//! Best-effort profile enrichment from the identity provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{Profile, ProfileEnrichmentError};

/// Total attempts per lookup: the first request plus one retry.
const MAX_ATTEMPTS: usize = 2;

/// A source of profile fields for a bearer token.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Look up the profile of the caller holding `token`.
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProfileEnrichmentError>;
}

/// Fetches profiles from an OIDC userinfo endpoint.
///
/// Each request is bounded by the configured timeout. Transport failures
/// and server errors are retried once; client errors are not.
#[derive(Debug, Clone)]
pub struct HttpProfileSource {
    client: Client,
    endpoint: Url,
}

impl HttpProfileSource {
    /// Create a source for `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, endpoint }
    }

    /// Get the endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, token: &str) -> Result<Profile, ProfileEnrichmentError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileEnrichmentError::Status(status.as_u16()));
        }

        Ok(response.json::<Profile>().await?)
    }
}

#[async_trait]
impl ProfileSource for HttpProfileSource {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ProfileEnrichmentError> {
        let mut attempt = 1;
        loop {
            match self.request(token).await {
                Err(error) if attempt < MAX_ATTEMPTS && is_transient(&error) => {
                    debug!(%error, attempt, "Retrying profile request");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn is_transient(error: &ProfileEnrichmentError) -> bool {
    match error {
        ProfileEnrichmentError::Request(_) => true,
        ProfileEnrichmentError::Status(status) => *status >= 500,
        ProfileEnrichmentError::Decode(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        routing::get,
    };
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use testresult::TestResult;

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{addr}/userinfo")).unwrap()
    }

    fn source(endpoint: Url) -> HttpProfileSource {
        HttpProfileSource::new(endpoint, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn it_fetches_the_profile_with_the_bearer_token() -> TestResult {
        async fn userinfo(headers: HeaderMap) -> (StatusCode, Json<serde_json::Value>) {
            let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            match authorization {
                Some("Bearer token-1") => (
                    StatusCode::OK,
                    Json(json!({
                        "sub": "auth0|1", "email": "ada@example.com", "name": "Ada",
                    })),
                ),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
            }
        }

        let endpoint = serve(Router::new().route("/userinfo", get(userinfo))).await;
        let profile = source(endpoint).fetch_profile("token-1").await?;

        assert_eq!(
            profile,
            Profile {
                email: Some("ada@example.com".into()),
                name: Some("Ada".into()),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_retries_server_errors_once() -> TestResult {
        async fn flaky(
            State(calls): State<Arc<AtomicUsize>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
            } else {
                (StatusCode::OK, Json(json!({ "name": "Ada" })))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/userinfo", get(flaky))
            .with_state(calls.clone());
        let profile = source(serve(app).await).fetch_profile("token").await?;

        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.email, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn it_gives_up_after_one_retry() {
        async fn broken(State(calls): State<Arc<AtomicUsize>>) -> StatusCode {
            calls.fetch_add(1, Ordering::SeqCst);
            StatusCode::BAD_GATEWAY
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/userinfo", get(broken))
            .with_state(calls.clone());
        let result = source(serve(app).await).fetch_profile("token").await;

        assert_eq!(result, Err(ProfileEnrichmentError::Status(502)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn it_does_not_retry_rejected_tokens() {
        async fn reject(State(calls): State<Arc<AtomicUsize>>) -> StatusCode {
            calls.fetch_add(1, Ordering::SeqCst);
            StatusCode::UNAUTHORIZED
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/userinfo", get(reject))
            .with_state(calls.clone());
        let result = source(serve(app).await).fetch_profile("token").await;

        assert_eq!(result, Err(ProfileEnrichmentError::Status(401)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn it_reports_undecodable_profiles() {
        let app = Router::new().route("/userinfo", get(|| async { "not json" }));
        let result = source(serve(app).await).fetch_profile("token").await;
        assert!(matches!(result, Err(ProfileEnrichmentError::Decode(_))));
    }

    #[tokio::test]
    async fn it_times_out_slow_endpoints() {
        async fn slow() -> Json<serde_json::Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "name": "Ada" }))
        }

        let endpoint = serve(Router::new().route("/userinfo", get(slow))).await;
        let source = HttpProfileSource::new(endpoint, Duration::from_millis(50));
        let result = source.fetch_profile("token").await;
        assert!(matches!(result, Err(ProfileEnrichmentError::Request(_))));
    }

    #[tokio::test]
    async fn it_reports_unreachable_endpoints() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/userinfo")).unwrap();
        let result = source(endpoint).fetch_profile("token").await;
        assert!(matches!(result, Err(ProfileEnrichmentError::Request(_))));
    }
}
