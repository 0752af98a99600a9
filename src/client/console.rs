//! Spot console API client
//!
//! Handles the two authenticated endpoints the core needs: the sign-in
//! exchange (email/password for an access token) and the batched market
//! score query.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, Result};

/// Spot console base URL
const CONSOLE_BASE_URL: &str = "https://console.spotinst.com";

const SIGN_IN_PATH: &str = "/api/auth/signIn";
const MARKET_SCORE_PATH: &str = "/api/aws/ec2/market/score";

/// Per-call timeouts: both endpoints answer small payloads quickly
const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(6);
const SCORE_BATCH_TIMEOUT: Duration = Duration::from_secs(6);

/// Console API request ceiling
const RATE_LIMIT_PER_SECOND: u32 = 10;

/// Resolve the console base URL, honoring the `SPOTOP_CONSOLE_URL` override
pub fn console_base_url() -> String {
    std::env::var("SPOTOP_CONSOLE_URL").unwrap_or_else(|_| CONSOLE_BASE_URL.to_string())
}

/// One live market score observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketScore {
    pub zone: String,
    pub instance: String,
    pub score: i32,
}

/// Seam over the market-score endpoint so the score fetcher is testable
/// without HTTP.
#[async_trait]
pub trait MarketScoreApi: Send + Sync {
    /// Whether credentials for score queries are available
    fn authenticated(&self) -> bool;

    /// Query live scores for one batch of instance types across the full
    /// zone universe.
    async fn market_scores(
        &self,
        zones: &[String],
        instances: &[String],
    ) -> Result<Vec<MarketScore>>;
}

/// Authenticated Spot console client
pub struct ConsoleClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
    account_id: Option<String>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ConsoleClient {
    /// Create a console client. `token` may be absent; score queries then
    /// fail with an auth error while sign-in still works.
    pub fn new(token: Option<String>, account_id: Option<String>) -> Result<Self> {
        Self::with_base_url(console_base_url(), token, account_id)
    }

    /// Create a client against a specific base URL (for testing)
    pub fn with_base_url(
        base_url: String,
        token: Option<String>,
        account_id: Option<String>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(
            std::num::NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap_or(std::num::NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            base_url,
            token,
            account_id,
            rate_limiter,
        })
    }

    /// Exchange console credentials for an access token
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        #[derive(Deserialize)]
        struct SignInItem {
            #[serde(rename = "accessToken")]
            access_token: String,
        }

        #[derive(Deserialize)]
        struct SignInResponse {
            items: Vec<SignInItem>,
        }

        let url = format!("{}{}", self.base_url, SIGN_IN_PATH);
        let body = json!({ "email": email, "password": password });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(SIGN_IN_TIMEOUT)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let parsed: SignInResponse = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse sign-in response: {}", e))
        })?;

        parsed
            .items
            .into_iter()
            .next()
            .map(|item| item.access_token)
            .ok_or_else(|| {
                ApiError::InvalidResponse("Sign-in response carried no token".to_string()).into()
            })
    }
}

/// Clamp a raw wire score (float) to the 0-100 integer scale
fn clamp_score(raw: f64) -> i32 {
    raw.round().clamp(0.0, 100.0) as i32
}

#[async_trait]
impl MarketScoreApi for ConsoleClient {
    fn authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn market_scores(
        &self,
        zones: &[String],
        instances: &[String],
    ) -> Result<Vec<MarketScore>> {
        let token = self.token.as_ref().ok_or(ApiError::Unauthorized)?;

        self.rate_limiter.until_ready().await;

        #[derive(Deserialize)]
        struct MarketEntry {
            #[serde(rename = "availabilityZone")]
            availability_zone: String,
            #[serde(rename = "instanceType")]
            instance_type: String,
            score: f64,
        }

        #[derive(Deserialize)]
        struct ScoreItem {
            #[serde(rename = "marketsScore", default)]
            markets_score: Vec<MarketEntry>,
        }

        #[derive(Deserialize)]
        struct ScoreResponse {
            #[serde(default)]
            items: Vec<ScoreItem>,
        }

        let url = format!("{}{}", self.base_url, MARKET_SCORE_PATH);
        let body = json!({
            "availabilityZones": zones,
            "instanceTypes": instances,
            "product": "Linux/UNIX",
            "minimumInstanceLifetime": [1],
        });

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .timeout(SCORE_BATCH_TIMEOUT);

        if let Some(account_id) = &self.account_id {
            request = request.query(&[("accountId", account_id)]);
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let parsed: ScoreResponse = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse score response: {}", e))
        })?;

        let scores = parsed
            .items
            .into_iter()
            .flat_map(|item| item.markets_score)
            .map(|entry| MarketScore {
                zone: entry.availability_zone,
                instance: entry.instance_type,
                score: clamp_score(entry.score),
            })
            .collect();

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_client_creation() {
        let client = ConsoleClient::new(Some("tok".to_string()), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_authenticated_reflects_token() {
        let with_token =
            ConsoleClient::with_base_url("http://localhost".into(), Some("tok".into()), None)
                .unwrap();
        let without_token =
            ConsoleClient::with_base_url("http://localhost".into(), None, None).unwrap();

        assert!(with_token.authenticated());
        assert!(!without_token.authenticated());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(87.4), 87);
        assert_eq!(clamp_score(87.6), 88);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(120.0), 100);
        assert_eq!(clamp_score(0.0), 0);
    }

    #[tokio::test]
    async fn test_market_scores_without_token() {
        let client = ConsoleClient::with_base_url("http://localhost".into(), None, None).unwrap();
        let err = client
            .market_scores(&["us-east-1a".into()], &["c5.large".into()])
            .await
            .unwrap_err();

        match err {
            Error::Api(ApiError::Unauthorized) => (),
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[cfg_attr(not(feature = "http-tests"), ignore)]
    #[tokio::test]
    async fn test_sign_in_extracts_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/auth/signIn")
            .with_status(200)
            .with_body(r#"{"items": [{"accessToken": "tok-abc"}]}"#)
            .create_async()
            .await;

        let client = ConsoleClient::with_base_url(server.url(), None, None).unwrap();
        let token = client.sign_in("user@example.com", "hunter2").await.unwrap();

        assert_eq!(token, "tok-abc");
    }

    #[cfg_attr(not(feature = "http-tests"), ignore)]
    #[tokio::test]
    async fn test_market_scores_parses_nested_items() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/aws/ec2/market/score")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "kind": "spotinst:aws:ec2:market:score",
                    "items": [
                        {
                            "lifetimePeriod": 1,
                            "marketsScore": [
                                {"availabilityZone": "us-east-1a", "instanceType": "c5.large", "product": "Linux/UNIX", "score": 91.2},
                                {"availabilityZone": "us-east-1b", "instanceType": "c5.large", "product": "Linux/UNIX", "score": 44.9}
                            ]
                        }
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = ConsoleClient::with_base_url(
            server.url(),
            Some("tok".into()),
            Some("act-123".into()),
        )
        .unwrap();
        let scores = client
            .market_scores(&["us-east-1a".into(), "us-east-1b".into()], &["c5.large".into()])
            .await
            .unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].zone, "us-east-1a");
        assert_eq!(scores[0].score, 91);
        assert_eq!(scores[1].score, 45);
    }
}
