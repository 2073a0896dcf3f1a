use std::{sync::Arc, time::Duration};

use anyhow::Context;
use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use super::ProviderError;

/// How many times a rate-limited request is retried before giving up.
const RATE_LIMIT_RETRIES: usize = 3;
const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// Request that is sent to the limited request client
#[derive(Debug)]
struct LimitedRequest {
    req: Request,
    res: oneshot::Sender<reqwest::Result<Response>>,
    /// Lets dropped callers remove their requests from the queue
    cancellation_token: CancellationToken,
}

/// Rate limited HTTP request client.
///
/// Note that cloned instances of this struct will "share" rate limit
#[derive(Debug, Clone)]
pub struct LimitedRequestClient {
    request_tx: mpsc::Sender<LimitedRequest>,
}

impl LimitedRequestClient {
    /// Create new limited client.
    ///
    /// Number argument is the allowed "concurrency", [Duration] argument is
    /// the rate. For example (10, 1s) allows 10 requests per second.
    pub fn new(client: Client, limit_number: usize, limit_duration: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<LimitedRequest>(100);
        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(limit_number));
            while let Some(LimitedRequest {
                req,
                res,
                cancellation_token,
            }) = rx.recv().await
            {
                let semaphore = semaphore.clone();
                let client = client.clone();
                tokio::spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        _ = cancellation_token.cancelled() => {
                            return;
                        }
                        Ok(permit) = semaphore.acquire() => permit,
                    };
                    tokio::select! {
                        response = client.execute(req) => {
                            if res.send(response).is_err() {
                                tracing::error!("Failed to send response: channel closed")
                            };
                        },
                        _ = cancellation_token.cancelled() => {}
                    }
                    tokio::time::sleep(limit_duration).await;
                    drop(permit);
                });
            }
        });
        Self { request_tx: tx }
    }

    /// Run a request and decode the JSON body.
    ///
    /// 429 responses sleep out the advertised delay and retry. 404 becomes
    /// [`ProviderError::NotFound`] carrying `not_found_context` (or the url).
    pub async fn request<T>(
        &self,
        req: Request,
        not_found_context: Option<&str>,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let url = req.url().to_string();
        let response = self.request_raw(req, not_found_context).await?;
        match response.json().await {
            Ok(res) => Ok(res),
            Err(e) => {
                tracing::error!(url, "Failed to deserialize provider response: {e}");
                Err(ProviderError::Other(anyhow::anyhow!(
                    "failed to deserialize response json body: {e}"
                )))
            }
        }
    }

    pub async fn request_raw(
        &self,
        req: Request,
        not_found_context: Option<&str>,
    ) -> Result<Response, ProviderError> {
        let url = req.url().to_string();
        let mut current = req;
        let mut attempt = 0;
        loop {
            let retry_copy = current.try_clone();
            let response = self.execute(current).await?;
            tracing::trace!(
                status = response.status().as_u16(),
                url,
                "Provider response"
            );
            match response.status().as_u16() {
                200 => return Ok(response),
                404 => {
                    return Err(ProviderError::NotFound(
                        not_found_context.unwrap_or(&url).to_string(),
                    ))
                }
                429 if attempt < RATE_LIMIT_RETRIES => {
                    let Some(next) = retry_copy else {
                        return Err(ProviderError::Other(anyhow::anyhow!(
                            "rate limited and the request body is not replayable"
                        )));
                    };
                    attempt += 1;
                    let delay = retry_delay(&response);
                    tracing::warn!(url, "Provider rate limited us, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    current = next;
                }
                rest => {
                    return Err(ProviderError::Other(anyhow::anyhow!(
                        "provider responded with status {rest}"
                    )))
                }
            }
        }
    }

    async fn execute(&self, req: Request) -> Result<Response, ProviderError> {
        let (tx, rx) = oneshot::channel::<Result<Response, reqwest::Error>>();
        let cancellation_token = CancellationToken::new();
        // Dropped when the caller's future is dropped, removing the queued
        // request before it is sent.
        let _guard = cancellation_token.clone().drop_guard();
        let url = req.url().to_string();
        let payload = LimitedRequest {
            req,
            res: tx,
            cancellation_token,
        };
        tracing::trace!("Sending request: {}", url);
        self.request_tx
            .send(payload)
            .await
            .context("Failed to send request")?;
        let response = rx
            .await
            .map_err(|e| anyhow::anyhow!("failed to receive response: {e}"))?
            .map_err(|e| {
                tracing::error!("Request to {} failed: {}", url, e);
                anyhow::anyhow!("Request failed: {}", e)
            })?;
        Ok(response)
    }
}

/// Delay advertised by a 429 response, 60s when the provider stays vague.
fn retry_delay(response: &Response) -> Duration {
    let headers = response.headers();
    if let Some(seconds) = headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Duration::from_secs(seconds);
    }
    if let Some(reset) = headers
        .get("X-RateLimit-Reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
    {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        if reset > now {
            return Duration::from_secs((reset - now) as u64);
        }
    }
    DEFAULT_RATE_LIMIT_DELAY
}
