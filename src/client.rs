use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};

use crate::config::ClientConfig;
use crate::error::TrackError;
use crate::types::{RawShippingRecord, TrackEnvelope};

const USER_AGENT: &str = concat!("parcel-glance/", env!("CARGO_PKG_VERSION"));
const TRACK_PATH: [&str; 3] = ["track", "v1", "details"];

/// Anything that can produce the raw status record for a tracking number
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, tracking_number: &str) -> Result<RawShippingRecord, TrackError>;
}

/// Decode a tracking response body into the shipment's status record.
///
/// Accepts the wrapped `TrackResponse` shape as well as a bare record, so a
/// response saved to disk reads the same as a live one.
pub fn decode_track_body(
    body: &str,
    tracking_number: &str,
) -> Result<RawShippingRecord, TrackError> {
    parse_envelope(body, tracking_number)?.into_record(tracking_number)
}

fn parse_envelope(body: &str, tracking_number: &str) -> Result<TrackEnvelope, TrackError> {
    serde_json::from_str(body).map_err(|source| TrackError::Deserialize {
        context: format!("tracking response for {}", tracking_number),
        source,
    })
}

/// Client for the carrier's tracking endpoint. One GET per lookup, no retries.
#[derive(Debug, Clone)]
pub struct UpsClient {
    http_client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl UpsClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TrackError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .build()?;

        let base_url = Url::parse(&config.api_base)
            .map_err(|e| e.to_string())
            .and_then(|url| {
                if url.cannot_be_a_base() {
                    Err("not a base URL".to_string())
                } else {
                    Ok(url)
                }
            })
            .map_err(|reason| TrackError::InvalidBaseUrl {
                url: config.api_base.clone(),
                reason,
            })?;

        Ok(Self {
            http_client,
            base_url,
            config: config.clone(),
        })
    }

    /// The tracking number is pushed as one escaped path segment
    fn track_url(&self, tracking_number: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(TRACK_PATH)
                .push(tracking_number.trim());
        }
        url
    }

    /// Transaction id sent in `transId`; unique enough per process
    fn transaction_id(tracking_number: &str) -> String {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("{}-{}", tracking_number.trim(), millis)
    }

    async fn request(&self, tracking_number: &str) -> Result<RawShippingRecord, TrackError> {
        let url = self.track_url(tracking_number);
        tracing::debug!(%url, "requesting tracking status");

        let mut request = self
            .http_client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .header("transId", Self::transaction_id(tracking_number))
            .header("transactionSrc", &self.config.transaction_src);

        if let Some(ref token) = self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(TrackError::NotFound {
                tracking_number: tracking_number.to_string(),
            });
        }

        // Error bodies share the fault shape, so try that before giving up
        // on a non-2xx status.
        let envelope = match parse_envelope(&body, tracking_number) {
            Ok(TrackEnvelope::Fault { response }) => return Err(response.into_error()),
            other => other,
        };

        if !status.is_success() {
            return Err(TrackError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        envelope?.into_record(tracking_number)
    }
}

#[async_trait]
impl StatusSource for UpsClient {
    async fn fetch_status(&self, tracking_number: &str) -> Result<RawShippingRecord, TrackError> {
        let record = self.request(tracking_number).await;
        match &record {
            Ok(_) => tracing::info!(tracking_number, "fetched tracking status"),
            Err(e) => tracing::warn!(tracking_number, error = %e, "tracking status fetch failed"),
        }
        record
    }
}
