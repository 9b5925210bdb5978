use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::peer::types::{OfferRequest, SessionDescription};
use crate::signaling::SignalingTransport;
use async_trait::async_trait;
use reqwest::Url;

pub const OFFER_PATH: &str = "/offer";

/// GET-эндпоинты устройства без тела запроса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    RecordStart,
    RecordStop,
    PowerDown,
}

impl DeviceAction {
    pub fn path(self) -> &'static str {
        match self {
            DeviceAction::RecordStart => "/record_start",
            DeviceAction::RecordStop => "/record_stop",
            DeviceAction::PowerDown => "/power_down",
        }
    }
}

/// Ответ только логируется
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    pub status: u16,
    pub body: String,
}

impl DeviceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn trigger(&self, action: DeviceAction) -> Result<DeviceResponse, TransportError>;
}

/// HTTP клиент к серверу устройства: `/offer` и GET-кнопки
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", config.server_url)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(limit) = config.request_timeout() {
            builder = builder.timeout(limit);
        }
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Пути абсолютные: берутся от корня сервера, как fetch('/offer') в браузере
    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Url(format!("{path}: {e}")))
    }
}

#[async_trait]
impl SignalingTransport for HttpApi {
    async fn post_offer(&self, offer: &OfferRequest) -> Result<SessionDescription, TransportError> {
        let url = self.endpoint(OFFER_PATH)?;
        log::debug!("POST {} ({} bytes of SDP)", url, offer.sdp.len());

        let response = self.client.post(url).json(offer).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let answer: SessionDescription = serde_json::from_str(&body)?;
        log::debug!("Received {:?} with {} bytes of SDP", answer.kind, answer.sdp.len());
        Ok(answer)
    }
}

#[async_trait]
impl DeviceApi for HttpApi {
    async fn trigger(&self, action: DeviceAction) -> Result<DeviceResponse, TransportError> {
        let url = self.endpoint(action.path())?;
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(DeviceResponse { status, body })
    }
}
