use thiserror::Error;

/// Ошибки движка WebRTC (создание соединения, описания, каналы, транссиверы)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Webrtc(webrtc::Error),

    #[error("rejected by engine: {0}")]
    Rejected(String),

    #[error("peer connection is closed")]
    Closed,
}

impl From<webrtc::Error> for EngineError {
    fn from(e: webrtc::Error) -> Self {
        match e {
            webrtc::Error::ErrConnectionClosed => EngineError::Closed,
            other => EngineError::Webrtc(other),
        }
    }
}

/// Ошибки HTTP-транспорта к устройству
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("response body is not a session description: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

/// Один вариант на каждый шаг offer/answer
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("failed to create offer: {0}")]
    OfferCreation(#[source] EngineError),

    #[error("failed to set local description: {0}")]
    LocalDescription(#[source] EngineError),

    #[error("ICE gathering did not complete within {0:?}")]
    GatheringTimeout(std::time::Duration),

    #[error("negotiation cancelled")]
    Cancelled,

    #[error("signaling exchange failed: {0}")]
    SignalingTransport(#[source] TransportError),

    #[error("failed to set remote description: {0}")]
    RemoteDescription(#[source] EngineError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("session has no data channel")]
    NoDataChannel,

    #[error("session already has a data channel")]
    ChannelExists,

    #[error("session is already closed")]
    AlreadyClosed,

    #[error("failed to encode control message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Ошибки кнопок оператора
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("stream is not started")]
    NotStarted,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid server url {0}")]
    InvalidUrl(String),

    #[error("invalid ICE server: {0}")]
    InvalidIceServer(String),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
