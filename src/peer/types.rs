use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// SDP описание в том виде, в каком его ходит по сети: `{ "sdp", "type" }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpType,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpType::Offer,
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpType::Answer,
        }
    }
}

/// Параметры камеры, которые сервер читает из `options`.
/// Незаданные поля не сериализуются, пустые опции дают `{}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cam_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cam_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nn_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mono_camera_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpixel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_disparity: Option<bool>,
}

/// Тело `POST /offer`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OfferRequest {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub options: StreamOptions,
}

impl OfferRequest {
    pub fn new(local: SessionDescription, options: StreamOptions) -> Self {
        Self {
            sdp: local.sdp,
            kind: local.kind,
            options,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringState {
    New,
    Gathering,
    Complete,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Входящий трек от сервера
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub kind: MediaKind,
    pub track_id: String,
    pub stream_id: String,
}

/// События data-channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Close,
    Message(String),
}

/// Команды, которые понимает обработчик data-channel на устройстве
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    Ping,
    StreamClosed,
    Stitch,
    Toggle,
    RecordStart,
    RecordStop,
    Shutdown,
    AwbMode,
    WhiteBalanceMore,
    WhiteBalanceLess,
    ExposureMore,
    ExposureLess,
}

impl FromStr for ControlMessage {
    type Err = String;

    /// Принимает имя команды в любом регистре, как и сервер (`data['type'].upper()`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tagged = serde_json::json!({ "type": s.trim().to_uppercase() });
        serde_json::from_value(tagged).map_err(|_| format!("unknown control message {s}"))
    }
}

/// Ответ устройства по data-channel: `{ "type": ..., "payload": ... }`
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceReply {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}
