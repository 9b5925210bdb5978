use crate::config::ClientConfig;
use crate::error::EngineError;
use crate::peer::events::Listeners;
use crate::peer::types::{
    ChannelEvent, ConnectionState, GatheringState, IceConnectionState, MediaKind,
    SessionDescription, SignalingState, TrackEvent,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Peer connection, которое даёт платформа (webrtc-rs или тестовый дублёр).
/// Здесь только вызовы; ICE, DTLS и SDP живут внутри реализации.
#[async_trait]
pub trait RtcEngine: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError>;
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError>;

    fn ice_gathering_state(&self) -> GatheringState;
    fn ice_connection_state(&self) -> IceConnectionState;
    fn signaling_state(&self) -> SignalingState;
    fn connection_state(&self) -> ConnectionState;

    fn gathering_events(&self) -> &Listeners<GatheringState>;
    fn ice_connection_events(&self) -> &Listeners<IceConnectionState>;
    fn signaling_events(&self) -> &Listeners<SignalingState>;
    fn track_events(&self) -> &Listeners<TrackEvent>;

    async fn create_data_channel(
        &self,
        label: &str,
        ordered: bool,
    ) -> Result<Arc<dyn DataChannel>, EngineError>;

    /// Добавляет recvonly транссивер
    async fn add_transceiver(&self, kind: MediaKind) -> Result<(), EngineError>;

    /// Останавливает все транссиверы, возвращает сколько остановлено
    async fn stop_transceivers(&self) -> Result<usize, EngineError>;

    /// Останавливает отправители, у которых есть исходящий трек
    async fn stop_senders(&self) -> Result<usize, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

/// Канал поверх соединения. Держит только ссылку на транспорт соединения.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;
    fn ordered(&self) -> bool;
    fn events(&self) -> &Listeners<ChannelEvent>;
    async fn send_text(&self, text: &str) -> Result<(), EngineError>;
    async fn close(&self) -> Result<(), EngineError>;
}

/// Создание соединения с фиксированной конфигурацией
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn RtcEngine>, EngineError>;
}
