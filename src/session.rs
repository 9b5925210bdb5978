use crate::config::ClientConfig;
use crate::error::{NegotiationError, SessionError};
use crate::peer::data_channel::{wire_callbacks, ChannelCallbacks};
use crate::peer::engine::{DataChannel, RtcEngine};
use crate::peer::events::ListenerId;
use crate::peer::types::{ConnectionState, ControlMessage, MediaKind, StreamOptions, TrackEvent};
use crate::signaling::{SignalingClient, SignalingTransport};
use crate::utils::{lock, random_id};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub type TrackCallback = Box<dyn Fn(&TrackEvent) + Send + Sync>;

#[derive(Default)]
struct Subscriptions {
    gathering: Option<ListenerId>,
    ice_connection: Option<ListenerId>,
    signaling: Option<ListenerId>,
    tracks: Option<ListenerId>,
}

/// Одно соединение с устройством: канал, транссиверы, переговоры.
/// Владеет движком; после `stop()` не переиспользуется.
pub struct Session {
    id: String,
    engine: Arc<dyn RtcEngine>,
    signaling: SignalingClient,
    data_channel: Mutex<Option<(Arc<dyn DataChannel>, ListenerId)>>,
    subscriptions: Mutex<Subscriptions>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl Session {
    pub fn open(
        engine: Arc<dyn RtcEngine>,
        transport: Arc<dyn SignalingTransport>,
        config: &ClientConfig,
    ) -> Self {
        let id = random_id();
        let signaling = SignalingClient::new(engine.clone(), transport, config.gathering_timeout());

        // только для лога
        let subscriptions = Subscriptions {
            gathering: Some(engine.gathering_events().subscribe({
                let id = id.clone();
                move |state| log::info!("[{id}] ICE gathering state: {:?}", state)
            })),
            ice_connection: Some(engine.ice_connection_events().subscribe({
                let id = id.clone();
                move |state| log::info!("[{id}] ICE connection state: {:?}", state)
            })),
            signaling: Some(engine.signaling_events().subscribe({
                let id = id.clone();
                move |state| log::info!("[{id}] Signaling state: {:?}", state)
            })),
            tracks: None,
        };

        log::info!(
            "[{id}] Session opened: gathering={:?} ice={:?} signaling={:?}",
            engine.ice_gathering_state(),
            engine.ice_connection_state(),
            engine.signaling_state()
        );

        Self {
            id,
            engine,
            signaling,
            data_channel: Mutex::new(None),
            subscriptions: Mutex::new(subscriptions),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Один упорядоченный канал на сессию
    pub async fn create_data_channel(
        &self,
        label: &str,
        callbacks: ChannelCallbacks,
    ) -> Result<Arc<dyn DataChannel>, SessionError> {
        if self.is_closed() {
            return Err(SessionError::AlreadyClosed);
        }
        if self.has_data_channel() {
            return Err(SessionError::ChannelExists);
        }

        let channel = self.engine.create_data_channel(label, true).await?;
        let listener = wire_callbacks(channel.as_ref(), callbacks);
        log::info!("[{}] Created data channel {}", self.id, label);

        let mut slot = lock(&self.data_channel);
        if slot.is_some() {
            // параллельный вызов успел первым
            channel.events().unsubscribe(listener);
            return Err(SessionError::ChannelExists);
        }
        *slot = Some((channel.clone(), listener));
        Ok(channel)
    }

    /// Recvonly транссиверы для запрошенных видов; трек уходит только в колбэк своего вида
    pub async fn add_media_handles(
        &self,
        on_audio: Option<TrackCallback>,
        on_video: Option<TrackCallback>,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::AlreadyClosed);
        }
        if on_video.is_some() {
            self.engine.add_transceiver(MediaKind::Video).await?;
        }
        if on_audio.is_some() {
            self.engine.add_transceiver(MediaKind::Audio).await?;
        }

        let session = self.id.clone();
        let listener = self.engine.track_events().subscribe(move |event| {
            let handler = match event.kind {
                MediaKind::Audio => on_audio.as_ref(),
                MediaKind::Video => on_video.as_ref(),
            };
            match handler {
                Some(handler) => handler(event),
                None => log::debug!("[{session}] No handler for {} track {}", event.kind, event.track_id),
            }
        });

        let previous = lock(&self.subscriptions).tracks.replace(listener);
        if let Some(previous) = previous {
            self.engine.track_events().unsubscribe(previous);
        }
        Ok(())
    }

    /// Переговоры; `stop()` прерывает их
    pub async fn start(&self, options: &StreamOptions) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::AlreadyClosed);
        }
        log::info!("[{}] Negotiating with options {:?}", self.id, options);

        tokio::select! {
            _ = self.cancel.cancelled() => Err(NegotiationError::Cancelled.into()),
            result = self.signaling.negotiate(options) => {
                result?;
                log::info!("[{}] Negotiation finished", self.id);
                Ok(())
            }
        }
    }

    pub async fn send_control(&self, message: &ControlMessage) -> Result<(), SessionError> {
        let channel = self.channel().ok_or(SessionError::NoDataChannel)?;
        let text = serde_json::to_string(message)?;
        log::debug!("[{}] Sending {}", self.id, text);
        channel.send_text(&text).await?;
        Ok(())
    }

    /// Останавливает транссиверы и отправители, закрывает соединение.
    /// Ошибки шагов не прерывают остановку, возвращается первая из них.
    /// Повторный вызов возвращает `AlreadyClosed`.
    pub async fn stop(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyClosed);
        }
        self.cancel.cancel();
        if self.engine.connection_state() == ConnectionState::Closed {
            // соединение закрыли в обход сессии, трогать его не нужно
            self.release_subscriptions();
            return Err(SessionError::AlreadyClosed);
        }

        let channel = lock(&self.data_channel).take();
        if let Some((channel, listener)) = channel {
            if let Err(e) = channel.close().await {
                log::warn!("[{}] Failed to close data channel: {}", self.id, e);
            }
            channel.events().unsubscribe(listener);
        }

        let mut first_error = None;
        match self.engine.stop_transceivers().await {
            Ok(count) => log::info!("[{}] Stopped {} transceivers", self.id, count),
            Err(e) => {
                log::warn!("[{}] Failed to stop transceivers: {}", self.id, e);
                first_error.get_or_insert(e);
            }
        }
        match self.engine.stop_senders().await {
            Ok(count) => log::info!("[{}] Stopped {} senders", self.id, count),
            Err(e) => {
                log::warn!("[{}] Failed to stop senders: {}", self.id, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.engine.close().await {
            log::warn!("[{}] Failed to close peer connection: {}", self.id, e);
            first_error.get_or_insert(e);
        }
        self.release_subscriptions();

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                log::info!("[{}] Session closed", self.id);
                Ok(())
            }
        }
    }

    pub fn has_data_channel(&self) -> bool {
        lock(&self.data_channel).is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn channel(&self) -> Option<Arc<dyn DataChannel>> {
        lock(&self.data_channel)
            .as_ref()
            .map(|(channel, _)| channel.clone())
    }

    fn release_subscriptions(&self) {
        let subs = std::mem::take(&mut *lock(&self.subscriptions));
        if let Some(id) = subs.gathering {
            self.engine.gathering_events().unsubscribe(id);
        }
        if let Some(id) = subs.ice_connection {
            self.engine.ice_connection_events().unsubscribe(id);
        }
        if let Some(id) = subs.signaling {
            self.engine.signaling_events().unsubscribe(id);
        }
        if let Some(id) = subs.tracks {
            self.engine.track_events().unsubscribe(id);
        }
    }
}
