use crate::config::ClientConfig;
use crate::error::EngineError;
use crate::logger::dump_selected_pair;
use crate::peer::data_channel::WebrtcDataChannel;
use crate::peer::engine::{DataChannel, EngineFactory, RtcEngine};
use crate::peer::events::Listeners;
use crate::peer::ice::rtc_config;
use crate::peer::types::{
    ConnectionState, GatheringState, IceConnectionState, MediaKind, SdpType, ServerConfig,
    SessionDescription, SignalingState, TrackEvent,
};
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

/// Peer connection на webrtc-rs. Все колбэки соединения ставятся один раз
/// при создании и раздают события через `Listeners`.
pub struct WebrtcEngine {
    pc: Arc<RTCPeerConnection>,
    gathering: Arc<Listeners<GatheringState>>,
    ice_connection: Arc<Listeners<IceConnectionState>>,
    signaling: Arc<Listeners<SignalingState>>,
    tracks: Arc<Listeners<TrackEvent>>,
}

impl WebrtcEngine {
    /// создаём Peer с кодеками по умолчанию (нужны для recvonly транссиверов)
    pub async fn new(servers: &[ServerConfig]) -> Result<Self, EngineError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();
        let pc = Arc::new(api.new_peer_connection(rtc_config(servers)).await?);

        let engine = Self {
            pc,
            gathering: Arc::new(Listeners::new()),
            ice_connection: Arc::new(Listeners::new()),
            signaling: Arc::new(Listeners::new()),
            tracks: Arc::new(Listeners::new()),
        };
        engine.install_handlers();
        Ok(engine)
    }

    fn install_handlers(&self) {
        let gathering = self.gathering.clone();
        self.pc
            .on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
                gathering.emit(&gatherer_state(state));
                Box::pin(async {})
            }));

        let ice_connection = self.ice_connection.clone();
        self.pc
            .on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
                ice_connection.emit(&ice_connection_state(state));
                Box::pin(async {})
            }));

        let signaling = self.signaling.clone();
        self.pc
            .on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
                signaling.emit(&signaling_state(state));
                Box::pin(async {})
            }));

        // Weak, чтобы обработчик не держал соединение живым
        let weak_pc = Arc::downgrade(&self.pc);
        self.pc
            .on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
                log::info!("Peer connection state changed to: {:?}", st);
                if st == RTCPeerConnectionState::Connected {
                    if let Some(pc) = weak_pc.upgrade() {
                        tokio::spawn(async move {
                            dump_selected_pair(&pc, "CONNECTED").await;
                        });
                    }
                }
                Box::pin(async {})
            }));

        let tracks = self.tracks.clone();
        self.pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let kind = match track.kind() {
                RTPCodecType::Audio => Some(MediaKind::Audio),
                RTPCodecType::Video => Some(MediaKind::Video),
                _ => None,
            };
            match kind {
                Some(kind) => {
                    log::info!("Track {} received: id={}", kind, track.id());
                    tracks.emit(&TrackEvent {
                        kind,
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                    });
                    // RTP не декодируем, но читаем, чтобы не копился буфер
                    tokio::spawn(async move {
                        let mut packets: u64 = 0;
                        while track.read_rtp().await.is_ok() {
                            packets += 1;
                        }
                        log::info!("Track {} ended after {} packets", kind, packets);
                    });
                }
                None => log::warn!("Ignoring track of unknown kind"),
            }
            Box::pin(async {})
        }));
    }
}

#[async_trait]
impl RtcEngine for WebrtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        let offer = self.pc.create_offer(None).await?;
        Ok(from_rtc(offer))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.pc.set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.pc.local_description().await.map(from_rtc)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    fn ice_gathering_state(&self) -> GatheringState {
        match self.pc.ice_gathering_state() {
            RTCIceGatheringState::Gathering => GatheringState::Gathering,
            RTCIceGatheringState::Complete => GatheringState::Complete,
            _ => GatheringState::New,
        }
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        ice_connection_state(self.pc.ice_connection_state())
    }

    fn signaling_state(&self) -> SignalingState {
        signaling_state(self.pc.signaling_state())
    }

    fn connection_state(&self) -> ConnectionState {
        match self.pc.connection_state() {
            RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
            RTCPeerConnectionState::Connected => ConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectionState::Failed,
            RTCPeerConnectionState::Closed => ConnectionState::Closed,
            _ => ConnectionState::New,
        }
    }

    fn gathering_events(&self) -> &Listeners<GatheringState> {
        &self.gathering
    }

    fn ice_connection_events(&self) -> &Listeners<IceConnectionState> {
        &self.ice_connection
    }

    fn signaling_events(&self) -> &Listeners<SignalingState> {
        &self.signaling
    }

    fn track_events(&self) -> &Listeners<TrackEvent> {
        &self.tracks
    }

    async fn create_data_channel(
        &self,
        label: &str,
        ordered: bool,
    ) -> Result<Arc<dyn DataChannel>, EngineError> {
        let init = RTCDataChannelInit {
            ordered: Some(ordered),
            ..Default::default()
        };
        let dc = self.pc.create_data_channel(label, Some(init)).await?;
        Ok(Arc::new(WebrtcDataChannel::attach(dc)))
    }

    async fn add_transceiver(&self, kind: MediaKind) -> Result<(), EngineError> {
        let codec = match kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        };
        self.pc
            .add_transceiver_from_kind(
                codec,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        Ok(())
    }

    async fn stop_transceivers(&self) -> Result<usize, EngineError> {
        let transceivers = self.pc.get_transceivers().await;
        for transceiver in &transceivers {
            transceiver.stop().await?;
        }
        Ok(transceivers.len())
    }

    async fn stop_senders(&self) -> Result<usize, EngineError> {
        let mut stopped = 0;
        for sender in self.pc.get_senders().await {
            if sender.track().await.is_some() {
                sender.stop().await?;
                stopped += 1;
            }
        }
        Ok(stopped)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.pc.close().await?;
        Ok(())
    }
}

/// Фабрика соединений на webrtc-rs
#[derive(Debug, Default, Clone, Copy)]
pub struct WebrtcFactory;

#[async_trait]
impl EngineFactory for WebrtcFactory {
    async fn connect(&self, config: &ClientConfig) -> Result<Arc<dyn RtcEngine>, EngineError> {
        let engine = WebrtcEngine::new(&config.ice_servers).await?;
        Ok(Arc::new(engine))
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, EngineError> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => {
            return Err(EngineError::Rejected("rollback is not supported".into()))
        }
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> SessionDescription {
    let kind = match desc.sdp_type {
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => SdpType::Offer,
    };
    SessionDescription {
        sdp: desc.sdp,
        kind,
    }
}

fn gatherer_state(state: RTCIceGathererState) -> GatheringState {
    match state {
        RTCIceGathererState::Gathering => GatheringState::Gathering,
        RTCIceGathererState::Complete => GatheringState::Complete,
        RTCIceGathererState::Closed => GatheringState::Closed,
        _ => GatheringState::New,
    }
}

fn ice_connection_state(state: RTCIceConnectionState) -> IceConnectionState {
    match state {
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
        _ => IceConnectionState::New,
    }
}

fn signaling_state(state: RTCSignalingState) -> SignalingState {
    match state {
        RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
        RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
        RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
        RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
        RTCSignalingState::Closed => SignalingState::Closed,
        _ => SignalingState::Stable,
    }
}
