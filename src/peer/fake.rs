//! Тестовый дублёр движка: записывает вызовы в общий журнал.

use crate::config::ClientConfig;
use crate::error::{EngineError, TransportError};
use crate::http::{DeviceAction, DeviceApi, DeviceResponse};
use crate::peer::engine::{DataChannel, EngineFactory, RtcEngine};
use crate::peer::events::Listeners;
use crate::peer::types::{
    ChannelEvent, ConnectionState, GatheringState, IceConnectionState, MediaKind, OfferRequest,
    SdpType, SessionDescription, SignalingState, TrackEvent,
};
use crate::signaling::SignalingTransport;
use crate::utils::lock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FAKE_OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";
pub const FAKE_GATHERED_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\na=candidate:1 1 udp 2130706431 127.0.0.1 50000 typ host\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateOffer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    PostOffer { gathering: GatheringState },
    CreateDataChannel { label: String, ordered: bool },
    AddTransceiver(MediaKind),
    Send(String),
    CloseChannel,
    StopTransceivers,
    StopSenders,
    Close,
    Device(DeviceAction),
}

pub type Journal = Arc<Mutex<Vec<Call>>>;

pub fn calls(journal: &Journal) -> Vec<Call> {
    lock(journal).clone()
}

#[derive(Debug, Clone)]
pub struct FakeScript {
    pub initial_gathering: GatheringState,
    /// После set_local_description сбор завершается через эту паузу
    pub complete_after_local: Option<Duration>,
    pub fail_offer: bool,
    pub fail_local: bool,
    pub fail_remote: bool,
    /// stop_transceivers возвращает ошибку
    pub fail_stop: bool,
    /// connect у фабрики уступает планировщику перед созданием движка
    pub connect_yields: bool,
}

impl Default for FakeScript {
    fn default() -> Self {
        Self {
            initial_gathering: GatheringState::New,
            complete_after_local: None,
            fail_offer: false,
            fail_local: false,
            fail_remote: false,
            fail_stop: false,
            connect_yields: false,
        }
    }
}

pub struct FakeEngine {
    script: FakeScript,
    journal: Journal,
    gathering_state: Arc<Mutex<GatheringState>>,
    local: Mutex<Option<SessionDescription>>,
    closed: AtomicBool,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    gathering: Arc<Listeners<GatheringState>>,
    ice_connection: Listeners<IceConnectionState>,
    signaling: Listeners<SignalingState>,
    tracks: Listeners<TrackEvent>,
}

impl FakeEngine {
    pub fn new(script: FakeScript) -> Arc<Self> {
        Self::with_journal(script, Journal::default())
    }

    pub fn with_journal(script: FakeScript, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            gathering_state: Arc::new(Mutex::new(script.initial_gathering)),
            script,
            journal,
            local: Mutex::new(None),
            closed: AtomicBool::new(false),
            channels: Mutex::new(Vec::new()),
            gathering: Arc::new(Listeners::new()),
            ice_connection: Listeners::new(),
            signaling: Listeners::new(),
            tracks: Listeners::new(),
        })
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        calls(&self.journal)
    }

    pub fn emit_gathering(&self, state: GatheringState) -> usize {
        *lock(&self.gathering_state) = state;
        self.gathering.emit(&state)
    }

    pub fn gathering_subscriptions(&self) -> u64 {
        self.gathering.total_subscribed()
    }

    pub fn emit_track(&self, kind: MediaKind) -> usize {
        self.tracks.emit(&TrackEvent {
            kind,
            track_id: format!("{kind}-track"),
            stream_id: "stream".into(),
        })
    }

    pub fn channel(&self, index: usize) -> Arc<FakeChannel> {
        lock(&self.channels)[index].clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        lock(&self.journal).push(call);
    }
}

#[async_trait]
impl RtcEngine for FakeEngine {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        self.record(Call::CreateOffer);
        if self.script.fail_offer || self.is_closed() {
            return Err(EngineError::Closed);
        }
        Ok(SessionDescription::offer(FAKE_OFFER_SDP))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.record(Call::SetLocal(desc.kind));
        if self.script.fail_local {
            return Err(EngineError::Rejected("local description".into()));
        }
        *lock(&self.local) = Some(desc);

        if let Some(delay) = self.script.complete_after_local {
            let state = self.gathering_state.clone();
            let events = self.gathering.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                *lock(&state) = GatheringState::Gathering;
                events.emit(&GatheringState::Gathering);
                *lock(&state) = GatheringState::Complete;
                events.emit(&GatheringState::Complete);
            });
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        // после сбора в SDP появляются кандидаты
        let local = lock(&self.local).clone()?;
        if *lock(&self.gathering_state) == GatheringState::Complete {
            return Some(SessionDescription {
                sdp: FAKE_GATHERED_SDP.into(),
                kind: local.kind,
            });
        }
        Some(local)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        self.record(Call::SetRemote(desc.kind));
        if self.script.fail_remote {
            return Err(EngineError::Rejected("malformed SDP".into()));
        }
        Ok(())
    }

    fn ice_gathering_state(&self) -> GatheringState {
        *lock(&self.gathering_state)
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        IceConnectionState::New
    }

    fn signaling_state(&self) -> SignalingState {
        SignalingState::Stable
    }

    fn connection_state(&self) -> ConnectionState {
        if self.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::New
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
        self.record(Call::CreateDataChannel {
            label: label.into(),
            ordered,
        });
        let channel = FakeChannel::new(label, ordered, self.journal.clone());
        lock(&self.channels).push(channel.clone());
        Ok(channel)
    }

    async fn add_transceiver(&self, kind: MediaKind) -> Result<(), EngineError> {
        self.record(Call::AddTransceiver(kind));
        Ok(())
    }

    async fn stop_transceivers(&self) -> Result<usize, EngineError> {
        self.record(Call::StopTransceivers);
        if self.script.fail_stop {
            return Err(EngineError::Rejected("transceiver stop".into()));
        }
        Ok(0)
    }

    async fn stop_senders(&self) -> Result<usize, EngineError> {
        self.record(Call::StopSenders);
        Ok(0)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.record(Call::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeChannel {
    label: String,
    ordered: bool,
    journal: Journal,
    events: Listeners<ChannelEvent>,
}

impl FakeChannel {
    pub fn new(label: &str, ordered: bool, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            ordered,
            journal,
            events: Listeners::new(),
        })
    }

    pub fn remote_open(&self) {
        self.events.emit(&ChannelEvent::Open);
    }

    pub fn remote_close(&self) {
        self.events.emit(&ChannelEvent::Close);
    }

    pub fn remote_message(&self, text: &str) {
        self.events.emit(&ChannelEvent::Message(text.into()));
    }

    pub fn sent(&self) -> Vec<String> {
        calls(&self.journal)
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DataChannel for FakeChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn ordered(&self) -> bool {
        self.ordered
    }

    fn events(&self) -> &Listeners<ChannelEvent> {
        &self.events
    }

    async fn send_text(&self, text: &str) -> Result<(), EngineError> {
        lock(&self.journal).push(Call::Send(text.into()));
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        lock(&self.journal).push(Call::CloseChannel);
        Ok(())
    }
}

/// Ответ, который вернёт `POST /offer`
pub enum FakeReply {
    Answer(SessionDescription),
    Status(u16),
    Body(String),
}

pub struct FakeTransport {
    journal: Journal,
    /// Движок, состояние сбора которого фиксируется в момент POST
    engine: Mutex<Option<Arc<FakeEngine>>>,
    reply: FakeReply,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl FakeTransport {
    pub fn new(journal: Journal, reply: FakeReply) -> Arc<Self> {
        Arc::new(Self {
            journal,
            engine: Mutex::new(None),
            reply,
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(journal: Journal) -> Arc<Self> {
        Self::new(journal, FakeReply::Answer(SessionDescription::answer("v=0\r\n")))
    }

    pub fn observe(&self, engine: Arc<FakeEngine>) {
        *lock(&self.engine) = Some(engine);
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        lock(&self.bodies).clone()
    }
}

#[async_trait]
impl SignalingTransport for FakeTransport {
    async fn post_offer(&self, offer: &OfferRequest) -> Result<SessionDescription, TransportError> {
        let gathering = lock(&self.engine)
            .as_ref()
            .map(|e| e.ice_gathering_state())
            .unwrap_or(GatheringState::New);
        lock(&self.journal).push(Call::PostOffer { gathering });
        lock(&self.bodies).push(serde_json::to_value(offer)?);

        match &self.reply {
            FakeReply::Answer(answer) => Ok(answer.clone()),
            FakeReply::Status(code) => Err(TransportError::Status(*code)),
            FakeReply::Body(body) => Ok(serde_json::from_str(body)?),
        }
    }
}

/// Каждый connect создаёт новый FakeEngine с общим журналом
pub struct FakeFactory {
    pub script: FakeScript,
    pub journal: Journal,
    pub transport: Option<Arc<FakeTransport>>,
    created: Mutex<Vec<Arc<FakeEngine>>>,
    pub fail: bool,
}

impl FakeFactory {
    pub fn new(script: FakeScript, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            script,
            journal,
            transport: None,
            created: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn observed_by(script: FakeScript, journal: Journal, transport: Arc<FakeTransport>) -> Arc<Self> {
        Arc::new(Self {
            script,
            journal,
            transport: Some(transport),
            created: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            script: FakeScript::default(),
            journal,
            transport: None,
            created: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn engine(&self, index: usize) -> Arc<FakeEngine> {
        lock(&self.created)[index].clone()
    }

    pub fn created(&self) -> usize {
        lock(&self.created).len()
    }
}

#[async_trait]
impl EngineFactory for FakeFactory {
    async fn connect(&self, _config: &ClientConfig) -> Result<Arc<dyn RtcEngine>, EngineError> {
        if self.script.connect_yields {
            tokio::task::yield_now().await;
        }
        if self.fail {
            return Err(EngineError::Rejected("no peer connection".into()));
        }
        let engine = FakeEngine::with_journal(self.script.clone(), self.journal.clone());
        if let Some(transport) = &self.transport {
            transport.observe(engine.clone());
        }
        lock(&self.created).push(engine.clone());
        Ok(engine)
    }
}

#[derive(Default)]
pub struct FakeDevice {
    pub journal: Journal,
    pub status: u16,
}

impl FakeDevice {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            status: 200,
        })
    }
}

#[async_trait]
impl DeviceApi for FakeDevice {
    async fn trigger(&self, action: DeviceAction) -> Result<DeviceResponse, TransportError> {
        lock(&self.journal).push(Call::Device(action));
        Ok(DeviceResponse {
            status: self.status,
            body: String::new(),
        })
    }
}
