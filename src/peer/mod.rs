pub mod connection;
pub mod data_channel;
pub mod engine;
pub mod events;
#[cfg(test)]
pub mod fake;
pub mod ice;
pub mod types;

pub use connection::{WebrtcEngine, WebrtcFactory};
pub use engine::{DataChannel, EngineFactory, RtcEngine};
pub use events::{Flow, ListenerId, Listeners};
pub use types::{
    ControlMessage, DeviceReply, MediaKind, OfferRequest, SdpType, ServerConfig,
    SessionDescription, StreamOptions, TrackEvent,
};
