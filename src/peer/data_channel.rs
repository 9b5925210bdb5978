use crate::error::EngineError;
use crate::peer::engine::DataChannel;
use crate::peer::events::{ListenerId, Listeners};
use crate::peer::types::ChannelEvent;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;

pub type Callback = Box<dyn Fn() + Send + Sync>;
pub type MessageCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Колбэки жизненного цикла канала
#[derive(Default)]
pub struct ChannelCallbacks {
    pub on_open: Option<Callback>,
    pub on_close: Option<Callback>,
    pub on_message: Option<MessageCallback>,
}

/// Раздаёт события канала колбэкам; каждый вызывается только на своё событие
pub fn wire_callbacks(channel: &dyn DataChannel, callbacks: ChannelCallbacks) -> ListenerId {
    let label = channel.label().to_string();
    channel.events().subscribe(move |event| match event {
        ChannelEvent::Open => {
            log::info!("Data channel {label} opened");
            if let Some(cb) = &callbacks.on_open {
                cb();
            }
        }
        ChannelEvent::Close => {
            log::info!("Data channel {label} closed");
            if let Some(cb) = &callbacks.on_close {
                cb();
            }
        }
        ChannelEvent::Message(text) => {
            log::debug!("Data channel {label} message, length: {}", text.len());
            if let Some(cb) = &callbacks.on_message {
                cb(text);
            }
        }
    })
}

/// RTCDataChannel из webrtc-rs
pub struct WebrtcDataChannel {
    dc: Arc<RTCDataChannel>,
    label: String,
    ordered: bool,
    events: Arc<Listeners<ChannelEvent>>,
}

impl WebrtcDataChannel {
    /// общий обработчик data-channel
    pub fn attach(dc: Arc<RTCDataChannel>) -> Self {
        let events = Arc::new(Listeners::new());

        dc.on_open(Box::new({
            let events = events.clone();
            move || {
                events.emit(&ChannelEvent::Open);
                Box::pin(async {})
            }
        }));

        dc.on_message(Box::new({
            let events = events.clone();
            move |msg: DataChannelMessage| {
                match decode_text(&msg.data, msg.is_string) {
                    Some(text) => {
                        events.emit(&ChannelEvent::Message(text));
                    }
                    None => log::debug!("Ignoring binary message, length: {}", msg.data.len()),
                }
                Box::pin(async {})
            }
        }));

        dc.on_close(Box::new({
            let events = events.clone();
            move || {
                events.emit(&ChannelEvent::Close);
                Box::pin(async {})
            }
        }));

        Self {
            label: dc.label().to_string(),
            ordered: dc.ordered(),
            dc,
            events,
        }
    }
}

fn decode_text(data: &Bytes, is_string: bool) -> Option<String> {
    if !is_string {
        return None;
    }
    Some(String::from_utf8_lossy(data).into_owned())
}

#[async_trait]
impl DataChannel for WebrtcDataChannel {
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
        let sent = self.dc.send_text(text.to_string()).await?;
        log::debug!("Sent {} bytes over {}", sent, self.label);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.dc.close().await?;
        Ok(())
    }
}
