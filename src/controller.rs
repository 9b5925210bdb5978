//! Кнопки оператора: старт и стоп стрима, запись, выключение устройства.

use crate::config::ClientConfig;
use crate::error::{ActionError, ConfigError, NegotiationError, SessionError};
use crate::http::{DeviceAction, DeviceApi, DeviceResponse, HttpApi};
use crate::peer::connection::WebrtcFactory;
use crate::peer::data_channel::ChannelCallbacks;
use crate::peer::engine::EngineFactory;
use crate::peer::events::{ListenerId, Listeners};
use crate::peer::types::{ControlMessage, DeviceReply, StreamOptions, TrackEvent};
use crate::session::Session;
use crate::signaling::SignalingTransport;
use crate::status::StatusLog;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const POWER_DOWN_PROMPT: &str = "Confirm to power down the device!";

/// Подтверждение опасного действия
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub struct Controller {
    config: ClientConfig,
    factory: Arc<dyn EngineFactory>,
    signaling: Arc<dyn SignalingTransport>,
    device: Arc<dyn DeviceApi>,
    status: Arc<StatusLog>,
    alerts: Listeners<String>,
    session: Mutex<Option<Arc<Session>>>,
}

impl Controller {
    pub fn new(
        config: ClientConfig,
        factory: Arc<dyn EngineFactory>,
        signaling: Arc<dyn SignalingTransport>,
        device: Arc<dyn DeviceApi>,
    ) -> Self {
        Self {
            config,
            factory,
            signaling,
            device,
            status: Arc::new(StatusLog::new()),
            alerts: Listeners::new(),
            session: Mutex::new(None),
        }
    }

    /// webrtc-rs + HTTP к серверу из конфига
    pub fn with_http(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let api = Arc::new(HttpApi::new(&config)?);
        log::info!("Device server: {}", api.base());
        Ok(Self::new(config, Arc::new(WebrtcFactory), api.clone(), api))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn status(&self) -> &Arc<StatusLog> {
        &self.status
    }

    /// Ошибки переговоров, по одной на неудачный `start`
    pub fn on_alert<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.alerts.subscribe(handler)
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn start(&self, options: StreamOptions) -> Result<(), ActionError> {
        self.status.append("Starting stream..");

        let previous = self.session.lock().await.take();
        if let Some(previous) = previous {
            log::info!("Replacing session {}", previous.id());
            if let Err(e) = previous.stop().await {
                log::warn!("Previous session did not stop cleanly: {}", e);
            }
        }

        let session = match self.open_session().await {
            Ok(session) => session,
            Err(e) => return Err(self.alert(e)),
        };
        // параллельный start мог успеть положить свою сессию
        let displaced = self.session.lock().await.replace(session.clone());
        if let Some(displaced) = displaced {
            log::info!("Session {} displaced by {}", displaced.id(), session.id());
            if let Err(e) = displaced.stop().await {
                log::warn!("Displaced session did not stop cleanly: {}", e);
            }
        }

        match session.start(&options).await {
            Ok(()) => Ok(()),
            Err(SessionError::Negotiation(NegotiationError::Cancelled)) => {
                log::info!("Negotiation of session {} cancelled", session.id());
                Err(SessionError::Negotiation(NegotiationError::Cancelled).into())
            }
            Err(e) => Err(self.alert(e)),
        }
    }

    pub async fn stop(&self) -> Result<(), ActionError> {
        self.status.append("Stopping stream..");
        let session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(ActionError::NotStarted)?;

        // устройство должно узнать о закрытии до того, как канал пропадёт
        if session.has_data_channel() {
            if let Err(e) = session.send_control(&ControlMessage::StreamClosed).await {
                log::warn!("Failed to send STREAM_CLOSED: {}", e);
            }
        }
        tokio::time::sleep(self.config.stop_delay()).await;

        session.stop().await?;
        Ok(())
    }

    pub async fn start_recording(&self) -> Result<DeviceResponse, ActionError> {
        self.device_action("Start recording...", DeviceAction::RecordStart)
            .await
    }

    pub async fn stop_recording(&self) -> Result<DeviceResponse, ActionError> {
        self.device_action("Stop recording...", DeviceAction::RecordStop)
            .await
    }

    pub async fn power_down(&self) -> Result<DeviceResponse, ActionError> {
        self.device_action("Powering down...", DeviceAction::PowerDown)
            .await
    }

    /// `true`, если оператор подтвердил и запрос ушёл
    pub async fn confirm_power_down<C: Confirm>(&self, confirm: &C) -> Result<bool, ActionError> {
        if !confirm.confirm(POWER_DOWN_PROMPT) {
            log::info!("Power down declined");
            return Ok(false);
        }
        self.power_down().await?;
        Ok(true)
    }

    pub async fn send_control(&self, message: ControlMessage) -> Result<(), ActionError> {
        let session = self
            .session
            .lock()
            .await
            .clone()
            .ok_or(ActionError::NotStarted)?;
        session.send_control(&message).await?;
        Ok(())
    }

    async fn open_session(&self) -> Result<Arc<Session>, SessionError> {
        let engine = self.factory.connect(&self.config).await?;
        let session = Arc::new(Session::open(engine, self.signaling.clone(), &self.config));

        let callbacks = ChannelCallbacks {
            on_open: Some(Box::new({
                let status = self.status.clone();
                move || status.append("[DC] opened")
            })),
            on_close: Some(Box::new({
                let status = self.status.clone();
                move || status.append("[DC] closed")
            })),
            on_message: Some(Box::new({
                let status = self.status.clone();
                move |text: &str| append_inbound(&status, text)
            })),
        };
        session
            .create_data_channel(&self.config.data_channel_label, callbacks)
            .await?;

        let status = self.status.clone();
        session
            .add_media_handles(
                None,
                Some(Box::new(move |track: &TrackEvent| {
                    status.append(format!("[Track] video received ({})", track.track_id))
                })),
            )
            .await?;
        Ok(session)
    }

    fn alert(&self, error: SessionError) -> ActionError {
        let message = error.to_string();
        log::error!("Stream failed: {}", message);
        self.alerts.emit(&message);
        error.into()
    }

    async fn device_action(
        &self,
        line: &str,
        action: DeviceAction,
    ) -> Result<DeviceResponse, ActionError> {
        self.status.append(line);
        let response = self.device.trigger(action).await.map_err(|e| {
            log::error!("{} failed: {}", action.path(), e);
            e
        })?;

        if response.is_success() {
            log::info!("{} -> {} {}", action.path(), response.status, response.body);
        } else {
            log::warn!("{} -> {} {}", action.path(), response.status, response.body);
        }
        Ok(response)
    }
}

/// JSON от устройства пишется в статус как есть, строка JSON без кавычек
fn append_inbound(status: &StatusLog, text: &str) {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::String(line)) => status.append(line),
        Ok(value) => {
            if let Ok(reply) = serde_json::from_value::<DeviceReply>(value.clone()) {
                log::debug!("Device reply {} with payload {}", reply.kind, reply.payload);
            }
            status.append(value.to_string());
        }
        Err(e) => {
            log::warn!("Data channel message is not JSON ({}): {}", e, text);
            status.append(text);
        }
    }
}
