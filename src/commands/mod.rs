pub mod device_api;
pub mod stream_api;

use tauri::{AppHandle, Emitter};

pub const STATUS_EVENT: &str = "camstream-status";
pub const ALERT_EVENT: &str = "camstream-alert";

/// Событие во фронтенд; ошибка только логируется
pub fn emit_event(app: &AppHandle, event: &str, payload: &str) {
    if let Err(e) = app.emit(event, payload) {
        log::warn!("Failed to emit event {}: {:?}", event, e);
    }
}
