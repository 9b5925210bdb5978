use crate::controller::Controller;
use crate::peer::types::{ControlMessage, StreamOptions};
use tauri::{command, State};

// Кнопки Start / Stop

#[command]
pub async fn start_stream(
    controller: State<'_, Controller>,
    options: Option<StreamOptions>,
) -> Result<(), String> {
    controller
        .start(options.unwrap_or_default())
        .await
        .map_err(|e| e.to_string())
}

#[command]
pub async fn stop_stream(controller: State<'_, Controller>) -> Result<(), String> {
    controller.stop().await.map_err(|e| e.to_string())
}

/// команда по data-channel, имя в любом регистре
#[command]
pub async fn send_control(controller: State<'_, Controller>, kind: String) -> Result<(), String> {
    let message: ControlMessage = kind.parse()?;
    controller
        .send_control(message)
        .await
        .map_err(|e| e.to_string())
}

#[command]
pub fn status_log(controller: State<'_, Controller>) -> Vec<String> {
    controller.status().lines()
}
