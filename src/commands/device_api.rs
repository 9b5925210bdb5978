use crate::controller::Controller;
use tauri::{command, State};

// GET-кнопки устройства; возвращают HTTP статус

#[command]
pub async fn start_recording(controller: State<'_, Controller>) -> Result<u16, String> {
    controller
        .start_recording()
        .await
        .map(|r| r.status)
        .map_err(|e| e.to_string())
}

#[command]
pub async fn stop_recording(controller: State<'_, Controller>) -> Result<u16, String> {
    controller
        .stop_recording()
        .await
        .map(|r| r.status)
        .map_err(|e| e.to_string())
}

/// Диалог подтверждения показывает фронтенд, сюда приходит ответ оператора
#[command]
pub async fn confirm_power_down(
    controller: State<'_, Controller>,
    confirmed: bool,
) -> Result<bool, String> {
    controller
        .confirm_power_down(&move |prompt: &str| {
            log::info!("{} -> {}", prompt, confirmed);
            confirmed
        })
        .await
        .map_err(|e| e.to_string())
}
