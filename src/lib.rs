#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod status;
pub mod utils;

pub use config::ClientConfig;
pub use controller::{Confirm, Controller};
pub use error::{ActionError, ConfigError, NegotiationError, SessionError, TransportError};
pub use session::Session;

#[cfg(feature = "desktop")]
pub const CONFIG_FILE: &str = "camstream.toml";

#[cfg(feature = "desktop")]
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    use tauri::Manager;

    logger::init();
    let config = ClientConfig::load_or_default(CONFIG_FILE)?;
    let controller = Controller::with_http(config)?;

    tauri::Builder::default()
        .setup(move |app| {
            let handle = app.handle().clone();
            controller.status().subscribe({
                let handle = handle.clone();
                move |line| commands::emit_event(&handle, commands::STATUS_EVENT, line)
            });
            controller.on_alert(move |message| {
                commands::emit_event(&handle, commands::ALERT_EVENT, message)
            });
            app.manage(controller);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Stream
            commands::stream_api::start_stream,
            commands::stream_api::stop_stream,
            commands::stream_api::send_control,
            commands::stream_api::status_log,
            // Device
            commands::device_api::start_recording,
            commands::device_api::stop_recording,
            commands::device_api::confirm_power_down,
        ])
        .run(tauri::generate_context!())?;
    Ok(())
}
