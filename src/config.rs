// Конфигурация приложения
// Логирование можно отключить только в режиме разработки

use crate::error::ConfigError;
use crate::peer::types::ServerConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true; // В режиме отладки логирование включено

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false; // В продакшене логирование отключено

// Дополнительные настройки для режима разработки
#[cfg(debug_assertions)]
pub mod dev {
    // Для полного отключения логирования в режиме разработки
    // измените эту константу на false
    // ВАЖНО: Эта настройка работает только в debug режиме!
    pub const ENABLE_LOGGING: bool = true;
}

#[cfg(not(debug_assertions))]
pub mod dev {
    // В продакшене все дополнительные настройки отключены
    pub const ENABLE_LOGGING: bool = false;
}

/// Порт, на котором слушает сервер устройства
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

pub const DEFAULT_CHANNEL_LABEL: &str = "pingChannel";

/// Пауза между STREAM_CLOSED и закрытием соединения
pub const DEFAULT_STOP_DELAY: Duration = Duration::from_millis(100);

/// Настройки клиента. Все поля необязательны в TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Базовый адрес сервера устройства; `/offer` и прочие пути берутся от корня
    pub server_url: String,
    pub ice_servers: Vec<ServerConfig>,
    /// При `None` ждём окончания ICE gathering сколько угодно
    pub gathering_timeout_ms: Option<u64>,
    pub stop_delay_ms: u64,
    pub data_channel_label: String,
    /// Таймаут HTTP-запросов, `None` без таймаута
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            ice_servers: Vec::new(),
            gathering_timeout_ms: None,
            stop_delay_ms: DEFAULT_STOP_DELAY.as_millis() as u64,
            data_channel_label: DEFAULT_CHANNEL_LABEL.into(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Нет файла: дефолтная конфигурация. Битый файл: ошибка
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("Config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.server_url)))?;

        // Та же проверка, что и при ручной установке серверов
        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(ConfigError::InvalidIceServer(
                    "server URL cannot be empty".into(),
                ));
            }
            if server.r#type == "turn"
                && (server.username.is_none() || server.credential.is_none())
            {
                return Err(ConfigError::InvalidIceServer(format!(
                    "TURN server {} requires username and credential",
                    server.url
                )));
            }
        }
        Ok(())
    }

    pub fn gathering_timeout(&self) -> Option<Duration> {
        self.gathering_timeout_ms.map(Duration::from_millis)
    }

    pub fn stop_delay(&self) -> Duration {
        Duration::from_millis(self.stop_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
