use once_cell::sync::OnceCell;
use std::io::Write;
use webrtc::peer_connection::RTCPeerConnection;

static INIT: OnceCell<()> = OnceCell::new();

/// Логирование включено конфигом сборки
pub fn enabled() -> bool {
    // Проверяем конфигурацию логирования
    if !crate::config::LOGGING_ENABLED {
        return false;
    }
    // В режиме разработки дополнительно проверяем dev::ENABLE_LOGGING
    crate::config::dev::ENABLE_LOGGING
}

/// Логирование с временными метками. RUST_LOG переопределяет уровень.
pub fn init() {
    INIT.get_or_init(|| {
        let level = if enabled() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Off
        };

        let result = env_logger::Builder::new()
            .filter_level(level)
            // шум от ICE/DTLS/SCTP
            .filter_module("webrtc", log::LevelFilter::Warn)
            .filter_module("webrtc_ice", log::LevelFilter::Warn)
            .filter_module("webrtc_sctp", log::LevelFilter::Warn)
            .parse_default_env()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "RUST: [{}] {:<5} {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.args()
                )
            })
            .try_init();

        // логгер мог поставить кто-то раньше (тесты, хост-приложение)
        if result.is_err() {
            log::debug!("Logger already initialised");
        }
    });
}

/// Быстрый снимок getStats → выбранная пара
pub async fn dump_selected_pair(pc: &RTCPeerConnection, moment: &str) {
    let stats = pc.get_stats().await;
    for (_, v) in stats.reports {
        if let webrtc::stats::StatsReportType::CandidatePair(pair) = v {
            if pair.nominated {
                log::info!(
                    "STATS {moment}: {}:{}  type: {:?}  bytes={}/{} state={:?}",
                    pair.local_candidate_id,
                    pair.remote_candidate_id,
                    pair.stats_type,
                    pair.bytes_sent,
                    pair.bytes_received,
                    pair.state
                );
            }
        }
    }
}
