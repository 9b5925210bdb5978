use crate::error::NegotiationError;
use crate::peer::engine::RtcEngine;
use crate::peer::events::{Flow, ListenerId, Listeners};
use crate::peer::types::{GatheringState, ServerConfig};
use crate::utils::{add_ice_url_scheme, lock};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;

/// Создает конфигурацию для peer connection.
/// webrtc-rs работает только в unified-plan, отдельно его включать не нужно.
pub fn rtc_config(servers: &[ServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_user_ice_servers(servers),
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

/// ServerConfig из настроек → RTCIceServer
pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Ждёт, пока ICE gathering дойдёт до `Complete`.
///
/// Если сбор уже закончен, подписка не создаётся. Иначе обработчик снимает
/// себя на первом `Complete`; при таймауте подписку снимаем здесь.
pub async fn wait_for_gathering_complete(
    engine: &dyn RtcEngine,
    limit: Option<Duration>,
) -> Result<(), NegotiationError> {
    if engine.ice_gathering_state() == GatheringState::Complete {
        log::debug!("ICE gathering already complete");
        return Ok(());
    }

    let (tx, rx) = oneshot::channel::<()>();
    let tx = Mutex::new(Some(tx));
    let events = engine.gathering_events();
    let subscription = Subscription {
        events,
        id: events.subscribe_until(move |state| {
            if *state != GatheringState::Complete {
                return Flow::Continue;
            }
            if let Some(tx) = lock(&tx).take() {
                let _ = tx.send(());
            }
            Flow::Done
        }),
    };

    // состояние могло смениться между проверкой и подпиской
    if engine.ice_gathering_state() == GatheringState::Complete {
        log::debug!("ICE gathering completed while subscribing");
        return Ok(());
    }

    log::debug!("Waiting for ICE gathering to complete...");
    let outcome = match limit {
        Some(limit) => match timeout(limit, rx).await {
            Ok(_) => Ok(()),
            Err(_) => Err(NegotiationError::GatheringTimeout(limit)),
        },
        // Отправитель живёт в обработчике, поэтому `rx` закрывается только вместе с ним
        None => rx.await.map_err(|_| NegotiationError::Cancelled),
    };
    drop(subscription);
    outcome
}

/// Снимает подписку при выходе, в том числе когда ожидание отменили
struct Subscription<'a> {
    events: &'a Listeners<GatheringState>,
    id: ListenerId,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.events.unsubscribe(self.id);
    }
}

/// Счётчик кандидатов по итоговому SDP (non-trickle)
pub fn analyze_candidates(sdp: &str) -> (usize, usize, usize) {
    let mut host_count = 0;
    let mut srflx_count = 0;
    let mut relay_count = 0;

    for line in sdp.lines().filter(|l| l.starts_with("a=candidate:")) {
        if line.contains("typ host") {
            host_count += 1;
        } else if line.contains("typ srflx") {
            srflx_count += 1;
        } else if line.contains("typ relay") {
            relay_count += 1;
        }
    }

    log::info!(
        "Candidate analysis: {} host, {} srflx, {} relay",
        host_count,
        srflx_count,
        relay_count
    );

    if host_count + srflx_count + relay_count == 0 {
        log::warn!("Local description carries no ICE candidates");
    }
    (host_count, srflx_count, relay_count)
}
