//! Offer/answer с сервером устройства через один `POST /offer`.
//!
//! Шаги строго по порядку, каждый принимает результат предыдущего:
//! [`OfferCreated`] → [`LocalApplied`] → [`GatheringComplete`] →
//! [`AnswerReceived`] → [`RemoteApplied`]. Ошибка любого шага обрывает
//! последовательность; отката нет.

use crate::error::{NegotiationError, TransportError};
use crate::peer::engine::RtcEngine;
use crate::peer::ice::{analyze_candidates, wait_for_gathering_complete};
use crate::peer::types::{OfferRequest, SessionDescription, StreamOptions};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Обмен offer → answer с сервером
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn post_offer(&self, offer: &OfferRequest) -> Result<SessionDescription, TransportError>;
}

#[derive(Debug)]
pub struct OfferCreated(pub SessionDescription);

#[derive(Debug)]
pub struct LocalApplied(pub SessionDescription);

/// Локальное описание с собранными кандидатами
#[derive(Debug)]
pub struct GatheringComplete(pub SessionDescription);

#[derive(Debug)]
pub struct AnswerReceived(pub SessionDescription);

#[derive(Debug)]
pub struct RemoteApplied;

pub struct SignalingClient {
    engine: Arc<dyn RtcEngine>,
    transport: Arc<dyn SignalingTransport>,
    gathering_timeout: Option<Duration>,
}

impl SignalingClient {
    pub fn new(
        engine: Arc<dyn RtcEngine>,
        transport: Arc<dyn SignalingTransport>,
        gathering_timeout: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            transport,
            gathering_timeout,
        }
    }

    pub async fn negotiate(&self, options: &StreamOptions) -> Result<RemoteApplied, NegotiationError> {
        let offer = self.create_offer().await?;
        let local = self.apply_local(offer).await?;
        let gathered = self.await_gathering(local).await?;
        let answer = self.exchange(gathered, options).await?;
        self.apply_remote(answer).await
    }

    pub async fn create_offer(&self) -> Result<OfferCreated, NegotiationError> {
        log::info!("Creating offer...");
        let offer = self
            .engine
            .create_offer()
            .await
            .map_err(NegotiationError::OfferCreation)?;
        Ok(OfferCreated(offer))
    }

    pub async fn apply_local(&self, offer: OfferCreated) -> Result<LocalApplied, NegotiationError> {
        log::info!("Setting local description (offer)...");
        self.engine
            .set_local_description(offer.0.clone())
            .await
            .map_err(NegotiationError::LocalDescription)?;
        Ok(LocalApplied(offer.0))
    }

    /// Ждём ICE gathering; берём итоговое описание, в нём уже есть кандидаты
    pub async fn await_gathering(
        &self,
        local: LocalApplied,
    ) -> Result<GatheringComplete, NegotiationError> {
        wait_for_gathering_complete(self.engine.as_ref(), self.gathering_timeout).await?;

        let finalized = match self.engine.local_description().await {
            Some(desc) => desc,
            None => {
                log::warn!("Engine reports no local description, sending the applied offer");
                local.0
            }
        };
        analyze_candidates(&finalized.sdp);
        Ok(GatheringComplete(finalized))
    }

    pub async fn exchange(
        &self,
        gathered: GatheringComplete,
        options: &StreamOptions,
    ) -> Result<AnswerReceived, NegotiationError> {
        let request = OfferRequest::new(gathered.0, options.clone());
        let answer = self
            .transport
            .post_offer(&request)
            .await
            .map_err(NegotiationError::SignalingTransport)?;
        Ok(AnswerReceived(answer))
    }

    pub async fn apply_remote(&self, answer: AnswerReceived) -> Result<RemoteApplied, NegotiationError> {
        log::info!("Setting remote description ({:?})...", answer.0.kind);
        self.engine
            .set_remote_description(answer.0)
            .await
            .map_err(NegotiationError::RemoteDescription)?;
        log::info!("Remote description set successfully");
        Ok(RemoteApplied)
    }
}
