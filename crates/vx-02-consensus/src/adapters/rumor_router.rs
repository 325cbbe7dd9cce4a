//! Gossip-to-consensus routing adapter.
//!
//! Implements the gossip subsystem's `RumorRouter` port for every
//! `consensus.*` tag: declarations update per-key resources, artifacts feed
//! the candidate store, deregistrations release facilitator slots, and
//! events land in the peer event buffers. A tag this adapter does not own
//! yields `None` so the gossip daemon can report it unhandled.
//!
//! Undecodable payloads under an owned tag are dropped with a warning; the
//! outer envelope was already validated, so a decode failure here means a
//! peer is speaking a different schema.

use crate::domain::{Artifact, ConsensusEvent, EpochKey};
use crate::events::{
    decode_payload, ArtifactAnnouncement, DeregistrationAnnouncement, EventAnnouncement,
    FacilityAnnouncement, ProposalAnnouncement, SignatureAnnouncement, TAG_ARTIFACT,
    TAG_DEREGISTRATION, TAG_EVENT, TAG_FACILITY, TAG_PROPOSAL, TAG_SIGNATURE,
};
use crate::ports::{ClusterView, ConsensusFunctions, GossipPublisher, RegistrationTransport};
use crate::service::ConsensusManager;
use async_trait::async_trait;
use shared_types::{Hash, SignedRumor};
use std::sync::Arc;
use tracing::warn;
use vx_01_gossip::ports::RumorRouter;

/// Routes validated `consensus.*` rumors into the manager.
pub struct ConsensusRumorRouter<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
{
    manager: Arc<ConsensusManager<K, A, E, CF, GP, CV, RT>>,
}

impl<K, A, E, CF, GP, CV, RT> ConsensusRumorRouter<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
{
    pub fn new(manager: Arc<ConsensusManager<K, A, E, CF, GP, CV, RT>>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl<K, A, E, CF, GP, CV, RT> RumorRouter for ConsensusRumorRouter<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
    CF: ConsensusFunctions<K, A, E> + 'static,
    GP: GossipPublisher + 'static,
    CV: ClusterView + 'static,
    RT: RegistrationTransport<K> + 'static,
{
    async fn route(&self, _hash: Hash, rumor: SignedRumor) -> Option<()> {
        match rumor.value.tag() {
            TAG_FACILITY => {
                let origin = *rumor.value.origin()?;
                match decode_payload::<FacilityAnnouncement<K>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_facility(origin, announcement).await,
                    Err(e) => warn!(error = %e, "undecodable facility rumor"),
                }
                Some(())
            }
            TAG_PROPOSAL => {
                let origin = *rumor.value.origin()?;
                match decode_payload::<ProposalAnnouncement<K>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_proposal(origin, announcement).await,
                    Err(e) => warn!(error = %e, "undecodable proposal rumor"),
                }
                Some(())
            }
            TAG_SIGNATURE => {
                let origin = *rumor.value.origin()?;
                match decode_payload::<SignatureAnnouncement<K>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_signature(origin, announcement).await,
                    Err(e) => warn!(error = %e, "undecodable signature rumor"),
                }
                Some(())
            }
            TAG_ARTIFACT => {
                match decode_payload::<ArtifactAnnouncement<K, A>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_artifact(announcement).await,
                    Err(e) => warn!(error = %e, "undecodable artifact rumor"),
                }
                Some(())
            }
            TAG_DEREGISTRATION => {
                let origin = *rumor.value.origin()?;
                match decode_payload::<DeregistrationAnnouncement<K>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_deregistration(origin, announcement),
                    Err(e) => warn!(error = %e, "undecodable deregistration rumor"),
                }
                Some(())
            }
            TAG_EVENT => {
                let origin = *rumor.value.origin()?;
                let ordinal = rumor.value.ordinal()?;
                match decode_payload::<EventAnnouncement<E>>(rumor.value.payload()) {
                    Ok(announcement) => self.manager.on_event(origin, ordinal, announcement).await,
                    Err(e) => warn!(error = %e, "undecodable event rumor"),
                }
                Some(())
            }
            _ => None,
        }
    }
}
