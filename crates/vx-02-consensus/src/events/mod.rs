//! Rumor payload types emitted and consumed by the consensus subsystem.

pub mod rumors;

pub use rumors::{
    decode_payload, encode_payload, ArtifactAnnouncement, DeregistrationAnnouncement,
    EventAnnouncement, FacilityAnnouncement, ProposalAnnouncement, SignatureAnnouncement,
    TAG_ARTIFACT, TAG_DEREGISTRATION, TAG_EVENT, TAG_FACILITY, TAG_PROPOSAL, TAG_SIGNATURE,
};
