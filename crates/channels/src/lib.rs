//! Inbound contact-center events for assistline.
//!
//! The contact center pushes conversation events over a signed webhook.
//! This crate verifies the signature, parses the event, and appends the
//! resulting message to the ledger:
//!
//! - **signature**: HMAC-SHA256 over the raw body, constant-time compared
//! - **contact_center**: event model, parsing and the ledger-facing handler

pub mod contact_center;
pub mod signature;

pub use contact_center::{
    AckStatus, ContactCenterEvent, ContactCenterHandler, EventAck, InboundError, UNKNOWN_EVENT,
};
pub use signature::SignatureVerifier;
