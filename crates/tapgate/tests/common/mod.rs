//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tapgate::prelude::*;
use tapgate_ticket::{
    message_hash, TicketError, TicketPcd, TicketSessionRecord, TicketSessionStore, TokenCodec,
    TICKET_PCD_TYPE,
};

pub const SECRET: &str = "e2e-secret";
pub const WATERMARK: &str = "e2e faucet";
pub const NULLIFIER: &str = "e2e nullifier";

/// Trusts every proof.
pub struct AcceptAll;

#[async_trait]
impl ProofOracle for AcceptAll {
    async fn verify(&self, _pcd: &TicketPcd) -> Result<bool, TicketError> {
        Ok(true)
    }
}

pub fn ticket_config() -> TicketConfig {
    TicketConfig {
        enabled: true,
        watermark: WATERMARK.into(),
        external_nullifier: NULLIFIER.into(),
        token_secret: Some(SECRET.into()),
        ..TicketConfig::default()
    }
}

pub fn ticket_module(config: TicketConfig, store: &MemoryTicketStore) -> TicketModule {
    TicketModule::new(config, Arc::new(store.clone()), Arc::new(AcceptAll)).unwrap()
}

/// A faucet token for `attendee`, as the callback would have issued it.
pub fn token_for(attendee: &str) -> String {
    TokenCodec::new(SECRET, 3_600)
        .issue(AuthInfo {
            ticket_id: format!("ticket-of-{attendee}"),
            product_id: "product-1".into(),
            event_id: "event-1".into(),
            attendee_id: attendee.into(),
            token: String::new(),
        })
        .unwrap()
        .token
}

/// A serialized proof envelope for `attendee` that passes verification.
pub fn proof_for(attendee: &str) -> String {
    let ticket = json!({
        "id": "pcd-1",
        "claim": {
            "partialTicket": {
                "ticketId": format!("ticket-of-{attendee}"),
                "eventId": "event-1",
                "productId": "product-1",
                "attendeeSemaphoreId": attendee,
            },
            "watermark": message_hash(WATERMARK).to_string(),
            "externalNullifier": message_hash(NULLIFIER).to_string(),
            "signer": ["s1", "s2"],
        },
        "proof": {},
    });
    json!({ "type": TICKET_PCD_TYPE, "pcd": ticket.to_string() }).to_string()
}

/// A ticket-session store whose disk is gone.
pub struct BrokenStore {
    pub fail_reads: bool,
    pub fail_writes: bool,
}

fn disk_gone() -> TicketError {
    TicketError::Store(sled::Error::Io(std::io::Error::other("disk gone")))
}

#[async_trait]
impl TicketSessionStore for BrokenStore {
    async fn insert(&self, _record: TicketSessionRecord) -> Result<(), TicketError> {
        if self.fail_writes {
            return Err(disk_gone());
        }
        Ok(())
    }

    async fn sessions_since(
        &self,
        _attendee_id: &str,
        _window_secs: u64,
    ) -> Result<Vec<TicketSessionRecord>, TicketError> {
        if self.fail_reads {
            return Err(disk_gone());
        }
        Ok(Vec::new())
    }
}
