//! Shared fixtures for the ticket integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use tapgate_protocol::AuthInfo;
use tapgate_ticket::{
    message_hash, ProofOracle, TicketConfig, TicketError, TicketPcd, TicketSessionRecord,
    TicketSessionStore, TokenCodec, TICKET_PCD_TYPE,
};

pub const SECRET: &str = "test-secret";
pub const WATERMARK: &str = "tapgate test faucet";
pub const NULLIFIER: &str = "tapgate test nullifier";

/// Oracle with a fixed verdict.
pub enum Oracle {
    Accept,
    Reject,
    Fail,
}

#[async_trait]
impl ProofOracle for Oracle {
    async fn verify(&self, _pcd: &TicketPcd) -> Result<bool, TicketError> {
        match self {
            Oracle::Accept => Ok(true),
            Oracle::Reject => Ok(false),
            Oracle::Fail => Err(TicketError::Oracle("prover offline".into())),
        }
    }
}

pub fn config() -> TicketConfig {
    TicketConfig {
        enabled: true,
        watermark: WATERMARK.into(),
        external_nullifier: NULLIFIER.into(),
        token_secret: Some(SECRET.into()),
        ..TicketConfig::default()
    }
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, 3_600)
}

/// A ticket proof that passes every stage under [`config`].
pub fn valid_ticket() -> Value {
    json!({
        "id": "pcd-1",
        "claim": {
            "partialTicket": {
                "ticketId": "ticket-1",
                "eventId": "event-1",
                "productId": "product-1",
                "attendeeSemaphoreId": "attendee-1"
            },
            "watermark": message_hash(WATERMARK).to_string(),
            "externalNullifier": message_hash(NULLIFIER).to_string(),
            "signer": ["signer-x", "signer-y"]
        },
        "proof": {}
    })
}

/// Wraps a ticket proof in the serialized-PCD envelope.
pub fn envelope(ticket: &Value) -> String {
    json!({ "type": TICKET_PCD_TYPE, "pcd": ticket.to_string() }).to_string()
}

pub fn identity(attendee: &str) -> AuthInfo {
    AuthInfo {
        ticket_id: format!("ticket-of-{attendee}"),
        product_id: "product-1".into(),
        event_id: "event-1".into(),
        attendee_id: attendee.into(),
        token: String::new(),
    }
}

/// A faucet token for `attendee`, signed with [`SECRET`].
pub fn token_for(attendee: &str) -> String {
    codec().issue(identity(attendee)).unwrap().token
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
