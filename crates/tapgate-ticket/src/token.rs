//! Faucet bearer tokens.
//!
//! After a proof verifies, the browser gets a token instead of keeping the
//! proof around. It sends the token back in the session-start input, and
//! the server trusts it without re-running the proof because it carries an
//! HMAC over its own payload.
//!
//! Layout: `base64url(json payload) "." hex(hmac-sha256(secret, base64 part))`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tapgate_protocol::AuthInfo;

use crate::TicketError;

type HmacSha256 = Hmac<Sha256>;

/// What a token vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    ticket_id: String,
    product_id: String,
    event_id: String,
    attendee_id: String,
    /// Unix seconds.
    issued_at: i64,
    /// Unix seconds.
    expires_at: i64,
}

/// Issues and checks faucet tokens.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    lifetime_secs: i64,
}

impl TokenCodec {
    /// Creates a codec signing with `secret`.
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: i64::try_from(lifetime_secs).unwrap_or(i64::MAX),
        }
    }

    /// Creates a codec with a random 32-byte secret.
    pub fn random(lifetime_secs: u64) -> Self {
        let secret: [u8; 32] = rand::rng().random();
        Self::new(secret.to_vec(), lifetime_secs)
    }

    /// Issues a token for the identity fields of `info` and returns `info`
    /// with its `token` filled in.
    pub fn issue(&self, mut info: AuthInfo) -> Result<AuthInfo, TicketError> {
        self.issue_at(&mut info, Utc::now().timestamp())?;
        Ok(info)
    }

    fn issue_at(&self, info: &mut AuthInfo, now: i64) -> Result<(), TicketError> {
        let payload = TokenPayload {
            ticket_id: info.ticket_id.clone(),
            product_id: info.product_id.clone(),
            event_id: info.event_id.clone(),
            attendee_id: info.attendee_id.clone(),
            issued_at: now,
            expires_at: now.saturating_add(self.lifetime_secs),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| TicketError::Token(format!("encode failed: {e}")))?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let signature = hex::encode(self.sign(body.as_bytes())?);
        info.token = format!("{body}.{signature}");
        Ok(())
    }

    /// Checks a token's signature and expiry and returns the identity it
    /// vouches for, with `token` set to the token itself.
    ///
    /// # Errors
    /// [`TicketError::Token`] for anything malformed, forged or expired.
    pub fn parse(&self, token: &str) -> Result<AuthInfo, TicketError> {
        self.parse_at(token, Utc::now().timestamp())
    }

    fn parse_at(&self, token: &str, now: i64) -> Result<AuthInfo, TicketError> {
        let (body, signature) = token
            .split_once('.')
            .ok_or_else(|| TicketError::Token("missing signature".into()))?;

        let signature =
            hex::decode(signature).map_err(|_| TicketError::Token("signature is not hex".into()))?;
        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TicketError::Token("signature mismatch".into()))?;

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| TicketError::Token("payload is not base64".into()))?;
        let payload: TokenPayload = serde_json::from_slice(&json)
            .map_err(|e| TicketError::Token(format!("payload decode failed: {e}")))?;

        if payload.expires_at <= now {
            return Err(TicketError::Token("token expired".into()));
        }

        Ok(AuthInfo {
            ticket_id: payload.ticket_id,
            product_id: payload.product_id,
            event_id: payload.event_id,
            attendee_id: payload.attendee_id,
            token: token.to_string(),
        })
    }

    fn mac(&self) -> Result<HmacSha256, TicketError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TicketError::Token(format!("bad secret: {e}")))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, TicketError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}
