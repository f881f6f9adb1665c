//! Session keys owned by the ticket module.

use tapgate_protocol::AuthInfo;
use tapgate_session::SessionKey;

/// The verified ticket identity of a session. Written once per session.
pub struct TicketAuth;

impl SessionKey for TicketAuth {
    const NAME: &'static str = "ticket.data";
    type Value = AuthInfo;
}

/// Reward factor granted by the ticket grants.
pub struct TicketFactor;

impl SessionKey for TicketFactor {
    const NAME: &'static str = "ticket.factor";
    type Value = f64;
}
