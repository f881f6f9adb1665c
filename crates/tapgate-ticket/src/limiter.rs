//! Per-attendee concurrency limit.

use tapgate_protocol::{AdmissionError, SessionId};
use tapgate_session::Session;

use crate::codes::TICKET_CONCURRENCY_LIMIT;
use crate::keys::TicketAuth;

/// Rejects `candidate` if `limit` other active sessions already belong to
/// `attendee_id`. A limit of 0 disables the check.
///
/// `active` is a snapshot of the session registry. Two sessions of the same
/// attendee starting at the same instant can both pass; that race is
/// accepted.
pub fn check_concurrency<'a>(
    limit: u32,
    attendee_id: &str,
    candidate: &SessionId,
    active: impl IntoIterator<Item = &'a Session>,
) -> Result<(), AdmissionError> {
    if limit == 0 {
        return Ok(());
    }

    let concurrent = active
        .into_iter()
        .filter(|session| session.id() != candidate)
        .filter(|session| match session.get::<TicketAuth>() {
            Ok(info) => info.is_some_and(|info| info.attendee_id == attendee_id),
            Err(err) => {
                tracing::warn!(session_id = %session.id(), error = %err, "unreadable ticket identity, not counted");
                false
            }
        })
        .count();

    if concurrent >= limit as usize {
        tracing::debug!(attendee_id, concurrent, limit, session_id = %candidate, "concurrency limit reached");
        return Err(AdmissionError::new(
            TICKET_CONCURRENCY_LIMIT,
            format!("Only {limit} concurrent sessions allowed per ticket holder"),
        ));
    }
    Ok(())
}
