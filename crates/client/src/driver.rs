//! Connects a [`Session`] to a [`Transport`] and pumps it until it stops.

use bytes::Bytes;
use tracing::{debug, error, info, trace};

use orrery_protocol::wire::Response;
use orrery_protocol::CommandError;

use crate::error::SessionError;
use crate::session::{Directive, Session};
use crate::transport::{Transport, TransportEvent};

/// Drives `session` over `transport` until a fatal error or the peer closes
/// the connection. `on_render` runs after every completed cycle with the
/// session borrowed, so the presentation side can walk the cache.
pub async fn run_session<T, F>(
    session: &mut Session,
    transport: &mut T,
    on_render: F,
) -> Result<(), SessionError>
where
    T: Transport,
    F: FnMut(&Session),
{
    run_cycles(session, transport, u64::MAX, on_render).await
}

/// Like [`run_session`], but returns `Ok(())` once `cycles` render yields
/// have been delivered. The session is left resumable at its render point.
///
/// The loop sends exactly the requests the session hands out and feeds every
/// response straight back, so at no point is more than one request in
/// flight.
pub async fn run_cycles<T, F>(
    session: &mut Session,
    transport: &mut T,
    cycles: u64,
    mut on_render: F,
) -> Result<(), SessionError>
where
    T: Transport,
    F: FnMut(&Session),
{
    let mut remaining = cycles;
    let mut response: Option<Response> = None;
    loop {
        if remaining == 0 {
            return Ok(());
        }
        let directive = match session.advance(response.take()) {
            Ok(directive) => directive,
            Err(err) => {
                error!(error = %err, "session aborted");
                return Err(err);
            }
        };
        match directive {
            Directive::Render => {
                debug!(cycle = session.cycles_completed(), "cycle complete");
                on_render(session);
                remaining -= 1;
            }
            Directive::Send(request) => {
                let text = request.to_json().map_err(CommandError::from)?;
                trace!(cmd = %request.cmd, "sending request");
                transport.send(Bytes::from(text)).await?;
                response = Some(wait_for_reply(transport).await?);
            }
        }
    }
}

/// Blocks on the transport until the single outstanding response arrives.
async fn wait_for_reply<T: Transport>(transport: &mut T) -> Result<Response, SessionError> {
    loop {
        match transport.next_event().await {
            TransportEvent::Opened => {
                trace!("transport opened");
            }
            TransportEvent::Message(payload) => {
                let response = Response::from_json(&payload).map_err(CommandError::from)?;
                trace!(ok = response.ok, "response received");
                return Ok(response);
            }
            TransportEvent::Error(err) => {
                error!(error = %err, "transport failed");
                return Err(err.into());
            }
            TransportEvent::Closed => {
                info!("connection closed by peer");
                return Err(SessionError::ConnectionClosed);
            }
        }
    }
}
