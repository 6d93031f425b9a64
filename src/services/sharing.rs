//! Sharing router: pin commands from viewers of a shared dashboard.
//!
//! ARCHITECTURE
//! ============
//! A viewer's app sends `Hardware` commands naming a dashboard and a target
//! (device, tag, or device selector). The router:
//! 1. parses the body,
//! 2. checks the dashboard is active and shared,
//! 3. resolves the target into device ids,
//! 4. applies writes to dashboard pin state,
//! 5. mirrors writes to the principal's other viewers,
//! 6. forwards the op-spec to the matching hardware links.
//!
//! DESIGN
//! ======
//! Routing is synchronous: every lookup is in memory and every send is a
//! `try_send` onto a connection queue, so one message runs to completion
//! without yielding. The router returns the direct reply for the originator
//! (if any) and leaves delivering it to the gateway.
//!
//! ERROR HANDLING
//! ==============
//! - Malformed bodies, inactive or unshared dashboards, and unreachable
//!   devices produce a protocol reply.
//! - A missing or empty write target is a silent no-op. A missing read
//!   widget is a hard fault (`ShareError`).
//! - Dashboard state is never rolled back after a failed forward.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::codec::{CommandBody, Operation, ReadCommand, WriteCommand};
use crate::dashboard::{Dashboard, NoSuchDashboard};
use crate::message::{Command, ErrorCode, ProtocolMessage, Response, now_ms};
use crate::profiles::User;
use crate::session::Session;
use crate::state::AppState;
use crate::target::Target;

use super::selector;

// =============================================================================
// TYPES
// =============================================================================

/// Hard faults: protocol or data inconsistencies the caller must surface.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("no live session for {0}")]
    NoSession(String),
    #[error(transparent)]
    NoSuchDashboard(#[from] NoSuchDashboard),
    #[error("no widget for read command on target {target_id}")]
    NoReadWidget { target_id: i32 },
    #[error("no widget {0} for device selector update")]
    NoSelectorWidget(i64),
}

impl ErrorCode for ShareError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSession(_) => "E_NO_SESSION",
            Self::NoSuchDashboard(_) => "E_NO_SUCH_DASHBOARD",
            Self::NoReadWidget { .. } => "E_NO_READ_WIDGET",
            Self::NoSelectorWidget(_) => "E_NO_SELECTOR_WIDGET",
        }
    }

    fn response(&self) -> Response {
        match self {
            Self::NoSession(_) | Self::NoSuchDashboard(_) => Response::IllegalCommand,
            Self::NoReadWidget { .. } | Self::NoSelectorWidget(_) => Response::IllegalCommandBody,
        }
    }
}

/// The viewer a command came from.
#[derive(Debug, Clone)]
pub struct Viewer {
    /// Principal whose session and profile the command runs against.
    pub user: Arc<User>,
    /// Share grant the viewer connected with; `None` for the owner's own apps.
    pub share_token: Option<String>,
    /// Originating app connection; never receives its own sync copy.
    pub conn_id: Uuid,
}

/// Direct reply for the originator, if the command produced one.
pub type Reply = Option<ProtocolMessage>;

// =============================================================================
// ROUTER
// =============================================================================

/// Route one `Hardware` command from a viewer.
///
/// # Errors
///
/// Returns `NoSession` when the viewer's principal has no live session,
/// `NoSuchDashboard` for unknown dashboard ids, and widget faults for reads
/// or selector updates that name a widget the dashboard doesn't have.
pub fn handle_hardware(state: &AppState, viewer: &Viewer, msg: &ProtocolMessage) -> Result<Reply, ShareError> {
    let email = &viewer.user.email;
    let session = state
        .sessions
        .get(email)
        .ok_or_else(|| ShareError::NoSession(email.clone()))?;

    let body = match CommandBody::parse(&msg.body) {
        Ok(body) => body,
        Err(e) => {
            debug!(id = msg.id, error = %e, "share: malformed command body");
            return Ok(Some(ProtocolMessage::illegal_command_body(msg.id)));
        }
    };

    let dash = viewer.user.profile.dash_by_id_or_fault(body.dash_id)?;

    if !dash.is_active() {
        debug!(dash_id = dash.id, "share: no active dashboard");
        return Ok(Some(ProtocolMessage::no_active_dashboard(msg.id)));
    }

    if !dash.is_shared() {
        debug!(dash_id = dash.id, user = %email, "share: dashboard is not shared");
        return Ok(Some(ProtocolMessage::not_allowed(msg.id)));
    }

    // Only route when the target exists and currently has devices assigned.
    let Some(target) = dash.target(body.target_id) else {
        debug!(dash_id = dash.id, target_id = body.target_id, "share: no assigned target for command");
        return Ok(None);
    };
    if target.device_ids().is_empty() {
        debug!(dash_id = dash.id, target_id = body.target_id, "share: no devices assigned to target");
        return Ok(None);
    }

    match body.operation {
        Operation::SelectorUpdate => selector::update_selection(&session, viewer, dash, msg, body.op_spec),
        Operation::Write => Ok(write(&session, viewer, dash, msg, &body, &target)),
        Operation::Read => read(&session, dash, msg, &body),
    }
}

fn write(
    session: &Session,
    viewer: &Viewer,
    dash: &Dashboard,
    msg: &ProtocolMessage,
    body: &CommandBody<'_>,
    target: &Target,
) -> Reply {
    let cmd = match WriteCommand::parse(body.op_spec) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(id = msg.id, error = %e, "share: invalid write command");
            return Some(ProtocolMessage::illegal_command_body(msg.id));
        }
    };

    let now = now_ms();
    for &device_id in target.device_ids() {
        dash.update(device_id, cmd.pin_type, cmd.pin, cmd.value, now);
    }
    // Tags keep their own last value next to their members'.
    if target.is_tag() {
        dash.update(target.id(), cmd.pin_type, cmd.pin, cmd.value, now);
    }

    if let Some(token) = viewer.share_token.as_deref() {
        let synced = session.sync_to_apps(viewer.conn_id, Some(token), &msg.retag(Command::AppSync));
        debug!(dash_id = dash.id, synced, "share: synced write to viewers");
    }

    let forward = ProtocolMessage::new(Command::Hardware, msg.id, body.op_spec);
    let delivery = session.send_to_hardware(dash.id, target.device_ids(), &forward);
    if delivery.no_device_in_network() {
        debug!(dash_id = dash.id, target_id = body.target_id, "share: no device in session");
        return Some(ProtocolMessage::device_not_in_network(msg.id));
    }
    debug!(
        dash_id = dash.id,
        target_id = body.target_id,
        matched = delivery.matched,
        delivered = delivery.delivered,
        updated_at = dash.updated_at(),
        "share: write forwarded"
    );
    None
}

fn read(session: &Session, dash: &Dashboard, msg: &ProtocolMessage, body: &CommandBody<'_>) -> Result<Reply, ShareError> {
    let cmd = match ReadCommand::parse(body.op_spec) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(id = msg.id, error = %e, "share: invalid read command");
            return Ok(Some(ProtocolMessage::illegal_command_body(msg.id)));
        }
    };

    let widget = dash
        .find_widget_by_pin(body.target_id, cmd.pin_type, cmd.pin)
        .ok_or(ShareError::NoReadWidget { target_id: body.target_id })?;

    // Frequency widgets are polled elsewhere.
    if widget.kind.is_frequency() {
        return Ok(None);
    }

    // Some third-party apps read pins bound to plain widgets; pass those through.
    let forward = ProtocolMessage::new(Command::Hardware, msg.id, body.op_spec);
    if session
        .send_to_hardware(dash.id, &[body.target_id], &forward)
        .no_device_in_network()
    {
        debug!(dash_id = dash.id, target_id = body.target_id, "share: no device in session");
        return Ok(Some(ProtocolMessage::device_not_in_network(msg.id)));
    }
    Ok(None)
}

#[cfg(test)]
#[path = "sharing_test.rs"]
mod tests;
