//! Device-selector updates: a viewer picks which device a selector targets.
//!
//! The new choice is stored on the dashboard, mirrored to the other viewers,
//! and every viewer following the dashboard is replayed the stored pin values
//! of the newly selected device so its widgets redraw.

use tracing::debug;

use crate::codec::{BODY_SEPARATOR, DEVICE_SEPARATOR, SelectorUpdate, write_op_spec};
use crate::dashboard::{Dashboard, WidgetKind};
use crate::message::{Command, ProtocolMessage};
use crate::session::Session;

use super::sharing::{Reply, ShareError, Viewer};

/// Id used for replayed pin values; they answer no request.
pub const REPLAY_MESSAGE_ID: u16 = 0;

/// Apply a `'u'` operation.
///
/// # Errors
///
/// Returns `NoSelectorWidget` when the dashboard has no widget with that id.
/// A widget that exists but isn't a device selector is ignored.
pub fn update_selection(
    session: &Session,
    viewer: &Viewer,
    dash: &Dashboard,
    msg: &ProtocolMessage,
    op_spec: &str,
) -> Result<Reply, ShareError> {
    let cmd = match SelectorUpdate::parse(op_spec) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(id = msg.id, error = %e, "selector: invalid update command");
            return Ok(Some(ProtocolMessage::illegal_command_body(msg.id)));
        }
    };

    let widget = dash
        .widget(cmd.widget_id)
        .ok_or(ShareError::NoSelectorWidget(cmd.widget_id))?;
    if widget.kind != WidgetKind::DeviceSelector {
        debug!(dash_id = dash.id, widget_id = widget.id, "selector: widget is not a device selector");
        return Ok(None);
    }

    dash.select_device(widget.id, cmd.device_id);
    debug!(dash_id = dash.id, widget_id = widget.id, device_id = cmd.device_id, "selector: device selected");

    let share_token = dash.share_token.as_deref();
    session.sync_to_apps(viewer.conn_id, share_token, &msg.retag(Command::AppSync));

    let replay = replay_messages(dash, cmd.device_id);
    if !replay.is_empty() {
        for app in session.app_connections() {
            if !app.needs_sync(share_token) {
                continue;
            }
            for pin_msg in &replay {
                if !app.conn.is_writable() {
                    break;
                }
                app.conn.send(pin_msg.clone());
            }
        }
    }

    Ok(Some(ProtocolMessage::ok(msg.id)))
}

/// `AppSync` messages carrying every stored pin value of `device_id`.
#[must_use]
pub fn replay_messages(dash: &Dashboard, device_id: i32) -> Vec<ProtocolMessage> {
    dash.device_pins(device_id)
        .into_iter()
        .map(|(key, value)| {
            let op_spec = write_op_spec(key.pin_type, key.pin, &value);
            let body = format!("{}{DEVICE_SEPARATOR}{device_id}{BODY_SEPARATOR}{op_spec}", dash.id);
            ProtocolMessage::new(Command::AppSync, REPLAY_MESSAGE_ID, body)
        })
        .collect()
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
