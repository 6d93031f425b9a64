//! Session registry: live connections grouped by principal.
//!
//! ARCHITECTURE
//! ============
//! Every authenticated principal with at least one open connection has one
//! `Session`. A session holds two pools:
//! - app connections (viewers), each optionally bound to a share token;
//! - hardware connections, grouped by dashboard, each bound to a device.
//!
//! Each connection is represented by the sender half of its bounded outbound
//! queue. The connection's own task drains the queue into the socket, so
//! every send here is a non-blocking `try_send`.
//!
//! DESIGN
//! ======
//! Membership only changes on connect/disconnect, through the registry.
//! Fan-out iterates a snapshot taken under a read lock, so a concurrent
//! connect is either fully visible or not at all.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::message::ProtocolMessage;

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Handle to one connection's outbound queue.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: Uuid,
    tx: mpsc::Sender<ProtocolMessage>,
}

impl Connection {
    #[must_use]
    pub fn new(tx: mpsc::Sender<ProtocolMessage>) -> Self {
        Self { id: Uuid::new_v4(), tx }
    }

    /// Open and not backed up.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        !self.tx.is_closed() && self.tx.capacity() > 0
    }

    /// Best-effort enqueue. Returns `false` if the queue is full or closed.
    pub fn send(&self, msg: ProtocolMessage) -> bool {
        self.tx.try_send(msg).is_ok()
    }
}

/// An app instance viewing the principal's dashboards.
#[derive(Debug, Clone)]
pub struct AppConnection {
    pub conn: Connection,
    /// Set when the viewer logged in through a share grant rather than as owner.
    pub share_token: Option<String>,
}

impl AppConnection {
    /// Owner connections see every dashboard; shared ones only their grant.
    #[must_use]
    pub fn needs_sync(&self, share_token: Option<&str>) -> bool {
        match self.share_token.as_deref() {
            None => true,
            Some(own) => share_token == Some(own),
        }
    }
}

/// A physical device link bound to one dashboard.
#[derive(Debug, Clone)]
pub struct HardwareConnection {
    pub conn: Connection,
    pub dash_id: i32,
    pub device_id: i32,
}

/// Outcome of a hardware forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareDelivery {
    /// Connections bound to a requested device on the dashboard.
    pub matched: usize,
    /// Matched connections whose queue accepted the message.
    pub delivered: usize,
}

impl HardwareDelivery {
    #[must_use]
    pub fn no_device_in_network(self) -> bool {
        self.matched == 0
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Default)]
pub struct Session {
    apps: RwLock<HashMap<Uuid, AppConnection>>,
    hardware: RwLock<HashMap<i32, HashMap<Uuid, HardwareConnection>>>,
}

impl Session {
    fn add_app(&self, app: AppConnection) {
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.conn.id, app);
    }

    fn add_hardware(&self, hw: HardwareConnection) {
        self.hardware
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(hw.dash_id)
            .or_default()
            .insert(hw.conn.id, hw);
    }

    /// Remove a connection from whichever pool holds it.
    fn remove(&self, conn_id: Uuid) -> bool {
        if self
            .apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn_id)
            .is_some()
        {
            return true;
        }

        let mut hardware = self.hardware.write().unwrap_or_else(PoisonError::into_inner);
        let Some(dash_id) = hardware
            .iter()
            .find_map(|(dash_id, conns)| conns.contains_key(&conn_id).then_some(*dash_id))
        else {
            return false;
        };
        if let Some(conns) = hardware.get_mut(&dash_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                hardware.remove(&dash_id);
            }
        }
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.read().unwrap_or_else(PoisonError::into_inner).is_empty()
            && self
                .hardware
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    /// Snapshot of the app connections.
    #[must_use]
    pub fn app_connections(&self) -> Vec<AppConnection> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Snapshot of the hardware connections bound to `dash_id`.
    #[must_use]
    pub fn hardware_connections(&self, dash_id: i32) -> Vec<HardwareConnection> {
        self.hardware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dash_id)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Mirror `msg` to every writable app connection, other than `origin`,
    /// that follows `share_token`. Returns how many copies were enqueued.
    pub fn sync_to_apps(&self, origin: Uuid, share_token: Option<&str>, msg: &ProtocolMessage) -> usize {
        let mut sent = 0;
        for app in self.app_connections() {
            if app.conn.id == origin || !app.conn.is_writable() || !app.needs_sync(share_token) {
                continue;
            }
            if app.conn.send(msg.clone()) {
                sent += 1;
            }
        }
        sent
    }

    /// Forward `msg` to the hardware connections of `dash_id` bound to any of
    /// `device_ids`.
    pub fn send_to_hardware(&self, dash_id: i32, device_ids: &[i32], msg: &ProtocolMessage) -> HardwareDelivery {
        let mut delivery = HardwareDelivery::default();
        for hw in self.hardware_connections(dash_id) {
            if !device_ids.contains(&hw.device_id) {
                continue;
            }
            delivery.matched += 1;
            if hw.conn.is_writable() && hw.conn.send(msg.clone()) {
                delivery.delivered += 1;
            }
        }
        delivery
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Principal → live session. Sessions exist exactly while they have connections.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, user_key: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_key)
            .cloned()
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register_app(&self, user_key: &str, app: AppConnection) -> Arc<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(user_key.to_owned()).or_default().clone();
        session.add_app(app);
        session
    }

    pub fn register_hardware(&self, user_key: &str, hw: HardwareConnection) -> Arc<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(user_key.to_owned()).or_default().clone();
        session.add_hardware(hw);
        session
    }

    /// Drop a connection; the session goes with its last connection.
    pub fn unregister(&self, user_key: &str, conn_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = sessions.get(user_key) else {
            return false;
        };
        let removed = session.remove(conn_id);
        if session.is_empty() {
            sessions.remove(user_key);
        }
        removed
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
