use super::*;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use crate::codec::PinType;
use crate::dashboard::{Dashboard, DashboardConfig, Device, Tag, Widget, WidgetKind};
use crate::message::{Command, ProtocolMessage};
use crate::services::sharing::Viewer;
use crate::session::{AppConnection, Connection, HardwareConnection};

pub const OWNER: &str = "owner@example.com";
pub const SHARE_TOKEN: &str = "share-42";
pub const DASH_ID: i32 = 42;
pub const PUMP: i32 = 101;
pub const FAN: i32 = 102;
/// Tag grouping `PUMP` and `FAN`.
pub const TAG_ID: i32 = 100_005;
pub const EMPTY_TAG_ID: i32 = 100_006;
/// Device selector initially pointing at `PUMP`.
pub const SELECTOR_ID: i32 = 200_000;
/// Device selector with no saved choice; addresses the default device.
pub const UNSET_SELECTOR_ID: i32 = 200_001;

const TEST_QUEUE_DEPTH: usize = 8;

fn widget(id: i64, kind: WidgetKind, device_id: i32, pin: Option<(PinType, u8)>) -> Widget {
    Widget {
        id,
        kind,
        device_id,
        pin_type: pin.map(|(t, _)| t),
        pin: pin.map(|(_, p)| p),
        selected_device: None,
    }
}

/// Dashboard 42: active, shared, two devices grouped by a tag.
#[must_use]
pub fn scenario_dashboard() -> DashboardConfig {
    let mut selector = widget(i64::from(SELECTOR_ID), WidgetKind::DeviceSelector, 0, None);
    selector.selected_device = Some(PUMP);

    DashboardConfig {
        id: DASH_ID,
        name: "greenhouse".into(),
        is_active: true,
        is_shared: true,
        share_token: Some(SHARE_TOKEN.into()),
        devices: vec![
            Device { id: 0, name: "default".into() },
            Device { id: PUMP, name: "pump".into() },
            Device { id: FAN, name: "fan".into() },
        ],
        tags: vec![
            Tag { id: TAG_ID, name: "all".into(), device_ids: vec![PUMP, FAN] },
            Tag { id: EMPTY_TAG_ID, name: "empty".into(), device_ids: vec![] },
        ],
        widgets: vec![
            widget(1, WidgetKind::Button, PUMP, Some((PinType::Digital, 3))),
            widget(2, WidgetKind::Gauge, PUMP, Some((PinType::Virtual, 1))),
            widget(3, WidgetKind::Terminal, FAN, Some((PinType::Virtual, 4))),
            selector,
            widget(i64::from(UNSET_SELECTOR_ID), WidgetKind::DeviceSelector, 0, None),
        ],
    }
}

/// App state whose only user, `OWNER`, owns `dashboards`.
#[must_use]
pub fn test_app_state_with(dashboards: Vec<DashboardConfig>) -> AppState {
    let profiles = ProfileStore::from_users([(OWNER.to_owned(), dashboards)]).expect("fixture profiles are valid");
    AppState::new(profiles, TEST_QUEUE_DEPTH)
}

#[must_use]
pub fn test_app_state() -> AppState {
    test_app_state_with(vec![scenario_dashboard()])
}

/// Scenario state with the dashboard's active and shared flags overridden.
#[must_use]
pub fn test_app_state_with_flags(is_active: bool, is_shared: bool) -> AppState {
    test_app_state_with(vec![DashboardConfig { is_active, is_shared, ..scenario_dashboard() }])
}

#[must_use]
pub fn dashboard(state: &AppState, dash_id: i32) -> Arc<Dashboard> {
    let owner = state.profiles.user(OWNER).expect("owner exists");
    owner
        .profile
        .dash_by_id(dash_id)
        .cloned()
        .expect("dashboard exists")
}

/// Register an app connection for `OWNER` and return it as a viewer.
pub fn connect_app(state: &AppState, share_token: Option<&str>) -> (Viewer, mpsc::Receiver<ProtocolMessage>) {
    connect_app_with_depth(state, share_token, TEST_QUEUE_DEPTH)
}

pub fn connect_app_with_depth(
    state: &AppState,
    share_token: Option<&str>,
    depth: usize,
) -> (Viewer, mpsc::Receiver<ProtocolMessage>) {
    let (tx, rx) = mpsc::channel(depth);
    let conn = Connection::new(tx);
    let conn_id = conn.id;
    let share_token = share_token.map(str::to_owned);
    state
        .sessions
        .register_app(OWNER, AppConnection { conn, share_token: share_token.clone() });
    let user = state.profiles.user(OWNER).expect("owner exists");
    (Viewer { user, share_token, conn_id }, rx)
}

/// Register a hardware link for `OWNER`.
pub fn connect_hardware(state: &AppState, dash_id: i32, device_id: i32) -> mpsc::Receiver<ProtocolMessage> {
    let (tx, rx) = mpsc::channel(TEST_QUEUE_DEPTH);
    state
        .sessions
        .register_hardware(OWNER, HardwareConnection { conn: Connection::new(tx), dash_id, device_id });
    rx
}

#[must_use]
pub fn hardware_message(id: u16, body: &str) -> ProtocolMessage {
    ProtocolMessage::new(Command::Hardware, id, body)
}

pub async fn assert_channel_has_message(rx: &mut mpsc::Receiver<ProtocolMessage>) -> ProtocolMessage {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("message receive timed out")
        .expect("channel closed")
}

pub async fn assert_channel_empty(rx: &mut mpsc::Receiver<ProtocolMessage>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}
