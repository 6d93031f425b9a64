use super::*;
use crate::dashboard::WidgetKind;

const PROFILES: &str = r"
users:
  - email: owner@example.com
    dashboards:
      - id: 42
        name: greenhouse
        is_active: true
        is_shared: true
        share_token: share-42
        devices:
          - { id: 101, name: pump }
          - { id: 102, name: fan }
        tags:
          - { id: 100005, name: all, device_ids: [101, 102] }
        widgets:
          - { id: 1, kind: button, device_id: 101, pin_type: digital, pin: 3 }
          - { id: 200000, kind: device_selector, selected_device: 102 }
      - id: 43
  - email: other@example.com
";

#[test]
fn from_yaml_builds_users_and_dashboards() {
    let store = ProfileStore::from_yaml(PROFILES).expect("parse");
    assert_eq!(store.len(), 2);

    let owner = store.user("owner@example.com").expect("owner");
    let dash = owner.profile.dash_by_id(42).expect("dash 42");
    assert!(dash.is_active());
    assert!(dash.is_shared());
    assert_eq!(dash.share_token.as_deref(), Some("share-42"));
    assert_eq!(dash.tags[0].device_ids, vec![101, 102]);
    assert_eq!(dash.widgets[1].kind, WidgetKind::DeviceSelector);
    assert_eq!(dash.selected_device(200_000), Some(102));

    let bare = owner.profile.dash_by_id(43).expect("dash 43");
    assert!(!bare.is_active());
    assert!(!bare.is_shared());
}

#[test]
fn dash_by_id_or_fault_reports_missing_id() {
    let store = ProfileStore::from_yaml(PROFILES).expect("parse");
    let owner = store.user("owner@example.com").expect("owner");
    assert_eq!(owner.profile.dash_by_id_or_fault(7).map(|d| d.id), Err(NoSuchDashboard(7)));
}

#[test]
fn dash_by_share_token_finds_shared_dashboard() {
    let store = ProfileStore::from_yaml(PROFILES).expect("parse");
    let owner = store.user("owner@example.com").expect("owner");
    assert_eq!(owner.profile.dash_by_share_token("share-42").map(|d| d.id), Some(42));
    assert!(owner.profile.dash_by_share_token("nope").is_none());
}

#[test]
fn unknown_user_is_none() {
    let store = ProfileStore::from_yaml(PROFILES).expect("parse");
    assert!(store.user("ghost@example.com").is_none());
}

#[test]
fn from_yaml_rejects_duplicate_users() {
    let raw = "users:\n  - email: a@x\n  - email: a@x\n";
    assert!(matches!(ProfileStore::from_yaml(raw), Err(ProfileError::DuplicateUser(email)) if email == "a@x"));
}

#[test]
fn from_yaml_rejects_duplicate_dashboards() {
    let raw = "users:\n  - email: a@x\n    dashboards:\n      - id: 1\n      - id: 1\n";
    assert!(matches!(
        ProfileStore::from_yaml(raw),
        Err(ProfileError::DuplicateDashboard { dash_id: 1, .. })
    ));
}

#[test]
fn from_yaml_rejects_malformed_documents() {
    assert!(matches!(ProfileStore::from_yaml("users: [{ email: 3, dashboards: 7 }]"), Err(ProfileError::Parse(_))));
}

#[test]
fn load_profiles_reports_missing_file() {
    let err = load_profiles(Path::new("/definitely/not/here.yaml")).expect_err("missing file");
    assert!(matches!(err, ProfileError::Io(_)));
}
