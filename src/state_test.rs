use super::*;

#[test]
fn new_state_has_no_sessions() {
    let state = test_helpers::test_app_state();
    assert!(state.sessions.is_empty());
    assert_eq!(state.profiles.len(), 1);
}

#[test]
fn clones_share_the_session_registry() {
    let state = test_helpers::test_app_state();
    let clone = state.clone();
    let (_viewer, _rx) = test_helpers::connect_app(&state, None);
    assert_eq!(clone.sessions.len(), 1);
}
