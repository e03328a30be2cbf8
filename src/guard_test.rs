use super::*;
use crate::navigation::HistoryNavigator;
use crate::test_helpers::user;

fn signed_in(role: Role) -> SessionState {
    SessionState::signed_in(user(role))
}

#[test]
fn bootstrapping_session_shows_placeholder() {
    let guard = RouteGuard::roles([Role::Admin]);
    assert_eq!(guard.check(&SessionState::bootstrapping(), "/admin"), GuardDecision::Loading);
}

#[test]
fn unauthenticated_visit_redirects_to_login_and_remembers_location() {
    let decision = RouteGuard::authenticated().check(&SessionState::signed_out(), "/portal/casos");
    assert_eq!(
        decision,
        GuardDecision::Redirect { to: LOGIN_PATH.into(), from: Some("/portal/casos".into()) }
    );
}

#[test]
fn role_in_allow_list_is_admitted() {
    let guard = RouteGuard::roles([Role::Client, Role::Admin, Role::Lawyer]);
    assert_eq!(guard.check(&signed_in(Role::Client), "/portal/casos"), GuardDecision::Allow);
}

#[test]
fn role_outside_allow_list_goes_to_its_home() {
    let guard = RouteGuard::roles([Role::Admin, Role::Lawyer]);
    assert_eq!(
        guard.check(&signed_in(Role::Client), "/admin/usuarios"),
        GuardDecision::Redirect { to: "/portal".into(), from: None }
    );

    let guard = RouteGuard::roles([Role::Client]);
    assert_eq!(
        guard.check(&signed_in(Role::Lawyer), "/portal"),
        GuardDecision::Redirect { to: "/admin".into(), from: None }
    );
}

#[test]
fn unrecognized_role_goes_to_public_home() {
    let guard = RouteGuard::roles([Role::Client]);
    assert_eq!(
        guard.check(&signed_in(Role::Unrecognized), "/portal"),
        GuardDecision::Redirect { to: PUBLIC_HOME.into(), from: None }
    );
}

#[test]
fn empty_allow_list_admits_any_signed_in_user() {
    let guard = RouteGuard::authenticated();
    for role in [Role::Client, Role::Lawyer, Role::Admin, Role::Unrecognized] {
        assert_eq!(guard.check(&signed_in(role), "/perfil"), GuardDecision::Allow);
    }
}

#[test]
fn enforce_follows_redirects() {
    let navigator = HistoryNavigator::starting_at("/admin/casos");
    let decision = RouteGuard::roles([Role::Admin]).enforce(&signed_in(Role::Client), &navigator);

    assert!(matches!(decision, GuardDecision::Redirect { .. }));
    assert_eq!(navigator.history(), vec!["/admin/casos".to_owned(), "/portal".to_owned()]);
}

#[test]
fn enforce_leaves_allowed_location_alone() {
    let navigator = HistoryNavigator::starting_at("/admin");
    RouteGuard::roles([Role::Admin]).enforce(&signed_in(Role::Admin), &navigator);
    assert_eq!(navigator.history().len(), 1);
}

#[test]
fn login_returns_to_remembered_location() {
    let client = user(Role::Client);
    assert_eq!(post_login_destination(&client, Some("/portal/casos")), "/portal/casos");
    assert_eq!(post_login_destination(&client, Some("/portal/casos?page=2")), "/portal/casos?page=2");
}

#[test]
fn login_without_usable_location_goes_to_role_home() {
    let admin = user(Role::Admin);
    assert_eq!(post_login_destination(&admin, None), "/admin");
    assert_eq!(post_login_destination(&admin, Some("")), "/admin");
    assert_eq!(post_login_destination(&admin, Some("/login?next=x")), "/admin");
    assert_eq!(post_login_destination(&admin, Some("https://evil.example")), "/admin");
    assert_eq!(post_login_destination(&admin, Some("//evil.example/x")), "/admin");
}

#[test]
fn guard_redirect_then_login_round_trip() {
    let GuardDecision::Redirect { from, .. } =
        RouteGuard::authenticated().check(&SessionState::signed_out(), "/portal/casos")
    else {
        panic!("expected redirect");
    };
    assert_eq!(post_login_destination(&user(Role::Client), from.as_deref()), "/portal/casos");
}
