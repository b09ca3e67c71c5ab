//! Login, signup, and session restoration against a real hub directory.

use std::collections::BTreeSet;
use std::path::Path;

use tempfile::TempDir;

use infohub_auth::service::NewUser;
use infohub_auth::AuthService;
use infohub_core::error::{HubError, ValidationError};
use infohub_core::{HubConfig, Role, User};
use infohub_store::hub::Hub;
use infohub_store::keys;

async fn open(dir: &Path) -> (Hub, AuthService) {
    let config = HubConfig::load_or_init(dir).expect("config");
    let hub = Hub::open(dir, &config).await.expect("hub");
    let auth = AuthService::from_hub(&hub);
    (hub, auth)
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn manager_seeded_with_documented_permissions() {
    let dir = TempDir::new().unwrap();
    let (_, auth) = open(dir.path()).await;

    let session = auth.login("manager", "manager123").await.expect("login");
    let p = &session.permissions;

    assert_eq!(session.role, Role::Manager);
    assert_eq!(
        p.sections,
        set(&["costing", "supply-planning", "operations", "quality"])
    );
    assert_eq!(p.sections, p.editable_sections);
    assert!(p.can_manage_users);
    assert!(p.can_delete_resources);
    assert!(!p.can_view_audit_log);
    assert!(!p.can_manage_roles);
    assert!(!p.can_edit_all_sections);
}

#[tokio::test]
async fn login_matches_identifier_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let (_, auth) = open(dir.path()).await;

    // By username, email, and display name, mixed case.
    assert!(auth.login("ADMIN", "admin123").await.is_ok());
    assert!(auth.login("Admin@Company.com", "admin123").await.is_ok());
    assert!(auth.login("system administrator", "admin123").await.is_ok());

    // Password stays exact.
    let err = auth.login("admin", "ADMIN123").await.expect_err("password");
    assert!(matches!(err, HubError::InvalidCredentials));
}

#[tokio::test]
async fn login_records_session_and_fresh_flag() {
    let dir = TempDir::new().unwrap();
    let (hub, auth) = open(dir.path()).await;

    auth.login("user", "user123").await.expect("login");

    let restored = auth.restore_session().await.expect("restore").expect("present");
    assert_eq!(restored.username, "user");

    assert!(auth.take_fresh_login().expect("flag"));
    assert!(!auth.take_fresh_login().expect("flag is one-shot"));

    let activities = hub.audit().list();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].description, "User user logged in");
}

#[tokio::test]
async fn signup_rejects_duplicate_email_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let (_, auth) = open(dir.path()).await;

    auth.signup("New Person", "new@company.com", "pw123")
        .await
        .expect("first signup");
    let before = auth.load_users().await.expect("users").len();

    let err = auth
        .signup("Someone Else", "NEW@company.COM", "other")
        .await
        .expect_err("duplicate");
    assert!(matches!(
        err,
        HubError::Validation(ValidationError::EmailTaken(_))
    ));

    let after = auth.load_users().await.expect("users").len();
    assert_eq!(before, after);
}

#[tokio::test]
async fn signup_grants_view_only_access_to_visible_sections() {
    let dir = TempDir::new().unwrap();
    let (_, auth) = open(dir.path()).await;

    let session = auth
        .signup("New Person", "new@company.com", "pw123")
        .await
        .expect("signup");

    assert_eq!(session.role, Role::User);
    assert_eq!(session.username, "new@company.com");
    assert_eq!(session.permissions.sections.len(), 8);
    assert!(session.permissions.editable_sections.is_empty());

    // Ids continue past the three seeded accounts.
    assert_eq!(session.user_id, "4");
}

#[tokio::test]
async fn restore_resyncs_permissions_from_user_table() {
    let dir = TempDir::new().unwrap();
    let (hub, auth) = open(dir.path()).await;

    auth.login("user", "user123").await.expect("login");

    // An admin grants the user edit access while the session is open.
    let mut users: Vec<User> = hub.kv().get(keys::USERS).expect("users");
    let user = users.iter_mut().find(|u| u.username == "user").unwrap();
    user.permissions.editable_sections.insert("costing".to_string());
    hub.kv().set(keys::USERS, &users).expect("save");

    let restored = auth.restore_session().await.expect("restore").expect("present");
    assert!(restored.permissions.editable_sections.contains("costing"));
}

#[tokio::test]
async fn corrupt_session_is_cleared_not_fatal() {
    let dir = TempDir::new().unwrap();
    let (hub, auth) = open(dir.path()).await;

    hub.kv()
        .set(keys::SESSION, &serde_json::json!({"userId": 42, "garbage": true}))
        .expect("seed corrupt");

    assert!(auth.restore_session().await.expect("restore").is_none());
    assert!(hub.kv().get_raw(keys::SESSION).is_none());
}

#[tokio::test]
async fn session_for_deleted_user_yields_none() {
    let dir = TempDir::new().unwrap();
    let (hub, auth) = open(dir.path()).await;

    auth.login("user", "user123").await.expect("login");
    let mut users: Vec<User> = hub.kv().get(keys::USERS).expect("users");
    users.retain(|u| u.username != "user");
    hub.kv().set(keys::USERS, &users).expect("save");

    assert!(auth.restore_session().await.expect("restore").is_none());
}

#[tokio::test]
async fn logout_logs_then_clears() {
    let dir = TempDir::new().unwrap();
    let (hub, auth) = open(dir.path()).await;

    auth.login("manager", "manager123").await.expect("login");
    auth.logout().await.expect("logout");

    assert!(auth.restore_session().await.expect("restore").is_none());
    let actions: Vec<String> = hub
        .audit()
        .list()
        .iter()
        .map(|a| a.action.to_string())
        .collect();
    assert_eq!(actions, ["LOGOUT", "LOGIN"]);
}

#[tokio::test]
async fn manager_may_create_users_but_not_managers() {
    let dir = TempDir::new().unwrap();
    let (_, auth) = open(dir.path()).await;

    let manager = auth.login("manager", "manager123").await.expect("login");

    let created = auth
        .create_user(
            &manager,
            NewUser {
                username: "analyst".to_string(),
                password: "pw123".to_string(),
                name: "Analyst".to_string(),
                email: "analyst@company.com".to_string(),
                role: Role::User,
                sections: set(&["costing"]),
                editable_sections: set(&["costing", "quality"]),
            },
        )
        .await
        .expect("create user role");

    // Sections widen to cover every editable section.
    assert!(created.permissions.sections.contains("quality"));

    let err = auth
        .create_user(
            &manager,
            NewUser {
                username: "mgr2".to_string(),
                password: "pw123".to_string(),
                name: "Second Manager".to_string(),
                email: "mgr2@company.com".to_string(),
                role: Role::Manager,
                sections: set(&[]),
                editable_sections: set(&[]),
            },
        )
        .await
        .expect_err("role gate");
    assert!(matches!(err, HubError::PermissionDenied(_)));
}
