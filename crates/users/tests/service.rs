mod common;

use std::sync::atomic::Ordering;

use serde_json::json;

use warden_auth::{AuthService, Object, PolicyAgent, Relation, RelationTuple, TokenKind};
use warden_users::{ErrorKind, Metadata, Service, User, UserRepository};

use common::{Harness, PASSWORD};

fn meta(value: serde_json::Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

async fn register(h: &Harness, email: &str) -> String {
    h.svc.register("", User::new(email, PASSWORD)).await.unwrap()
}

async fn login(h: &Harness, email: &str) -> String {
    h.svc.login(User::new(email, PASSWORD)).await.unwrap()
}

#[tokio::test]
async fn bootstrap_registration_grants_ownership() {
    let h = Harness::open().await;

    let id = h.svc.register("", User::new("a@x.com", "Str0ng!pw")).await.unwrap();

    h.agent
        .check_policy(&RelationTuple::new(id.as_str(), Object::Users, Relation::Member))
        .await
        .unwrap();

    let stored = h.repo.retrieve_by_id(&id).await.unwrap();
    assert_eq!(stored.email, "a@x.com");
    assert!(!stored.password.is_empty());
    assert_ne!(stored.password, "Str0ng!pw");
}

#[tokio::test]
async fn weak_password_is_rejected_before_any_side_effect() {
    let h = Harness::open().await;

    let err = h.svc.register("", User::new("bob@example.com", "short")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PasswordFormat);
    assert_eq!(h.saves(), 0);
    assert_eq!(h.ids.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.inner.len(), 1);
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let h = Harness::open().await;

    let err = h.svc.register("", User::new("not-an-email", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedEntity);
    assert_eq!(h.saves(), 0);
}

#[tokio::test]
async fn failed_ownership_grant_leaves_no_account() {
    let h = Harness::open().await;
    h.agent.fail_grants.store(true, Ordering::SeqCst);

    let err = h.svc.register("", User::new("carol@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(h.saves(), 0);
    assert!(h.repo.inner.is_empty());
}

#[tokio::test]
async fn id_generation_failure_aborts_before_the_grant() {
    let h = Harness::open().await;
    h.ids.failing.store(true, Ordering::SeqCst);

    let err = h.svc.register("", User::new("cy@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CreateUser);
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(h.saves(), 0);
    assert_eq!(h.agent.inner.len(), 1);
}

#[tokio::test]
async fn closed_registration_requires_a_token() {
    let h = Harness::closed();

    let err = h.svc.register("", User::new("dan@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.saves(), 0);
}

#[tokio::test]
async fn closed_registration_rejects_non_authorities() {
    let h = Harness::closed();
    let token = h.auth.issue("u-1", "plain@example.com", TokenKind::User).await.unwrap();

    let err = h.svc.register(&token, User::new("dan@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.saves(), 0);
}

#[tokio::test]
async fn authorities_register_when_bootstrap_is_closed() {
    let h = Harness::closed();
    let token = h.authority_token().await;

    let id = h.svc.register(&token, User::new("erin@example.com", PASSWORD)).await.unwrap();

    assert_eq!(h.repo.retrieve_by_id(&id).await.unwrap().email, "erin@example.com");
}

#[tokio::test]
async fn policy_backend_outage_closes_bootstrap_registration() {
    let h = Harness::open().await;
    h.agent.fail_checks.store(true, Ordering::SeqCst);

    let err = h.svc.register("", User::new("fay@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.saves(), 0);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let h = Harness::open().await;
    register(&h, "gus@example.com").await;

    let err = h.svc.register("", User::new("gus@example.com", PASSWORD)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn login_issues_a_token_for_the_account() {
    let h = Harness::open().await;
    let id = register(&h, "hal@example.com").await;

    let token = login(&h, "hal@example.com").await;

    let identity = h.auth.identify(&token).await.unwrap();
    assert_eq!(identity.id, id);
    assert_eq!(identity.email, "hal@example.com");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let h = Harness::open().await;
    register(&h, "ivy@example.com").await;

    let wrong_password = h
        .svc
        .login(User::new("ivy@example.com", "wrong-password"))
        .await
        .unwrap_err();
    let unknown_email = h
        .svc
        .login(User::new("nobody@example.com", PASSWORD))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.kind(), ErrorKind::Unauthorized);
    assert_eq!(wrong_password.kind(), unknown_email.kind());
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn views_never_carry_a_password() {
    let h = Harness::open().await;
    let id = register(&h, "jay@example.com").await;
    let token = login(&h, "jay@example.com").await;

    let viewed = h.svc.view_user(&token, &id).await.unwrap();
    assert_eq!(viewed.id, id);
    assert!(viewed.password.is_empty());

    let profile = h.svc.view_profile(&token).await.unwrap();
    assert_eq!(profile.email, "jay@example.com");
    assert!(profile.password.is_empty());

    let body = serde_json::to_value(&profile).unwrap();
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn views_require_a_valid_token() {
    let h = Harness::open().await;
    let id = register(&h, "kim@example.com").await;

    assert_eq!(h.svc.view_user("bogus", &id).await.unwrap_err().kind(), ErrorKind::Unauthorized);
    assert_eq!(h.svc.view_profile("").await.unwrap_err().kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn viewing_a_missing_user_is_unauthorized() {
    let h = Harness::open().await;
    register(&h, "lee@example.com").await;
    let token = login(&h, "lee@example.com").await;

    let err = h.svc.view_user(&token, "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn list_users_echoes_window_and_redacts() {
    let h = Harness::open().await;
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        register(&h, email).await;
    }
    let token = login(&h, "a@example.com").await;

    let page = h.svc.list_users(&token, 1, 1, "", Metadata::new()).await.unwrap();

    assert_eq!(page.metadata.total, 3);
    assert_eq!(page.metadata.offset, 1);
    assert_eq!(page.metadata.limit, 1);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].email, "b@example.com");
    assert!(page.items.iter().all(|u| u.password.is_empty()));

    let filtered = h.svc.list_users(&token, 0, 10, "c@", Metadata::new()).await.unwrap();
    assert_eq!(filtered.metadata.total, 1);
    assert_eq!(filtered.items[0].email, "c@example.com");
}

#[tokio::test]
async fn update_user_is_scoped_to_the_caller() {
    let h = Harness::open().await;
    register(&h, "mia@example.com").await;
    register(&h, "ned@example.com").await;
    let token = login(&h, "mia@example.com").await;

    let payload = User::new("ned@example.com", "").with_metadata(meta(json!({"role": "ops"})));
    h.svc.update_user(&token, payload).await.unwrap();

    let mia = h.repo.retrieve_by_email("mia@example.com").await.unwrap();
    let ned = h.repo.retrieve_by_email("ned@example.com").await.unwrap();
    assert_eq!(mia.metadata, meta(json!({"role": "ops"})));
    assert!(ned.metadata.is_empty());
}

#[tokio::test]
async fn reset_token_for_unknown_email_sends_nothing() {
    let h = Harness::open().await;

    let err = h.svc.generate_reset_token("ghost@example.com", "app.example.com").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserNotFound);
    assert!(h.emailer.sent().is_empty());
}

#[tokio::test]
async fn reset_token_requires_an_email() {
    let h = Harness::open().await;

    let err = h.svc.generate_reset_token("", "app.example.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingEmail);
}

#[tokio::test]
async fn recovery_flow_sets_a_new_password() {
    let h = Harness::open().await;
    register(&h, "ola@example.com").await;

    h.svc.generate_reset_token("ola@example.com", "app.example.com").await.unwrap();

    let sent = h.emailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ola@example.com".to_string()]);
    assert_eq!(sent[0].host, "app.example.com");

    h.svc.reset_password(&sent[0].token, "brand-new-secret").await.unwrap();

    h.svc
        .login(User::new("ola@example.com", "brand-new-secret"))
        .await
        .unwrap();
    let err = h.svc.login(User::new("ola@example.com", PASSWORD)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn reset_password_checks_token_and_pattern() {
    let h = Harness::open().await;
    register(&h, "pat@example.com").await;
    let token = login(&h, "pat@example.com").await;

    assert_eq!(
        h.svc.reset_password("", "brand-new-secret").await.unwrap_err().kind(),
        ErrorKind::MissingResetToken
    );
    assert_eq!(
        h.svc.reset_password("bogus", "brand-new-secret").await.unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(
        h.svc.reset_password(&token, "short").await.unwrap_err().kind(),
        ErrorKind::PasswordFormat
    );
}

#[tokio::test]
async fn email_delivery_failure_is_reported() {
    let h = Harness::open().await;
    register(&h, "quinn@example.com").await;
    h.emailer.failing.store(true, Ordering::SeqCst);

    let err = h.svc.generate_reset_token("quinn@example.com", "app.example.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmailDelivery);
}

#[tokio::test]
async fn change_password_with_wrong_old_password_keeps_the_hash() {
    let h = Harness::open().await;
    register(&h, "ray@example.com").await;
    let token = login(&h, "ray@example.com").await;
    let before = h.repo.retrieve_by_email("ray@example.com").await.unwrap().password;

    let err = h
        .svc
        .change_password(&token, "brand-new-secret", "not-the-old-one")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let after = h.repo.retrieve_by_email("ray@example.com").await.unwrap().password;
    assert_eq!(before, after);
}

#[tokio::test]
async fn change_password_replaces_the_credential() {
    let h = Harness::open().await;
    register(&h, "sue@example.com").await;
    let token = login(&h, "sue@example.com").await;

    h.svc.change_password(&token, "brand-new-secret", PASSWORD).await.unwrap();

    h.svc
        .login(User::new("sue@example.com", "brand-new-secret"))
        .await
        .unwrap();
}

#[tokio::test]
async fn change_password_enforces_the_pattern() {
    let h = Harness::open().await;
    register(&h, "tom@example.com").await;
    let token = login(&h, "tom@example.com").await;

    let err = h.svc.change_password(&token, "short", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PasswordFormat);
}

#[tokio::test]
async fn empty_group_yields_an_empty_page() {
    let h = Harness::open().await;
    register(&h, "uma@example.com").await;
    let token = login(&h, "uma@example.com").await;

    let page = h.svc.list_members(&token, "g-empty", 5, 20, Metadata::new()).await.unwrap();

    assert_eq!(page.metadata.total, 0);
    assert_eq!(page.metadata.offset, 5);
    assert_eq!(page.metadata.limit, 20);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn group_members_are_resolved_and_redacted() {
    let h = Harness::open().await;
    let a = register(&h, "vic@example.com").await;
    let b = register(&h, "wes@example.com").await;
    register(&h, "xan@example.com").await;
    h.auth.assign("g-1", "users", [a.as_str(), b.as_str()]).unwrap();
    h.auth.assign("g-1", "things", ["t-1"]).unwrap();
    let token = login(&h, "xan@example.com").await;

    let page = h.svc.list_members(&token, "g-1", 0, 10, Metadata::new()).await.unwrap();

    let mut emails: Vec<_> = page.items.iter().map(|u| u.email.as_str()).collect();
    emails.sort();
    assert_eq!(emails, ["vic@example.com", "wes@example.com"]);
    assert_eq!(page.metadata.offset, 0);
    assert_eq!(page.metadata.limit, 10);
    assert!(page.items.iter().all(|u| u.password.is_empty()));
}

#[tokio::test]
async fn list_members_requires_a_valid_token() {
    let h = Harness::open().await;

    let err = h.svc.list_members("bogus", "g-1", 0, 10, Metadata::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}
