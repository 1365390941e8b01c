//! Expired access tokens: shared refresh, replay and forced sign-out.

#![allow(clippy::unwrap_used)]

use medico_client::error::SESSION_EXPIRED_MESSAGE;
use medico_integration_tests::TestContext;
use reqwest::Method;

#[tokio::test]
async fn test_concurrent_calls_share_one_refresh() {
    let ctx = TestContext::new();
    ctx.backend.put_in_cart(2, 1);
    ctx.login_customer().await;
    ctx.backend.expire_token();

    let api = ctx.client.api();
    let (a, b, c) = tokio::join!(api.get_cart(), api.get_cart(), api.get_cart());

    for cart in [a, b, c] {
        assert_eq!(cart.unwrap().quantity_of(medico_core::ProductId::new(2)), Some(1));
    }
    assert_eq!(ctx.backend.calls(&Method::POST, "/auth/refresh"), 1);
    assert!(ctx.client.auth().is_authenticated());
    // One toast per rejected call, none for the replays.
    let toasts = ctx.client.toasts().active();
    assert_eq!(toasts.len(), 3);
    assert!(toasts.iter().all(|t| t.message == SESSION_EXPIRED_MESSAGE));
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let ctx = TestContext::new();
    ctx.login_customer().await;
    let cart_fetches = ctx.backend.calls(&Method::GET, "/cart/");
    ctx.backend.expire_token();
    ctx.backend.reject_refresh();

    let err = ctx.client.api().get_cart().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!ctx.client.auth().is_authenticated());
    assert!(ctx.client.auth().access_token().is_none());
    // No replay after the failed refresh.
    assert_eq!(ctx.backend.calls(&Method::GET, "/cart/"), cart_fetches + 1);
    assert!(
        ctx.client
            .toasts()
            .active()
            .iter()
            .any(|t| t.message == SESSION_EXPIRED_MESSAGE)
    );
}

#[tokio::test]
async fn test_explicit_refresh_rotates_token() {
    let ctx = TestContext::new();
    ctx.login_customer().await;
    ctx.backend.expire_token();

    assert!(ctx.client.api().refresh_token().await);
    ctx.client.api().get_cart().await.unwrap();
    assert_eq!(ctx.backend.calls(&Method::POST, "/auth/refresh"), 1);
}

#[tokio::test]
async fn test_wrong_admin_password_is_not_a_session_expiry() {
    let ctx = TestContext::new();
    let email = medico_core::Email::parse("admin@medico.test").unwrap();
    let password = secrecy::SecretString::from("wrong-password");

    let err = ctx.client.api().admin_login(&email, &password).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(ctx.backend.calls(&Method::POST, "/auth/refresh"), 0);
    let messages: Vec<String> = ctx
        .client
        .toasts()
        .active()
        .into_iter()
        .map(|t| t.message)
        .collect();
    assert_eq!(messages, ["Invalid email or password"]);
}
