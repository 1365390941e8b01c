//! Guest cart, login merge, logout revert and the admin lockout, end to end.

#![allow(clippy::unwrap_used)]

use medico_client::catalog;
use medico_client::storage::{KeyValueStore, keys};
use medico_client::{CartMode, ClientError};
use medico_core::{ProductId, UserId};
use medico_integration_tests::{CUSTOMER_ID, TestContext};

fn lines(ctx: &TestContext) -> Vec<(i32, u32)> {
    ctx.client
        .cart()
        .cart()
        .lines()
        .iter()
        .map(|l| (l.product_id.as_i32(), l.quantity))
        .collect()
}

async fn add_product(ctx: &TestContext, id: i32, quantity: u32) {
    let product = catalog::find(ProductId::new(id)).unwrap();
    ctx.client.cart().add(&product, quantity).await.unwrap();
}

#[tokio::test]
async fn test_guest_cart_moves_to_empty_server_cart() {
    let ctx = TestContext::new();
    add_product(&ctx, 5, 2).await;

    ctx.login_customer().await;

    assert_eq!(lines(&ctx), [(5, 2)]);
    assert_eq!(ctx.backend.cart(), [(5, 2)]);
    assert!(ctx.store.get(keys::CART_GUEST).unwrap().is_none());
    assert_eq!(
        ctx.client.cart().mode(),
        CartMode::Customer(UserId::new(CUSTOMER_ID))
    );
}

#[tokio::test]
async fn test_overlapping_lines_add_up() {
    let ctx = TestContext::new();
    ctx.backend.put_in_cart(5, 3);
    ctx.backend.put_in_cart(8, 1);
    add_product(&ctx, 5, 2).await;
    add_product(&ctx, 1, 1).await;

    ctx.login_customer().await;

    assert_eq!(ctx.backend.cart(), [(1, 1), (5, 5), (8, 1)]);
    let mut merged = lines(&ctx);
    merged.sort_unstable();
    assert_eq!(merged, [(1, 1), (5, 5), (8, 1)]);
    assert_eq!(ctx.client.cart().count(), 7);
}

#[tokio::test]
async fn test_one_failed_merge_call_does_not_stop_the_rest() {
    let ctx = TestContext::new();
    ctx.backend.put_in_cart(5, 3);
    ctx.backend.fail_writes_for(5);
    add_product(&ctx, 5, 2).await;
    add_product(&ctx, 1, 1).await;
    add_product(&ctx, 8, 2).await;

    ctx.login_customer().await;

    assert_eq!(ctx.backend.cart(), [(1, 1), (5, 3), (8, 2)]);
    let server: Vec<(i32, u32)> = ctx
        .backend
        .cart()
        .into_iter()
        .map(|(id, qty)| (i32::try_from(id).unwrap(), u32::try_from(qty).unwrap()))
        .collect();
    let mut adopted = lines(&ctx);
    adopted.sort_unstable();
    assert_eq!(adopted, server);
    assert!(ctx.store.get(keys::CART_GUEST).unwrap().is_none());
}

#[tokio::test]
async fn test_customer_edits_reach_the_server() {
    let ctx = TestContext::new();
    ctx.login_customer().await;

    add_product(&ctx, 7, 1).await;
    ctx.client.cart().increase(ProductId::new(7)).await.unwrap();
    ctx.client.cart().add(&catalog::find(ProductId::new(2)).unwrap(), 1).await.unwrap();
    ctx.client.cart().remove(ProductId::new(2)).await.unwrap();

    assert_eq!(ctx.backend.cart(), [(7, 2)]);
    assert_eq!(lines(&ctx), [(7, 2)]);

    ctx.client.cart().clear().await.unwrap();
    assert!(ctx.backend.cart().is_empty());
    assert!(ctx.client.cart().cart().is_empty());
}

#[tokio::test]
async fn test_failed_write_rolls_back() {
    let ctx = TestContext::new();
    ctx.backend.put_in_cart(3, 1);
    ctx.login_customer().await;
    ctx.backend.fail_cart_writes();

    let err = ctx.client.cart().increase(ProductId::new(3)).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(lines(&ctx), [(3, 1)]);
    assert!(
        ctx.client
            .toasts()
            .active()
            .iter()
            .any(|t| t.message.contains("database unavailable"))
    );
}

#[tokio::test]
async fn test_logout_reverts_to_guest_cart() {
    let ctx = TestContext::new();
    add_product(&ctx, 5, 1).await;
    ctx.login_customer().await;
    assert_eq!(lines(&ctx), [(5, 1)]);

    ctx.client.api().logout().await.unwrap();
    ctx.client.cart().catch_up().await;

    assert_eq!(ctx.client.cart().mode(), CartMode::Guest);
    // The guest cart was consumed by the merge.
    assert!(ctx.client.cart().cart().is_empty());
    assert!(!ctx.client.auth().is_authenticated());
}

#[tokio::test]
async fn test_restart_restores_session_and_mirror() {
    let mut ctx = TestContext::new();
    ctx.backend.put_in_cart(4, 2);
    ctx.login_customer().await;

    ctx.restart();

    assert!(ctx.client.auth().is_authenticated());
    assert_eq!(lines(&ctx), [(4, 2)]);
}

#[tokio::test]
async fn test_admin_has_no_cart() {
    let ctx = TestContext::new();
    add_product(&ctx, 6, 1).await;

    ctx.login_admin().await;

    assert_eq!(ctx.client.cart().mode(), CartMode::AdminDisabled);
    assert!(ctx.client.cart().cart().is_empty());
    assert!(ctx.store.get(keys::CART_ADMIN_DISABLED).unwrap().is_some());

    let product = catalog::find(ProductId::new(6)).unwrap();
    let err = ctx.client.cart().add(&product, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::AdminCartDisabled));

    ctx.client.api().logout().await.unwrap();
    ctx.client.cart().catch_up().await;

    assert!(ctx.store.get(keys::CART_ADMIN_DISABLED).unwrap().is_none());
    assert_eq!(lines(&ctx), [(6, 1)]);
}
