//! Unit tests for `TokenRepo` issuance and redemption primitives.
//!
//! Validates:
//! - Create and fetch round-trip, including the 256-bit token value
//! - Redemption flips `used` exactly once and records proof
//! - A second redemption fails with `AlreadyUsed`
//! - Expired and unknown tokens classify correctly
//! - Active-token lookups filter out used and expired rows

use std::sync::Arc;

use chrono::{Duration, Utc};
use fieldline::models::token::{ActionToken, TokenAction};
use fieldline::persistence::{db, token_repo::TokenRepo};
use fieldline::{AppError, TokenError};

fn sample(ticket_id: &str, action: TokenAction) -> ActionToken {
    ActionToken::new(ticket_id.to_owned(), "fe-7".to_owned(), action, 12, Utc::now())
}

async fn create(repo: &TokenRepo, pool: &sqlx::SqlitePool, token: &ActionToken) {
    let mut conn = pool.acquire().await.expect("conn");
    repo.create(conn.as_mut(), token).await.expect("create");
}

#[tokio::test]
async fn create_persists_and_fetches() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let token = sample("tick-1", TokenAction::OnSite);
    assert_eq!(token.id.len(), 64);
    create(&repo, &pool, &token).await;

    let fetched = repo
        .get_by_id(&token.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(fetched.ticket_id, "tick-1");
    assert_eq!(fetched.fe_id, "fe-7");
    assert_eq!(fetched.action, TokenAction::OnSite);
    assert!(!fetched.used);
    assert!(fetched.used_at.is_none());
}

#[tokio::test]
async fn redeem_flips_used_and_records_proof() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let token = sample("tick-2", TokenAction::Resolution);
    create(&repo, &pool, &token).await;

    let mut conn = pool.acquire().await.expect("conn");
    let redeemed = repo
        .redeem(
            conn.as_mut(),
            &token.id,
            Utc::now(),
            Some("https://proofs.example/p1.jpg"),
        )
        .await
        .expect("redeem");
    assert!(redeemed.used);
    assert!(redeemed.used_at.is_some());
    assert_eq!(
        redeemed.proof_url.as_deref(),
        Some("https://proofs.example/p1.jpg")
    );
}

#[tokio::test]
async fn second_redemption_fails_already_used() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let token = sample("tick-3", TokenAction::OnSite);
    create(&repo, &pool, &token).await;

    let mut conn = pool.acquire().await.expect("conn");
    repo.redeem(conn.as_mut(), &token.id, Utc::now(), None)
        .await
        .expect("first redeem");

    let err = repo
        .redeem(conn.as_mut(), &token.id, Utc::now(), None)
        .await
        .expect_err("second redeem");
    assert!(matches!(err, AppError::Token(TokenError::AlreadyUsed)));
}

#[tokio::test]
async fn expired_token_classifies_as_expired() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let mut token = sample("tick-4", TokenAction::OnSite);
    token.expires_at = Utc::now() - Duration::hours(1);
    create(&repo, &pool, &token).await;

    // Scoped: the pool has a single connection and `get_by_id` below
    // needs it back.
    {
        let mut conn = pool.acquire().await.expect("conn");
        let err = repo
            .redeem(conn.as_mut(), &token.id, Utc::now(), None)
            .await
            .expect_err("expired");
        assert!(matches!(err, AppError::Token(TokenError::Expired)));
    }

    // Still unused: expiry never consumes a token.
    let fetched = repo
        .get_by_id(&token.id)
        .await
        .expect("query")
        .expect("exists");
    assert!(!fetched.used);
}

#[tokio::test]
async fn unknown_token_classifies_as_not_found() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let mut conn = pool.acquire().await.expect("conn");
    let err = repo
        .redeem(conn.as_mut(), "no-such-token", Utc::now(), None)
        .await
        .expect_err("missing");
    assert!(matches!(err, AppError::Token(TokenError::NotFound)));
}

#[tokio::test]
async fn find_active_matches_the_exact_triple() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let token = sample("tick-5", TokenAction::OnSite);
    create(&repo, &pool, &token).await;

    let mut conn = pool.acquire().await.expect("conn");
    let now = Utc::now();
    let hit = repo
        .find_active_in_tx(conn.as_mut(), "tick-5", "fe-7", TokenAction::OnSite, now)
        .await
        .expect("query");
    assert_eq!(hit.map(|t| t.id), Some(token.id));

    let miss = repo
        .find_active_in_tx(conn.as_mut(), "tick-5", "fe-7", TokenAction::Resolution, now)
        .await
        .expect("query");
    assert!(miss.is_none());

    let wrong_fe = repo
        .find_active_in_tx(conn.as_mut(), "tick-5", "fe-8", TokenAction::OnSite, now)
        .await
        .expect("query");
    assert!(wrong_fe.is_none());
}

#[tokio::test]
async fn lookup_active_skips_used_and_expired_rows() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let repo = TokenRepo::new(Arc::clone(&pool));

    let mut expired = sample("tick-6", TokenAction::OnSite);
    expired.expires_at = Utc::now() - Duration::hours(2);
    create(&repo, &pool, &expired).await;

    let spent = sample("tick-6", TokenAction::OnSite);
    create(&repo, &pool, &spent).await;
    {
        let mut conn = pool.acquire().await.expect("conn");
        repo.redeem(conn.as_mut(), &spent.id, Utc::now(), None)
            .await
            .expect("redeem");
    }

    assert!(repo
        .lookup_active("tick-6", Utc::now())
        .await
        .expect("query")
        .is_none());

    let live = sample("tick-6", TokenAction::Resolution);
    create(&repo, &pool, &live).await;
    let found = repo
        .lookup_active("tick-6", Utc::now())
        .await
        .expect("query")
        .expect("live token");
    assert_eq!(found.id, live.id);
}

#[tokio::test]
async fn token_values_are_unique_and_hex() {
    let a = sample("tick-7", TokenAction::OnSite);
    let b = sample("tick-7", TokenAction::OnSite);
    assert_ne!(a.id, b.id);
    assert!(a.id.chars().all(|c| c.is_ascii_hexdigit()));
}
