//! Credential sealing through the external account repository.

mod test_utils;

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, Set};

use osf_web::crypto::CryptoKey;
use osf_web::models::external_account;
use osf_web::repositories::ExternalAccountRepository;
use osf_web::repositories::external_account::AccountCredentials;

fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![0u8; 32]).expect("valid test key")
}

fn credentials(provider_id: &str, key: &str) -> AccountCredentials {
    AccountCredentials {
        provider: "github".into(),
        provider_name: "GitHub".into(),
        provider_id: provider_id.into(),
        oauth_key: Some(key.into()),
        refresh_token: Some(format!("{key}-refresh")),
        scopes: vec!["repo".into()],
        display_name: Some("octocat".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn credentials_round_trip_through_storage() {
    let db = Arc::new(test_utils::setup_test_db().await.unwrap());
    let repo = ExternalAccountRepository::new(db, test_crypto_key());

    let account = repo.upsert(&credentials("1", "gho_one")).await.unwrap();
    assert!(account.oauth_secret.is_none());
    assert!(!account
        .oauth_key
        .as_ref()
        .unwrap()
        .windows(b"gho_one".len())
        .any(|w| w == b"gho_one"));

    let opened = repo.open_credentials(&account).unwrap();
    assert_eq!(opened.oauth_key.as_deref(), Some("gho_one"));
    assert_eq!(opened.refresh_token.as_deref(), Some("gho_one-refresh"));
    assert_eq!(opened.oauth_secret, None);
}

#[tokio::test]
async fn upsert_refreshes_existing_account() {
    let db = Arc::new(test_utils::setup_test_db().await.unwrap());
    let repo = ExternalAccountRepository::new(db, test_crypto_key());

    let first = repo.upsert(&credentials("1", "gho_old")).await.unwrap();
    let second = repo.upsert(&credentials("1", "gho_new")).await.unwrap();

    assert_eq!(first.id, second.id);
    let opened = repo.open_credentials(&second).unwrap();
    assert_eq!(opened.oauth_key.as_deref(), Some("gho_new"));
}

#[tokio::test]
async fn ciphertext_copied_to_another_account_does_not_open() {
    let db = Arc::new(test_utils::setup_test_db().await.unwrap());
    let repo = ExternalAccountRepository::new(Arc::clone(&db), test_crypto_key());

    let victim = repo.upsert(&credentials("1", "gho_victim")).await.unwrap();
    let attacker = repo.upsert(&credentials("2", "gho_attacker")).await.unwrap();

    let mut active: external_account::ActiveModel = attacker.into();
    active.oauth_key = Set(victim.oauth_key.clone());
    let tampered = active.update(&*db).await.unwrap();

    assert!(repo.open_credentials(&tampered).is_err());
}

#[tokio::test]
async fn another_key_cannot_open_credentials() {
    let db = Arc::new(test_utils::setup_test_db().await.unwrap());
    let repo = ExternalAccountRepository::new(Arc::clone(&db), test_crypto_key());
    let account = repo.upsert(&credentials("1", "gho_one")).await.unwrap();

    let other = ExternalAccountRepository::new(db, CryptoKey::new(vec![9u8; 32]).unwrap());
    assert!(other.open_credentials(&account).is_err());
}
