//! PostgreSQL backend tests
//!
//! Need a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use shelfkeeper_server::{
    config::DatabaseConfig,
    error::AppError,
    models::{
        book::{BookQuery, NewBook},
        user::{NewUser, Role},
    },
    repository::{PostgresStorage, Repository},
    services::{credentials::Argon2Hasher, Services},
};

async fn services() -> Services {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        ..Default::default()
    };
    let storage = PostgresStorage::connect(&config).await.unwrap();
    storage.migrate().await.unwrap();

    sqlx::query("TRUNCATE recordlist, booklist, userlist RESTART IDENTITY")
        .execute(storage.pool())
        .await
        .unwrap();

    Services::new(Repository::new(storage), Arc::new(Argon2Hasher::new()))
}

#[tokio::test]
#[ignore]
async fn test_postgres_lifecycle() {
    let services = services().await;
    let now = Utc.with_ymd_and_hms(2023, 1, 31, 9, 0, 0).unwrap();

    services
        .catalog
        .acquire(&NewBook {
            isbn: "0001".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Chilton".to_string(),
            quantity: 1,
        })
        .await
        .unwrap();
    services
        .accounts
        .register(&NewUser {
            id: "alicia".to_string(),
            name: "Alicia".to_string(),
            password: "578152".to_string(),
            role: Role::Standard,
        })
        .await
        .unwrap();

    let record = services.lifecycle.borrow("0001", "alicia", now).await.unwrap();
    assert_eq!(record.deadline, Utc.with_ymd_and_hms(2023, 2, 28, 9, 0, 0).unwrap());
    assert!(matches!(
        services.lifecycle.borrow("0001", "alicia", now).await,
        Err(AppError::AlreadyBorrowed(_))
    ));

    let receipt = services.lifecycle.return_book("0001", "alicia", now).await.unwrap();
    assert!(!receipt.was_overdue);
    assert_eq!(services.catalog.check_available("0001").await.unwrap().available, 1);
}

#[tokio::test]
#[ignore]
async fn test_postgres_rollback_on_error() {
    let services = services().await;

    services
        .catalog
        .acquire(&NewBook {
            isbn: "0001".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Chilton".to_string(),
            quantity: 1,
        })
        .await
        .unwrap();

    // Unknown user: the copy must stay on the shelf
    assert!(matches!(
        services.lifecycle.borrow("0001", "nobody", Utc::now()).await,
        Err(AppError::UserNotFound(_))
    ));
    assert_eq!(services.catalog.check_available("0001").await.unwrap().available, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore]
async fn test_postgres_concurrent_borrows_of_last_copy() {
    let services = services().await;
    services
        .catalog
        .acquire(&NewBook {
            isbn: "0001".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Chilton".to_string(),
            quantity: 1,
        })
        .await
        .unwrap();
    for id in ["alicia", "brandon"] {
        services
            .accounts
            .register(&NewUser {
                id: id.to_string(),
                name: id.to_uppercase(),
                password: "578152".to_string(),
                role: Role::Standard,
            })
            .await
            .unwrap();
    }

    let now = Utc::now();
    let first = services.lifecycle.clone();
    let second = services.lifecycle.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.borrow("0001", "alicia", now).await }),
        tokio::spawn(async move { second.borrow("0001", "brandon", now).await }),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    // The loser sees either the committed counter or a serialization failure
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::NoCopyAvailable(_)) | Err(AppError::Storage(_)))));
    assert_eq!(services.catalog.check_available("0001").await.unwrap().available, 0);
}

#[tokio::test]
#[ignore]
async fn test_postgres_search_wildcards_match_literally() {
    let services = services().await;
    for (isbn, title) in [("0001", "100% Dune"), ("0002", "Dune Messiah")] {
        services
            .catalog
            .acquire(&NewBook {
                isbn: isbn.to_string(),
                title: title.to_string(),
                author: "Frank Herbert".to_string(),
                publisher: "Chilton".to_string(),
                quantity: 1,
            })
            .await
            .unwrap();
    }

    let found = services.catalog.search(&BookQuery::by_title("100%")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].isbn, "0001");
    assert!(services.catalog.search(&BookQuery::by_title("D_ne")).await.unwrap().is_empty());
}
