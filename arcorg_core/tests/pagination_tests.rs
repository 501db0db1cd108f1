//! Paginated lookup tests

use arcorg_core::*;
use arcorg_test_utils::{AccountBuilder, DirectoryCall, MockDirectory, MockOperation};
use std::sync::Arc;

fn seeded(page_size: usize, count: usize) -> MockDirectory {
    let directory = MockDirectory::with_page_size(page_size);
    for n in 0..count {
        directory.insert_account(
            AccountBuilder::new(format!("{:012}", n + 1)).build(),
            "ou-active",
        );
    }
    directory
}

#[tokio::test]
async fn test_match_on_last_page_is_found() {
    let directory = seeded(2, 9);
    directory.insert_account(
        AccountBuilder::new("111122223333")
            .email("needle@example.com")
            .build(),
        "ou-closed",
    );
    let client = AccountDirectory::new(Arc::new(directory.clone()));

    let found = client.find_by_email("needle@example.com").await.unwrap();

    assert_eq!(found.map(|a| a.id), Some("111122223333".to_string()));
    assert_eq!(directory.call_count(MockOperation::ListAccounts), 5);
}

#[tokio::test]
async fn test_not_found_only_after_final_page() {
    let directory = seeded(3, 7);
    let client = AccountDirectory::new(Arc::new(directory.clone()));

    let found = client.find_by_email("missing@example.com").await.unwrap();

    assert!(found.is_none());
    assert_eq!(
        directory.calls_of(MockOperation::ListAccounts),
        vec![
            DirectoryCall::ListAccounts { cursor: None },
            DirectoryCall::ListAccounts {
                cursor: Some("page-3".to_string())
            },
            DirectoryCall::ListAccounts {
                cursor: Some("page-6".to_string())
            },
        ]
    );
}

#[tokio::test]
async fn test_lookup_stops_at_first_matching_page() {
    let directory = seeded(2, 10);
    let client = AccountDirectory::new(Arc::new(directory.clone()));

    let found = client
        .find_by_email("account-000000000003@example.com")
        .await
        .unwrap();

    assert!(found.is_some());
    assert_eq!(directory.call_count(MockOperation::ListAccounts), 2);
}

#[tokio::test]
async fn test_page_error_aborts_lookup() {
    let directory = seeded(2, 6);
    let client = AccountDirectory::new(Arc::new(directory.clone()));
    directory.fail_next(
        MockOperation::ListAccounts,
        arcorg_core::error::DirectoryError::throttled("ListAccounts"),
    );

    let result = client.find_by_email("missing@example.com").await;

    assert!(result.is_err());
    assert_eq!(directory.call_count(MockOperation::ListAccounts), 1);
}

#[tokio::test]
async fn test_find_all_collects_across_pages() {
    let directory = seeded(2, 5);
    for id in ["111111111111", "222222222222"] {
        directory.insert_account(
            AccountBuilder::new(id).email("shared@example.com").build(),
            "ou-closed",
        );
    }
    let client = AccountDirectory::new(Arc::new(directory));

    let matches = client.find_all_by_email("shared@example.com").await.unwrap();

    let ids: Vec<_> = matches.into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["111111111111", "222222222222"]);
}
