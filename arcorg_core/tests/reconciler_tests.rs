//! Lifecycle tests for the account reconciler
//!
//! Every test drives the reconciler against the in-memory directory and
//! checks both the returned outcome and the directory calls it made.

use arcorg_core::error::{DirectoryError, LifecycleError, ValidationError};
use arcorg_core::*;
use arcorg_test_utils::{
    AccountBuilder, DirectoryCall, MockDirectory, MockOperation, PlacementBuilder,
    ReconcilerHarness, ScriptedPoll,
};

const EMAIL: &str = "team-a@example.com";

fn quarantined(harness: &ReconcilerHarness, id: &str) {
    harness.directory.insert_account(
        AccountBuilder::new(id).email(EMAIL).name("team-a").build(),
        "ou-closed",
    );
}

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_account_is_created_and_moved() {
        // Arrange
        let harness = ReconcilerHarness::new();
        harness
            .directory
            .set_creation_script(vec![ScriptedPoll::Pending, ScriptedPoll::Pending]);
        let desired = PlacementBuilder::new(EMAIL).build();

        // Act
        let outcome = harness.reconciler.create(&desired, None).await.unwrap();

        // Assert
        let CreateOutcome::Created(record) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(record.email, EMAIL);
        assert_eq!(record.id, ExternalId::from_account_id(&record.account_id));
        assert_eq!(harness.directory.call_count(MockOperation::CreateAccount), 1);
        assert_eq!(
            harness.directory.call_count(MockOperation::GetCreationStatus),
            3
        );
        assert_eq!(
            harness.directory.calls_of(MockOperation::MoveAccount),
            vec![DirectoryCall::MoveAccount {
                account_id: record.account_id.clone(),
                from_unit_id: None,
                to_unit_id: "ou-active".to_string(),
            }]
        );
        assert_eq!(
            harness.directory.parents(&record.account_id),
            vec!["ou-active".to_string()]
        );
    }

    #[tokio::test]
    async fn test_quarantined_account_is_adopted_without_create() {
        let harness = ReconcilerHarness::new();
        quarantined(&harness, "111122223333");
        let desired = PlacementBuilder::new(EMAIL).build();

        let outcome = harness.reconciler.create(&desired, None).await.unwrap();

        assert_eq!(
            outcome,
            CreateOutcome::Adopted(ManagedResourceRecord::placed("111122223333", &desired))
        );
        assert_eq!(harness.directory.call_count(MockOperation::CreateAccount), 0);
        assert_eq!(
            harness.directory.mutating_calls(),
            vec![DirectoryCall::MoveAccount {
                account_id: "111122223333".to_string(),
                from_unit_id: Some("ou-closed".to_string()),
                to_unit_id: "ou-active".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_account_elsewhere_is_skipped_untouched() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            "ou-finance",
        );
        let desired = PlacementBuilder::new(EMAIL).build();

        let outcome = harness.reconciler.create(&desired, None).await.unwrap();

        let CreateOutcome::Skipped(warning) = &outcome else {
            panic!("expected Skipped, got {outcome:?}");
        };
        assert!(warning.detail.contains("111122223333"));
        assert!(warning.detail.contains("ou-finance"));
        assert!(outcome.record().is_none());
        assert!(harness.directory.mutating_calls().is_empty());
        assert_eq!(
            harness.directory.parents("111122223333"),
            vec!["ou-finance".to_string()]
        );
    }

    #[tokio::test]
    async fn test_account_already_active_is_skipped() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            "ou-active",
        );

        let outcome = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap();

        assert!(matches!(outcome, CreateOutcome::Skipped(_)));
        assert!(harness.directory.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_suspended_account_is_a_conflict() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("111122223333")
                .email(EMAIL)
                .suspended()
                .build(),
            "ou-closed",
        );

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::PendingClosure { ref account_id, .. })
                if account_id == "111122223333"
        ));
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert!(harness.directory.mutating_calls().is_empty());
        assert_eq!(harness.directory.call_count(MockOperation::ListParents), 0);
    }

    #[tokio::test]
    async fn test_multiple_parents_is_a_conflict() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account_with_parents(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            vec!["ou-closed".to_string(), "ou-other".to_string()],
        );

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::ParentCardinality {
                parent_count: 2,
                ..
            })
        ));
        assert!(harness.directory.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_orphaned_account_is_a_conflict() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account_with_parents(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            Vec::new(),
        );

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::ParentCardinality {
                parent_count: 0,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_creation_failure_persists_nothing() {
        let harness = ReconcilerHarness::new();
        harness.directory.set_creation_script(vec![
            ScriptedPoll::Pending,
            ScriptedPoll::Fail(Some("EMAIL_ALREADY_EXISTS".to_string())),
        ]);

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::CreationFailed { ref reason, .. })
                if reason.as_deref() == Some("EMAIL_ALREADY_EXISTS")
        ));
        assert_eq!(err.category(), ErrorCategory::CreationFailed);
        assert_eq!(harness.directory.call_count(MockOperation::MoveAccount), 0);
        assert_eq!(harness.directory.account_count(), 0);
    }

    #[tokio::test]
    async fn test_creation_timeout_is_reported() {
        let harness = ReconcilerHarness::with_config(ReconcilerConfig::test());
        harness
            .directory
            .set_creation_script(vec![ScriptedPoll::Pending; 5]);

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::CreationTimedOut { attempts: 5, .. })
        ));
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert_eq!(harness.directory.call_count(MockOperation::MoveAccount), 0);
    }

    #[tokio::test]
    async fn test_move_failure_after_creation_is_reported() {
        let harness = ReconcilerHarness::new();
        harness.directory.fail_next(
            MockOperation::MoveAccount,
            DirectoryError::rejected("MoveAccount", "AccessDeniedException", "denied"),
        );

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::MoveFailed {
                from_unit_id: None,
                ..
            })
        ));
        assert_eq!(err.category(), ErrorCategory::MoveFailed);
        assert_eq!(harness.directory.account_count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_before_mutation() {
        let harness = ReconcilerHarness::new();
        harness.directory.fail_always(
            MockOperation::ListAccounts,
            DirectoryError::transport("ListAccounts", "connection reset"),
        );

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Directory(_)));
        assert!(err.is_retryable());
        assert!(harness.directory.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_placement_makes_no_calls() {
        let harness = ReconcilerHarness::new();
        let desired = PlacementBuilder::new(EMAIL)
            .closed_unit("ou-active")
            .build();

        let err = harness.reconciler.create(&desired, None).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(harness.directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_refuses_duplicate_emails() {
        let config = ReconcilerConfig {
            strict_email_uniqueness: true,
            ..ReconcilerConfig::test()
        };
        let harness = ReconcilerHarness::with_config(config);
        quarantined(&harness, "111122223333");
        quarantined(&harness, "444455556666");

        let err = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap_err();

        let Error::Lifecycle(LifecycleError::DuplicateEmail { account_ids, .. }) = err else {
            panic!("expected DuplicateEmail");
        };
        assert_eq!(account_ids, vec!["111122223333", "444455556666"]);
        assert!(harness.directory.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_lenient_mode_takes_first_match() {
        let harness = ReconcilerHarness::new();
        quarantined(&harness, "111122223333");
        quarantined(&harness, "444455556666");

        let outcome = harness
            .reconciler
            .create(&PlacementBuilder::new(EMAIL).build(), None)
            .await
            .unwrap();

        assert_eq!(outcome.record().unwrap().account_id, "111122223333");
    }
}

mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_is_idempotent_without_drift() {
        let harness = ReconcilerHarness::new();
        quarantined(&harness, "111122223333");
        let desired = PlacementBuilder::new(EMAIL).build();
        let record = harness
            .reconciler
            .create(&desired, None)
            .await
            .unwrap()
            .into_record()
            .unwrap();
        harness.directory.reset_calls();

        let first = harness.reconciler.read(&record).await.unwrap();
        let second = harness.reconciler.read(&record).await.unwrap();

        assert_eq!(first, ReadOutcome::Present(record.clone()));
        assert_eq!(first, second);
        assert!(harness.directory.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_reports_gone_account() {
        let harness = ReconcilerHarness::new();
        let record = ManagedResourceRecord::placed(
            "111122223333",
            &PlacementBuilder::new(EMAIL).build(),
        );

        let outcome = harness.reconciler.read(&record).await.unwrap();

        assert_eq!(outcome, ReadOutcome::Gone);
    }

    #[tokio::test]
    async fn test_read_refreshes_identity_only() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("999988887777").email(EMAIL).build(),
            "ou-somewhere",
        );
        let record = ManagedResourceRecord::placed(
            "111122223333",
            &PlacementBuilder::new(EMAIL).build(),
        );

        let ReadOutcome::Present(refreshed) = harness.reconciler.read(&record).await.unwrap()
        else {
            panic!("expected Present");
        };

        assert_eq!(refreshed.account_id, "999988887777");
        assert_eq!(refreshed.id.as_str(), "arcorg:999988887777");
        assert_eq!(refreshed.active_unit_id, record.active_unit_id);
        assert_eq!(refreshed.closed_unit_id, record.closed_unit_id);
    }

    #[tokio::test]
    async fn test_read_propagates_directory_errors() {
        let harness = ReconcilerHarness::new();
        harness
            .directory
            .fail_next(MockOperation::ListAccounts, DirectoryError::throttled("ListAccounts"));
        let record = ManagedResourceRecord::placed(
            "111122223333",
            &PlacementBuilder::new(EMAIL).build(),
        );

        let err = harness.reconciler.read(&record).await.unwrap_err();

        assert!(matches!(err, Error::Directory(DirectoryError::Throttled { .. })));
    }
}

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_any_changed_field_is_rejected_without_calls() {
        let harness = ReconcilerHarness::new();
        let desired = PlacementBuilder::new(EMAIL).build();
        let stored = ManagedResourceRecord::placed("111122223333", &desired);

        let cases = [
            ("email", PlacementBuilder::new("other@example.com").name("team-a").build()),
            ("name", PlacementBuilder::new(EMAIL).name("renamed").build()),
            ("active_unit_id", PlacementBuilder::new(EMAIL).active_unit("ou-new").build()),
            ("closed_unit_id", PlacementBuilder::new(EMAIL).closed_unit("ou-gone").build()),
        ];

        for (expected_field, changed) in cases {
            let err = harness.reconciler.update(&stored, &changed).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Lifecycle(LifecycleError::ImmutableField { field, .. })
                        if field == expected_field
                ),
                "unexpected error for {expected_field}: {err:?}"
            );
        }
        assert!(harness.directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_placement_is_accepted() {
        let harness = ReconcilerHarness::new();
        let desired = PlacementBuilder::new(EMAIL).build();
        let stored = ManagedResourceRecord::placed("111122223333", &desired);

        let record = harness.reconciler.update(&stored, &desired).unwrap();

        assert_eq!(record, stored);
        assert!(harness.directory.calls().is_empty());
    }
}

mod destroy_tests {
    use super::*;

    #[tokio::test]
    async fn test_destroy_moves_account_to_closed_unit() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            "ou-active",
        );
        let record = ManagedResourceRecord::placed(
            "111122223333",
            &PlacementBuilder::new(EMAIL).build(),
        );

        let state = harness.reconciler.destroy(&record).await.unwrap();

        assert_eq!(state, LifecycleState::Quarantined);
        assert_eq!(
            harness.directory.mutating_calls(),
            vec![DirectoryCall::MoveAccount {
                account_id: "111122223333".to_string(),
                from_unit_id: Some("ou-active".to_string()),
                to_unit_id: "ou-closed".to_string(),
            }]
        );
        assert_eq!(
            harness.directory.parents("111122223333"),
            vec!["ou-closed".to_string()]
        );
    }

    #[tokio::test]
    async fn test_destroy_fails_when_account_drifted() {
        let harness = ReconcilerHarness::new();
        harness.directory.insert_account(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            "ou-elsewhere",
        );
        let record = ManagedResourceRecord::placed(
            "111122223333",
            &PlacementBuilder::new(EMAIL).build(),
        );

        let err = harness.reconciler.destroy(&record).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::MoveFailed);
        assert_eq!(
            harness.directory.parents("111122223333"),
            vec!["ou-elsewhere".to_string()]
        );
    }

    #[tokio::test]
    async fn test_destroy_then_create_adopts_same_account() {
        let harness = ReconcilerHarness::new();
        let desired = PlacementBuilder::new(EMAIL).build();
        let created = harness
            .reconciler
            .create(&desired, None)
            .await
            .unwrap()
            .into_record()
            .unwrap();

        harness.reconciler.destroy(&created).await.unwrap();
        let outcome = harness.reconciler.create(&desired, None).await.unwrap();

        assert_eq!(outcome, CreateOutcome::Adopted(created));
        assert_eq!(harness.directory.call_count(MockOperation::CreateAccount), 1);
        assert_eq!(harness.directory.account_count(), 1);
    }
}

mod import_tests {
    use super::*;

    #[tokio::test]
    async fn test_import_then_read_resolves_account() {
        let directory = MockDirectory::new();
        directory.insert_account(
            AccountBuilder::new("111122223333").email(EMAIL).build(),
            "ou-active",
        );
        let harness = ReconcilerHarness::with_directory(directory, ReconcilerConfig::test());
        let desired = PlacementBuilder::new(EMAIL).build();

        let imported = harness.reconciler.import("arcorg:111122223333").unwrap();
        assert_eq!(imported.account_id, "111122223333");
        assert!(harness.directory.calls().is_empty());

        let record = ManagedResourceRecord::imported(imported, &desired);
        let outcome = harness.reconciler.read(&record).await.unwrap();

        assert_eq!(outcome, ReadOutcome::Present(record));
    }

    #[tokio::test]
    async fn test_import_rejects_wrong_prefix() {
        let harness = ReconcilerHarness::new();

        let err = harness.reconciler.import("111122223333").unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidExternalId { .. })
        ));
    }
}
