use super::{create_flaky_service, create_test_service, create_unaudited_service, employee, expense, ids, seed};
use crate::constants::{BILL_SHARING_CREATED, BILL_SHARING_DELETED, BILL_SHARING_FINALIZED, PAYMENT_STATUS_CHANGED};
use crate::core::allocation::compute_breakdown;
use crate::core::errors::FundError;
use crate::core::models::{PaymentMethod, PaymentStatus, SharingState, SharingStatus};
use crate::core::services::{AutoFinalize, FinalizeOutcome};
use crate::infrastructure::storage::LedgerStore;
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;

fn expense_ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_create_without_direct_payers_finalizes_immediately() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", true), employee("e2", "Binh", true)],
        vec![expense("x1", dec!(300000)), expense("x2", dec!(100000))],
    )
    .await;

    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1", "x2"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1", "x2"]), &breakdown, Some("admin"))
        .await
        .unwrap();

    assert_eq!(created.finalization, AutoFinalize::Finalized);
    assert_eq!(created.entry.detail.sharing.status, SharingState::Finalized);
    assert!(created.entry.detail.participants.is_empty());
    assert_eq!(created.entry.detail.expenses.len(), 2);

    for (id, amount) in [("x1", dec!(300000)), ("x2", dec!(100000))] {
        let stored = service.list_expenses().await.unwrap().into_iter().find(|e| e.id == id).unwrap();
        assert_eq!(stored.amount_reimbursed, amount);
        assert_eq!(stored.sharing_status, SharingStatus::FullyReimbursed);
        assert_eq!(stored.net_amount(), dec!(0));
    }

    let actions: Vec<String> = service.get_app_logs().await.unwrap().into_iter().map(|l| l.action).collect();
    assert!(actions.contains(&BILL_SHARING_CREATED.to_string()));
    assert!(actions.contains(&BILL_SHARING_FINALIZED.to_string()));
}

#[tokio::test]
async fn test_only_direct_payers_with_positive_share_become_participants() {
    let service = create_test_service();
    seed(
        &service,
        vec![
            employee("e1", "An", true),
            employee("e2", "Binh", false),
            employee("e3", "Chi", false),
            employee("e4", "Dung", false),
            employee("e5", "Giang", false),
        ],
        vec![expense("x1", dec!(400000))],
    )
    .await;

    let honorees = ids(&["e4", "e5"]);
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2", "e3", "e4", "e5"]), &honorees)
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();

    let detail = &created.entry.detail;
    assert_eq!(detail.sharing.status, SharingState::Pending);
    let mut payers: Vec<(&str, _, bool)> = detail
        .participants
        .iter()
        .map(|p| (p.employee_id.as_str(), p.amount_owed, p.is_birthday_person))
        .collect();
    payers.sort();
    assert_eq!(
        payers,
        vec![
            ("e2", dec!(133333), false),
            ("e3", dec!(133333), false),
            ("e4", dec!(66667), true),
            ("e5", dec!(66667), true),
        ]
    );
    assert_eq!(
        created.finalization,
        AutoFinalize::Outstanding {
            remaining: dec!(400000)
        }
    );
    assert_eq!(created.entry.report.fund_covered, dec!(0));

    let stored = service.list_expenses().await.unwrap();
    assert_eq!(stored[0].sharing_status, SharingStatus::Shared);
    assert_eq!(stored[0].amount_reimbursed, dec!(0));
}

#[tokio::test]
async fn test_paying_last_participant_finalizes_and_unpaying_keeps_it() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", false), employee("e2", "Binh", false)],
        vec![expense("x1", dec!(200000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let participants = created.entry.detail.participants.clone();
    assert_eq!(participants.len(), 2);

    let first = service
        .toggle_payment_status(&participants[0].id, PaymentStatus::Pending, Some("treasurer"))
        .await
        .unwrap();
    assert_eq!(first.participant.payment_status, PaymentStatus::Paid);
    assert!(first.participant.payment_date.is_some());
    assert_eq!(first.previous, PaymentStatus::Pending);
    assert_eq!(
        first.finalization,
        AutoFinalize::Outstanding {
            remaining: dec!(100000)
        }
    );

    let last = service
        .toggle_payment_status(&participants[1].id, PaymentStatus::Pending, Some("treasurer"))
        .await
        .unwrap();
    assert_eq!(last.finalization, AutoFinalize::Finalized);

    let expense = service.list_expenses().await.unwrap().remove(0);
    assert_eq!(expense.amount_reimbursed, dec!(200000));
    assert_eq!(expense.sharing_status, SharingStatus::FullyReimbursed);

    let back = service
        .toggle_payment_status(&participants[1].id, PaymentStatus::Paid, None)
        .await
        .unwrap();
    assert_eq!(back.participant.payment_status, PaymentStatus::Pending);
    assert!(back.participant.payment_date.is_none());
    assert_eq!(back.finalization, AutoFinalize::AlreadyFinalized);

    let entry = service.get_bill_sharing(&created.entry.detail.sharing.id).await.unwrap();
    assert!(entry.detail.is_finalized());
    let expense = service.list_expenses().await.unwrap().remove(0);
    assert_eq!(expense.amount_reimbursed, dec!(200000));

    let status_changes = service
        .get_app_logs()
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.action == PAYMENT_STATUS_CHANGED)
        .count();
    assert_eq!(status_changes, 3);
}

#[tokio::test]
async fn test_finalize_twice_applies_reimbursement_once() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(150000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let sharing_id = created.entry.detail.sharing.id.clone();

    assert_eq!(service.finalize(&sharing_id, None).await.unwrap(), FinalizeOutcome::Finalized);
    assert_eq!(
        service.finalize(&sharing_id, None).await.unwrap(),
        FinalizeOutcome::AlreadyFinalized
    );

    let expense = service.list_expenses().await.unwrap().remove(0);
    assert_eq!(expense.amount_reimbursed, dec!(150000));
}

#[tokio::test]
async fn test_delete_finalized_sharing_restores_expenses() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", true), employee("e2", "Binh", true)],
        vec![expense("x1", dec!(300000)), expense("x2", dec!(80000))],
    )
    .await;
    let before = service.list_expenses().await.unwrap();

    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1", "x2"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1", "x2"]), &breakdown, None)
        .await
        .unwrap();
    assert!(created.entry.detail.is_finalized());

    let rolled_back = service
        .delete_bill_sharing(&created.entry.detail.sharing.id, Some("admin"))
        .await
        .unwrap();
    assert!(rolled_back);
    assert_eq!(service.list_expenses().await.unwrap(), before);
    assert!(service.bill_sharing_history().await.unwrap().is_empty());

    let deleted = service
        .get_app_logs()
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.action == BILL_SHARING_DELETED)
        .unwrap();
    assert_eq!(deleted.details["rolled_back"], serde_json::json!(true));
}

#[tokio::test]
async fn test_delete_pending_sharing_unlinks_expenses() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(90000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let sharing_id = created.entry.detail.sharing.id.clone();
    let participant_id = created.entry.detail.participants[0].id.clone();

    assert!(!service.delete_bill_sharing(&sharing_id, None).await.unwrap());

    let expense = service.list_expenses().await.unwrap().remove(0);
    assert_eq!(expense.sharing_status, SharingStatus::NotShared);
    assert_eq!(
        service.get_bill_sharing(&sharing_id).await.unwrap_err(),
        FundError::BillSharingNotFound(sharing_id.clone())
    );
    let err = service
        .toggle_payment_status(&participant_id, PaymentStatus::Pending, None)
        .await
        .unwrap_err();
    assert_eq!(err.source, FundError::ParticipantNotFound(participant_id));
}

#[tokio::test]
async fn test_create_rejects_stale_or_empty_selection() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", true)],
        vec![expense("x1", dec!(100000))],
    )
    .await;

    let stale = compute_breakdown(dec!(90000), &ids(&["e1"]), &ids(&[]), |_| true, 0).unwrap();
    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &stale, None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FundError::StaleDraft {
            expected: dec!(90000),
            actual: dec!(100000)
        }
    );

    let err = service
        .create_bill_sharing(&[], &stale, None)
        .await
        .unwrap_err();
    assert_eq!(err, FundError::NoExpensesSelected);

    let err = service
        .create_bill_sharing(&expense_ids(&["missing"]), &stale, None)
        .await
        .unwrap_err();
    assert_eq!(err, FundError::ExpenseNotFound("missing".to_string()));

    assert!(service.bill_sharing_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preview_rejects_unknown_rows() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", true)],
        vec![expense("x1", dec!(100000))],
    )
    .await;

    let err = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "ghost"]), &ids(&[]))
        .await
        .unwrap_err();
    assert_eq!(err, FundError::EmployeeNotFound("ghost".to_string()));

    let err = service
        .preview_breakdown(&expense_ids(&["x9"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap_err();
    assert_eq!(err, FundError::ExpenseNotFound("x9".to_string()));
}

#[tokio::test]
async fn test_failed_participant_insert_leaves_no_rows() {
    let (service, ledger) = create_flaky_service();
    seed(
        &service,
        vec![employee("e1", "An", false), employee("e2", "Binh", false)],
        vec![expense("x1", dec!(200000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();

    ledger.fail_participants.store(true, Ordering::SeqCst);
    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap_err();
    assert!(err.is_persistence());

    assert!(ledger.inner.get_bill_sharing_history().await.unwrap().is_empty());
    let expense = ledger.inner.get_expense("x1").await.unwrap().unwrap();
    assert_eq!(expense.sharing_status, SharingStatus::NotShared);
    assert!(
        service
            .get_app_logs()
            .await
            .unwrap()
            .iter()
            .all(|l| l.action != BILL_SHARING_CREATED)
    );
}

#[tokio::test]
async fn test_failed_link_insert_leaves_no_rows() {
    let (service, ledger) = create_flaky_service();
    seed(
        &service,
        vec![employee("e1", "An", true)],
        vec![expense("x1", dec!(200000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();

    ledger.fail_links.store(true, Ordering::SeqCst);
    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FundError::DatabaseError("injected failure in insert_bill_sharing_expenses".to_string())
    );
    assert!(ledger.inner.get_bill_sharing_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_status_update_returns_previous_status() {
    let (service, ledger) = create_flaky_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(50000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let participant_id = created.entry.detail.participants[0].id.clone();

    ledger.fail_status_update.store(true, Ordering::SeqCst);
    let rollback = service
        .toggle_payment_status(&participant_id, PaymentStatus::Pending, None)
        .await
        .unwrap_err();
    assert_eq!(rollback.previous, PaymentStatus::Pending);
    assert_eq!(rollback.participant_id, participant_id);
    assert!(rollback.source.is_persistence());

    let stored = ledger.inner.get_participant(&participant_id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
    assert!(stored.payment_date.is_none());
}

#[tokio::test]
async fn test_finalize_failure_after_toggle_keeps_status() {
    let (service, ledger) = create_flaky_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(50000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let sharing_id = created.entry.detail.sharing.id.clone();
    let participant_id = created.entry.detail.participants[0].id.clone();

    ledger.fail_finalize.store(true, Ordering::SeqCst);
    let change = service
        .toggle_payment_status(&participant_id, PaymentStatus::Pending, None)
        .await
        .unwrap();
    assert_eq!(change.participant.payment_status, PaymentStatus::Paid);
    assert!(matches!(change.finalization, AutoFinalize::Failed(_)));

    let entry = service.get_bill_sharing(&sharing_id).await.unwrap();
    assert_eq!(entry.detail.sharing.status, SharingState::Pending);
    assert!(entry.report.is_fully_collected());

    // A later retry goes through once the store recovers.
    ledger.fail_finalize.store(false, Ordering::SeqCst);
    assert_eq!(
        service.auto_finalize_if_eligible(&sharing_id).await.unwrap(),
        AutoFinalize::Finalized
    );
}

#[tokio::test]
async fn test_history_is_newest_first_with_reports() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(100000)), expense("x2", dec!(40000))],
    )
    .await;

    let mut created_ids = Vec::new();
    for id in ["x1", "x2"] {
        let breakdown = service
            .preview_breakdown(&expense_ids(&[id]), &ids(&["e1"]), &ids(&[]))
            .await
            .unwrap();
        let created = service
            .create_bill_sharing(&expense_ids(&[id]), &breakdown, None)
            .await
            .unwrap();
        created_ids.push(created.entry.detail.sharing.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let history = service.bill_sharing_history().await.unwrap();
    let listed: Vec<String> = history.iter().map(|h| h.detail.sharing.id.clone()).collect();
    assert_eq!(listed, vec![created_ids[1].clone(), created_ids[0].clone()]);
    assert_eq!(history[0].report.direct_total_owed, dec!(40000));
    assert_eq!(history[1].report.pending_count, 1);
}

#[tokio::test]
async fn test_altered_breakdown_is_rejected() {
    let service = create_test_service();
    seed(
        &service,
        vec![
            employee("e1", "An", true),
            employee("e2", "Binh", false),
            employee("e3", "Chi", false),
        ],
        vec![expense("x1", dec!(300000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2", "e3"]), &ids(&[]))
        .await
        .unwrap();

    // Direct payers claimed as fund-covered, with an inflated share.
    let mut tampered = breakdown.clone();
    for share in tampered.shares.values_mut() {
        share.payment_method = PaymentMethod::Fund;
    }
    if let Some(share) = tampered.shares.get_mut("e2") {
        share.amount_owed = dec!(9999999);
    }
    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &tampered, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FundError::InvalidInput(ref field, _) if field == "breakdown"));
    assert!(err.is_validation());

    // Marking a payer as honoree without recomputing the shares.
    let mut honored = breakdown.clone();
    if let Some(share) = honored.shares.get_mut("e3") {
        share.is_honoree = true;
    }
    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &honored, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FundError::InvalidInput(ref field, _) if field == "breakdown"));

    let mut inflated_totals = breakdown.clone();
    inflated_totals.direct_total = dec!(1);
    assert!(
        service
            .create_bill_sharing(&expense_ids(&["x1"]), &inflated_totals, None)
            .await
            .is_err()
    );

    assert!(service.bill_sharing_history().await.unwrap().is_empty());
    assert_eq!(
        service.list_expenses().await.unwrap()[0].sharing_status,
        SharingStatus::NotShared
    );

    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    assert_eq!(created.entry.detail.participants.len(), 2);
}

#[tokio::test]
async fn test_breakdown_follows_current_fund_membership() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", true), employee("e2", "Binh", true)],
        vec![expense("x1", dec!(200000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();

    let mut leaver = employee("e2", "Binh", false);
    leaver.monthly_contribution = dec!(0);
    service.update_employee(leaver, None).await.unwrap();

    let err = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FundError::InvalidInput(ref field, _) if field == "breakdown"));
}

#[tokio::test]
async fn test_create_succeeds_when_auto_finalize_fails() {
    let (service, ledger) = create_flaky_service();
    seed(
        &service,
        vec![employee("e1", "An", true)],
        vec![expense("x1", dec!(120000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();

    ledger.fail_finalize.store(true, Ordering::SeqCst);
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    assert!(matches!(created.finalization, AutoFinalize::Failed(_)));
    assert_eq!(created.entry.detail.sharing.status, SharingState::Pending);

    let history = ledger.inner.get_bill_sharing_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sharing.id, created.entry.detail.sharing.id);
    assert_eq!(history[0].sharing.status, SharingState::Pending);

    ledger.fail_finalize.store(false, Ordering::SeqCst);
    assert_eq!(
        service
            .finalize(&created.entry.detail.sharing.id, None)
            .await
            .unwrap(),
        FinalizeOutcome::Finalized
    );
    assert_eq!(
        service.list_expenses().await.unwrap()[0].sharing_status,
        SharingStatus::FullyReimbursed
    );
}

#[tokio::test]
async fn test_committed_changes_survive_audit_failure() {
    let service = create_unaudited_service();
    seed(
        &service,
        vec![employee("e1", "An", true), employee("e2", "Binh", false)],
        vec![expense("x1", dec!(200000)), expense("x2", dec!(80000))],
    )
    .await;
    assert_eq!(service.list_expenses().await.unwrap().len(), 2);

    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1", "e2"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, Some("admin"))
        .await
        .unwrap();
    let sharing_id = created.entry.detail.sharing.id.clone();
    assert_eq!(
        created.finalization,
        AutoFinalize::Outstanding {
            remaining: dec!(100000)
        }
    );

    assert_eq!(
        service.finalize(&sharing_id, Some("admin")).await.unwrap(),
        FinalizeOutcome::Finalized
    );
    assert!(service.delete_bill_sharing(&sharing_id, Some("admin")).await.unwrap());
    assert!(service.bill_sharing_history().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_finalize_reimburses_once() {
    let service = create_test_service();
    seed(
        &service,
        vec![employee("e1", "An", false)],
        vec![expense("x1", dec!(75000))],
    )
    .await;
    let breakdown = service
        .preview_breakdown(&expense_ids(&["x1"]), &ids(&["e1"]), &ids(&[]))
        .await
        .unwrap();
    let created = service
        .create_bill_sharing(&expense_ids(&["x1"]), &breakdown, None)
        .await
        .unwrap();
    let sharing_id = created.entry.detail.sharing.id.clone();

    let (first, second) = tokio::join!(service.finalize(&sharing_id, None), service.finalize(&sharing_id, None));
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| *o == FinalizeOutcome::AlreadyFinalized);
    assert_eq!(
        outcomes,
        vec![FinalizeOutcome::Finalized, FinalizeOutcome::AlreadyFinalized]
    );

    let x1 = service.list_expenses().await.unwrap().remove(0);
    assert_eq!(x1.amount_reimbursed, dec!(75000));
    let finalized_logs = service
        .get_app_logs()
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.action == BILL_SHARING_FINALIZED)
        .count();
    assert_eq!(finalized_logs, 1);
}

