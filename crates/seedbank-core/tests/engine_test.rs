mod common;

use chrono::Duration;
use common::{date, noon, utc, Harness};
use seedbank_common::{
    Decision, LedgerKind, RequestStatus, StreakRewards, StreakThreshold, TaskStatus,
};
use seedbank_core::{
    EngineError, LedgerFilter, LedgerScope, ManualTaskDraft, PrivilegeDraft, RoutineItemDraft,
};

#[tokio::test]
async fn test_bdd_given_new_york_monday_when_chores_completed_then_today_ledger_shows_eight() {
    let h = Harness::new("America/New_York").await;
    // Monday 2026-01-19 10:00 EST
    let now = utc("2026-01-19T15:00:00Z");
    h.bank.create_routine(&h.parent_at(now), h.family.id, h.routine("Morning", "MON,WED", &[5, 3]))
        .await
        .unwrap();

    let ctx = h.child_at(now);
    let tasks = h.bank.get_due_tasks(&ctx, h.family.id, None, None).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.day == date(2026, 1, 19)));
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));
    assert_eq!(tasks.iter().map(|t| t.point_value).collect::<Vec<_>>(), vec![5, 3]);

    for task in &tasks {
        let update = h.bank.set_task_status(&ctx, task.id, TaskStatus::Completed).await.unwrap();
        assert_eq!(update.task.status, TaskStatus::Completed);
        assert_eq!(update.task.completed_at, Some(now));
    }

    let streak = h.bank.get_streak(&ctx, h.child.id).await.unwrap();
    assert_eq!(streak.current, 1);
    assert_eq!(streak.last_qualifying_day, Some(date(2026, 1, 19)));

    // 22:00 EST is already Tuesday in UTC but still Monday for the family
    let late = h.child_at(utc("2026-01-20T03:00:00Z"));
    let page = h.bank.get_ledger(&late, h.child.id, LedgerFilter::today()).await.unwrap();
    assert_eq!(page.entries.iter().map(|e| e.amount).sum::<i64>(), 8);
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.balance, 8);

    let again = h.bank.get_due_tasks(&late, h.family.id, None, None).await.unwrap();
    assert_eq!(again.len(), 2);
    assert!(again.iter().all(|t| t.is_completed()));
}

#[tokio::test]
async fn test_expansion_is_idempotent() {
    let h = Harness::new("Europe/Berlin").await;
    let now = noon("Europe/Berlin", date(2026, 2, 2));
    h.bank.create_routine(&h.parent_at(now), h.family.id, h.routine("Daily", "", &[1, 2, 3]))
        .await
        .unwrap();

    let ctx = h.parent_at(now);
    let first = h.bank.get_due_tasks(&ctx, h.family.id, Some(h.child.id), None).await.unwrap();
    let second = h.bank.get_due_tasks(&ctx, h.family.id, Some(h.child.id), None).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(
        first.iter().map(|t| t.id).collect::<Vec<_>>(),
        second.iter().map(|t| t.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_routine_changes_never_touch_materialized_tasks() {
    let h = Harness::new("UTC").await;
    let monday = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(monday);
    let routine = h
        .bank
        .create_routine(&parent, h.family.id, h.routine("Morning", "", &[5]))
        .await
        .unwrap();

    let today = h.bank.get_due_tasks(&parent, h.family.id, None, None).await.unwrap();
    assert_eq!(today[0].point_value, 5);

    let mut draft = h.routine("Morning", "", &[]);
    draft.items = vec![RoutineItemDraft {
        id: Some(routine.items[0].id),
        title: "Morning chore 1".to_string(),
        point_value: 10,
    }];
    h.bank.update_routine(&parent, routine.id, draft).await.unwrap();

    let today = h.bank.get_due_tasks(&parent, h.family.id, None, None).await.unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].point_value, 5);

    let tomorrow = h
        .bank
        .get_due_tasks(&parent, h.family.id, None, Some(date(2026, 1, 20)))
        .await
        .unwrap();
    assert_eq!(tomorrow[0].point_value, 10);
    assert_eq!(tomorrow[0].item_id, today[0].item_id);
}

#[tokio::test]
async fn test_past_days_are_not_materialized() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);
    h.bank.create_routine(&parent, h.family.id, h.routine("Morning", "", &[5])).await.unwrap();

    let yesterday = h
        .bank
        .get_due_tasks(&parent, h.family.id, None, Some(date(2026, 1, 18)))
        .await
        .unwrap();
    assert!(yesterday.is_empty());
}

#[tokio::test]
async fn test_bdd_given_weekly_and_daily_rewards_when_seven_days_completed_then_weekly_paid_once()
{
    let zone = "Europe/Berlin";
    let h = Harness::new(zone).await;
    let start = date(2026, 3, 2);
    let setup = h.parent_at(noon(zone, start));
    h.bank
        .configure_streak_rewards(
            &setup,
            h.family.id,
            StreakRewards { daily: 5, weekly: 50, ..Default::default() },
        )
        .await
        .unwrap();
    h.bank.create_routine(&setup, h.family.id, h.routine("Chores", "", &[1])).await.unwrap();

    let mut weekly_days = Vec::new();
    for n in 0..8 {
        let day = start + Duration::days(n);
        let ctx = h.child_at(noon(zone, day));
        let tasks = h.bank.get_due_tasks(&ctx, h.family.id, None, None).await.unwrap();
        let update = h.bank.set_task_status(&ctx, tasks[0].id, TaskStatus::Completed).await.unwrap();

        let kinds: Vec<LedgerKind> = update.entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds[0], LedgerKind::TaskReward);
        let streak_amounts: Vec<i64> = update
            .entries
            .iter()
            .filter(|e| e.kind == LedgerKind::StreakReward)
            .map(|e| e.amount)
            .collect();
        assert_eq!(streak_amounts[0], 5, "daily reward on day {}", n + 1);
        if streak_amounts.contains(&50) {
            weekly_days.push(n + 1);
        }
    }
    assert_eq!(weekly_days, vec![7]);

    let ctx = h.child_at(noon(zone, start + Duration::days(7)));
    let streak = h.bank.get_streak(&ctx, h.child.id).await.unwrap();
    assert_eq!(streak.current, 8);
    let weekly = streak.goals.iter().find(|g| g.threshold == StreakThreshold::Weekly).unwrap();
    assert!(weekly.rewarded);
    assert_eq!(weekly.progress, 7);
    assert!(streak.goals.iter().all(|g| g.reward > 0));

    // 8 task points + 8 daily rewards + 1 weekly reward
    assert_eq!(h.bank.balance(&ctx, h.child.id).await.unwrap(), 8 + 40 + 50);
}

#[tokio::test]
async fn test_bdd_given_five_day_streak_when_a_day_is_missed_then_streak_resets() {
    let zone = "America/Los_Angeles";
    let h = Harness::new(zone).await;
    let start = date(2026, 5, 4);
    h.bank
        .create_routine(&h.parent_at(noon(zone, start)), h.family.id, h.routine("Chores", "", &[2]))
        .await
        .unwrap();

    for n in 0..5 {
        let ctx = h.child_at(noon(zone, start + Duration::days(n)));
        let tasks = h.bank.get_due_tasks(&ctx, h.family.id, None, None).await.unwrap();
        h.bank.set_task_status(&ctx, tasks[0].id, TaskStatus::Completed).await.unwrap();
    }

    let day6 = h.child_at(noon(zone, start + Duration::days(5)));
    assert_eq!(h.bank.get_streak(&day6, h.child.id).await.unwrap().current, 5);

    let day7 = h.child_at(noon(zone, start + Duration::days(6)));
    let streak = h.bank.get_streak(&day7, h.child.id).await.unwrap();
    assert_eq!(streak.current, 0);
    assert_eq!(streak.longest, 5);

    let tasks = h.bank.get_due_tasks(&day7, h.family.id, None, None).await.unwrap();
    h.bank.set_task_status(&day7, tasks[0].id, TaskStatus::Completed).await.unwrap();
    let streak = h.bank.get_streak(&day7, h.child.id).await.unwrap();
    assert_eq!(streak.current, 1);
    assert_eq!(streak.longest, 5);
}

#[tokio::test]
async fn test_bdd_given_privilege_costing_thirty_when_balance_twenty_then_request_refused() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);
    let child = h.child_at(now);

    let privilege = h
        .bank
        .create_privilege(
            &parent,
            h.family.id,
            PrivilegeDraft { title: "Movie night".to_string(), description: None, cost: 30 },
        )
        .await
        .unwrap();
    h.bank.post_ledger_entry(&parent, h.child.id, LedgerKind::Gift, 20, None).await.unwrap();

    let refused = h.bank.create_privilege_request(&child, h.child.id, privilege.id, None).await;
    assert!(matches!(
        refused,
        Err(EngineError::InsufficientBalance { required: 30, available: 20 })
    ));
    assert!(h.bank.list_privilege_requests(&parent, h.family.id, None).await.unwrap().is_empty());

    h.bank
        .post_ledger_entry(&parent, h.child.id, LedgerKind::Gift, 15, Some("birthday".into()))
        .await
        .unwrap();
    let request = h
        .bank
        .create_privilege_request(&child, h.child.id, privilege.id, Some("Friday".into()))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.cost, 30);
    assert_eq!(h.bank.balance(&child, h.child.id).await.unwrap(), 35);

    let denied = h.bank.decide_privilege_request(&child, request.id, Decision::Approved).await;
    assert!(matches!(denied, Err(EngineError::Authorization(_))));

    let decided =
        h.bank.decide_privilege_request(&parent, request.id, Decision::Approved).await.unwrap();
    assert_eq!(decided.request.status, RequestStatus::Approved);
    assert_eq!(decided.request.resolved_by, Some(h.parent.id));
    let redemption = decided.redemption.unwrap();
    assert_eq!(redemption.kind, LedgerKind::PrivilegeRedemption);
    assert_eq!(redemption.amount, -30);
    assert_eq!(redemption.request_id, Some(request.id));
    assert_eq!(h.bank.balance(&child, h.child.id).await.unwrap(), 5);

    let twice = h.bank.decide_privilege_request(&parent, request.id, Decision::Rejected).await;
    assert!(matches!(twice, Err(EngineError::InvalidStateTransition(_))));

    let ended = h.bank.terminate_privilege_request(&parent, request.id).await.unwrap();
    assert_eq!(ended.status, RequestStatus::Terminated);
    assert_eq!(ended.terminated_by, Some(h.parent.id));
    assert_eq!(h.bank.balance(&child, h.child.id).await.unwrap(), 5);

    let again = h.bank.terminate_privilege_request(&parent, request.id).await;
    assert!(matches!(again, Err(EngineError::InvalidStateTransition(_))));
}

#[tokio::test]
async fn test_rejected_request_has_no_ledger_effect_and_cannot_terminate() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);
    let child = h.child_at(now);

    let privilege = h
        .bank
        .create_privilege(
            &parent,
            h.family.id,
            PrivilegeDraft { title: "Late bedtime".to_string(), description: None, cost: 10 },
        )
        .await
        .unwrap();
    h.bank.post_ledger_entry(&parent, h.child.id, LedgerKind::Gift, 10, None).await.unwrap();

    let request =
        h.bank.create_privilege_request(&child, h.child.id, privilege.id, None).await.unwrap();
    let decided =
        h.bank.decide_privilege_request(&parent, request.id, Decision::Rejected).await.unwrap();
    assert_eq!(decided.request.status, RequestStatus::Rejected);
    assert!(decided.redemption.is_none());
    assert_eq!(h.bank.balance(&child, h.child.id).await.unwrap(), 10);

    let terminate = h.bank.terminate_privilege_request(&parent, request.id).await;
    assert!(matches!(terminate, Err(EngineError::InvalidStateTransition(_))));

    let mine = h.bank.my_privilege_requests(&child, Some(RequestStatus::Rejected)).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_task_toggle_posts_reversal_without_double_rewards() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);
    h.bank
        .configure_streak_rewards(&parent, h.family.id, StreakRewards { daily: 2, ..Default::default() })
        .await
        .unwrap();
    h.bank.create_routine(&parent, h.family.id, h.routine("Morning", "", &[5])).await.unwrap();

    let ctx = h.child_at(now);
    let task = h.bank.get_due_tasks(&ctx, h.family.id, None, None).await.unwrap().remove(0);

    let done = h.bank.set_task_status(&ctx, task.id, TaskStatus::Completed).await.unwrap();
    assert_eq!(done.entries.len(), 2);
    let repeat = h.bank.set_task_status(&ctx, task.id, TaskStatus::Completed).await.unwrap();
    assert!(repeat.entries.is_empty());
    assert_eq!(h.bank.balance(&ctx, h.child.id).await.unwrap(), 7);

    let undone = h.bank.set_task_status(&ctx, task.id, TaskStatus::Pending).await.unwrap();
    assert_eq!(undone.task.status, TaskStatus::Pending);
    assert!(undone.task.completed_at.is_none());
    assert_eq!(undone.entries.len(), 1);
    assert_eq!(undone.entries[0].kind, LedgerKind::TaskReversal);
    assert_eq!(undone.entries[0].amount, -5);

    // Completing again pays the task but the day already counts toward the streak
    let redone = h.bank.set_task_status(&ctx, task.id, TaskStatus::Completed).await.unwrap();
    assert_eq!(redone.entries.len(), 1);
    assert_eq!(h.bank.balance(&ctx, h.child.id).await.unwrap(), 7);
    assert_eq!(h.bank.get_streak(&ctx, h.child.id).await.unwrap().current, 1);
}

#[tokio::test]
async fn test_manual_tasks_and_history() {
    let h = Harness::new("Asia/Tokyo").await;
    // 05:00 JST Tuesday
    let now = utc("2026-01-19T20:00:00Z");
    let parent = h.parent_at(now);

    let task = h
        .bank
        .create_manual_task(
            &parent,
            ManualTaskDraft {
                child_id: h.child.id,
                title: "Help with groceries".to_string(),
                point_value: 4,
                day: None,
            },
        )
        .await
        .unwrap();
    assert!(task.is_manual());
    assert_eq!(task.day, date(2026, 1, 20));

    let child = h.child_at(now);
    h.bank.set_task_status(&child, task.id, TaskStatus::Completed).await.unwrap();

    let history = h.bank.task_history(&child, h.family.id, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, task.id);

    let future = h
        .bank
        .create_manual_task(
            &parent,
            ManualTaskDraft {
                child_id: h.child.id,
                title: "Pack for trip".to_string(),
                point_value: 1,
                day: Some(date(2026, 1, 25)),
            },
        )
        .await
        .unwrap();
    let early = h.bank.set_task_status(&child, future.id, TaskStatus::Completed).await;
    assert!(matches!(early, Err(EngineError::Validation(_))));

    let by_child = h
        .bank
        .create_manual_task(
            &child,
            ManualTaskDraft { child_id: h.child.id, title: "x".to_string(), point_value: 1, day: None },
        )
        .await;
    assert!(matches!(by_child, Err(EngineError::Authorization(_))));
}

#[tokio::test]
async fn test_manual_postings_are_validated() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);

    let system = h.bank.post_ledger_entry(&parent, h.child.id, LedgerKind::TaskReward, 5, None).await;
    assert!(matches!(system, Err(EngineError::Validation(_))));

    let zero = h.bank.post_ledger_entry(&parent, h.child.id, LedgerKind::Gift, 0, None).await;
    assert!(matches!(zero, Err(EngineError::Validation(_))));

    let by_child =
        h.bank.post_ledger_entry(&h.child_at(now), h.child.id, LedgerKind::Gift, 5, None).await;
    assert!(matches!(by_child, Err(EngineError::Authorization(_))));

    let penalty =
        h.bank.post_ledger_entry(&parent, h.child.id, LedgerKind::Penalty, 7, None).await.unwrap();
    assert_eq!(penalty.amount, -7);
    assert_eq!(penalty.author_id, Some(h.parent.id));
    // No balance floor
    assert_eq!(h.bank.balance(&parent, h.child.id).await.unwrap(), -7);
}

#[tokio::test]
async fn test_ledger_scopes_and_family_view() {
    let h = Harness::new("America/New_York").await;
    let sibling = h.add_child("Leo").await;

    let monday = h.parent_at(utc("2026-01-19T15:00:00Z"));
    let tuesday = h.parent_at(utc("2026-01-20T15:00:00Z"));
    h.bank.post_ledger_entry(&monday, h.child.id, LedgerKind::Gift, 3, None).await.unwrap();
    h.bank.post_ledger_entry(&tuesday, h.child.id, LedgerKind::Gift, 4, None).await.unwrap();
    h.bank.post_ledger_entry(&tuesday, sibling.id, LedgerKind::Gift, 9, None).await.unwrap();

    let all = h.bank.get_ledger(&tuesday, h.child.id, LedgerFilter::default()).await.unwrap();
    assert_eq!(all.entries.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![4, 3]);

    let monday_only = LedgerFilter { scope: LedgerScope::Day(date(2026, 1, 19)), limit: None };
    let page = h.bank.get_ledger(&tuesday, h.child.id, monday_only).await.unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.balance, 7);

    let limited = LedgerFilter { scope: LedgerScope::All, limit: Some(1) };
    assert_eq!(h.bank.get_ledger(&tuesday, h.child.id, limited).await.unwrap().entries.len(), 1);

    let family = h.bank.family_ledger(&tuesday, h.family.id, LedgerFilter::today()).await.unwrap();
    assert_eq!(family.len(), 2);

    let peek = h.bank.get_ledger(&h.child_at(tuesday.now), sibling.id, LedgerFilter::default()).await;
    assert!(matches!(peek, Err(EngineError::Authorization(_))));
}

#[tokio::test]
async fn test_other_families_are_out_of_reach() {
    let h = Harness::new("UTC").await;
    let other = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");

    let foreign_parent = other.parent_at(now);
    let gift = h.bank.post_ledger_entry(&foreign_parent, h.child.id, LedgerKind::Gift, 5, None).await;
    assert!(matches!(gift, Err(EngineError::Authorization(_))));

    let wrong_family = h.bank.get_due_tasks(&foreign_parent, h.family.id, None, None).await;
    assert!(matches!(wrong_family, Err(EngineError::Authorization(_))));
}

#[tokio::test]
async fn test_family_timezone_updates() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");

    let invalid = h.bank.set_family_timezone(&h.parent_at(now), h.family.id, "Mars/Base").await;
    assert!(matches!(invalid, Err(EngineError::Validation(_))));

    let by_child = h.bank.set_family_timezone(&h.child_at(now), h.family.id, "Asia/Tokyo").await;
    assert!(matches!(by_child, Err(EngineError::Authorization(_))));

    let family =
        h.bank.set_family_timezone(&h.parent_at(now), h.family.id, "Asia/Tokyo").await.unwrap();
    assert_eq!(family.timezone, "Asia/Tokyo");

    let rewards = h.bank.streak_rewards(&h.child_at(now), h.family.id).await.unwrap();
    assert_eq!(rewards, StreakRewards::default());
}

#[tokio::test]
async fn test_routine_assignments_must_be_family_children() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);

    let mut draft = h.routine("Morning", "MON", &[1]);
    draft.child_ids.push(h.parent.id);
    let result = h.bank.create_routine(&parent, h.family.id, draft).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    let routine =
        h.bank.create_routine(&parent, h.family.id, h.routine("Morning", "MON", &[1])).await.unwrap();
    h.bank.archive_routine(&parent, routine.id).await.unwrap();

    assert!(h.bank.list_routines(&parent, h.family.id, false).await.unwrap().is_empty());
    let archived = h.bank.list_routines(&parent, h.family.id, true).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert!(!archived[0].active);

    let tasks = h.bank.get_due_tasks(&parent, h.family.id, None, None).await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn test_future_day_preview_follows_later_routine_edits() {
    let h = Harness::new("UTC").await;
    // Wednesday 2026-01-14
    let wednesday = utc("2026-01-14T09:00:00Z");
    let parent = h.parent_at(wednesday);
    let routine = h
        .bank
        .create_routine(&parent, h.family.id, h.routine("Music practice", "MON", &[5]))
        .await
        .unwrap();

    let preview = h
        .bank
        .get_due_tasks(&parent, h.family.id, None, Some(date(2026, 1, 19)))
        .await
        .unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].point_value, 5);
    assert_eq!(preview[0].status, TaskStatus::Pending);

    let again = h
        .bank
        .get_due_tasks(&parent, h.family.id, None, Some(date(2026, 1, 19)))
        .await
        .unwrap();
    assert_eq!(again[0].id, preview[0].id);

    let mut draft = h.routine("Music practice", "TUE", &[]);
    draft.items = vec![RoutineItemDraft {
        id: Some(routine.items[0].id),
        title: "Music practice chore 1".to_string(),
        point_value: 10,
    }];
    h.bank.update_routine(&parent, routine.id, draft).await.unwrap();

    let tuesday = h
        .bank
        .get_due_tasks(&parent, h.family.id, None, Some(date(2026, 1, 20)))
        .await
        .unwrap();
    assert_eq!(tuesday.len(), 1);
    assert_eq!(tuesday[0].point_value, 10);

    // Monday arrives: nothing from the old MON schedule was kept
    let monday = h.parent_at(utc("2026-01-19T09:00:00Z"));
    let due = h.bank.get_due_tasks(&monday, h.family.id, None, None).await.unwrap();
    assert!(due.is_empty());

    // Tuesday arrives: the stored instance carries the edited value
    let tuesday_ctx = h.child_at(utc("2026-01-20T09:00:00Z"));
    let due = h.bank.get_due_tasks(&tuesday_ctx, h.family.id, None, None).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].point_value, 10);
    let update = h.bank.set_task_status(&tuesday_ctx, due[0].id, TaskStatus::Completed).await;
    assert!(update.is_ok());
}

#[tokio::test]
async fn test_future_preview_cannot_be_completed() {
    let h = Harness::new("UTC").await;
    let now = utc("2026-01-19T09:00:00Z");
    let parent = h.parent_at(now);
    h.bank.create_routine(&parent, h.family.id, h.routine("Morning", "", &[5])).await.unwrap();

    let tomorrow = h
        .bank
        .get_due_tasks(&parent, h.family.id, Some(h.child.id), Some(date(2026, 1, 20)))
        .await
        .unwrap();
    assert_eq!(tomorrow.len(), 1);

    let child = h.child_at(now);
    let result = h.bank.set_task_status(&child, tomorrow[0].id, TaskStatus::Completed).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
    assert_eq!(h.bank.balance(&parent, h.child.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_late_completion_counts_the_same_whether_or_not_streak_was_viewed() {
    let h = Harness::new("UTC").await;
    let watched = h.child.clone();
    let unwatched = h.add_child("Leo").await;

    let start = date(2026, 1, 5);
    let setup = h.parent_at(noon("UTC", start));
    let mut draft = h.routine("Evening", "", &[2]);
    draft.child_ids = vec![watched.id, unwatched.id];
    h.bank.create_routine(&setup, h.family.id, draft).await.unwrap();

    let as_member = |member: &seedbank_common::Member, now| {
        seedbank_core::RequestContext::new(seedbank_core::Caller::from(member)).at(now)
    };

    // Days 1-3 completed on the day, day 4 materialized but left open
    for offset in 0..4 {
        let now = noon("UTC", start + Duration::days(offset));
        let tasks = h.bank.get_due_tasks(&h.parent_at(now), h.family.id, None, None).await.unwrap();
        assert_eq!(tasks.len(), 2);
        if offset < 3 {
            for task in &tasks {
                let owner = if task.child_id == watched.id { &watched } else { &unwatched };
                h.bank
                    .set_task_status(&as_member(owner, now), task.id, TaskStatus::Completed)
                    .await
                    .unwrap();
            }
        }
    }

    let day5 = noon("UTC", start + Duration::days(4));
    let viewed = h.bank.get_streak(&as_member(&watched, day5), watched.id).await.unwrap();
    assert_eq!(viewed.current, 0);

    let day4 = h
        .bank
        .get_due_tasks(&h.parent_at(day5), h.family.id, None, Some(start + Duration::days(3)))
        .await
        .unwrap();
    assert_eq!(day4.len(), 2);
    for task in &day4 {
        let owner = if task.child_id == watched.id { &watched } else { &unwatched };
        h.bank
            .set_task_status(&as_member(owner, day5), task.id, TaskStatus::Completed)
            .await
            .unwrap();
    }

    let watched_streak = h.bank.get_streak(&as_member(&watched, day5), watched.id).await.unwrap();
    let unwatched_streak =
        h.bank.get_streak(&as_member(&unwatched, day5), unwatched.id).await.unwrap();
    assert_eq!(watched_streak.current, unwatched_streak.current);
    assert_eq!(watched_streak.current, 1);
    assert_eq!(unwatched_streak.longest, 3);
    assert_eq!(unwatched_streak.last_qualifying_day, Some(start + Duration::days(3)));
}

#[tokio::test]
async fn test_new_family_uses_configured_default_zone() {
    let dir = tempfile::tempdir().unwrap();
    let config = seedbank_db::DatabaseConfig {
        path: dir.path().join("seedbank.db").to_str().unwrap().to_string(),
        ..Default::default()
    };
    let db = seedbank_db::Database::new(config).await.unwrap();
    db.run_migrations().await.unwrap();

    let settings = seedbank_core::EngineSettings {
        default_timezone: Some("Asia/Tokyo".to_string()),
        ..Default::default()
    };
    let bank = seedbank_core::Seedbank::new(db, settings);
    let now = utc("2026-01-01T00:00:00Z");

    let defaulted = bank.create_family("Sato", None, now).await.unwrap();
    assert_eq!(defaulted.timezone, "Asia/Tokyo");

    let explicit = bank.create_family("Okafor", Some("Africa/Lagos"), now).await.unwrap();
    assert_eq!(explicit.timezone, "Africa/Lagos");
}
