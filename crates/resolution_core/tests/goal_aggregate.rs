use resolution_core::db::open_db_in_memory;
use resolution_core::{
    Board, GoalAggregate, GoalDetailsEdit, GoalError, GoalRepository, ManualClock,
    SqliteGoalRepository, SqliteSubtaskRepository, SyncError, TimerPhase, GOAL_COUNT,
};
use rusqlite::Connection;
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;

type SqliteAggregate<'conn> =
    GoalAggregate<SqliteGoalRepository<'conn>, SqliteSubtaskRepository<'conn>, ManualClock>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn load<'conn>(conn: &'conn Connection, clock: &ManualClock, goal_id: i64) -> SqliteAggregate<'conn> {
    GoalAggregate::load(
        SqliteGoalRepository::try_new(conn).unwrap(),
        SqliteSubtaskRepository::try_new(conn).unwrap(),
        clock.clone(),
        goal_id,
    )
    .unwrap()
}

#[test]
fn view_recomputes_elapsed_time_on_every_read() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 1);

    aggregate.start_timer().unwrap();
    clock.advance(Duration::from_secs(75));

    let view = aggregate.view();
    assert_eq!(view.timer_phase, TimerPhase::Running);
    assert_eq!(view.elapsed_seconds, 75);
    assert_eq!(view.goal.timer_started_at, Some(T0));
    assert_eq!(view.goal.total_time_seconds, 0);

    clock.advance(Duration::from_secs(5));
    assert_eq!(aggregate.view().elapsed_seconds, 80);

    aggregate.stop_timer().unwrap();
    let stopped = aggregate.view();
    assert_eq!(stopped.timer_phase, TimerPhase::Stopped);
    assert_eq!(stopped.goal.total_time_seconds, 80);
    assert_eq!(stopped.goal.timer_started_at, None);
}

#[test]
fn view_counts_completed_subtasks() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 2);

    let first = aggregate.subtasks_mut().add("Sketch").unwrap();
    aggregate.subtasks_mut().add("Build").unwrap();
    aggregate.subtasks_mut().toggle_complete(first.id).unwrap();

    let view = aggregate.view();
    assert_eq!(view.subtasks.len(), 2);
    assert_eq!(view.completed_subtasks, 1);
    assert!(!view.needs_refresh);
    assert!(!view.goal.is_complete);
}

#[test]
fn details_edit_trims_title_and_clears_blank_fields() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 3);

    aggregate
        .update_details(GoalDetailsEdit {
            title: Some("  Learn to weld ".to_string()),
            description: Some("  Evening class\n".to_string()),
            notes: Some(" bring gloves ".to_string()),
        })
        .unwrap();
    assert_eq!(
        aggregate.view().goal.notes.as_deref(),
        Some("bring gloves")
    );
    aggregate
        .update_details(GoalDetailsEdit {
            notes: Some("   ".to_string()),
            ..GoalDetailsEdit::default()
        })
        .unwrap();

    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let stored = repo.get_goal(3).unwrap().unwrap();
    assert_eq!(stored.title, "Learn to weld");
    assert_eq!(stored.description.as_deref(), Some("Evening class"));
    assert_eq!(stored.notes, None);
    assert_eq!(aggregate.view().goal.title, "Learn to weld");
}

#[test]
fn blank_title_is_rejected() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 4);

    let err = aggregate
        .update_details(GoalDetailsEdit {
            title: Some(" ".to_string()),
            ..GoalDetailsEdit::default()
        })
        .unwrap_err();
    assert!(matches!(err, GoalError::InvalidTitle));
    assert_eq!(aggregate.view().goal.title, "Weekend 4");
}

#[test]
fn completion_flag_is_explicit_and_drives_progress() {
    let conn = setup();
    let clock = ManualClock::new(T0);

    let mut first = load(&conn, &clock, 1);
    first.subtasks_mut().add("Unfinished").unwrap();
    first.set_complete(true).unwrap();
    let mut second = load(&conn, &clock, 2);
    assert!(second.toggle_complete().unwrap());
    let mut third = load(&conn, &clock, 3);
    third.toggle_complete().unwrap();
    assert!(!third.toggle_complete().unwrap());

    let board = Board::load(&SqliteGoalRepository::try_new(&conn).unwrap(), &clock).unwrap();
    assert_eq!(board.goals.len(), GOAL_COUNT);
    assert_eq!(board.progress.completed, 2);
    assert_eq!(board.progress.total, GOAL_COUNT);
    assert_eq!(board.progress.percent, 20);
    assert!(board.goals[0].is_complete);
    assert!(!board.goals[2].is_complete);
}

#[test]
fn board_reports_live_elapsed_for_running_goals() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 5);
    aggregate.start_timer().unwrap();
    clock.advance(Duration::from_secs(42));

    let board = Board::load(&SqliteGoalRepository::try_new(&conn).unwrap(), &clock).unwrap();
    let summary = &board.goals[4];
    assert_eq!(summary.id, 5);
    assert_eq!(summary.timer_phase, TimerPhase::Running);
    assert_eq!(summary.elapsed_seconds, 42);
    assert_eq!(board.goals[0].elapsed_seconds, 0);
}

#[test]
fn refresh_adopts_timer_changes_from_another_session() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut stale = load(&conn, &clock, 6);
    let mut other = load(&conn, &clock, 6);

    other.start_timer().unwrap();
    clock.advance(Duration::from_secs(10));
    assert_eq!(stale.view().timer_phase, TimerPhase::Stopped);

    assert_eq!(stale.refresh().unwrap(), None);
    let view = stale.view();
    assert_eq!(view.timer_phase, TimerPhase::Running);
    assert_eq!(view.elapsed_seconds, 10);
}

#[test]
fn failed_checklist_write_is_visible_in_view_until_refresh() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let mut aggregate = load(&conn, &clock, 7);
    let a = aggregate.subtasks_mut().add("A").unwrap();
    let b = aggregate.subtasks_mut().add("B").unwrap();

    conn.execute_batch(&format!(
        "CREATE TRIGGER subtasks_fail_sort_update_test
         BEFORE UPDATE OF sort_order ON subtasks
         WHEN NEW.id = '{}'
         BEGIN
             SELECT RAISE(ABORT, 'forced sort failure');
         END;",
        b.id
    ))
    .unwrap();

    let err = aggregate.subtasks_mut().reorder(a.id, 1).unwrap_err();
    assert!(matches!(err, SyncError::PartialWrite { applied: 0, .. }));
    assert!(aggregate.view().needs_refresh);

    assert!(aggregate.refresh().unwrap().is_some());
    assert!(!aggregate.view().needs_refresh);
    let ids: Vec<_> = aggregate.view().subtasks.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[test]
fn unknown_goal_is_reported() {
    let conn = setup();
    let result = GoalAggregate::load(
        SqliteGoalRepository::try_new(&conn).unwrap(),
        SqliteSubtaskRepository::try_new(&conn).unwrap(),
        ManualClock::new(T0),
        11,
    );
    assert!(matches!(result, Err(GoalError::GoalNotFound(11))));
}
