use resolution_core::db::open_db_in_memory;
use resolution_core::{
    GoalRepository, ManualClock, SqliteGoalRepository, TimerController, TimerError, TimerPhase,
    TimerTransition,
};
use rusqlite::Connection;
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn start_persists_start_instant_and_keeps_total() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 3).unwrap();

    assert_eq!(timer.phase(), TimerPhase::Stopped);
    let transition = timer.start().unwrap();
    assert_eq!(transition, TimerTransition::Started { started_at: T0 });
    assert_eq!(timer.phase(), TimerPhase::Running);

    let stored = repo.get_goal(3).unwrap().unwrap();
    assert_eq!(stored.timer_started_at, Some(T0));
    assert_eq!(stored.total_time_seconds, 0);
}

#[test]
fn second_start_keeps_original_interval() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 1).unwrap();

    timer.start().unwrap();
    clock.advance(Duration::from_secs(5));
    assert_eq!(
        timer.start().unwrap(),
        TimerTransition::Unchanged(TimerPhase::Running)
    );

    let stored = repo.get_goal(1).unwrap().unwrap();
    assert_eq!(stored.timer_started_at, Some(T0));
}

#[test]
fn stop_folds_interval_into_total_in_one_write() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 2).unwrap();

    timer.start().unwrap();
    clock.advance(Duration::from_millis(90_500));
    assert_eq!(timer.elapsed_now(), 90);

    let transition = timer.stop().unwrap();
    assert_eq!(
        transition,
        TimerTransition::Stopped {
            total_time_seconds: 90,
            interval_seconds: 90,
        }
    );

    let stored = repo.get_goal(2).unwrap().unwrap();
    assert_eq!(stored.total_time_seconds, 90);
    assert_eq!(stored.timer_started_at, None);

    clock.advance(Duration::from_secs(60));
    assert_eq!(timer.elapsed_now(), 90);
}

#[test]
fn intervals_accumulate_across_sessions() {
    let conn = setup();
    let clock = ManualClock::new(T0);

    {
        let repo = SqliteGoalRepository::try_new(&conn).unwrap();
        let mut timer = TimerController::load(repo, clock.clone(), 4).unwrap();
        timer.start().unwrap();
        clock.advance(Duration::from_secs(30));
        timer.stop().unwrap();
    }

    clock.advance(Duration::from_secs(600));
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let mut timer = TimerController::load(repo, clock.clone(), 4).unwrap();
    assert_eq!(timer.elapsed_now(), 30);
    timer.start().unwrap();
    clock.advance(Duration::from_secs(15));
    assert_eq!(timer.elapsed_now(), 45);
    timer.stop().unwrap();

    assert_eq!(repo.get_goal(4).unwrap().unwrap().total_time_seconds, 45);
}

#[test]
fn running_timer_survives_reload() {
    let conn = setup();
    let clock = ManualClock::new(T0);
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let mut first = TimerController::load(repo, clock.clone(), 5).unwrap();
    first.start().unwrap();
    drop(first);

    clock.advance(Duration::from_secs(12));
    let reloaded = TimerController::load(repo, clock.clone(), 5).unwrap();
    assert_eq!(reloaded.phase(), TimerPhase::Running);
    assert_eq!(reloaded.elapsed_now(), 12);
}

#[test]
fn stop_while_stopped_is_a_no_op() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let mut timer = TimerController::load(repo, ManualClock::new(T0), 6).unwrap();

    assert_eq!(
        timer.stop().unwrap(),
        TimerTransition::Unchanged(TimerPhase::Stopped)
    );
    assert_eq!(repo.get_goal(6).unwrap().unwrap().total_time_seconds, 0);
}

#[test]
fn toggle_alternates_phases() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 7).unwrap();

    assert!(matches!(
        timer.toggle().unwrap(),
        TimerTransition::Started { .. }
    ));
    clock.advance(Duration::from_secs(2));
    assert!(matches!(
        timer.toggle().unwrap(),
        TimerTransition::Stopped {
            total_time_seconds: 2,
            ..
        }
    ));
    assert_eq!(timer.phase(), TimerPhase::Stopped);
}

#[test]
fn failed_stop_write_leaves_timer_running() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 8).unwrap();
    timer.start().unwrap();
    clock.advance(Duration::from_secs(20));

    conn.execute_batch(
        "CREATE TRIGGER goals_fail_timer_update_test
         BEFORE UPDATE OF total_time_seconds ON goals
         WHEN NEW.id = 8
         BEGIN
             SELECT RAISE(ABORT, 'forced timer failure');
         END;",
    )
    .unwrap();

    let err = timer.stop().unwrap_err();
    assert!(matches!(err, TimerError::Persistence(_)));
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.elapsed_now(), 20);

    let stored = repo.get_goal(8).unwrap().unwrap();
    assert_eq!(stored.timer_started_at, Some(T0));
    assert_eq!(stored.total_time_seconds, 0);

    conn.execute_batch("DROP TRIGGER goals_fail_timer_update_test;")
        .unwrap();
    timer.stop().unwrap();
    assert_eq!(repo.get_goal(8).unwrap().unwrap().total_time_seconds, 20);
}

#[test]
fn unknown_goal_is_reported() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let result = TimerController::load(repo, ManualClock::new(T0), 42);
    assert!(matches!(result, Err(TimerError::GoalNotFound(42))));
}

#[test]
fn failed_start_write_leaves_timer_stopped() {
    let conn = setup();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let clock = ManualClock::new(T0);
    let mut timer = TimerController::load(repo, clock.clone(), 9).unwrap();

    conn.execute_batch(
        "CREATE TRIGGER goals_fail_timer_start_test
         BEFORE UPDATE OF timer_started_at ON goals
         WHEN NEW.id = 9
         BEGIN
             SELECT RAISE(ABORT, 'forced timer failure');
         END;",
    )
    .unwrap();

    let err = timer.start().unwrap_err();
    assert!(matches!(err, TimerError::Persistence(_)));
    assert_eq!(timer.phase(), TimerPhase::Stopped);
    clock.advance(Duration::from_secs(30));
    assert_eq!(timer.elapsed_now(), 0);

    let stored = repo.get_goal(9).unwrap().unwrap();
    assert_eq!(stored.timer_started_at, None);
    assert_eq!(stored.total_time_seconds, 0);

    conn.execute_batch("DROP TRIGGER goals_fail_timer_start_test;")
        .unwrap();
    assert_eq!(
        timer.start().unwrap(),
        TimerTransition::Started {
            started_at: T0 + 30_000
        }
    );
}
