use resolution_core::db::open_db_in_memory;
use resolution_core::{
    Board, Goal, GoalAggregate, ManualClock, SqliteGoalRepository, SqliteSubtaskRepository, Subtask,
};
use serde_json::{json, Value};

#[test]
fn goal_serializes_with_storage_field_names() {
    let goal = Goal {
        id: 1,
        title: "Weekend 1".to_string(),
        description: None,
        is_complete: false,
        notes: Some("n".to_string()),
        total_time_seconds: 90,
        timer_started_at: Some(1_700_000_000_000),
        created_at: 1,
        updated_at: 2,
    };

    let value = serde_json::to_value(&goal).unwrap();
    assert_eq!(
        value,
        json!({
            "id": 1,
            "title": "Weekend 1",
            "description": null,
            "is_complete": false,
            "notes": "n",
            "total_time_seconds": 90,
            "timer_started_at": 1_700_000_000_000_i64,
            "created_at": 1,
            "updated_at": 2
        })
    );

    let decoded: Goal = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, goal);
}

#[test]
fn view_json_carries_phase_and_subtasks() {
    let conn = open_db_in_memory().unwrap();
    let mut aggregate = GoalAggregate::load(
        SqliteGoalRepository::try_new(&conn).unwrap(),
        SqliteSubtaskRepository::try_new(&conn).unwrap(),
        ManualClock::new(1_700_000_000_000),
        1,
    )
    .unwrap();
    let created = aggregate.subtasks_mut().add("Paint").unwrap();
    aggregate.start_timer().unwrap();

    let value: Value = serde_json::to_value(aggregate.view()).unwrap();
    assert_eq!(value["timer_phase"], "running");
    assert_eq!(value["elapsed_seconds"], 0);
    assert_eq!(value["completed_subtasks"], 0);
    assert_eq!(value["needs_refresh"], false);
    assert_eq!(value["subtasks"][0]["id"], created.id.to_string());

    let subtask: Subtask = serde_json::from_value(value["subtasks"][0].clone()).unwrap();
    assert_eq!(subtask, created);
}

#[test]
fn board_json_carries_progress_percent() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(1_700_000_000_000);
    for goal_id in [1, 2, 3] {
        let mut aggregate = GoalAggregate::load(
            SqliteGoalRepository::try_new(&conn).unwrap(),
            SqliteSubtaskRepository::try_new(&conn).unwrap(),
            clock.clone(),
            goal_id,
        )
        .unwrap();
        aggregate.set_complete(true).unwrap();
    }

    let board = Board::load(&SqliteGoalRepository::try_new(&conn).unwrap(), &clock).unwrap();
    let value = serde_json::to_value(&board).unwrap();
    assert_eq!(
        value["progress"],
        json!({ "completed": 3, "total": 10, "percent": 30 })
    );
    assert_eq!(value["goals"].as_array().unwrap().len(), 10);
    assert_eq!(value["goals"][0]["timer_phase"], "stopped");
}
