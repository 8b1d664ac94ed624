// libs/scheduling-cell/tests/slots_test.rs

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{
    ResolvedScheduleConfig, SchedulingDefaults, StaffMember, WorkingHours,
};
use scheduling_cell::services::conflict::intervals_overlap;
use scheduling_cell::services::slots::{
    calculate_slots, generate_slots, is_non_working_day, weekday_num, SlotService,
};
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-key".to_string(),
    }
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn test_staff(slot_duration: i32) -> StaffMember {
    StaffMember {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        full_name: "Alex Moreau".to_string(),
        slot_duration: Some(slot_duration),
        lead_time: None,
        finish_time: None,
        appointment_buffer_minutes: None,
    }
}

fn working_hours_row(staff_id: Uuid, day_of_week: i32, start: &str, end: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "staff_member_id": staff_id,
        "day_of_week": day_of_week,
        "start_time": start,
        "end_time": end,
    })
}

fn booked_request_row(staff_id: Uuid, date: NaiveDate, start: &str, end: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "date": date,
        "start_time": start,
        "end_time": end,
        "service_id": Uuid::new_v4(),
        "staff_member_id": staff_id,
        "reschedule_attempts": 0,
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339(),
    })
}

fn hold_row(
    staff_id: Uuid,
    date: NaiveDate,
    start: &str,
    end: &str,
    created_at: chrono::DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "appointment_request_id": Uuid::new_v4(),
        "date": date,
        "start_time": start,
        "end_time": end,
        "staff_member_id": staff_id,
        "reason_for_rescheduling": "patient conflict",
        "reschedule_status": "pending",
        "created_at": created_at.to_rfc3339(),
    })
}

/// Next occurrence of the given date at least a week out, so the
/// same-day buffer logic never interferes.
fn future_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(7)
}

async fn mount_schedule_mocks(
    mock_server: &MockServer,
    working_hours: serde_json::Value,
    days_off: serde_json::Value,
    booked: serde_json::Value,
    holds: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/working_hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(working_hours))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/days_off"))
        .respond_with(ResponseTemplate::new(200).set_body_json(days_off))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(booked))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/reschedule_history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(holds))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_available_slots_for_open_morning() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([]),
        json!([]),
        json!([]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    let expected: Vec<NaiveTime> = vec![
        time(9, 0),
        time(9, 30),
        time(10, 0),
        time(10, 30),
        time(11, 0),
        time(11, 30),
    ];
    assert_eq!(slots, expected);
}

#[tokio::test]
async fn test_booked_slot_is_excluded() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([]),
        json!([booked_request_row(staff.id, date, "10:00:00", "10:30:00")]),
        json!([]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    assert!(!slots.contains(&time(10, 0)));
    assert!(slots.contains(&time(9, 30)));
    assert!(slots.contains(&time(10, 30)));
    assert_eq!(slots.len(), 5);
}

#[tokio::test]
async fn test_day_off_yields_no_slots() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([{
            "id": Uuid::new_v4(),
            "staff_member_id": staff.id,
            "start_date": date - Duration::days(1),
            "end_date": date + Duration::days(1),
            "description": "conference",
        }]),
        json!([]),
        json!([]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_no_working_hours_row_yields_no_slots() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();

    mount_schedule_mocks(&mock_server, json!([]), json!([]), json!([]), json!([])).await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_live_hold_blocks_its_slot() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([]),
        json!([]),
        json!([hold_row(staff.id, date, "09:30:00", "10:00:00", Utc::now())]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    assert!(!slots.contains(&time(9, 30)));
    assert_eq!(slots.len(), 5);
}

#[tokio::test]
async fn test_expired_hold_releases_its_slot() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([]),
        json!([]),
        json!([hold_row(
            staff.id,
            date,
            "09:30:00",
            "10:00:00",
            Utc::now() - Duration::minutes(10),
        )]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let slots = service
        .available_slots(&staff, date, &SchedulingDefaults::default(), "test-token")
        .await
        .unwrap();

    assert!(slots.contains(&time(9, 30)));
    assert_eq!(slots.len(), 6);
}

#[tokio::test]
async fn test_slot_query_is_read_only_and_repeatable() {
    let mock_server = MockServer::start().await;
    let staff = test_staff(30);
    let date = future_date();
    let day = weekday_num(date);

    mount_schedule_mocks(
        &mock_server,
        json!([working_hours_row(staff.id, day, "09:00:00", "12:00:00")]),
        json!([]),
        json!([booked_request_row(staff.id, date, "11:00:00", "11:30:00")]),
        json!([]),
    )
    .await;

    let service = SlotService::new(&test_config(&mock_server));
    let defaults = SchedulingDefaults::default();
    let first = service
        .available_slots(&staff, date, &defaults, "test-token")
        .await
        .unwrap();
    let second = service
        .available_slots(&staff, date, &defaults, "test-token")
        .await
        .unwrap();

    assert_eq!(first, second);
}

// === PURE SLOT ARITHMETIC ===

#[test]
fn test_calculate_slots_even_window() {
    let slots = calculate_slots(time(9, 0), time(12, 0), Duration::minutes(30));
    assert_eq!(slots.len(), 6);
    assert_eq!(slots.first(), Some(&time(9, 0)));
    assert_eq!(slots.last(), Some(&time(11, 30)));
}

#[test]
fn test_calculate_slots_drops_partial_final_slot() {
    // 09:00-10:45 with 30-minute slots: 10:30 would end at 11:00,
    // past the window, so only three slots fit.
    let slots = calculate_slots(time(9, 0), time(10, 45), Duration::minutes(30));
    assert_eq!(slots, vec![time(9, 0), time(9, 30), time(10, 0)]);
}

#[test]
fn test_calculate_slots_empty_window() {
    let slots = calculate_slots(time(12, 0), time(12, 0), Duration::minutes(30));
    assert!(slots.is_empty());

    let slots = calculate_slots(time(12, 0), time(9, 0), Duration::minutes(30));
    assert!(slots.is_empty());
}

fn resolved(slot_duration: i32) -> ResolvedScheduleConfig {
    ResolvedScheduleConfig {
        slot_duration,
        lead_time: None,
        finish_time: None,
        buffer_minutes: 0,
    }
}

fn hours(start: NaiveTime, end: NaiveTime) -> WorkingHours {
    WorkingHours {
        id: Uuid::new_v4(),
        staff_member_id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: start,
        end_time: end,
    }
}

#[test]
fn test_generate_slots_lead_time_trims_window_start() {
    let mut config = resolved(30);
    config.lead_time = Some(time(10, 0));

    let date = NaiveDate::from_ymd_opt(2030, 6, 10).unwrap();
    let now = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).unwrap();
    let slots = generate_slots(&hours(time(9, 0), time(12, 0)), &config, date, now);

    assert_eq!(slots.first(), Some(&time(10, 0)));
    assert_eq!(slots.len(), 4);
}

#[test]
fn test_generate_slots_finish_time_trims_window_end() {
    let mut config = resolved(30);
    config.finish_time = Some(time(11, 0));

    let date = NaiveDate::from_ymd_opt(2030, 6, 10).unwrap();
    let now = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).unwrap();
    let slots = generate_slots(&hours(time(9, 0), time(12, 0)), &config, date, now);

    assert_eq!(slots.last(), Some(&time(10, 30)));
    assert_eq!(slots.len(), 4);
}

#[test]
fn test_generate_slots_buffer_applies_only_to_today() {
    let mut config = resolved(30);
    config.buffer_minutes = 60;

    let today = NaiveDate::from_ymd_opt(2030, 6, 10).unwrap();
    let now = Utc.with_ymd_and_hms(2030, 6, 10, 9, 15, 0).unwrap();

    // Today at 09:15 with a 60-minute buffer: nothing before 10:15,
    // so the first whole slot starts at 10:15.
    let slots = generate_slots(&hours(time(9, 0), time(12, 0)), &config, today, now);
    assert_eq!(slots.first(), Some(&time(10, 15)));

    // Tomorrow the buffer does not apply.
    let slots = generate_slots(
        &hours(time(9, 0), time(12, 0)),
        &config,
        today + Duration::days(1),
        now,
    );
    assert_eq!(slots.first(), Some(&time(9, 0)));
}

#[test]
fn test_weekday_num_convention() {
    // 2030-06-09 is a Sunday.
    let sunday = NaiveDate::from_ymd_opt(2030, 6, 9).unwrap();
    assert_eq!(weekday_num(sunday), 0);
    assert_eq!(weekday_num(sunday + Duration::days(1)), 1);
    assert_eq!(weekday_num(sunday + Duration::days(6)), 6);
}

#[test]
fn test_is_non_working_day_derived_from_rows() {
    let saturday_hours = vec![hours_for_day(6)];

    // Saturday with a row is a working day; Sunday without one is not.
    assert!(!is_non_working_day(&saturday_hours, 6));
    assert!(is_non_working_day(&saturday_hours, 0));

    // Weekdays are never non-working here, even with no row; the
    // missing-row case yields an empty schedule instead.
    assert!(!is_non_working_day(&[], 2));
}

fn hours_for_day(day_of_week: i32) -> WorkingHours {
    WorkingHours {
        id: Uuid::new_v4(),
        staff_member_id: Uuid::new_v4(),
        day_of_week,
        start_time: time(9, 0),
        end_time: time(17, 0),
    }
}

#[test]
fn test_intervals_overlap_semantics() {
    // Plain overlap.
    assert!(intervals_overlap(time(9, 0), time(10, 0), time(9, 30), time(10, 30)));
    // Containment.
    assert!(intervals_overlap(time(9, 0), time(12, 0), time(10, 0), time(10, 30)));
    // Adjacent intervals share only an endpoint: no overlap.
    assert!(!intervals_overlap(time(9, 0), time(10, 0), time(10, 0), time(11, 0)));
    // Disjoint.
    assert!(!intervals_overlap(time(9, 0), time(10, 0), time(11, 0), time(12, 0)));
}

#[test]
fn test_overlap_catches_straddling_booking() {
    // A 60-minute booking from 09:30 straddles the 10:00 slot start
    // without containing any slot boundary point. Interval overlap
    // still catches it.
    let slot_start = time(10, 0);
    let slot_end = time(10, 30);
    assert!(intervals_overlap(slot_start, slot_end, time(9, 30), time(10, 30)));
}
