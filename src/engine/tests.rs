use super::*;
use crate::limits::*;
use crate::store::{MemoryStore, WalStore};
use std::path::PathBuf;

fn at(s: &str) -> chrono::NaiveDateTime {
    parse_timestamp(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    parse_day(s).unwrap()
}

fn slot(s: &str) -> SlotId {
    SlotId::new(at(s))
}

fn clocks(slots: &[TimeSlot]) -> Vec<String> {
    slots.iter().map(|s| s.id.clock()).collect()
}

/// Every test runs on 2024-07-01 at midnight.
fn fixed_now() -> chrono::NaiveDateTime {
    at("2024-07-01T00:00")
}

async fn engine_with(store: Arc<dyn Store>) -> Engine {
    Engine::open(
        Schedule::default(),
        ServiceCatalog::default(),
        store,
        Arc::new(NotifyHub::new()),
    )
    .await
    .unwrap()
    .with_clock(fixed_now)
}

async fn engine() -> Engine {
    engine_with(Arc::new(MemoryStore::new())).await
}

fn details(service_id: &str, start: &str) -> BookingDetails {
    BookingDetails {
        service_id: service_id.into(),
        client_name: "Maria Souza".into(),
        client_email: "maria@example.com".into(),
        client_phone: Some("11 99999-0000".into()),
        address: Address {
            zip_code: "01310100".into(),
            street: "Av. Paulista".into(),
            number: "1000".into(),
            complement: Some("apt 12".into()),
            neighborhood: "Bela Vista".into(),
            city: "Sao Paulo".into(),
            state: "SP".into(),
        },
        start_time: at(start),
        notes: None,
    }
}

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("slotbook_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

// ── Availability ─────────────────────────────────────────

#[tokio::test]
async fn sixty_minute_service_on_empty_day() {
    let engine = engine().await;
    let starts = engine
        .find_available_starts(date("2024-07-30"), "ac-maintenance")
        .await
        .unwrap();

    // Inclusive boundary: 17:00 ends exactly at closing time.
    assert_eq!(starts.len(), 19);
    assert_eq!(starts[0].id.clock(), "08:00");
    assert_eq!(starts[18].id.clock(), "17:00");
    assert!(!clocks(&starts).contains(&"17:30".to_string()));
    for pair in starts.windows(2) {
        assert!(pair[0].start < pair[1].start);
    }
}

#[tokio::test]
async fn service_longer_than_day_has_no_starts() {
    let catalog = ServiceCatalog::new(vec![Service {
        id: "marathon".into(),
        name: "Marathon".into(),
        description: String::new(),
        duration_minutes: 11 * 60,
        base_price: Default::default(),
    }])
    .unwrap();
    let engine = Engine::open(
        Schedule::default(),
        catalog,
        Arc::new(MemoryStore::new()),
        Arc::new(NotifyHub::new()),
    )
    .await
    .unwrap()
    .with_clock(fixed_now);

    let starts = engine
        .find_available_starts(date("2024-07-30"), "marathon")
        .await
        .unwrap();
    assert!(starts.is_empty());
}

#[tokio::test]
async fn unknown_service_is_rejected() {
    let engine = engine().await;
    let err = engine
        .find_available_starts(date("2024-07-30"), "plumbing")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidService("plumbing".into()));
}

#[tokio::test]
async fn get_day_slots_is_idempotent() {
    let engine = engine().await;
    let day = date("2024-07-30");
    let first = engine.get_day_slots(day).await.unwrap();
    let second = engine.get_day_slots(day).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 20);
    assert_eq!(engine.cached_days(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_reads_generate_once() {
    let engine = Arc::new(engine().await);
    let day = date("2024-08-01");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            let shared = eng.day(day);
            (Arc::as_ptr(&shared) as usize, eng.get_day_slots(day).await.unwrap())
        }));
    }
    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap());
    }

    let (ptr, slots) = &results[0];
    assert!(results.iter().all(|(p, s)| p == ptr && s == slots));
    assert_eq!(engine.cached_days(), 1);
}

// ── Booking ──────────────────────────────────────────────

#[tokio::test]
async fn ninety_minute_booking_marks_three_slots() {
    let engine = engine().await;
    let day = date("2024-07-30");

    let booking = engine
        .book(details("electrical-repair", "2024-07-30T09:00"))
        .await
        .unwrap();
    assert_eq!(booking.end_time, at("2024-07-30T10:30"));
    assert_eq!(booking.service_name, "Residential electrical repair");

    let slots = engine.get_day_slots(day).await.unwrap();
    let booked: Vec<_> = slots.iter().filter(|s| s.is_booked).map(|s| s.id.clock()).collect();
    assert_eq!(booked, ["09:00", "09:30", "10:00"]);

    let before = slots.iter().find(|s| s.id == slot("2024-07-30T08:30")).unwrap();
    assert!(before.is_free());
}

#[tokio::test]
async fn booked_start_leaves_the_candidate_list() {
    let engine = engine().await;
    let day = date("2024-07-30");

    engine
        .book(details("ac-maintenance", "2024-07-30T14:00"))
        .await
        .unwrap();

    let starts = clocks(
        &engine
            .find_available_starts(day, "ac-maintenance")
            .await
            .unwrap(),
    );
    // 13:30 would overlap 14:00, 14:00 and 14:30 are booked.
    for gone in ["13:30", "14:00", "14:30"] {
        assert!(!starts.contains(&gone.to_string()), "{gone} still offered");
    }
    assert!(starts.contains(&"13:00".to_string()));
    assert!(starts.contains(&"15:00".to_string()));
    assert_eq!(starts.len(), 16);
}

#[tokio::test]
async fn double_booking_same_start_fails() {
    let engine = engine().await;
    engine
        .book(details("ac-install", "2024-07-30T10:00"))
        .await
        .unwrap();
    let err = engine
        .book(details("ac-maintenance", "2024-07-30T11:00"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SlotUnavailable(at("2024-07-30T11:00")));
    assert_eq!(engine.list_bookings_at(&all(), at("2024-01-01T00:00")).unwrap().len(), 1);
}

#[tokio::test]
async fn unaligned_start_is_unavailable() {
    let engine = engine().await;
    let err = engine
        .book(details("ac-maintenance", "2024-07-30T09:10"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SlotUnavailable(at("2024-07-30T09:10")));
}

#[tokio::test]
async fn past_starts_are_never_offered_or_booked() {
    fn mid_morning() -> chrono::NaiveDateTime {
        at("2024-07-30T10:15")
    }
    let engine = engine().await.with_clock(mid_morning);

    let starts = engine
        .find_available_starts(date("2024-07-30"), "ac-maintenance")
        .await
        .unwrap();
    assert_eq!(starts[0].id.clock(), "10:30");
    assert_eq!(starts.len(), 14);

    for start in ["2024-07-30T10:00", "2024-07-29T09:00", "2001-01-02T09:00"] {
        let err = engine
            .book(details("ac-maintenance", start))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SlotUnavailable(at(start)));
    }
    assert!(engine
        .find_available_starts(date("2024-07-29"), "ac-maintenance")
        .await
        .unwrap()
        .is_empty());
    assert!(engine.list_bookings_at(&all(), mid_morning()).unwrap().is_empty());

    engine.book(details("ac-maintenance", "2024-07-30T10:30")).await.unwrap();
}

#[tokio::test]
async fn days_beyond_the_horizon_are_refused() {
    let engine = engine().await;
    let last = fixed_now().date() + chrono::Duration::days(BOOKING_HORIZON_DAYS);
    let beyond = last.succ_opt().unwrap();

    assert_eq!(engine.get_day_slots(last).await.unwrap().len(), 20);
    assert!(matches!(
        engine.get_day_slots(beyond).await,
        Err(EngineError::LimitExceeded(_))
    ));
    assert!(matches!(
        engine.find_available_starts(beyond, "ac-install").await,
        Err(EngineError::LimitExceeded(_))
    ));
    let start = beyond.and_hms_opt(9, 0, 0).unwrap();
    assert!(matches!(
        engine.set_blocked(SlotId::new(start), true).await,
        Err(EngineError::LimitExceeded(_))
    ));
    let err = engine
        .book(details("ac-install", &start.format("%Y-%m-%dT%H:%M").to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));

    // Refused days never reach the cache.
    for offset in 1..500 {
        let _ = engine
            .get_day_slots(last + chrono::Duration::days(offset))
            .await;
    }
    assert_eq!(engine.cached_days(), 1);
}

#[tokio::test]
async fn start_outside_business_hours_is_unavailable() {
    let engine = engine().await;
    for start in ["2024-07-30T07:30", "2024-07-30T17:30", "2024-07-30T18:00"] {
        let err = engine
            .book(details("ac-maintenance", start))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SlotUnavailable(at(start)));
    }
}

#[tokio::test]
async fn service_ending_at_close_is_bookable() {
    let engine = engine().await;
    let b = engine
        .book(details("ac-install", "2024-07-30T16:00"))
        .await
        .unwrap();
    assert_eq!(b.end_time, at("2024-07-30T18:00"));
}

#[tokio::test]
async fn create_booking_validates_duration_and_service() {
    let engine = engine().await;
    let err = engine
        .create_booking(details("ac-install", "2024-07-30T09:00"), 0)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidDuration(0));

    let err = engine
        .create_booking(details("ac-install", "2024-07-30T09:00"), -30)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidDuration(-30));

    let err = engine
        .create_booking(details("", "2024-07-30T09:00"), 30)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidService(String::new()));
}

#[tokio::test]
async fn explicit_duration_overrides_catalog() {
    let engine = engine().await;
    let b = engine
        .create_booking(details("ac-install", "2024-07-30T09:00"), 45)
        .await
        .unwrap();
    assert_eq!(b.end_time, at("2024-07-30T09:45"));

    // 45 minutes still occupies two 30-minute slots.
    let slots = engine.get_day_slots(date("2024-07-30")).await.unwrap();
    assert!(slots[2].is_booked && slots[3].is_booked && !slots[4].is_booked);
}

#[tokio::test]
async fn invalid_fields_change_nothing() {
    let engine = engine().await;
    let mut d = details("ac-install", "2024-07-30T09:00");
    d.client_email = String::new();
    let err = engine.book(d).await.unwrap_err();
    assert_eq!(err, EngineError::MissingField("client_email"));

    assert!(engine
        .get_day_slots(date("2024-07-30"))
        .await
        .unwrap()
        .iter()
        .all(TimeSlot::is_free));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn at_most_one_of_many_concurrent_bookings_wins() {
    let engine = Arc::new(engine().await);
    let starts = [
        "2024-07-30T09:00",
        "2024-07-30T09:30",
        "2024-07-30T10:00",
        "2024-07-30T09:00",
    ];

    let mut handles = Vec::new();
    for i in 0..32 {
        let eng = engine.clone();
        let start = starts[i % starts.len()];
        handles.push(tokio::spawn(async move {
            // 120-minute runs from any of these starts overlap each other.
            eng.book(details("ac-install", start)).await
        }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => wins += 1,
            Err(EngineError::SlotUnavailable(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);
    let booked = engine
        .get_day_slots(date("2024-07-30"))
        .await
        .unwrap()
        .iter()
        .filter(|s| s.is_booked)
        .count();
    assert_eq!(booked, 4);
}

#[tokio::test]
async fn store_failure_leaves_ledger_and_slots_untouched() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(store.clone()).await;
    let day = date("2024-07-30");

    store.set_fail_writes(true);
    let err = engine
        .book(details("ac-install", "2024-07-30T09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreError(_)));
    assert!(engine.get_day_slots(day).await.unwrap().iter().all(TimeSlot::is_free));
    assert!(engine.list_bookings_at(&all(), at("2024-01-01T00:00")).unwrap().is_empty());

    let err = engine
        .set_blocked(slot("2024-07-30T12:00"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreError(_)));
    assert!(engine.get_day_slots(day).await.unwrap().iter().all(TimeSlot::is_free));

    store.set_fail_writes(false);
    engine
        .book(details("ac-install", "2024-07-30T09:00"))
        .await
        .unwrap();
    assert_eq!(store.writes(), 1);
}

// ── Blocks ───────────────────────────────────────────────

#[tokio::test]
async fn blocked_slot_removes_overlapping_candidates() {
    let engine = engine().await;
    let day = date("2024-07-30");

    let blocked = engine.set_blocked(slot("2024-07-30T10:00"), true).await.unwrap();
    assert!(blocked.is_blocked && !blocked.is_booked);

    let starts = clocks(&engine.find_available_starts(day, "ac-maintenance").await.unwrap());
    assert!(!starts.contains(&"09:30".to_string()));
    assert!(!starts.contains(&"10:00".to_string()));
    assert!(starts.contains(&"09:00".to_string()));
    assert!(starts.contains(&"10:30".to_string()));

    let err = engine
        .book(details("ac-maintenance", "2024-07-30T09:30"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SlotUnavailable(at("2024-07-30T09:30")));

    engine.set_blocked(slot("2024-07-30T10:00"), false).await.unwrap();
    let starts = clocks(&engine.find_available_starts(day, "ac-maintenance").await.unwrap());
    assert!(starts.contains(&"09:30".to_string()));
}

#[tokio::test]
async fn blocking_booked_slot_is_invalid_transition() {
    let engine = engine().await;
    engine
        .book(details("ac-maintenance", "2024-07-30T15:00"))
        .await
        .unwrap();

    let id = slot("2024-07-30T15:30");
    for blocked in [true, false] {
        let err = engine.set_blocked(id, blocked).await.unwrap_err();
        assert_eq!(err, EngineError::InvalidTransition(id));
    }
    let slots = engine.get_day_slots(date("2024-07-30")).await.unwrap();
    let s = slots.iter().find(|s| s.id == id).unwrap();
    assert!(s.is_booked && !s.is_blocked);
}

#[tokio::test]
async fn blocking_unknown_slot_is_not_found() {
    let engine = engine().await;
    for id in [slot("2024-07-30T10:15"), slot("2024-07-30T19:00")] {
        assert_eq!(
            engine.set_blocked(id, true).await.unwrap_err(),
            EngineError::SlotNotFound(id)
        );
    }
}

#[tokio::test]
async fn repeated_block_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(store.clone()).await;
    let id = slot("2024-07-30T10:00");

    engine.set_blocked(id, true).await.unwrap();
    engine.set_blocked(id, true).await.unwrap();
    engine.set_blocked(slot("2024-07-30T11:00"), false).await.unwrap();
    assert_eq!(store.writes(), 1);
    assert_eq!(engine.recent_notifications(None).len(), 1);
}

// ── Cache eviction ───────────────────────────────────────

#[tokio::test]
async fn evicted_day_regenerates_with_same_flags() {
    let engine = engine().await;
    let day = date("2024-07-30");

    engine
        .book(details("electrical-repair", "2024-07-30T09:00"))
        .await
        .unwrap();
    engine.set_blocked(slot("2024-07-30T15:00"), true).await.unwrap();
    let before = engine.get_day_slots(day).await.unwrap();
    engine.get_day_slots(date("2024-08-02")).await.unwrap();

    assert_eq!(engine.evict_days_before(date("2024-08-01")).await, 1);
    assert_eq!(engine.cached_days(), 1);

    let after = engine.get_day_slots(day).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn eviction_racing_with_bookings_keeps_every_mark() {
    let engine = Arc::new(engine().await);
    let day = date("2024-07-30");
    let starts = ["08:00", "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00"];

    let mut bookers = Vec::new();
    let mut evictors = Vec::new();
    for start in starts {
        let eng = engine.clone();
        bookers.push(tokio::spawn(async move {
            eng.book(details("ac-maintenance", &format!("2024-07-30T{start}")))
                .await
        }));
        let eng = engine.clone();
        evictors.push(tokio::spawn(async move {
            eng.evict_days_before(date("2024-08-01")).await;
            eng.get_day_slots(day).await.unwrap();
        }));
    }
    let mut wins = 0;
    for h in bookers {
        h.await.unwrap().unwrap();
        wins += 1;
    }
    for h in evictors {
        h.await.unwrap();
    }
    assert_eq!(wins, starts.len());

    let booked = engine
        .get_day_slots(day)
        .await
        .unwrap()
        .iter()
        .filter(|s| s.is_booked)
        .count();
    assert_eq!(booked, starts.len() * 2);
}

// ── Persistence ──────────────────────────────────────────

#[tokio::test]
async fn bookings_and_blocks_survive_reopen() {
    let path = test_wal_path("reopen.wal");
    let day = date("2024-07-30");

    let booking = {
        let engine = engine_with(Arc::new(WalStore::open(&path).unwrap())).await;
        engine.set_blocked(slot("2024-07-30T16:00"), true).await.unwrap();
        engine.set_blocked(slot("2024-07-30T17:00"), true).await.unwrap();
        engine.set_blocked(slot("2024-07-30T17:00"), false).await.unwrap();
        engine
            .book(details("ac-install", "2024-07-30T09:00"))
            .await
            .unwrap()
    };

    let engine = engine_with(Arc::new(WalStore::open(&path).unwrap())).await;
    assert_eq!(engine.get_booking(&booking.id), Some(booking.clone()));

    let slots = engine.get_day_slots(day).await.unwrap();
    let booked: Vec<_> = slots.iter().filter(|s| s.is_booked).map(|s| s.id.clock()).collect();
    assert_eq!(booked, ["09:00", "09:30", "10:00", "10:30"]);
    let blocked: Vec<_> = slots.iter().filter(|s| s.is_blocked).map(|s| s.id.clock()).collect();
    assert_eq!(blocked, ["16:00"]);
}

#[tokio::test]
async fn reopen_after_compaction() {
    let path = test_wal_path("reopen_compacted.wal");
    let store = Arc::new(WalStore::open(&path).unwrap());
    let engine = engine_with(store.clone()).await;

    for _ in 0..5 {
        engine.set_blocked(slot("2024-07-30T12:00"), true).await.unwrap();
        engine.set_blocked(slot("2024-07-30T12:00"), false).await.unwrap();
    }
    engine
        .book(details("ac-maintenance", "2024-07-30T12:00"))
        .await
        .unwrap();
    assert_eq!(store.appends_since_compact().await, 11);
    store.compact().await.unwrap();
    drop(engine);

    let engine = engine_with(Arc::new(WalStore::open(&path).unwrap())).await;
    let slots = engine.get_day_slots(date("2024-07-30")).await.unwrap();
    assert_eq!(slots.iter().filter(|s| s.is_booked).count(), 2);
    assert!(slots.iter().all(|s| !s.is_blocked));
}

// ── Queries ──────────────────────────────────────────────

fn all() -> BookingFilter {
    BookingFilter {
        view: BookingView::All,
        ..Default::default()
    }
}

#[tokio::test]
async fn list_bookings_views_and_search() {
    let engine = engine().await;
    let mut d = details("ac-install", "2024-07-29T08:00");
    d.client_name = "Joao Lima".into();
    d.client_email = "joao@example.com".into();
    d.address.neighborhood = "Pinheiros".into();
    d.address.zip_code = "05422-000".into();
    engine.book(d).await.unwrap();
    engine.book(details("ac-maintenance", "2024-07-30T08:00")).await.unwrap();
    engine.book(details("electrical-repair", "2024-07-31T08:00")).await.unwrap();
    engine.book(details("ac-maintenance", "2024-07-31T14:00")).await.unwrap();

    let now = at("2024-07-30T12:00");
    let starts = |f: &BookingFilter| -> Vec<String> {
        engine
            .list_bookings_at(f, now)
            .unwrap()
            .iter()
            .map(|b| b.start_time.format("%m-%d %H:%M").to_string())
            .collect()
    };

    assert_eq!(
        starts(&all()),
        ["07-31 14:00", "07-31 08:00", "07-30 08:00", "07-29 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter::default()),
        ["07-31 08:00", "07-31 14:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::Past,
            ..Default::default()
        }),
        ["07-30 08:00", "07-29 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            day: Some(date("2024-07-31")),
            view: BookingView::Upcoming,
            search: None,
        }),
        ["07-31 08:00", "07-31 14:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::All,
            search: Some("JOAO".into()),
            ..Default::default()
        }),
        ["07-29 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::All,
            search: Some("electrical".into()),
            ..Default::default()
        }),
        ["07-31 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::All,
            search: Some("pinheiros".into()),
            ..Default::default()
        }),
        ["07-29 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::All,
            search: Some("Bela Vista".into()),
            ..Default::default()
        }),
        ["07-31 14:00", "07-31 08:00", "07-30 08:00"]
    );
    assert_eq!(
        starts(&BookingFilter {
            view: BookingView::All,
            search: Some("05422".into()),
            ..Default::default()
        }),
        ["07-29 08:00"]
    );

    let err = engine
        .list_bookings_at(
            &BookingFilter {
                search: Some("x".repeat(MAX_SEARCH_LEN + 1)),
                ..Default::default()
            },
            now,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
}

#[tokio::test]
async fn notifications_describe_changes() {
    let engine = engine().await;
    let day = date("2024-07-30");
    let mut rx = engine.notify.subscribe_all();

    engine.book(details("ac-maintenance", "2024-07-30T09:00")).await.unwrap();
    engine.set_blocked(slot("2024-07-30T11:00"), true).await.unwrap();
    engine.set_blocked(slot("2024-07-31T11:00"), true).await.unwrap();

    assert_eq!(
        rx.recv().await.unwrap().message,
        "new booking: Air conditioner maintenance with Maria Souza on 2024-07-30 at 09:00"
    );
    assert_eq!(rx.recv().await.unwrap().message, "slot 11:00 on 2024-07-30 blocked");
    assert_eq!(rx.recv().await.unwrap().day, date("2024-07-31"));

    let feed = engine.recent_notifications(Some(day));
    assert_eq!(feed.len(), 2);
    assert_eq!(engine.recent_notifications(None).len(), 3);
}

#[tokio::test]
async fn services_keep_catalog_order() {
    let engine = engine().await;
    let ids: Vec<_> = engine.services().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["ac-install", "ac-maintenance", "electrical-repair"]);
}
