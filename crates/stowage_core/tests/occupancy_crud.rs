use rusqlite::Connection;
use stowage_core::db::open_db_in_memory;
use stowage_core::{
    ActionKind, FindQuery, Floor, GridSchema, GridService, HistoryQuery, HistoryService,
    OccupancyService, Occupant, OccupantDetails, OccupantRepository, PlaceRequest, RepoError,
    SlotAddress, SqliteOccupantRepository,
};

fn addr(raw: &str) -> SlotAddress {
    raw.parse().unwrap()
}

fn initialized() -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    GridService::new(&mut conn)
        .initialize(&GridSchema::default())
        .unwrap();
    conn
}

fn place(conn: &mut Connection, slot: &str, floor: Floor, order: &str) -> Occupant {
    OccupancyService::new(conn)
        .place(&PlaceRequest {
            slot: addr(slot),
            floor,
            details: OccupantDetails::for_order(order),
        })
        .unwrap()
}

#[test]
fn place_and_find_round_trip() {
    let mut conn = initialized();
    let details = OccupantDetails {
        order_num: "Z-1042".to_string(),
        rolls: Some(18),
        meterage: Some(950.5),
        density: Some("90g".to_string()),
        roll_weight: Some(412.0),
        comment: Some("fragile edges".to_string()),
    };
    let placed = OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("c4"),
            floor: Floor::One,
            details: details.clone(),
        })
        .unwrap();
    assert_eq!(placed.slot, addr("C4"));

    let found = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: Some(addr("C4")),
            order_num: None,
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, placed.id);
    assert_eq!(found[0].floor, Floor::One);
    assert_eq!(found[0].details, details);
}

#[test]
fn place_on_an_occupied_floor_overwrites_in_place() {
    let mut conn = initialized();
    let original = place(&mut conn, "C4", Floor::One, "ORD-1");

    let mut replacement = OccupantDetails::for_order("ORD-2");
    replacement.rolls = Some(5);
    let updated = OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("C4"),
            floor: Floor::One,
            details: replacement,
        })
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.details.order_num, "ORD-2");

    let history = HistoryService::new(&mut conn)
        .list(&HistoryQuery::default())
        .unwrap();
    assert_eq!(history[0].kind(), ActionKind::Update);
    assert_eq!(history[1].kind(), ActionKind::Create);
}

#[test]
fn place_rejects_unknown_slots_and_invalid_details() {
    let mut conn = initialized();

    let unknown = OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("Z99"),
            floor: Floor::One,
            details: OccupantDetails::for_order("ORD-1"),
        })
        .unwrap_err();
    assert!(matches!(unknown, RepoError::SlotUnknown(_)));

    let invalid = OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("C4"),
            floor: Floor::One,
            details: OccupantDetails::for_order("   "),
        })
        .unwrap_err();
    assert!(matches!(invalid, RepoError::Validation(_)));
}

#[test]
fn remove_without_floor_clears_both_and_logs_each() {
    let mut conn = initialized();
    place(&mut conn, "C4", Floor::One, "ORD-1");
    place(&mut conn, "C4", Floor::Two, "ORD-2");

    let removed = OccupancyService::new(&mut conn)
        .remove(&addr("C4"), None)
        .unwrap();
    assert_eq!(removed, 2);

    let history = HistoryService::new(&mut conn)
        .list(&HistoryQuery::default())
        .unwrap();
    let deletes: Vec<_> = history
        .iter()
        .filter(|record| record.kind() == ActionKind::Delete)
        .collect();
    assert_eq!(deletes.len(), 2);
    // Each record carries its own floor, independently undoable.
    let mut floors: Vec<u8> = deletes.iter().map(|record| record.floor_raw).collect();
    floors.sort_unstable();
    assert_eq!(floors, [1, 2]);
}

#[test]
fn remove_of_an_empty_slot_is_a_zero_count_no_op() {
    let mut conn = initialized();
    let removed = OccupancyService::new(&mut conn)
        .remove(&addr("C4"), None)
        .unwrap();
    assert_eq!(removed, 0);

    let history = HistoryService::new(&mut conn)
        .list(&HistoryQuery::default())
        .unwrap();
    assert!(history.is_empty());
}

#[test]
fn remove_with_floor_only_clears_that_floor() {
    let mut conn = initialized();
    place(&mut conn, "C4", Floor::One, "ORD-1");
    place(&mut conn, "C4", Floor::Two, "ORD-2");

    let removed = OccupancyService::new(&mut conn)
        .remove(&addr("C4"), Some(Floor::One))
        .unwrap();
    assert_eq!(removed, 1);

    let left = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: Some(addr("C4")),
            order_num: None,
        })
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].floor, Floor::Two);
}

#[test]
fn relocate_moves_the_occupant_and_back() {
    let mut conn = initialized();
    let original = place(&mut conn, "C4", Floor::One, "ORD-1");

    let moved = OccupancyService::new(&mut conn)
        .relocate(&addr("C4"), Floor::One, &addr("D9"), Floor::One)
        .unwrap();
    assert_eq!(moved.id, original.id);
    assert_eq!(moved.slot, addr("D9"));

    let back = OccupancyService::new(&mut conn)
        .relocate(&addr("D9"), Floor::One, &addr("C4"), Floor::One)
        .unwrap();
    assert_eq!(back.slot, addr("C4"));
    assert_eq!(back.details, original.details);
}

#[test]
fn relocate_into_an_occupied_floor_fails_and_changes_nothing() {
    let mut conn = initialized();
    place(&mut conn, "C4", Floor::One, "ORD-1");
    place(&mut conn, "D9", Floor::One, "ORD-2");

    let err = OccupancyService::new(&mut conn)
        .relocate(&addr("C4"), Floor::One, &addr("D9"), Floor::One)
        .unwrap_err();
    assert!(matches!(err, RepoError::FloorOccupied { .. }));

    let at_source = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: Some(addr("C4")),
            order_num: None,
        })
        .unwrap();
    assert_eq!(at_source[0].details.order_num, "ORD-1");
    let at_target = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: Some(addr("D9")),
            order_num: None,
        })
        .unwrap();
    assert_eq!(at_target[0].details.order_num, "ORD-2");
}

#[test]
fn relocate_reports_missing_source_and_unknown_target() {
    let mut conn = initialized();

    let missing = OccupancyService::new(&mut conn)
        .relocate(&addr("C4"), Floor::One, &addr("D9"), Floor::One)
        .unwrap_err();
    assert!(matches!(missing, RepoError::NotFound(_)));

    place(&mut conn, "C4", Floor::One, "ORD-1");
    let unknown = OccupancyService::new(&mut conn)
        .relocate(&addr("C4"), Floor::One, &addr("Z99"), Floor::One)
        .unwrap_err();
    assert!(matches!(unknown, RepoError::SlotUnknown(_)));
}

#[test]
fn find_requires_exactly_one_filter() {
    let mut conn = initialized();

    let neither = OccupancyService::new(&mut conn)
        .find(&FindQuery::default())
        .unwrap_err();
    assert!(matches!(neither, RepoError::BadQuery(_)));

    let both = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: Some(addr("C4")),
            order_num: Some("ORD-1".to_string()),
        })
        .unwrap_err();
    assert!(matches!(both, RepoError::BadQuery(_)));
}

#[test]
fn find_by_order_spans_slots_and_floors() {
    let mut conn = initialized();
    place(&mut conn, "C4", Floor::One, "ORD-1");
    place(&mut conn, "C4", Floor::Two, "ORD-1");
    place(&mut conn, "D9", Floor::One, "ORD-1");
    place(&mut conn, "E2", Floor::One, "ORD-2");

    let found = OccupancyService::new(&mut conn)
        .find(&FindQuery {
            slot: None,
            order_num: Some("ORD-1".to_string()),
        })
        .unwrap();
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|o| o.details.order_num == "ORD-1"));
}

#[test]
fn first_free_floor_prefers_the_lower_level() {
    let mut conn = initialized();
    assert_eq!(
        OccupancyService::new(&mut conn)
            .first_free_floor(&addr("C4"))
            .unwrap(),
        Some(Floor::One)
    );

    place(&mut conn, "C4", Floor::One, "ORD-1");
    assert_eq!(
        OccupancyService::new(&mut conn)
            .first_free_floor(&addr("C4"))
            .unwrap(),
        Some(Floor::Two)
    );

    place(&mut conn, "C4", Floor::Two, "ORD-2");
    assert_eq!(
        OccupancyService::new(&mut conn)
            .first_free_floor(&addr("C4"))
            .unwrap(),
        None
    );

    let unknown = OccupancyService::new(&mut conn)
        .first_free_floor(&addr("Z99"))
        .unwrap_err();
    assert!(matches!(unknown, RepoError::SlotUnknown(_)));
}

#[test]
fn stats_aggregate_count_and_weight() {
    let mut conn = initialized();
    let mut heavy = OccupantDetails::for_order("ORD-1");
    heavy.roll_weight = Some(300.0);
    OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("C4"),
            floor: Floor::One,
            details: heavy,
        })
        .unwrap();
    place(&mut conn, "D9", Floor::One, "ORD-2");

    let stats = OccupancyService::new(&mut conn).stats().unwrap();
    assert_eq!(stats.occupants, 2);
    assert!((stats.total_roll_weight - 300.0).abs() < f64::EPSILON);
}

#[test]
fn store_level_unique_constraint_backstops_double_placement() {
    let mut conn = initialized();
    place(&mut conn, "C4", Floor::One, "ORD-1");

    // Bypass the service precheck and hit the UNIQUE(slot_id, floor)
    // constraint directly.
    let repo = SqliteOccupantRepository::new(&conn);
    let err = repo
        .insert(&addr("C4"), Floor::One, &OccupantDetails::for_order("ORD-2"))
        .unwrap_err();
    assert!(matches!(err, RepoError::FloorOccupied { .. }));
}

#[test]
fn store_level_foreign_key_maps_to_slot_unknown() {
    let conn = initialized();
    let repo = SqliteOccupantRepository::new(&conn);
    let err = repo
        .insert(&addr("Q77"), Floor::One, &OccupantDetails::for_order("ORD-1"))
        .unwrap_err();
    assert!(matches!(err, RepoError::SlotUnknown(_)));
}
