use rusqlite::Connection;
use stowage_core::db::open_db_in_memory;
use stowage_core::{
    Floor, GridSchema, GridService, OccupancyService, OccupantDetails, PlaceRequest, SlotAddress,
    SlotKind,
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

fn kind_at(conn: &mut Connection, raw: &str) -> SlotKind {
    GridService::new(conn)
        .list_slots()
        .unwrap()
        .into_iter()
        .find(|slot| slot.address == addr(raw))
        .unwrap()
        .kind
}

#[test]
fn initialize_creates_the_full_address_space() {
    let mut conn = open_db_in_memory().unwrap();
    let count = GridService::new(&mut conn)
        .initialize(&GridSchema::default())
        .unwrap();
    assert_eq!(count, 24 * 13);

    let slots = GridService::new(&mut conn).list_slots().unwrap();
    assert_eq!(slots.len(), 24 * 13);
}

#[test]
fn layout_rule_matches_the_floor_plan() {
    let mut conn = initialized();

    // Outer columns are walkway on every row.
    assert_eq!(kind_at(&mut conn, "A1"), SlotKind::Walkway);
    assert_eq!(kind_at(&mut conn, "B12"), SlotKind::Walkway);
    // Storage bands in columns C..X.
    assert_eq!(kind_at(&mut conn, "C1"), SlotKind::Storage);
    assert_eq!(kind_at(&mut conn, "C5"), SlotKind::Storage);
    assert_eq!(kind_at(&mut conn, "X8"), SlotKind::Storage);
    assert_eq!(kind_at(&mut conn, "X12"), SlotKind::Storage);
    // Cross aisles and the last row stay clear.
    assert_eq!(kind_at(&mut conn, "C6"), SlotKind::Walkway);
    assert_eq!(kind_at(&mut conn, "C7"), SlotKind::Walkway);
    assert_eq!(kind_at(&mut conn, "C13"), SlotKind::Walkway);
}

#[test]
fn slots_are_listed_in_grid_order() {
    let mut conn = initialized();
    let slots = GridService::new(&mut conn).list_slots().unwrap();

    assert_eq!(slots[0].address, addr("A1"));
    assert_eq!(slots[1].address, addr("A2"));
    assert_eq!(slots[12].address, addr("A13"));
    assert_eq!(slots[13].address, addr("B1"));
}

#[test]
fn initialize_twice_yields_identical_assignments() {
    let mut conn = initialized();
    let first = GridService::new(&mut conn).list_slots().unwrap();

    GridService::new(&mut conn)
        .initialize(&GridSchema::default())
        .unwrap();
    let second = GridService::new(&mut conn).list_slots().unwrap();

    assert_eq!(first, second);
}

#[test]
fn schema_revision_redefines_kind_without_touching_occupants() {
    let mut conn = initialized();
    OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("C4"),
            floor: Floor::One,
            details: OccupantDetails::for_order("ORD-77"),
        })
        .unwrap();

    // Revision: row 4 is no longer a storage band.
    let revised = GridSchema {
        storage_row_bands: vec![(1, 3), (8, 12)],
        ..GridSchema::default()
    };
    GridService::new(&mut conn).initialize(&revised).unwrap();

    assert_eq!(kind_at(&mut conn, "C4"), SlotKind::Walkway);
    let kept = OccupancyService::new(&mut conn)
        .find(&stowage_core::FindQuery {
            slot: Some(addr("C4")),
            order_num: None,
        })
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].details.order_num, "ORD-77");
}

#[test]
fn snapshot_reports_busy_floors_with_data() {
    let mut conn = initialized();
    let mut details = OccupantDetails::for_order("ORD-9");
    details.rolls = Some(12);
    OccupancyService::new(&mut conn)
        .place(&PlaceRequest {
            slot: addr("D8"),
            floor: Floor::Two,
            details,
        })
        .unwrap();

    let snapshot = GridService::new(&mut conn).snapshot().unwrap();
    assert_eq!(snapshot.len(), 24 * 13);

    let status = snapshot
        .iter()
        .find(|status| status.slot == addr("D8"))
        .unwrap();
    assert!(!status.floor1_busy());
    assert!(status.floor2_busy());
    let occupant = status.floor2.as_ref().unwrap();
    assert_eq!(occupant.details.order_num, "ORD-9");
    assert_eq!(occupant.details.rolls, Some(12));

    let empty = snapshot
        .iter()
        .find(|status| status.slot == addr("E8"))
        .unwrap();
    assert!(!empty.floor1_busy());
    assert!(!empty.floor2_busy());
}
