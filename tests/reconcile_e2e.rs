//! End-to-end tests for entity reconciliation through the game client
//!
//! These feed authoritative snapshots in order and check that piece
//! identities survive moves, disappear with captures and appear with
//! promotions.

use arcana_client::{
    config::ClientConfig,
    core::{EntityId, PieceKind, Side, Square},
    game::{
        ClientLogger, GameClient, LastMove, LegalMoveTable, PlacementSnapshot, ServerEvent,
    },
    Result,
};
use similar_asserts::assert_eq;
use std::rc::Rc;

fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

fn client(side: Side) -> GameClient<LegalMoveTable> {
    GameClient::with_logger(
        side,
        &ClientConfig::default(),
        LegalMoveTable::new(),
        Rc::new(ClientLogger::capturing()),
    )
}

fn snapshot(placement: &str, turn: Side, last: Option<(&str, &str, bool)>) -> ServerEvent {
    let mut snapshot = PlacementSnapshot::new(placement, turn);
    snapshot.last_move = last.map(|(from, to, captured)| LastMove {
        from: sq(from),
        to: sq(to),
        captured,
    });
    ServerEvent::Snapshot(snapshot)
}

fn id_at(client: &GameClient<LegalMoveTable>, square: &str) -> EntityId {
    client
        .reconciler()
        .entity_at(sq(square))
        .unwrap_or_else(|| panic!("no entity on {}", square))
        .id
}

/// Snapshot A has pawns on e4 (white) and d5 (black); after e4xd5 only the
/// white pawn is left, on d5. The white pawn keeps its identity and the
/// black pawn's identity is gone.
#[test]
fn test_capture_removes_entity() -> Result<()> {
    let mut client = client(Side::White);
    client.apply_event(&snapshot("4k3/8/8/3p4/4P3/8/8/4K3", Side::White, None))?;

    let x = id_at(&client, "e4");
    let y = id_at(&client, "d5");

    client.apply_event(&snapshot(
        "4k3/8/8/3P4/8/8/8/4K3",
        Side::Black,
        Some(("e4", "d5", true)),
    ))?;

    assert_eq!(id_at(&client, "d5"), x);
    assert!(client.reconciler().get(y).is_none());
    let report = client.last_report().unwrap();
    assert_eq!(report.dropped, vec![y]);
    assert_eq!(report.moved, 1);
    assert_eq!(client.entities().len(), 3);
    Ok(())
}

/// Every piece that did not move keeps its id and the mover keeps its own
#[test]
fn test_opening_sequence_identity_stability() -> Result<()> {
    let mut client = client(Side::White);
    client.apply_event(&ServerEvent::Snapshot(PlacementSnapshot::starting_position()))?;
    let before: Vec<_> = client.entities().to_vec();
    let knight = id_at(&client, "g1");
    let pawn = id_at(&client, "e2");

    client.apply_event(&snapshot(
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
        Side::Black,
        Some(("e2", "e4", false)),
    ))?;
    client.apply_event(&snapshot(
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR",
        Side::White,
        Some(("e7", "e5", false)),
    ))?;
    client.apply_event(&snapshot(
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R",
        Side::Black,
        Some(("g1", "f3", false)),
    ))?;

    assert_eq!(id_at(&client, "e4"), pawn);
    assert_eq!(id_at(&client, "f3"), knight);
    assert_eq!(client.entities().len(), 32);

    // Pieces that never moved are untouched
    for entity in &before {
        if ["e2", "e7", "g1"].contains(&entity.square.to_string().as_str()) {
            continue;
        }
        assert_eq!(id_at(&client, &entity.square.to_string()), entity.id);
    }
    Ok(())
}

/// Promotion drops the pawn and mints a queen; the new id was never used
#[test]
fn test_promotion_mints_new_identity() -> Result<()> {
    let mut client = client(Side::White);
    client.apply_event(&snapshot("k7/4P3/8/8/8/8/8/4K3", Side::White, None))?;
    let pawn = id_at(&client, "e7");
    let max_before = client.entities().iter().map(|e| e.id).max().unwrap();

    client.apply_event(&snapshot(
        "k3Q3/8/8/8/8/8/8/4K3",
        Side::Black,
        Some(("e7", "e8", false)),
    ))?;

    let queen = client.reconciler().entity_at(sq("e8")).unwrap();
    assert_eq!(queen.kind, PieceKind::Queen);
    assert!(queen.id > max_before);
    assert!(client.reconciler().get(pawn).is_none());

    let report = client.last_report().unwrap();
    assert_eq!(report.minted, vec![queen.id]);
    assert_eq!(report.dropped, vec![pawn]);
    Ok(())
}

/// A removal effect takes out one rook; the other keeps its identity even
/// though it also moved
#[test]
fn test_group_isolation_across_kinds() -> Result<()> {
    let mut client = client(Side::White);
    client.apply_event(&snapshot("4k3/8/8/8/8/8/8/RN2K2R", Side::White, None))?;
    let knight = id_at(&client, "b1");
    let rook_a = id_at(&client, "a1");

    // Knight goes to a3, rook a1 goes to a2, rook h1 is removed
    client.apply_event(&snapshot("4k3/8/8/8/8/N7/R7/4K3", Side::Black, None))?;

    assert_eq!(id_at(&client, "a3"), knight);
    assert_eq!(id_at(&client, "a2"), rook_a);
    assert_eq!(client.entities().len(), 4);
    Ok(())
}

/// A corrupt snapshot mid-game is refused and the next good one reconciles
/// against the last good state
#[test]
fn test_malformed_snapshot_fails_closed() -> Result<()> {
    let mut client = client(Side::Black);
    client.apply_event(&ServerEvent::Snapshot(PlacementSnapshot::starting_position()))?;
    let before = client.entities().to_vec();

    let err = client
        .apply_event(&snapshot("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP", Side::Black, None))
        .unwrap_err();
    assert!(err.to_string().contains("Malformed snapshot"));
    assert_eq!(client.entities(), &before[..]);
    assert_eq!(client.reconciler().cycles(), 1);

    client.apply_event(&snapshot(
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
        Side::Black,
        Some(("e2", "e4", false)),
    ))?;
    assert_eq!(client.reconciler().cycles(), 2);
    assert_eq!(client.last_report().unwrap().moved, 1);
    Ok(())
}
