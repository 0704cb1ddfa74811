//! Entity reconciliation across authoritative snapshots
//!
//! Snapshots carry full placements with no piece identity. The reconciler
//! maps each new snapshot onto the previously tracked entities so that a
//! piece keeps its `EntityId` while it moves, and only captures or
//! promotions destroy or create entities.
//!
//! Matching happens inside `(kind, side)` groups only, in two passes:
//!
//! 1. **Exact**: an occupant standing where an unmatched entity of its group
//!    already stands takes that entity. Pieces that did not move never
//!    animate.
//! 2. **Nearest**: each remaining occupant takes the unmatched entity of its
//!    group with the smallest squared distance. Ties go to the entity that
//!    comes first in the previous entity list. That tie-break is arbitrary
//!    but deterministic: when two same-type pieces could each be either
//!    mover, the snapshot holds nothing that says which one really moved.
//!
//! Leftover occupants get fresh IDs; leftover entities are dropped.

use crate::core::{EntityId, EntityIdAllocator, Occupant, PieceEntity, PieceKind, Side};
use crate::game::logger::{ClientLogger, VerbosityLevel};
use crate::game::snapshot::PlacementSnapshot;
use crate::{ArcanaError, Result};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::rc::Rc;

type GroupKey = (PieceKind, Side);

/// What one reconciliation cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entities that kept their square
    pub retained: usize,
    /// Entities that kept their ID but changed square
    pub moved: usize,
    /// Entities created this cycle (promotion, resurrection, first snapshot)
    pub minted: Vec<EntityId>,
    /// Entities destroyed this cycle (capture, removal effects)
    pub dropped: Vec<EntityId>,
}

/// Merge new occupants into the previous entity set
///
/// Returns the new entity list in occupant order. `previous` is not
/// modified; IDs for new entities come from `ids`.
pub fn reconcile(
    previous: &[PieceEntity],
    occupants: &[Occupant],
    ids: &mut EntityIdAllocator,
) -> (Vec<PieceEntity>, ReconcileReport) {
    let mut groups: FxHashMap<GroupKey, SmallVec<[usize; 8]>> = FxHashMap::default();
    for (idx, entity) in previous.iter().enumerate() {
        groups.entry((entity.kind, entity.side)).or_default().push(idx);
    }

    let mut claimed = vec![false; previous.len()];
    let mut assignment: Vec<Option<usize>> = vec![None; occupants.len()];

    // Exact pass
    for (slot, occupant) in occupants.iter().enumerate() {
        let Some(candidates) = groups.get(&(occupant.kind, occupant.side)) else {
            continue;
        };
        if let Some(&prev) = candidates
            .iter()
            .find(|&&prev| !claimed[prev] && previous[prev].square == occupant.square)
        {
            claimed[prev] = true;
            assignment[slot] = Some(prev);
        }
    }

    // Nearest pass
    for (slot, occupant) in occupants.iter().enumerate() {
        if assignment[slot].is_some() {
            continue;
        }
        let Some(candidates) = groups.get(&(occupant.kind, occupant.side)) else {
            continue;
        };
        let target = occupant.square.to_coordinate();
        let mut best: Option<(usize, f32)> = None;
        for &prev in candidates.iter() {
            if claimed[prev] {
                continue;
            }
            let dist = previous[prev].square.to_coordinate().distance_sq(&target);
            // Strict comparison keeps the first candidate on ties
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((prev, dist));
            }
        }
        if let Some((prev, _)) = best {
            claimed[prev] = true;
            assignment[slot] = Some(prev);
        }
    }

    let mut report = ReconcileReport::default();
    let mut next = Vec::with_capacity(occupants.len());
    for (occupant, matched) in occupants.iter().zip(assignment) {
        match matched {
            Some(prev) => {
                let mut entity = previous[prev].clone();
                if entity.square == occupant.square {
                    report.retained += 1;
                } else {
                    report.moved += 1;
                }
                entity.place(occupant.square);
                next.push(entity);
            }
            None => {
                let id = ids.next_id();
                report.minted.push(id);
                next.push(PieceEntity::new(id, occupant.kind, occupant.side, occupant.square));
            }
        }
    }

    report.dropped = previous
        .iter()
        .zip(claimed)
        .filter(|(_, claimed)| !claimed)
        .map(|(entity, _)| entity.id)
        .collect();

    (next, report)
}

/// Owner of the tracked entity set
///
/// Snapshots must be applied in the order the server emitted them, since each
/// cycle compares against the one before.
#[derive(Debug)]
pub struct EntityReconciler {
    entities: Vec<PieceEntity>,
    ids: EntityIdAllocator,
    cycles: u64,
    logger: Rc<ClientLogger>,
}

impl EntityReconciler {
    pub fn new(logger: Rc<ClientLogger>) -> Self {
        EntityReconciler {
            entities: Vec::new(),
            ids: EntityIdAllocator::new(),
            cycles: 0,
            logger,
        }
    }

    /// Current entity set, in board order of the last applied snapshot
    pub fn entities(&self) -> &[PieceEntity] {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&PieceEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_at(&self, square: crate::core::Square) -> Option<&PieceEntity> {
        self.entities.iter().find(|e| e.square == square)
    }

    /// Number of snapshots applied so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Reconcile against a new snapshot
    ///
    /// Fails closed: if the placement does not parse, the current entity set
    /// is kept unchanged and `MalformedSnapshot` is returned.
    pub fn apply(&mut self, snapshot: &PlacementSnapshot) -> Result<ReconcileReport> {
        let occupants = snapshot.occupants().map_err(|e| {
            self.logger.event(
                VerbosityLevel::Minimal,
                "reconcile",
                format_args!("rejected snapshot, keeping {} entities: {}", self.entities.len(), e),
            );
            ArcanaError::MalformedSnapshot(e.to_string())
        })?;

        let (next, report) = reconcile(&self.entities, &occupants, &mut self.ids);

        #[cfg(feature = "verbose-logging")]
        self.trace_cycle(&next, &report);

        self.entities = next;
        self.cycles += 1;

        self.logger.event(
            VerbosityLevel::Normal,
            "reconcile",
            format_args!(
                "cycle {}: {} entities ({} retained, {} moved, {} minted, {} dropped)",
                self.cycles,
                self.entities.len(),
                report.retained,
                report.moved,
                report.minted.len(),
                report.dropped.len()
            ),
        );

        Ok(report)
    }

    #[cfg(feature = "verbose-logging")]
    fn trace_cycle(&self, next: &[PieceEntity], report: &ReconcileReport) {
        for entity in next {
            if let Some(old) = self.entities.iter().find(|e| e.id == entity.id) {
                if old.square != entity.square {
                    self.logger.event(
                        VerbosityLevel::Verbose,
                        "reconcile",
                        format_args!(
                            "{} {} {} {} -> {}",
                            entity.id, entity.side, entity.kind, old.square, entity.square
                        ),
                    );
                }
            } else {
                self.logger.event(
                    VerbosityLevel::Verbose,
                    "reconcile",
                    format_args!("{} {} {} spawned on {}", entity.id, entity.side, entity.kind, entity.square),
                );
            }
        }
        for id in &report.dropped {
            self.logger
                .event(VerbosityLevel::Verbose, "reconcile", format_args!("{} removed", id));
        }
    }

    /// Forget all tracked entities (new game); IDs keep counting up
    pub fn reset(&mut self) {
        self.entities.clear();
        self.cycles = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Square;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn occ(kind: PieceKind, side: Side, square: &str) -> Occupant {
        Occupant {
            kind,
            side,
            square: sq(square),
        }
    }

    fn reconciler() -> EntityReconciler {
        EntityReconciler::new(Rc::new(ClientLogger::capturing()))
    }

    fn id_at(entities: &[PieceEntity], square: &str) -> EntityId {
        entities.iter().find(|e| e.square == sq(square)).unwrap().id
    }

    #[test]
    fn test_first_snapshot_mints_everything() {
        let mut ids = EntityIdAllocator::new();
        let occupants = vec![
            occ(PieceKind::King, Side::White, "e1"),
            occ(PieceKind::King, Side::Black, "e8"),
        ];
        let (entities, report) = reconcile(&[], &occupants, &mut ids);
        assert_eq!(entities.len(), 2);
        assert_eq!(report.minted.len(), 2);
        assert!(report.dropped.is_empty());
        assert_ne!(entities[0].id, entities[1].id);
    }

    #[test]
    fn test_single_move_keeps_identity() {
        let mut ids = EntityIdAllocator::new();
        let before = vec![
            occ(PieceKind::Rook, Side::White, "a1"),
            occ(PieceKind::Rook, Side::White, "h1"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let a1 = id_at(&first, "a1");
        let h1 = id_at(&first, "h1");

        let after = vec![
            occ(PieceKind::Rook, Side::White, "a4"),
            occ(PieceKind::Rook, Side::White, "h1"),
        ];
        let (second, report) = reconcile(&first, &after, &mut ids);
        assert_eq!(id_at(&second, "a4"), a1);
        assert_eq!(id_at(&second, "h1"), h1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.moved, 1);
        assert!(report.minted.is_empty());
    }

    #[test]
    fn test_nearest_pass_picks_closest_not_first() {
        let mut ids = EntityIdAllocator::new();
        let before = vec![
            occ(PieceKind::Rook, Side::White, "a1"),
            occ(PieceKind::Rook, Side::White, "h1"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let a1 = id_at(&first, "a1");
        let h1 = id_at(&first, "h1");

        // h4 is visited first; the a1 rook comes first but h1 is closer
        let after = vec![
            occ(PieceKind::Rook, Side::White, "h4"),
            occ(PieceKind::Rook, Side::White, "a2"),
        ];
        let (second, report) = reconcile(&first, &after, &mut ids);
        assert_eq!(id_at(&second, "h4"), h1);
        assert_eq!(id_at(&second, "a2"), a1);
        assert_eq!(report.moved, 2);
        assert!(report.minted.is_empty());
        assert!(report.dropped.is_empty());
    }

    #[test]
    fn test_exact_match_beats_nearer_candidate() {
        let mut ids = EntityIdAllocator::new();
        let before = vec![
            occ(PieceKind::Knight, Side::White, "e3"),
            occ(PieceKind::Knight, Side::White, "e5"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let e3 = id_at(&first, "e3");
        let e5 = id_at(&first, "e5");

        // e4 is equidistant from both and is visited first; without the exact
        // pass it would take the e3 knight on the tie-break.
        let after = vec![
            occ(PieceKind::Knight, Side::White, "e4"),
            occ(PieceKind::Knight, Side::White, "e3"),
        ];
        let (second, report) = reconcile(&first, &after, &mut ids);
        assert_eq!(id_at(&second, "e3"), e3);
        assert_eq!(id_at(&second, "e4"), e5);
        assert_eq!(report.retained, 1);
        assert_eq!(report.moved, 1);
    }

    #[test]
    fn test_exact_pass_runs_before_nearest() {
        let mut ids = EntityIdAllocator::new();
        // a8 comes first in board order and is nearest to the entity on b7;
        // the entity on b7 must still stay put because b7 is occupied again.
        let before = vec![
            occ(PieceKind::Bishop, Side::Black, "b7"),
            occ(PieceKind::Bishop, Side::Black, "h1"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let b7 = id_at(&first, "b7");
        let h1 = id_at(&first, "h1");

        let after = vec![
            occ(PieceKind::Bishop, Side::Black, "a8"),
            occ(PieceKind::Bishop, Side::Black, "b7"),
        ];
        let (second, report) = reconcile(&first, &after, &mut ids);
        assert_eq!(id_at(&second, "b7"), b7);
        assert_eq!(id_at(&second, "a8"), h1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.moved, 1);
    }

    #[test]
    fn test_groups_never_mix() {
        let mut ids = EntityIdAllocator::new();
        let (first, _) = reconcile(&[], &[occ(PieceKind::Knight, Side::White, "e4")], &mut ids);
        let knight = first[0].id;

        let (second, report) =
            reconcile(&first, &[occ(PieceKind::Bishop, Side::White, "e4")], &mut ids);
        assert_ne!(second[0].id, knight);
        assert_eq!(report.dropped, vec![knight]);
        assert_eq!(report.minted.len(), 1);

        let (third, _) = reconcile(&second, &[occ(PieceKind::Bishop, Side::Black, "e4")], &mut ids);
        assert_ne!(third[0].id, second[0].id);
    }

    #[test]
    fn test_tie_goes_to_first_previous_entity() {
        let mut ids = EntityIdAllocator::new();
        // Rooks on c1 and g1 are both distance 2 files from e1
        let before = vec![
            occ(PieceKind::Rook, Side::White, "c1"),
            occ(PieceKind::Rook, Side::White, "g1"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let c1 = id_at(&first, "c1");
        let g1 = id_at(&first, "g1");

        let (second, report) =
            reconcile(&first, &[occ(PieceKind::Rook, Side::White, "e1")], &mut ids);
        assert_eq!(second[0].id, c1);
        assert_eq!(report.dropped, vec![g1]);
    }

    #[test]
    fn test_capture_keeps_attacker_drops_victim() {
        let mut ids = EntityIdAllocator::new();
        let before = vec![
            occ(PieceKind::Pawn, Side::Black, "d5"),
            occ(PieceKind::Pawn, Side::White, "e4"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let x = id_at(&first, "e4");
        let y = id_at(&first, "d5");

        let (second, report) =
            reconcile(&first, &[occ(PieceKind::Pawn, Side::White, "d5")], &mut ids);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, x);
        assert_eq!(report.dropped, vec![y]);
    }

    #[test]
    fn test_promotion_mints_new_queen() {
        let mut ids = EntityIdAllocator::new();
        let before = vec![
            occ(PieceKind::Queen, Side::White, "d1"),
            occ(PieceKind::Pawn, Side::White, "e7"),
        ];
        let (first, _) = reconcile(&[], &before, &mut ids);
        let old_queen = id_at(&first, "d1");
        let pawn = id_at(&first, "e7");

        let after = vec![
            occ(PieceKind::Queen, Side::White, "e8"),
            occ(PieceKind::Queen, Side::White, "d1"),
        ];
        let (second, report) = reconcile(&first, &after, &mut ids);
        assert_eq!(id_at(&second, "d1"), old_queen);
        let new_queen = id_at(&second, "e8");
        assert_ne!(new_queen, old_queen);
        assert_ne!(new_queen, pawn);
        assert_eq!(report.minted, vec![new_queen]);
        assert_eq!(report.dropped, vec![pawn]);
    }

    #[test]
    fn test_apply_fails_closed() {
        let mut reconciler = reconciler();
        reconciler.apply(&PlacementSnapshot::starting_position()).unwrap();
        let before: Vec<PieceEntity> = reconciler.entities().to_vec();

        let broken = PlacementSnapshot::new("rnbqkbnr/pppppppp/8/8", Side::White);
        let err = reconciler.apply(&broken).unwrap_err();
        assert!(matches!(err, ArcanaError::MalformedSnapshot(_)));
        assert_eq!(reconciler.entities(), before.as_slice());
        assert_eq!(reconciler.cycles(), 1);
    }

    #[test]
    fn test_apply_logs_summary() {
        let logger = Rc::new(ClientLogger::capturing());
        let mut reconciler = EntityReconciler::new(Rc::clone(&logger));
        reconciler.apply(&PlacementSnapshot::starting_position()).unwrap();

        let logs = logger.logs();
        assert!(logs
            .iter()
            .any(|l| l.message == "cycle 1: 32 entities (0 retained, 0 moved, 32 minted, 0 dropped)"));
    }

    #[test]
    fn test_reset_does_not_reuse_ids() {
        let mut reconciler = reconciler();
        reconciler.apply(&PlacementSnapshot::starting_position()).unwrap();
        let max_before = reconciler.entities().iter().map(|e| e.id).max().unwrap();

        reconciler.reset();
        assert!(reconciler.entities().is_empty());

        reconciler.apply(&PlacementSnapshot::starting_position()).unwrap();
        let min_after = reconciler.entities().iter().map(|e| e.id).min().unwrap();
        assert!(min_after > max_before);
    }
}
