// Full bomb lifecycles driven through the engine, firing timer tokens by hand.

use bomber_server::domain::grid::{Cell, CellCoords, Direction, Grid, PlayerId, PowerUpKind};
use bomber_server::domain::{
    BombId, EngineError, GameAction, GameConfig, PowerUpRoller, RenderRef, StaleRef, TimerToken,
    WeightedRoller,
};
use bomber_server::use_cases::GameEngine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

struct NoDrops;

impl PowerUpRoller for NoDrops {
    fn roll(&mut self) -> Option<PowerUpKind> {
        None
    }
}

fn engine_on(grid: Grid, roller: Box<dyn PowerUpRoller>) -> GameEngine {
    let mut engine = GameEngine::with_parts(GameConfig::default(), roller, StdRng::seed_from_u64(1));
    engine.dispatch(GameAction::SetMap {
        grid,
        animate: false,
    });
    engine.dispatch(GameAction::StartGame);
    engine.dispatch(GameAction::SetPlayerRef {
        player: PlayerId::P1,
        render_ref: RenderRef(1),
    });
    engine
}

fn cell(engine: &GameEngine, row: usize, col: usize) -> Cell {
    engine
        .snapshot()
        .grid
        .read_cell(CellCoords::new(row, col))
        .expect("in bounds")
}

/// Drops a bomb for `player` and returns the fuse token it scheduled.
fn drop_bomb(engine: &mut GameEngine, player: PlayerId) -> TimerToken {
    let report = engine.dispatch(GameAction::DropBomb { player });
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    report.timers[0].token
}

/// Fires `token` and returns the follow-up token, if any.
fn fire(engine: &mut GameEngine, token: TimerToken) -> Option<TimerToken> {
    let report = engine.dispatch(token.into_action());
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    report.timers.first().map(|timer| timer.token)
}

#[test]
fn corner_bomb_sets_both_arms_on_fire_and_removes_its_owner() {
    let mut engine = engine_on(Grid::filled(8, Cell::Empty), Box::new(NoDrops));
    let fuse = drop_bomb(&mut engine, PlayerId::P1);
    assert_eq!(cell(&engine, 0, 0), Cell::BombPresent);

    let clear = fire(&mut engine, fuse).expect("fire timer");
    assert_eq!(cell(&engine, 1, 0), Cell::FireVertical);
    assert_eq!(cell(&engine, 2, 0), Cell::FireVertical);
    assert_eq!(cell(&engine, 0, 1), Cell::FireHorizontal);
    assert_eq!(cell(&engine, 0, 2), Cell::FireHorizontal);
    assert_eq!(cell(&engine, 3, 0), Cell::Empty);
    assert!(!engine.snapshot().players.contains_key(&PlayerId::P1));

    assert_eq!(fire(&mut engine, clear), None);
    assert!(engine.snapshot().bombs.is_empty());
    for (row, col) in [(0, 0), (1, 0), (2, 0), (0, 1), (0, 2)] {
        assert_eq!(cell(&engine, row, col), Cell::Empty);
    }
}

#[test]
fn walls_clip_the_corner_blast() {
    let mut grid = Grid::filled(8, Cell::Empty);
    grid.set_cell(CellCoords::new(0, 1), Cell::WallSolid)
        .expect("in bounds");
    grid.set_cell(CellCoords::new(1, 0), Cell::WallBreakable)
        .expect("in bounds");
    let mut engine = engine_on(grid, Box::new(NoDrops));

    let fuse = drop_bomb(&mut engine, PlayerId::P1);
    fire(&mut engine, fuse);
    assert_eq!(cell(&engine, 0, 1), Cell::WallSolid);
    assert_eq!(cell(&engine, 1, 0), Cell::FireVertical);
    assert_eq!(cell(&engine, 2, 0), Cell::Empty);
}

#[test]
fn forced_drop_appears_only_after_the_fire_clears_and_can_be_collected() {
    let mut grid = Grid::filled(8, Cell::Empty);
    grid.set_cell(CellCoords::new(0, 2), Cell::WallBreakable)
        .expect("in bounds");
    let roller = WeightedRoller::always(PowerUpKind::ExtraBomb, StdRng::seed_from_u64(3));
    let mut engine = engine_on(grid, Box::new(roller));
    engine.dispatch(GameAction::ToggleTwoPlayer);

    let fuse = drop_bomb(&mut engine, PlayerId::P1);
    let clear = fire(&mut engine, fuse).expect("fire timer");
    assert_eq!(cell(&engine, 0, 2), Cell::FireHorizontal);
    assert!(engine.snapshot().players.contains_key(&PlayerId::P2));

    fire(&mut engine, clear);
    assert_eq!(cell(&engine, 0, 2), Cell::PowerUpVisible(PowerUpKind::ExtraBomb));

    // P2 walks in from its corner at (0, 7).
    for _ in 0..5 {
        engine.dispatch(GameAction::RequestMove {
            player: PlayerId::P2,
            direction: Direction::Left,
        });
    }
    let p2 = &engine.snapshot().players[&PlayerId::P2];
    assert_eq!(p2.power_up_count(PowerUpKind::ExtraBomb), 1);
    assert_eq!(cell(&engine, 0, 2), Cell::PlayerSlot(PlayerId::P2));
}

#[test]
fn toggling_helpers_off_removes_only_their_entity() {
    let mut engine = engine_on(Grid::filled(8, Cell::Empty), Box::new(NoDrops));
    for (toggle, slot) in [
        (GameAction::ToggleNpc, PlayerId::P4),
        (GameAction::ToggleTwoPlayer, PlayerId::P2),
    ] {
        engine.dispatch(toggle.clone());
        engine.dispatch(GameAction::SetPlayerRef {
            player: slot,
            render_ref: RenderRef(9),
        });
        let grid_before = engine.snapshot().grid.clone();
        let others: Vec<PlayerId> = engine
            .snapshot()
            .players
            .keys()
            .copied()
            .filter(|id| *id != slot)
            .collect();

        engine.dispatch(toggle);
        let snapshot = engine.snapshot();
        assert!(!snapshot.players.contains_key(&slot));
        assert_eq!(snapshot.grid, grid_before);
        assert_eq!(snapshot.players.keys().copied().collect::<Vec<_>>(), others);
    }
}

#[test]
fn repeated_or_unknown_clears_are_no_ops() {
    let mut engine = engine_on(Grid::filled(8, Cell::Empty), Box::new(NoDrops));
    let fuse = drop_bomb(&mut engine, PlayerId::P1);
    let clear = fire(&mut engine, fuse).expect("fire timer");
    fire(&mut engine, clear);

    let settled = Arc::clone(engine.snapshot());
    let TimerToken::Fire(bomb) = clear else {
        panic!("expected a fire token");
    };
    for action in [
        GameAction::ExplosionComplete { bomb },
        GameAction::ExplosionComplete { bomb: BombId(99) },
    ] {
        let report = engine.dispatch(action);
        assert!(matches!(
            report.errors.as_slice(),
            [EngineError::StaleReference(StaleRef::Bomb(_))]
        ));
        assert!(Arc::ptr_eq(&settled, engine.snapshot()));
    }
}

#[test]
fn bombs_of_departed_players_still_complete() {
    let mut engine = engine_on(Grid::filled(8, Cell::Empty), Box::new(NoDrops));
    let fuse = drop_bomb(&mut engine, PlayerId::P1);
    engine.dispatch(GameAction::RemovePlayer {
        player: PlayerId::P1,
    });
    // The bomb tag under the departed player stays.
    assert_eq!(cell(&engine, 0, 0), Cell::BombPresent);

    let clear = fire(&mut engine, fuse).expect("fire timer");
    assert_eq!(cell(&engine, 0, 0), Cell::FireCore);
    fire(&mut engine, clear);
    assert_eq!(cell(&engine, 0, 0), Cell::Empty);
}
