mod common;

use common::{at, standard_layout};
use rand::{rngs::SmallRng, SeedableRng};
use seabattle::{
    Difficulty, FileSaveStore, GameError, GameSession, MemorySaveStore, SaveStore, SavedGame, Seat,
};

fn battle_for(player: &str) -> GameSession {
    let mut rng = SmallRng::seed_from_u64(5);
    let mut session =
        GameSession::practice(format!("{}-game", player), player.into(), Difficulty::Hard, &mut rng)
            .unwrap();
    session.ready_with_layout(Seat::One, &standard_layout(), None).unwrap();
    session.shoot(Seat::One, at(4, 4)).unwrap();
    session
}

fn exercise(store: &dyn SaveStore) {
    let alice = SavedGame::new("alice".into(), battle_for("alice"));
    let first = store.save(&alice).unwrap();
    let second = store.save(&alice).unwrap();
    assert!(first.starts_with("alice_"));
    assert_ne!(first, second, "names never collide");
    store.save(&SavedGame::new("bob".into(), battle_for("bob"))).unwrap();

    let listed = store.list_saves("alice").unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|info| info.difficulty == Difficulty::Hard));
    assert!(listed.iter().all(|info| info.size_bytes > 0));
    assert!(listed.iter().any(|info| info.name == first));
    assert!(store.list_saves("carol").unwrap().is_empty());

    let loaded = store.load(&first).unwrap();
    assert_eq!(loaded, alice);
    assert_eq!(
        loaded.session.snapshot(Seat::One),
        alice.session.snapshot(Seat::One)
    );

    store.delete(&first).unwrap();
    assert_eq!(store.load(&first), Err(GameError::UnknownSession));
    assert_eq!(store.delete(&first), Err(GameError::UnknownSession));
    assert_eq!(store.list_saves("alice").unwrap().len(), 1);
}

#[test]
fn memory_store() {
    exercise(&MemorySaveStore::new());
}

#[test]
fn file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSaveStore::new(dir.path().join("saves")).unwrap();
    exercise(&store);
    assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 2);
}

#[test]
fn file_store_rejects_path_names_and_skips_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSaveStore::new(dir.path()).unwrap();
    assert_eq!(store.load("../etc/passwd"), Err(GameError::UnknownSession));
    assert_eq!(store.load(""), Err(GameError::UnknownSession));

    std::fs::write(dir.path().join("broken.sav"), b"not a save").unwrap();
    store.save(&SavedGame::new("alice".into(), battle_for("alice"))).unwrap();
    assert_eq!(store.list_saves("alice").unwrap().len(), 1);
    assert!(matches!(
        store.load("broken"),
        Err(GameError::PersistenceFailure(_))
    ));
}
