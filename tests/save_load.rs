mod common;

use citybuilder::{
    snapshot::SaveState, Catalog, Engine, EngineSettings, GameDate, RestoreError, TilePos,
};

fn city(catalog: &Catalog) -> Engine {
    let mut engine = Engine::new(EngineSettings {
        width: 20,
        height: 20,
    });
    for x in 2..10 {
        engine
            .place(common::template(catalog, "Road"), TilePos::new(x, 5))
            .unwrap();
    }
    let builds = [
        ("Water Tower", 2, 6),
        ("Power Plant", 4, 6),
        ("Treatment Plant", 7, 6),
        ("House", 3, 3),
        ("Park", 5, 4),
    ];
    for (name, x, y) in builds {
        engine
            .place(common::template(catalog, name), TilePos::new(x, y))
            .unwrap();
    }
    engine.advance(11.0);
    engine
}

fn road_masks(engine: &Engine) -> Vec<(TilePos, Option<u8>)> {
    let map = engine.map();
    map.anchors()
        .into_iter()
        .filter_map(|id| map.instance(id))
        .map(|inst| (inst.anchor, inst.road_mask()))
        .collect()
}

#[test]
fn saved_game_restores_identically() {
    let catalog = common::catalog();
    let original = city(&catalog);
    let mut buffer = Vec::new();
    original.save(&mut buffer).unwrap();

    let mut restored = Engine::new(EngineSettings::default());
    restored.load(&catalog, buffer.as_slice()).unwrap();

    assert_eq!(restored.map().width(), 20);
    assert_eq!(restored.money(), original.money());
    assert_eq!(restored.population(), original.population());
    assert_eq!(restored.happiness(), original.happiness());
    assert_eq!(restored.date(), GameDate::new(2000, 5, 29));
    assert_eq!(restored.map().occupied_tiles(), original.map().occupied_tiles());
    assert_eq!(road_masks(&restored), road_masks(&original));
}

#[test]
fn load_resubscribes_daily_taxes() {
    let catalog = common::catalog();
    let mut buffer = Vec::new();
    city(&catalog).save(&mut buffer).unwrap();

    let mut engine = Engine::new(EngineSettings::default());
    engine.load(&catalog, buffer.as_slice()).unwrap();
    assert_eq!(engine.clock().listener_count(), 1);

    let before = engine.money();
    let expected = (engine.population() as f64 * engine.happiness() * 100.0) as i64 + 300;
    assert_eq!(engine.advance(3.0), 1);
    assert_eq!(engine.money(), before + expected);
}

#[test]
fn unknown_template_leaves_engine_untouched() {
    let catalog = common::catalog();
    let mut buffer = Vec::new();
    city(&catalog).save(&mut buffer).unwrap();

    let roads_only = Catalog::from_templates(
        catalog.iter().filter(|t| t.is_road()).cloned(),
    )
    .unwrap();
    let mut engine = Engine::new(EngineSettings {
        width: 12,
        height: 12,
    });
    engine
        .place(common::template(&catalog, "House"), TilePos::new(1, 1))
        .unwrap();
    let money = engine.money();
    let occupied = engine.map().occupied_tiles();

    let err = engine.load(&roads_only, buffer.as_slice()).unwrap_err();
    assert!(matches!(err, RestoreError::UnknownTemplate { .. }));
    assert_eq!(engine.map().width(), 12);
    assert_eq!(engine.money(), money);
    assert_eq!(engine.map().occupied_tiles(), occupied);
    assert_eq!(engine.date(), GameDate::START);
}

#[test]
fn save_file_round_trip() {
    let catalog = common::catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");
    let original = city(&catalog);
    original.save_to_path(&path).unwrap();

    let mut engine = Engine::new(EngineSettings::default());
    engine.load_from_path(&catalog, &path).unwrap();
    assert_eq!(engine.money(), original.money());
    assert_eq!(engine.map().instance_count(), original.map().instance_count());
}

#[test]
fn missing_save_file_is_an_io_error() {
    let catalog = common::catalog();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = Engine::new(EngineSettings::default());
    let err = engine
        .load_from_path(&catalog, dir.path().join("absent.json"))
        .unwrap_err();
    assert!(matches!(err, RestoreError::Io(_)));
    assert_eq!(engine.money(), 1000);
}

#[test]
fn garbage_save_is_a_format_error() {
    let catalog = common::catalog();
    let mut engine = Engine::new(EngineSettings::default());
    let err = engine.load(&catalog, &b"not json"[..]).unwrap_err();
    assert!(matches!(err, RestoreError::Format(_)));
}

#[test]
fn oversized_save_is_rejected_without_touching_engine() {
    let catalog = common::catalog();
    let state = SaveState {
        width: u32::MAX,
        height: u32::MAX,
        money: 5,
        date: GameDate::START,
        saved_at: None,
        instances: Vec::new(),
    };
    let mut buffer = Vec::new();
    state.write_to(&mut buffer).unwrap();

    let mut engine = Engine::new(EngineSettings::default());
    let err = engine.load(&catalog, buffer.as_slice()).unwrap_err();
    assert!(matches!(err, RestoreError::Corrupt(_)));
    assert_eq!(engine.map().width(), 100);
    assert_eq!(engine.money(), 1000);
}
