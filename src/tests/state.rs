use realmgate_protocol::types::{BlockPos, GameData, GameMode, ItemEntry, ItemInstance, Vec3};

use crate::state::{ChatDirection, ChatEntry, GameState, Status, CHAT_HISTORY_CAP};

fn seeded_state() -> GameState {
    let state = GameState::new();
    state.init_from_game_data(&GameData {
        world_name: "Test Realm".to_owned(),
        entity_runtime_id: 42,
        player_position: Vec3::new(0.5, 64.0, 0.5),
        pitch: 0.0,
        yaw: 180.0,
        dimension: 0,
        game_mode: GameMode::Creative,
        world_time: 6000,
        spawn: BlockPos::new(0, 70, 0),
        items: vec![
            ItemEntry {
                network_id: 1,
                name: "minecraft:stone".to_owned(),
            },
            ItemEntry {
                network_id: 2,
                name: "minecraft:dirt".to_owned(),
            },
        ],
    });
    state
}

#[test]
fn chat_ring_keeps_only_the_newest_entries() {
    let state = GameState::new();

    for i in 0..150 {
        state.push_chat(ChatEntry::now(
            "Steve",
            format!("message {i}"),
            ChatDirection::Incoming,
        ));
    }

    let history = state.chat_history(0);
    assert_eq!(history.len(), CHAT_HISTORY_CAP);
    assert_eq!(history.first().unwrap().message, "message 50");
    assert_eq!(history.last().unwrap().message, "message 149");
}

#[test]
fn chat_history_bounds() {
    let state = GameState::new();

    for i in 0..5 {
        state.push_chat(ChatEntry::now(
            "Steve",
            format!("m{i}"),
            ChatDirection::Outgoing,
        ));
    }

    assert_eq!(state.chat_history(0).len(), 5);
    assert_eq!(state.chat_history(-3).len(), 5);
    assert_eq!(state.chat_history(100).len(), 5);

    let last_two = state.chat_history(2);
    assert_eq!(last_two.len(), 2);
    assert_eq!(last_two[0].message, "m3");
    assert_eq!(last_two[1].message, "m4");
}

#[test]
fn slot_update_grows_the_window() {
    let state = seeded_state();

    state.set_inventory(0, vec![ItemInstance::new(1, 1)]);
    state.update_inventory_slot(0, 5, ItemInstance::new(2, 10));

    let items = state.inventory();
    let slot5 = items.iter().find(|i| i.slot == 5).expect("slot 5 present");
    assert_eq!(slot5.name, "minecraft:dirt");
    assert_eq!(slot5.count, 10);

    // Slots 1..=4 were created empty and are filtered out of the view.
    assert_eq!(items.len(), 2);
}

#[test]
fn slot_update_touches_unknown_windows() {
    let state = seeded_state();

    state.update_inventory_slot(119, 0, ItemInstance::new(1, 3));

    let items = state.inventory();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "minecraft:stone");
}

#[test]
fn inventory_skips_empty_slots_and_resolves_names() {
    let state = seeded_state();

    state.set_inventory(
        0,
        vec![
            ItemInstance::new(1, 64),
            ItemInstance::EMPTY,
            ItemInstance::new(9999, 2),
        ],
    );

    let mut items = state.inventory();
    items.sort_by_key(|i| i.slot);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "minecraft:stone");
    assert_eq!(items[0].count, 64);
    assert_eq!(items[1].name, "unknown:9999");
}

#[test]
fn item_names_are_never_empty() {
    let state = seeded_state();

    assert_eq!(state.item_name(1), "minecraft:stone");
    assert_eq!(state.item_name(-7), "unknown:-7");
}

#[test]
fn block_learning_rejects_unresolved_names() {
    let state = GameState::new();

    assert_eq!(state.block_name(500), "rid:500");

    state.learn_block(500, "unknown:0");
    assert_eq!(state.block_name(500), "rid:500");

    state.learn_block(500, "minecraft:stone");
    assert_eq!(state.block_name(500), "minecraft:stone");

    // Learning is idempotent.
    state.learn_block(500, "minecraft:stone");
    assert_eq!(state.block_name(500), "minecraft:stone");
}

#[test]
fn player_add_then_remove_restores_the_roster() {
    let state = GameState::new();
    state.add_player("x0", "Resident");

    let before = state.players();

    state.add_player("x1", "Visitor");
    state.remove_player("x1");

    let after = state.players();
    assert_eq!(before, after);

    // Adds are idempotent too.
    state.add_player("x0", "Resident");
    assert_eq!(state.players().len(), 1);
}

#[test]
fn health_and_attribute_are_aliased() {
    let state = seeded_state();
    assert_eq!(state.world_info().health, 20.0);

    state.set_attribute("minecraft:health", 15.0);
    assert_eq!(state.world_info().health, 15.0);

    state.set_health(7.5);
    assert_eq!(state.attribute("minecraft:health"), Some(7.5));

    state.set_attribute("minecraft:hunger", 18.0);
    assert_eq!(state.world_info().health, 7.5);
}

#[test]
fn queries_return_defensive_copies() {
    let state = seeded_state();
    state.set_inventory(0, vec![ItemInstance::new(1, 64)]);

    let snapshot = state.inventory();
    let players_snapshot = state.players();

    state.update_inventory_slot(0, 0, ItemInstance::new(2, 1));
    state.add_player("x9", "Newcomer");

    assert_eq!(snapshot[0].name, "minecraft:stone");
    assert_eq!(snapshot[0].count, 64);
    assert!(players_snapshot.is_empty());
}

#[test]
fn entity_updates_for_the_local_player_follow_position() {
    let state = seeded_state();
    state.set_identity("Steve", "xuid", 42);

    state.add_entity(42, "Steve", Vec3::new(0.0, 64.0, 0.0));
    state.add_entity(7, "minecraft:cow", Vec3::new(10.0, 64.0, 10.0));

    state.update_entity_position(7, Vec3::new(11.0, 64.0, 10.0));
    let pos = state.position();
    assert_eq!((pos.x, pos.y, pos.z), (0.5, 64.0, 0.5));

    state.update_entity_position(42, Vec3::new(1.0, 65.0, 2.0));
    let pos = state.position();
    assert_eq!((pos.x, pos.y, pos.z), (1.0, 65.0, 2.0));
}

#[test]
fn removing_a_missing_entity_is_a_no_op() {
    let state = GameState::new();
    state.remove_entity(999);
    assert!(state.entities().is_empty());
}

#[test]
fn init_resets_the_previous_session() {
    let state = seeded_state();

    state.push_chat(ChatEntry::now("A", "hello", ChatDirection::Incoming));
    state.add_player("x1", "Alice");
    state.add_entity(7, "minecraft:cow", Vec3::ZERO);
    state.set_health(3.0);
    state.learn_block(5, "minecraft:stone");

    state.init_from_game_data(&GameData {
        world_name: "Second Realm".to_owned(),
        ..GameData::default()
    });

    assert!(state.chat_history(0).is_empty());
    assert!(state.players().is_empty());
    assert!(state.entities().is_empty());
    assert_eq!(state.block_name(5), "rid:5");

    let info = state.world_info();
    assert_eq!(info.world_name, "Second Realm");
    assert_eq!(info.health, 20.0);
}

#[test]
fn status_round_trips() {
    let state = GameState::new();
    assert_eq!(state.status(), Status::Starting);

    for status in [
        Status::WaitingForClient,
        Status::ConnectingToRealm,
        Status::Connected,
        Status::Disconnected,
        Status::WaitingForClient,
    ] {
        state.set_status(status);
        assert_eq!(state.status(), status);
    }
}

#[test]
fn identity_clears_on_session_end() {
    let state = GameState::new();
    state.set_identity("Steve", "xuid", 42);
    assert_eq!(state.runtime_id(), 42);

    state.clear_identity();
    assert_eq!(state.runtime_id(), 0);
    assert_eq!(state.identity(), (String::new(), String::new()));
}

#[test]
fn verbose_toggle_round_trips() {
    let state = GameState::new();
    assert!(!state.verbose());

    state.set_verbose(true);
    assert!(state.verbose());

    state.set_verbose(false);
    assert!(!state.verbose());
}
