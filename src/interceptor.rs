//! Pure packet inspection.
//!
//! Both relay directions call into here with every frame before forwarding
//! it. Inspection never modifies the frame, never writes to a connection,
//! and only ever takes the state lock. A frame that fails to decode is
//! logged and skipped; the relay forwards the original bytes regardless.

use realmgate_protocol::packets::{
    packet_id, AddActor, AddPlayer, ChangeDimension, ContainerClose, ContainerOpen,
    InventoryContent, InventorySlot, InventoryTransaction, ItemStackResponse, LevelEvent,
    MobEquipment, MoveActorDelta, MovePlayer, PlayerAction, PlayerAuthInput, PlayerList,
    PlayerListAction, RemoveActor, SetHealth, SetTime, Text, TransactionData, UpdateAttributes,
    UpdateBlock, UseItemAction,
};
use realmgate_protocol::types::{InputFlags, TextKind};
use realmgate_protocol::{Decode, Packet, PacketFrame};
use tracing::debug;

use crate::state::{ChatDirection, ChatEntry, GameState};

/// Inspects one client-origin frame.
pub fn on_client_packet(frame: &PacketFrame, state: &GameState) {
    match frame.id {
        packet_id::PLAYER_AUTH_INPUT => {
            let Some(pkt) = decode::<PlayerAuthInput>(frame) else {
                return;
            };

            state.update_position(
                pkt.position.x,
                pkt.position.y,
                pkt.position.z,
                pkt.pitch,
                pkt.yaw,
            );

            if state.verbose() && pkt.flags != InputFlags::EMPTY {
                debug!(
                    flags_lo = pkt.flags.lo,
                    flags_hi = pkt.flags.hi,
                    tick = pkt.tick,
                    "client input flags"
                );
            }
        }
        packet_id::TEXT => {
            let Some(pkt) = decode::<Text>(frame) else {
                return;
            };

            // Only true chat is retained on the outgoing side.
            if pkt.kind == TextKind::Chat {
                state.push_chat(ChatEntry::now(
                    pkt.source,
                    pkt.message,
                    ChatDirection::Outgoing,
                ));
            }
        }
        packet_id::INVENTORY_TRANSACTION => on_inventory_transaction(frame, state),
        packet_id::PLAYER_ACTION if state.verbose() => {
            if let Some(pkt) = decode::<PlayerAction>(frame) {
                debug!(
                    action = pkt.action,
                    position = %pkt.position,
                    face = pkt.face,
                    "player action"
                );
            }
        }
        packet_id::MOB_EQUIPMENT if state.verbose() => {
            if let Some(pkt) = decode::<MobEquipment>(frame) {
                debug!(
                    item = %state.item_name(pkt.item.network_id),
                    hotbar_slot = pkt.hotbar_slot,
                    "held item changed"
                );
            }
        }
        _ => {}
    }
}

/// Inspects one upstream-origin frame.
pub fn on_server_packet(frame: &PacketFrame, state: &GameState) {
    match frame.id {
        packet_id::MOVE_PLAYER => {
            let Some(pkt) = decode::<MovePlayer>(frame) else {
                return;
            };

            if pkt.runtime_id == state.runtime_id() {
                state.update_position(
                    pkt.position.x,
                    pkt.position.y,
                    pkt.position.z,
                    pkt.pitch,
                    pkt.yaw,
                );
            }
        }
        packet_id::CHANGE_DIMENSION => {
            if let Some(pkt) = decode::<ChangeDimension>(frame) {
                state.set_dimension(pkt.dimension);
            }
        }
        packet_id::INVENTORY_CONTENT => {
            if let Some(pkt) = decode::<InventoryContent>(frame) {
                state.set_inventory(pkt.window_id, pkt.items);
            }
        }
        packet_id::INVENTORY_SLOT => {
            if let Some(pkt) = decode::<InventorySlot>(frame) {
                state.update_inventory_slot(pkt.window_id, pkt.slot, pkt.item);
            }
        }
        packet_id::TEXT => {
            // Every text kind is retained on the incoming side; consumers
            // must not assume these are chat only.
            if let Some(pkt) = decode::<Text>(frame) {
                state.push_chat(ChatEntry::now(
                    pkt.source,
                    pkt.message,
                    ChatDirection::Incoming,
                ));
            }
        }
        packet_id::PLAYER_LIST => {
            let Some(pkt) = decode::<PlayerList>(frame) else {
                return;
            };

            for entry in &pkt.entries {
                match pkt.action {
                    PlayerListAction::Add => state.add_player(&entry.user_id, &entry.username),
                    PlayerListAction::Remove => state.remove_player(&entry.user_id),
                }
            }
        }
        packet_id::SET_TIME => {
            if let Some(pkt) = decode::<SetTime>(frame) {
                state.set_world_time(i64::from(pkt.time));
            }
        }
        packet_id::UPDATE_ATTRIBUTES => {
            let Some(pkt) = decode::<UpdateAttributes>(frame) else {
                return;
            };

            if pkt.runtime_id == state.runtime_id() {
                for attr in &pkt.attributes {
                    state.set_attribute(&attr.name, attr.value);
                }
            }
        }
        packet_id::SET_HEALTH => {
            if let Some(pkt) = decode::<SetHealth>(frame) {
                state.set_health(pkt.health as f32);
            }
        }
        packet_id::ADD_ACTOR => {
            if let Some(pkt) = decode::<AddActor>(frame) {
                state.add_entity(pkt.runtime_id, &pkt.actor_type, pkt.position);
            }
        }
        packet_id::ADD_PLAYER => {
            if let Some(pkt) = decode::<AddPlayer>(frame) {
                state.add_entity(pkt.runtime_id, &pkt.username, pkt.position);
            }
        }
        packet_id::REMOVE_ACTOR => {
            if let Some(pkt) = decode::<RemoveActor>(frame) {
                // Hosts set the unique id equal to the runtime id, so the
                // map lookup uses it directly.
                state.remove_entity(pkt.unique_id as u64);
            }
        }
        packet_id::MOVE_ACTOR_DELTA => {
            if let Some(pkt) = decode::<MoveActorDelta>(frame) {
                state.update_entity_position(pkt.runtime_id, pkt.position);
            }
        }
        packet_id::UPDATE_BLOCK if state.verbose() => {
            if let Some(pkt) = decode::<UpdateBlock>(frame) {
                debug!(
                    position = %pkt.position,
                    block = %state.block_name(pkt.block_runtime_id),
                    layer = pkt.layer,
                    "block update"
                );
            }
        }
        packet_id::LEVEL_EVENT if state.verbose() => {
            if let Some(pkt) = decode::<LevelEvent>(frame) {
                debug!(event = pkt.event_id, data = pkt.data, "level event");
            }
        }
        packet_id::CONTAINER_OPEN if state.verbose() => {
            if let Some(pkt) = decode::<ContainerOpen>(frame) {
                debug!(
                    window = pkt.window_id,
                    container_type = pkt.container_type,
                    "container open"
                );
            }
        }
        packet_id::CONTAINER_CLOSE if state.verbose() => {
            if let Some(pkt) = decode::<ContainerClose>(frame) {
                debug!(window = pkt.window_id, "container close");
            }
        }
        packet_id::ITEM_STACK_RESPONSE if state.verbose() => {
            if let Some(pkt) = decode::<ItemStackResponse>(frame) {
                debug!(responses = pkt.responses.len(), "item stack response");
            }
        }
        _ => {}
    }
}

/// Click-block transactions teach the block registry: when the held item
/// resolves to a known name, the block runtime id seen in the same
/// transaction is recorded under it. This is the only state mutation on
/// the diagnostic path, and it is idempotent.
fn on_inventory_transaction(frame: &PacketFrame, state: &GameState) {
    let Some(pkt) = decode::<InventoryTransaction>(frame) else {
        return;
    };

    let TransactionData::UseItem(use_item) = &pkt.transaction else {
        if state.verbose() {
            debug!("inventory transaction");
        }
        return;
    };

    if use_item.action == UseItemAction::ClickBlock {
        let name = state.item_name(use_item.held_item.network_id);
        state.learn_block(use_item.block_runtime_id, &name);
    }

    if state.verbose() {
        debug!(
            held = %state.item_name(use_item.held_item.network_id),
            position = %use_item.block_pos,
            block_runtime_id = use_item.block_runtime_id,
            "use item"
        );
    }
}

fn decode<P>(frame: &PacketFrame) -> Option<P>
where
    P: Packet + Decode,
{
    match frame.decode::<P>() {
        Ok(pkt) => Some(pkt),
        Err(e) => {
            debug!("failed to decode {}: {e:#}", P::NAME);
            None
        }
    }
}
