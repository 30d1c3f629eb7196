use super::actors::{EquipSlot, Inventory, Item};

/// Merges `item` into existing stacks of the same id up to `max_qty`; any
/// overflow becomes new stacks.
pub fn add_item_to_inventory(inventory: &mut Inventory, item: Item) {
    let max_qty = item.max_qty.max(1);
    let mut remaining = item.qty.max(1);

    for stack in inventory
        .items
        .iter_mut()
        .filter(|stack| stack.id == item.id)
    {
        if remaining == 0 {
            break;
        }
        let room = max_qty.saturating_sub(stack.qty);
        let moved = room.min(remaining);
        stack.qty += moved;
        stack.max_qty = max_qty;
        remaining -= moved;
    }

    while remaining > 0 {
        let qty = remaining.min(max_qty);
        inventory.items.push(Item {
            qty,
            max_qty,
            ..item.clone()
        });
        remaining -= qty;
    }
}

/// Ranks an item for a slot: the hand that swings uses attack first,
/// everything else uses defense first; the other stat breaks ties.
fn slot_score(slot: EquipSlot, item: &Item) -> (i32, i32) {
    match slot {
        EquipSlot::RightHand => (item.atk, item.def),
        _ => (item.def, item.atk),
    }
}

/// Equips the best backpack candidate for `slot` when it strictly beats the
/// current occupant. The replaced item goes back into the backpack.
pub fn auto_equip_if_better(inventory: &mut Inventory, slot: EquipSlot) -> bool {
    let best = inventory
        .items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.slot == Some(slot))
        .max_by(|(ia, a), (ib, b)| {
            slot_score(slot, a)
                .cmp(&slot_score(slot, b))
                .then_with(|| ib.cmp(ia))
        })
        .map(|(index, item)| (index, slot_score(slot, item)));
    let Some((index, candidate_score)) = best else {
        return false;
    };
    if let Some(current) = inventory.equipped.get(&slot) {
        if candidate_score <= slot_score(slot, current) {
            return false;
        }
    }

    let stack = &mut inventory.items[index];
    let equipped = if stack.qty > 1 {
        stack.qty -= 1;
        Item {
            qty: 1,
            ..stack.clone()
        }
    } else {
        inventory.items.remove(index)
    };
    if let Some(previous) = inventory.equipped.insert(slot, equipped) {
        add_item_to_inventory(inventory, previous);
    }
    true
}
