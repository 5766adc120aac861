//! Status text derived from story state: the quest hint and the inventory line.

use story_state::{items, names, FlagStore, Inventory, FLOWER_TARGET};

/// The next objective, picked from the first unmet milestone.
pub fn quest_hint(flags: &FlagStore) -> String {
    if flags.get_bool(names::MET_GIRL) {
        return "Happy Valentine's Day! ❤️".to_string();
    }
    let milestones = [
        (names::INTRO_TALKED, "Talk to the Villager"),
        (names::BRIDGE_SEEN, "Explore the river to the East"),
        (names::QUEST_STARTED, "Talk to the Injured Man"),
        (names::CAT_FOUND, "Find the Cat (Search bushes)"),
        (names::KEY_COLLECTED, "Return Cat to Man"),
        (names::TOOLS_COLLECTED, "Find the Chest (South)"),
        (names::BRIDGE_REPAIRED, "Repair the Bridge"),
        (names::NORTH_VILLAGER_TALKED, "Cross bridge & explore"),
    ];
    if let Some((_, hint)) = milestones.iter().find(|(flag, _)| !flags.get_bool(flag)) {
        return hint.to_string();
    }
    if !flags.get_bool(names::HAS_BOUQUET) {
        return format!(
            "Find Roses ({}/{})",
            flags.get_int(names::FLOWERS_COLLECTED),
            FLOWER_TARGET
        );
    }
    "Find the Girl (Flower Field)".to_string()
}

/// The inventory bar, or `None` when there is nothing to show.
pub fn inventory_line(inventory: &Inventory) -> Option<String> {
    if inventory.is_empty() {
        return None;
    }
    let entries: Vec<String> = inventory
        .items()
        .iter()
        .map(|item| match item.as_str() {
            items::KEY => format!("{} 🗝️", item),
            items::OLD_AXE => format!("{} 🪓", item),
            items::BOUQUET => format!("{} 💐", item),
            other => other.to_string(),
        })
        .collect();
    Some(format!("Inv: {}", entries.join("  ")))
}
