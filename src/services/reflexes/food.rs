//! Closed-set food item recognition for the hunger reflex.

const FOOD_ITEMS: &[&str] = &[
    "bread",
    "cooked_beef",
    "cooked_porkchop",
    "cooked_chicken",
    "cooked_mutton",
    "cooked_rabbit",
    "cooked_cod",
    "cooked_salmon",
    "apple",
    "baked_potato",
    "carrot",
    "golden_carrot",
    "melon_slice",
    "sweet_berries",
    "pumpkin_pie",
    "mushroom_stew",
    "rabbit_stew",
    "beetroot_soup",
    "honey_bottle",
];

/// Whether `name` is recognised as food by the hunger reflex.
pub fn is_food(name: &str) -> bool {
    FOOD_ITEMS.contains(&name)
}
