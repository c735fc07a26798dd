use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub id: i64,
    pub name: String,
    pub required_xp: u32,
    #[serde(default)]
    pub image: Option<String>,
}

/// Outfit slot of a shop item. Hair and headwear share one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSlot {
    #[serde(alias = "headwear")]
    Hair,
    Top,
    Bottom,
    Boots,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: u32,
    #[serde(rename = "type")]
    pub slot: ItemSlot,
    #[serde(default)]
    pub required_rank: Option<Rank>,
    #[serde(default)]
    pub image_preview_url: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl ShopItem {
    /// Whether a character at `xp` meets the item's rank requirement.
    pub fn is_rank_unlocked(&self, xp: u32) -> bool {
        self.required_rank
            .as_ref()
            .is_none_or(|rank| xp >= rank.required_xp)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub item: ShopItem,
    #[serde(default)]
    pub is_equipped: bool,
    #[serde(default)]
    pub is_unlocked: bool,
    #[serde(default)]
    pub is_purchased: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangeItemRequest {
    pub inventory_item_id: i64,
}
