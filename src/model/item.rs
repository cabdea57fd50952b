use serde::{Deserialize, Deserializer, Serialize};

/// Where a menu entry points. Resolved to a path by a `LinkResolver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkTarget {
    /// A typed entity such as `category:shoes` or `product:1042`
    Entity { kind: String, id: String },
    /// A literal URL or path entered by the user
    Custom { url: String },
}

impl std::fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkTarget::Entity { kind, id } => write!(f, "{}:{}", kind, id),
            LinkTarget::Custom { url } => write!(f, "{}", url),
        }
    }
}

/// Presentation fields carried through the engine unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkTarget>,
    /// Destination path last produced by the link resolver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub new_tab: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A flat, persisted menu record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(flatten)]
    pub payload: ItemPayload,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    /// Create an active root item with the given title at rank 0
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        MenuItem {
            id: id.into(),
            parent_id: None,
            sort_order: 0,
            is_active: true,
            payload: ItemPayload {
                title: title.into(),
                ..Default::default()
            },
        }
    }

    /// Builder-style parent/rank setter, mostly for fixtures
    pub fn under(mut self, parent_id: Option<&str>, sort_order: u32) -> Self {
        self.parent_id = parent_id.map(str::to_string);
        self.sort_order = sort_order;
        self
    }

    pub fn title(&self) -> &str {
        &self.payload.title
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A partial update for one record: only the structural fields.
///
/// `parent_id` is `None` when the parent is unchanged and is then omitted from
/// the serialized form. `Some(None)` means the item becomes a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub parent_id: Option<Option<String>>,
    pub sort_order: u32,
}

impl ItemPatch {
    /// Apply this patch to a record in place
    pub fn apply_to(&self, item: &mut MenuItem) {
        if let Some(parent) = &self.parent_id {
            item.parent_id = parent.clone();
        }
        item.sort_order = self.sort_order;
    }
}

/// Distinguish a present `null` (become root) from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
