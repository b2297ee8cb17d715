use dioxus::prelude::*;

/// Dietary and cultural requirements that have a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    Halal,
    Kosher,
    Vegetarian,
    Vegan,
    GlutenFree,
    Organic,
    DairyFree,
    NutFree,
}

impl BadgeKind {
    /// Read a stored tag. `gluten_free` and `gluten-free` are the same tag;
    /// anything unrecognised shows as vegetarian.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "halal" => Self::Halal,
            "kosher" => Self::Kosher,
            "vegan" => Self::Vegan,
            "gluten-free" => Self::GlutenFree,
            "organic" => Self::Organic,
            "dairy-free" => Self::DairyFree,
            "nut-free" => Self::NutFree,
            _ => Self::Vegetarian,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Halal => "Halal",
            Self::Kosher => "Kosher",
            Self::Vegetarian => "Vegetarian",
            Self::Vegan => "Vegan",
            Self::GlutenFree => "Gluten-Free",
            Self::Organic => "Organic",
            Self::DairyFree => "Dairy-Free",
            Self::NutFree => "Nut-Free",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Halal => "🌙",
            Self::Kosher => "✡️",
            Self::Vegetarian => "🥬",
            Self::Vegan => "🌱",
            Self::GlutenFree => "🌾",
            Self::Organic => "🌿",
            Self::DairyFree => "🥛",
            Self::NutFree => "🥜",
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            Self::Halal => "cultural-badge-halal",
            Self::Kosher => "cultural-badge-kosher",
            Self::Vegetarian => "cultural-badge-vegetarian",
            Self::Vegan => "cultural-badge-vegan",
            Self::GlutenFree => "cultural-badge-gluten-free",
            Self::Organic => "cultural-badge-organic",
            Self::DairyFree => "cultural-badge-dairy-free",
            Self::NutFree => "cultural-badge-nut-free",
        }
    }

    pub fn aria_label(self) -> String {
        format!("{} dietary requirement", self.label())
    }
}

/// Badge for one dietary tag. `text` replaces the visible label; the
/// accessible label always names the requirement.
#[component]
pub fn CulturalBadge(
    tag: String,
    #[props(default)] text: Option<String>,
    #[props(default)] class: String,
) -> Element {
    let kind = BadgeKind::from_tag(&tag);
    let display = text
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| kind.label().to_string());
    let classes = format!("cultural-badge {} {class}", kind.class());

    rsx! {
        span {
            class: "{classes}",
            role: "img",
            aria_label: kind.aria_label(),
            span { class: "mr-1", aria_hidden: "true", {kind.icon()} }
            span { "{display}" }
        }
    }
}
