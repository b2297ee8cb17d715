mod bento_card;
mod cultural_badge;

pub use bento_card::{BentoCard, BentoSize, BentoVariant};
pub use cultural_badge::{BadgeKind, CulturalBadge};
