//! Choices offered by the sign-up and profile forms.

use api::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

const fn opt(value: &'static str, label: &'static str) -> SelectOption {
    SelectOption { value, label }
}

/// Stored tag values use `_`; [`crate::CulturalBadge`] accepts either spelling.
pub const DIETARY_OPTIONS: [SelectOption; 7] = [
    opt("halal", "🌙 Halal"),
    opt("kosher", "✡️ Kosher"),
    opt("vegetarian", "🥬 Vegetarian"),
    opt("vegan", "🌱 Vegan"),
    opt("gluten_free", "🌾 Gluten-Free"),
    opt("dairy_free", "🥛 Dairy-Free"),
    opt("nut_free", "🥜 Nut-Free"),
];

pub const CUISINE_OPTIONS: [SelectOption; 10] = [
    opt("american", "American"),
    opt("mexican", "Mexican"),
    opt("chinese", "Chinese"),
    opt("indian", "Indian"),
    opt("middle_eastern", "Middle Eastern"),
    opt("african", "African"),
    opt("european", "European"),
    opt("asian", "Asian"),
    opt("latin_american", "Latin American"),
    opt("mediterranean", "Mediterranean"),
];

/// Every interface language, labelled in its own script.
pub fn language_options() -> impl Iterator<Item = SelectOption> {
    Language::ALL
        .into_iter()
        .map(|language| opt(language.code(), language.native_name()))
}

pub fn cuisine_label(value: &str) -> Option<&'static str> {
    CUISINE_OPTIONS
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_options_follow_language_list() {
        let options: Vec<_> = language_options().collect();
        assert_eq!(options.len(), 6);
        assert_eq!(options[0], opt("en", "English"));
        assert_eq!(options[2], opt("ar", "العربية"));
    }

    #[test]
    fn test_cuisine_label() {
        assert_eq!(cuisine_label("middle_eastern"), Some("Middle Eastern"));
        assert_eq!(cuisine_label("martian"), None);
    }
}
