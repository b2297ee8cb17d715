//! # User profiles: cultural, dietary and budget preferences
//!
//! One row of the `user_profiles` table per identity, keyed by the identity id.
//!
//! | Type | Role |
//! |------|------|
//! | [`Profile`] | A row as read back from the store. Every column the backend may leave null is optional here. |
//! | [`ProfileSeed`] | The optional values collected by the sign-up form. |
//! | [`NewProfile`] | The row inserted after registration: the seed with defaults applied. |
//! | [`ProfileChanges`] | A partial update; only the fields that are set are sent. |
//! | [`CulturalPreferences`] | Read-only bundle of the cuisine, dietary and language fields. |
//!
//! Sets (languages, cuisines, dietary restrictions) are stored as JSON arrays and
//! modelled as [`BTreeSet`]s: ordered and free of duplicates. A null array reads
//! back as an empty set.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_CUISINE: &str = "american";
pub const DEFAULT_FAMILY_SIZE: u32 = 1;

fn nullable_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// A `user_profiles` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Always equal to the owning identity's id.
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub primary_language: Option<String>,
    #[serde(default, deserialize_with = "nullable_set")]
    pub secondary_languages: BTreeSet<String>,
    #[serde(default)]
    pub primary_cuisine: Option<String>,
    #[serde(default, deserialize_with = "nullable_set")]
    pub secondary_cuisines: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable_set")]
    pub dietary_restrictions: BTreeSet<String>,
    #[serde(default)]
    pub family_size: Option<u32>,
    #[serde(default)]
    pub monthly_budget: Option<f64>,
}

impl Profile {
    /// Whether onboarding has filled in everything the app relies on.
    ///
    /// `monthly_budget` is nullable in the schema but still required here, and a
    /// zero budget counts as missing. Whether the budget should gate completeness
    /// is an open product question; the check is kept as it has always behaved.
    pub fn is_complete(&self) -> bool {
        non_empty(&self.display_name)
            && non_empty(&self.primary_language)
            && non_empty(&self.primary_cuisine)
            && self.family_size.is_some_and(|size| size > 0)
            && self.monthly_budget.is_some_and(|budget| budget != 0.0)
    }

    /// Primary language code, or `en` when unset.
    pub fn preferred_language(&self) -> &str {
        self.primary_language
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn cultural_preferences(&self) -> CulturalPreferences {
        CulturalPreferences {
            primary_cuisine: self.primary_cuisine.clone(),
            secondary_cuisines: self.secondary_cuisines.clone(),
            dietary_restrictions: self.dietary_restrictions.clone(),
            primary_language: self.primary_language.clone(),
            secondary_languages: self.secondary_languages.clone(),
        }
    }

    /// Apply a partial update in place, the way the store applies a `PATCH`.
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(ref name) = changes.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(ref language) = changes.primary_language {
            self.primary_language = Some(language.clone());
        }
        if let Some(ref languages) = changes.secondary_languages {
            self.secondary_languages = languages.clone();
        }
        if let Some(ref cuisine) = changes.primary_cuisine {
            self.primary_cuisine = Some(cuisine.clone());
        }
        if let Some(ref cuisines) = changes.secondary_cuisines {
            self.secondary_cuisines = cuisines.clone();
        }
        if let Some(ref restrictions) = changes.dietary_restrictions {
            self.dietary_restrictions = restrictions.clone();
        }
        if let Some(size) = changes.family_size {
            self.family_size = Some(size);
        }
        if let Some(budget) = changes.monthly_budget {
            self.monthly_budget = budget;
        }
    }
}

/// Values collected at sign-up. Anything left unset gets a default when the
/// profile row is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSeed {
    pub display_name: Option<String>,
    pub primary_language: Option<String>,
    pub primary_cuisine: Option<String>,
    pub family_size: Option<u32>,
    pub monthly_budget: Option<f64>,
    pub dietary_restrictions: BTreeSet<String>,
}

impl ProfileSeed {
    /// Display name sent as sign-up metadata; empty when not given.
    pub fn display_name_or_default(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }

    pub fn language_or_default(&self) -> &str {
        self.primary_language
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// The row inserted right after a registration that needs no confirmation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProfile {
    pub id: String,
    pub display_name: String,
    pub primary_language: String,
    pub primary_cuisine: String,
    pub family_size: u32,
    pub monthly_budget: Option<f64>,
    pub dietary_restrictions: BTreeSet<String>,
}

impl NewProfile {
    /// Apply the registration defaults: language `en`, cuisine `american`,
    /// family size 1, no dietary restrictions, no budget. A zero family size or
    /// budget is treated as unset.
    pub fn from_seed(user_id: &str, seed: &ProfileSeed) -> Self {
        Self {
            id: user_id.to_string(),
            display_name: seed.display_name_or_default().to_string(),
            primary_language: seed.language_or_default().to_string(),
            primary_cuisine: seed
                .primary_cuisine
                .clone()
                .filter(|cuisine| !cuisine.is_empty())
                .unwrap_or_else(|| DEFAULT_CUISINE.to_string()),
            family_size: seed
                .family_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_FAMILY_SIZE),
            monthly_budget: seed.monthly_budget.filter(|budget| *budget != 0.0),
            dietary_restrictions: seed.dietary_restrictions.clone(),
        }
    }

    /// The row as the store returns it after insertion.
    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            display_name: Some(self.display_name),
            primary_language: Some(self.primary_language),
            secondary_languages: BTreeSet::new(),
            primary_cuisine: Some(self.primary_cuisine),
            secondary_cuisines: BTreeSet::new(),
            dietary_restrictions: self.dietary_restrictions,
            family_size: Some(self.family_size),
            monthly_budget: self.monthly_budget,
        }
    }
}

/// A partial profile update. `monthly_budget: Some(None)` clears the budget.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_languages: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_cuisines: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<Option<f64>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the changes touch columns a new row cannot be seeded with.
    pub fn sets_secondary(&self) -> bool {
        self.secondary_languages.is_some() || self.secondary_cuisines.is_some()
    }
}

/// Seed for a row that is created from an edit because none existed yet.
impl From<&ProfileChanges> for ProfileSeed {
    fn from(changes: &ProfileChanges) -> Self {
        Self {
            display_name: changes.display_name.clone(),
            primary_language: changes.primary_language.clone(),
            primary_cuisine: changes.primary_cuisine.clone(),
            family_size: changes.family_size,
            monthly_budget: changes.monthly_budget.flatten(),
            dietary_restrictions: changes.dietary_restrictions.clone().unwrap_or_default(),
        }
    }
}

/// Cuisine, dietary and language preferences taken from a [`Profile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CulturalPreferences {
    pub primary_cuisine: Option<String>,
    pub secondary_cuisines: BTreeSet<String>,
    pub dietary_restrictions: BTreeSet<String>,
    pub primary_language: Option<String>,
    pub secondary_languages: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_profile() -> Profile {
        Profile {
            id: "u1".to_string(),
            display_name: Some("Amara".to_string()),
            primary_language: Some("es".to_string()),
            primary_cuisine: Some("mexican".to_string()),
            family_size: Some(4),
            monthly_budget: Some(400.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_profile() {
        assert!(complete_profile().is_complete());
    }

    #[test]
    fn test_each_required_field_gates_completeness() {
        let cases: [fn(&mut Profile); 10] = [
            |p| p.display_name = None,
            |p| p.display_name = Some(String::new()),
            |p| p.primary_language = None,
            |p| p.primary_language = Some(String::new()),
            |p| p.primary_cuisine = None,
            |p| p.primary_cuisine = Some(String::new()),
            |p| p.family_size = None,
            |p| p.family_size = Some(0),
            |p| p.monthly_budget = None,
            |p| p.monthly_budget = Some(0.0),
        ];

        for (i, clear) in cases.into_iter().enumerate() {
            let mut profile = complete_profile();
            clear(&mut profile);
            assert!(!profile.is_complete(), "case {i} should be incomplete");
        }
    }

    #[test]
    fn test_null_arrays_read_as_empty_sets() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "u1",
            "display_name": "Amara",
            "primary_language": "ar",
            "secondary_languages": null,
            "primary_cuisine": "middle_eastern",
            "dietary_restrictions": ["halal", "nut_free", "halal"],
            "family_size": 3,
            "monthly_budget": null
        }))
        .unwrap();

        assert!(profile.secondary_languages.is_empty());
        assert!(profile.secondary_cuisines.is_empty());
        assert_eq!(profile.dietary_restrictions.len(), 2);
        assert_eq!(profile.monthly_budget, None);
        assert!(!profile.is_complete());
    }

    #[test]
    fn test_preferred_language_defaults_to_english() {
        let mut profile = complete_profile();
        assert_eq!(profile.preferred_language(), "es");
        profile.primary_language = Some(String::new());
        assert_eq!(profile.preferred_language(), "en");
        profile.primary_language = None;
        assert_eq!(profile.preferred_language(), "en");
    }

    #[test]
    fn test_new_profile_applies_defaults() {
        let row = NewProfile::from_seed(
            "u1",
            &ProfileSeed {
                display_name: Some("A".to_string()),
                primary_language: Some("es".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(row.display_name, "A");
        assert_eq!(row.primary_language, "es");
        assert_eq!(row.primary_cuisine, "american");
        assert_eq!(row.family_size, 1);
        assert_eq!(row.monthly_budget, None);
        assert!(row.dietary_restrictions.is_empty());

        let blank = NewProfile::from_seed(
            "u2",
            &ProfileSeed {
                family_size: Some(0),
                monthly_budget: Some(0.0),
                ..Default::default()
            },
        );
        assert_eq!(blank.display_name, "");
        assert_eq!(blank.primary_language, "en");
        assert_eq!(blank.family_size, 1);
        assert_eq!(blank.monthly_budget, None);
    }

    #[test]
    fn test_changes_serialize_only_set_fields() {
        let changes = ProfileChanges {
            family_size: Some(5),
            monthly_budget: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({ "family_size": 5, "monthly_budget": null })
        );
        assert!(ProfileChanges::default().is_empty());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_apply_changes() {
        let mut profile = complete_profile();
        profile.apply(&ProfileChanges {
            primary_cuisine: Some("indian".to_string()),
            dietary_restrictions: Some(BTreeSet::from(["vegetarian".to_string()])),
            monthly_budget: Some(None),
            ..Default::default()
        });
        assert_eq!(profile.primary_cuisine.as_deref(), Some("indian"));
        assert!(profile.dietary_restrictions.contains("vegetarian"));
        assert_eq!(profile.monthly_budget, None);
        assert_eq!(profile.display_name.as_deref(), Some("Amara"));

        let prefs = profile.cultural_preferences();
        assert_eq!(prefs.primary_cuisine.as_deref(), Some("indian"));
        assert_eq!(prefs.primary_language.as_deref(), Some("es"));
    }
}
