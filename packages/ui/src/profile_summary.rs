use api::{Profile, UserIdentity};
use dioxus::prelude::*;

use crate::components::{BentoCard, BentoSize, BentoVariant, CulturalBadge};
use crate::options::cuisine_label;
use crate::use_auth;

/// Budget shown as dollars with two decimals, or a dash when not set.
pub fn format_budget(budget: Option<f64>) -> String {
    match budget {
        Some(amount) => format!("${amount:.2}"),
        None => "–".to_string(),
    }
}

fn summary_name(profile: Option<&Profile>, user: &UserIdentity) -> String {
    profile
        .and_then(|p| p.display_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| user.display_name())
        .to_string()
}

/// Card with the signed-in user's preferences. Renders nothing when signed out.
#[component]
pub fn ProfileSummary(#[props(default)] class: String) -> Element {
    let auth = use_auth();
    let state = auth();

    let Some(user) = state.current_user() else {
        return rsx! {};
    };
    let profile = state.current_profile();
    let name = summary_name(profile, user);
    let complete = state.is_profile_complete();

    let cuisine = profile
        .and_then(|p| p.primary_cuisine.as_deref())
        .map(|value| cuisine_label(value).unwrap_or(value).to_string())
        .unwrap_or_else(|| "Not set".to_string());
    let family = profile
        .and_then(|p| p.family_size)
        .map(|size| size.to_string())
        .unwrap_or_else(|| "Not set".to_string());
    let budget = format_budget(profile.and_then(|p| p.monthly_budget));
    let tags: Vec<String> = profile
        .map(|p| p.dietary_restrictions.iter().cloned().collect())
        .unwrap_or_default();

    rsx! {
        BentoCard {
            variant: BentoVariant::Warm,
            size: BentoSize::Md,
            class,

            div {
                class: "profile-summary-header",
                h3 { class: "profile-summary-name", "{name}" }
                if complete {
                    span { class: "status-pill status-complete", "Profile complete" }
                } else {
                    span { class: "status-pill status-incomplete", "Finish your profile" }
                }
            }

            dl {
                class: "profile-summary-facts",
                dt { "Cuisine" }
                dd { "{cuisine}" }
                dt { "Family size" }
                dd { "{family}" }
                dt { "Monthly budget" }
                dd { "{budget}" }
            }

            if !tags.is_empty() {
                div {
                    class: "profile-summary-badges",
                    for tag in tags {
                        CulturalBadge { key: "{tag}", tag: tag.clone() }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_budget() {
        assert_eq!(format_budget(Some(400.0)), "$400.00");
        assert_eq!(format_budget(Some(12.345)), "$12.35");
        assert_eq!(format_budget(None), "–");
    }

    #[test]
    fn test_summary_name_prefers_profile() {
        let user = UserIdentity {
            id: "u1".to_string(),
            email: Some("cook@example.com".to_string()),
            email_confirmed_at: None,
            created_at: None,
            user_metadata: Default::default(),
        };
        let profile = Profile {
            id: "u1".to_string(),
            display_name: Some("Amina".to_string()),
            ..Default::default()
        };
        assert_eq!(summary_name(Some(&profile), &user), "Amina");

        let unnamed = Profile {
            display_name: Some(String::new()),
            ..profile
        };
        assert_eq!(summary_name(Some(&unnamed), &user), "cook@example.com");
        assert_eq!(summary_name(None, &user), "cook@example.com");
    }
}
