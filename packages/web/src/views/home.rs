//! Landing page and signed-in dashboard.

use dioxus::prelude::*;
use ui::{use_auth, BentoCard, BentoSize, BentoVariant, CulturalBadge, ProfileSummary};

use crate::Route;

#[component]
pub fn Home() -> Element {
    let auth = use_auth();
    let state = auth();

    if state.is_authenticated() {
        let name = state
            .current_profile()
            .and_then(|p| p.display_name.clone())
            .filter(|n| !n.is_empty())
            .or_else(|| state.current_user().map(|u| u.display_name().to_string()))
            .unwrap_or_default();
        let complete = state.is_profile_complete();

        rsx! {
            Dashboard { name, complete }
        }
    } else {
        rsx! {
            Welcome {}
        }
    }
}

#[component]
fn Dashboard(name: String, complete: bool) -> Element {
    let nav = use_navigator();

    rsx! {
        section {
            class: "page",
            h1 { class: "page-title", "Welcome back, {name}" }

            div {
                class: "bento-grid",
                ProfileSummary { class: "bento-span-2" }

                if !complete {
                    BentoCard {
                        variant: BentoVariant::Cultural,
                        aria_label: "Complete your profile".to_string(),
                        onclick: move |_| {
                            nav.push(Route::ProfilePage {});
                        },
                        h3 { "Complete your profile" }
                        p { "Add your cuisine, family size and budget to get tailored meal plans." }
                    }
                }

                BentoCard {
                    variant: BentoVariant::Fresh,
                    h3 { "Budget-friendly recipes" }
                    p { "Recipes are matched to your monthly food budget and family size." }
                }
            }
        }
    }
}

#[component]
fn Welcome() -> Element {
    let nav = use_navigator();

    rsx! {
        section {
            class: "page hero",
            h1 { class: "hero-title", "Eat well, spend wisely, honour your traditions" }
            p {
                class: "hero-subtitle",
                "PlateWise plans meals around your culture, your dietary needs and your budget."
            }

            div {
                class: "bento-grid",
                BentoCard {
                    variant: BentoVariant::Cultural,
                    size: BentoSize::Lg,
                    class: "bento-span-2",
                    aria_label: "Create your account".to_string(),
                    onclick: move |_| {
                        nav.push(Route::Register {});
                    },
                    h2 { "Join PlateWise" }
                    p { "Tell us what you cook and who you cook for." }
                }

                BentoCard {
                    variant: BentoVariant::Warm,
                    h3 { "Every tradition welcome" }
                    div {
                        class: "badge-row",
                        CulturalBadge { tag: "halal" }
                        CulturalBadge { tag: "kosher" }
                        CulturalBadge { tag: "vegan" }
                        CulturalBadge { tag: "gluten_free" }
                    }
                }

                BentoCard {
                    variant: BentoVariant::Fresh,
                    size: BentoSize::Sm,
                    aria_label: "Sign in".to_string(),
                    onclick: move |_| {
                        nav.push(Route::Login {});
                    },
                    h3 { "Already cooking with us?" }
                    p { "Sign in" }
                }
            }
        }
    }
}
