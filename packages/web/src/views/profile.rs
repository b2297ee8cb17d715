//! Profile page: view and edit the signed-in user's preferences.

use std::collections::BTreeSet;

use api::{Language, Profile, ProfileChanges};
use dioxus::prelude::*;
use ui::options::{language_options, CUISINE_OPTIONS, DIETARY_OPTIONS};
use ui::{
    parse_budget, parse_family_size, use_auth, use_coordinator, BentoCard, BentoSize, BentoVariant,
    FormError, ProfileSummary, SignOutButton, MAX_FAMILY_SIZE,
};

use crate::Route;

/// Editable copy of a profile. Numbers stay as text until saved.
#[derive(Debug, Clone, PartialEq)]
struct ProfileDraft {
    display_name: String,
    language: Language,
    cuisine: String,
    family_size: String,
    monthly_budget: String,
    dietary: BTreeSet<String>,
}

impl ProfileDraft {
    fn from_profile(profile: Option<&Profile>) -> Self {
        let Some(profile) = profile else {
            return Self {
                display_name: String::new(),
                language: Language::En,
                cuisine: "american".to_string(),
                family_size: "1".to_string(),
                monthly_budget: String::new(),
                dietary: BTreeSet::new(),
            };
        };
        Self {
            display_name: profile.display_name.clone().unwrap_or_default(),
            language: Language::from_code(profile.preferred_language()).unwrap_or_default(),
            cuisine: profile
                .primary_cuisine
                .clone()
                .unwrap_or_else(|| "american".to_string()),
            family_size: profile.family_size.unwrap_or(1).to_string(),
            monthly_budget: profile
                .monthly_budget
                .map(|budget| format!("{budget:.2}"))
                .unwrap_or_default(),
            dietary: profile.dietary_restrictions.clone(),
        }
    }

    fn toggle_dietary(&mut self, tag: &str) {
        if !self.dietary.remove(tag) {
            self.dietary.insert(tag.to_string());
        }
    }

    /// Every field as a change. An empty budget clears the stored one.
    fn to_changes(&self) -> Result<ProfileChanges, String> {
        let family_size = parse_family_size(&self.family_size).map_err(|e| e.to_string())?;
        let monthly_budget = parse_budget(&self.monthly_budget).map_err(|e| e.to_string())?;

        let display_name = self.display_name.trim();
        if display_name.is_empty() {
            return Err("Display name is required".to_string());
        }

        Ok(ProfileChanges {
            display_name: Some(display_name.to_string()),
            primary_language: Some(self.language.code().to_string()),
            primary_cuisine: Some(self.cuisine.clone()),
            dietary_restrictions: Some(self.dietary.clone()),
            family_size: Some(family_size),
            monthly_budget: Some(monthly_budget),
            ..Default::default()
        })
    }
}

#[component]
pub fn ProfilePage() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    use_effect(move || {
        if !auth.read().is_authenticated() {
            nav.replace(Route::Login {});
        }
    });

    let state = auth();
    if !state.is_authenticated() {
        return rsx! {};
    }
    // Keyed on the loaded profile so the editor resets once the fetch lands.
    let profile_key = state
        .current_profile()
        .map(|p| p.id.clone())
        .unwrap_or_default();

    rsx! {
        section {
            class: "page",
            h1 { class: "page-title", "Your Profile" }
            div {
                class: "bento-grid",
                ProfileSummary {}
                ProfileEditor { key: "{profile_key}", profile: state.current_profile().cloned() }
            }
            div {
                class: "mt-6",
                SignOutButton {
                    on_signed_out: move |_| {
                        nav.push(Route::Home {});
                    },
                }
            }
        }
    }
}

#[component]
fn ProfileEditor(profile: Option<Profile>) -> Element {
    let coordinator = use_coordinator();
    let mut draft = use_signal(|| ProfileDraft::from_profile(profile.as_ref()));
    let mut saving = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let mut saved = use_signal(|| false);

    let handle_save = move |evt: FormEvent| {
        evt.prevent_default();
        let coordinator = coordinator.clone();
        spawn(async move {
            error.set(None);
            saved.set(false);
            let changes = match draft.read().to_changes() {
                Ok(changes) => changes,
                Err(message) => {
                    error.set(Some(message));
                    return;
                }
            };

            saving.set(true);
            match coordinator.update_profile(&changes).await {
                Ok(_) => saved.set(true),
                Err(e) => {
                    tracing::warn!(error = %e, "profile update failed");
                    error.set(Some(e.to_string()));
                }
            }
            saving.set(false);
        });
    };

    let current = draft();

    rsx! {
        BentoCard {
            variant: BentoVariant::Default,
            size: BentoSize::Lg,
            class: "bento-span-2",

            h2 { "Edit preferences" }

            if let Some(message) = error() {
                div { class: "alert alert-error", role: "alert", "{message}" }
            }
            if saved() {
                div { class: "alert alert-success", role: "status", "Profile saved." }
            }

            form {
                class: "auth-fields",
                onsubmit: handle_save,

                label { class: "form-label", r#for: "profile-name", "Display Name" }
                input {
                    id: "profile-name",
                    class: "form-input",
                    r#type: "text",
                    value: current.display_name.clone(),
                    oninput: move |evt: FormEvent| draft.write().display_name = evt.value(),
                }

                label { class: "form-label", r#for: "profile-language", "Preferred Language" }
                select {
                    id: "profile-language",
                    class: "form-input",
                    value: current.language.code(),
                    onchange: move |evt: FormEvent| {
                        if let Some(language) = Language::from_code(&evt.value()) {
                            draft.write().language = language;
                        }
                    },
                    for choice in language_options() {
                        option {
                            key: "{choice.value}",
                            value: choice.value,
                            selected: choice.value == current.language.code(),
                            {choice.label}
                        }
                    }
                }

                label { class: "form-label", r#for: "profile-cuisine", "Primary Cuisine" }
                select {
                    id: "profile-cuisine",
                    class: "form-input",
                    value: current.cuisine.clone(),
                    onchange: move |evt: FormEvent| draft.write().cuisine = evt.value(),
                    for choice in CUISINE_OPTIONS {
                        option {
                            key: "{choice.value}",
                            value: choice.value,
                            selected: choice.value == current.cuisine,
                            {choice.label}
                        }
                    }
                }

                label { class: "form-label", r#for: "profile-family", "Family Size" }
                input {
                    id: "profile-family",
                    class: "form-input",
                    r#type: "number",
                    min: "1",
                    max: MAX_FAMILY_SIZE.to_string(),
                    value: current.family_size.clone(),
                    oninput: move |evt: FormEvent| draft.write().family_size = evt.value(),
                }

                label { class: "form-label", r#for: "profile-budget", "Monthly Food Budget" }
                input {
                    id: "profile-budget",
                    class: "form-input",
                    r#type: "number",
                    min: "0",
                    step: "0.01",
                    value: current.monthly_budget.clone(),
                    oninput: move |evt: FormEvent| draft.write().monthly_budget = evt.value(),
                }

                fieldset {
                    class: "dietary-options",
                    legend { class: "form-label", "Dietary Restrictions" }
                    div {
                        class: "dietary-grid",
                        for choice in DIETARY_OPTIONS {
                            label {
                                key: "{choice.value}",
                                class: "dietary-option",
                                input {
                                    r#type: "checkbox",
                                    value: choice.value,
                                    checked: current.dietary.contains(choice.value),
                                    onchange: move |_| draft.write().toggle_dietary(choice.value),
                                }
                                span { {choice.label} }
                            }
                        }
                    }
                }

                button {
                    r#type: "submit",
                    class: "btn-primary w-full",
                    disabled: saving(),
                    if saving() { "Saving..." } else { "Save Profile" }
                }
            }
        }
    }
}
