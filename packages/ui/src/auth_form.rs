//! Sign-in / sign-up form.

use std::collections::BTreeSet;

use api::{Language, OAuthProvider, ProfileSeed, UserIdentity};
use dioxus::prelude::*;
use thiserror::Error;

use crate::components::{BentoCard, BentoSize, BentoVariant};
use crate::options::{language_options, CUISINE_OPTIONS, DIETARY_OPTIONS};
use crate::{use_auth, use_coordinator, OAuthButton};

/// Shortest password accepted for a new account or a password change.
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_FAMILY_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::SignIn => "Welcome Back",
            Self::SignUp => "Join PlateWise",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            Self::SignIn => "Sign in to your PlateWise account",
            Self::SignUp => "Create your culturally-inclusive food budget account",
        }
    }

    fn submit_label(self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::SignUp => "Create Account",
        }
    }

    fn switch_prompt(self) -> &'static str {
        match self {
            Self::SignIn => "Don't have an account? Sign up",
            Self::SignUp => "Already have an account? Sign in",
        }
    }
}

/// Input problems caught before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter your email address")]
    MissingEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
    #[error("Family size must be a whole number between 1 and 20")]
    InvalidFamilySize,
    #[error("Monthly budget must be a positive amount")]
    InvalidBudget,
}

/// A password being set must be typed twice and be long enough.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), FormError> {
    if password != confirm {
        return Err(FormError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::PasswordTooShort);
    }
    Ok(())
}

pub fn parse_family_size(text: &str) -> Result<u32, FormError> {
    text.trim()
        .parse::<u32>()
        .ok()
        .filter(|size| (1..=MAX_FAMILY_SIZE).contains(size))
        .ok_or(FormError::InvalidFamilySize)
}

/// Empty text means no budget.
pub fn parse_budget(text: &str) -> Result<Option<f64>, FormError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(budget) if budget.is_finite() && budget >= 0.0 => Ok(Some(budget)),
        _ => Err(FormError::InvalidBudget),
    }
}

/// Everything typed into the form. Numeric fields are kept as text until
/// [`validate`](Self::validate) and [`to_seed`](Self::to_seed).
#[derive(Debug, Clone, PartialEq)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: String,
    pub language: Language,
    pub cuisine: String,
    pub family_size: String,
    pub monthly_budget: String,
    pub dietary: BTreeSet<String>,
}

impl AuthFormState {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            display_name: String::new(),
            language: Language::En,
            cuisine: "american".to_string(),
            family_size: "1".to_string(),
            monthly_budget: String::new(),
            dietary: BTreeSet::new(),
        }
    }

    /// Flip between sign-in and sign-up, keeping the credentials typed so far.
    pub fn switch_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.confirm_password.clear();
    }

    pub fn toggle_dietary(&mut self, tag: &str) {
        if !self.dietary.remove(tag) {
            self.dietary.insert(tag.to_string());
        }
    }

    pub fn parsed_family_size(&self) -> Result<u32, FormError> {
        parse_family_size(&self.family_size)
    }

    pub fn parsed_budget(&self) -> Result<Option<f64>, FormError> {
        parse_budget(&self.monthly_budget)
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.email.trim().is_empty() {
            return Err(FormError::MissingEmail);
        }
        if self.mode == AuthMode::SignIn {
            return Ok(());
        }
        check_new_password(&self.password, &self.confirm_password)?;
        self.parsed_family_size()?;
        self.parsed_budget()?;
        Ok(())
    }

    pub fn to_seed(&self) -> ProfileSeed {
        let display_name = self.display_name.trim();
        ProfileSeed {
            display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
            primary_language: Some(self.language.code().to_string()),
            primary_cuisine: Some(self.cuisine.clone()),
            family_size: self.parsed_family_size().ok(),
            monthly_budget: self.parsed_budget().ok().flatten(),
            dietary_restrictions: self.dietary.clone(),
        }
    }
}

const CONFIRM_EMAIL_MESSAGE: &str =
    "Please check your email and click the confirmation link to complete your registration.";

#[component]
pub fn AuthForm(
    #[props(default)] mode: AuthMode,
    #[props(default)] on_success: EventHandler<UserIdentity>,
    #[props(default)] on_mode_change: EventHandler<AuthMode>,
) -> Element {
    let coordinator = use_coordinator();
    let auth = use_auth();
    let mut form = use_signal(move || AuthFormState::new(mode));
    let mut loading = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let mut success = use_signal(|| Option::<String>::None);

    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let coordinator = coordinator.clone();
        spawn(async move {
            error.set(None);
            success.set(None);
            let state = form();
            if let Err(e) = state.validate() {
                error.set(Some(e.to_string()));
                return;
            }

            loading.set(true);
            let gateway = coordinator.gateway();
            match state.mode {
                AuthMode::SignUp => {
                    match gateway
                        .register(&state.email, &state.password, &state.to_seed())
                        .await
                    {
                        Ok(registration) if registration.needs_confirmation => {
                            success.set(Some(CONFIRM_EMAIL_MESSAGE.to_string()));
                        }
                        Ok(registration) => {
                            success.set(Some("Account created successfully!".to_string()));
                            // The sign-in notification may have fetched before the row existed.
                            if let Err(e) = coordinator.refresh_profile().await {
                                tracing::debug!(error = %e, "profile refresh after sign-up skipped");
                            }
                            on_success.call(registration.user);
                        }
                        Err(failure) => error.set(Some(failure.message)),
                    }
                }
                AuthMode::SignIn => {
                    let language = auth.read().language();
                    match gateway
                        .authenticate(&state.email, &state.password, language)
                        .await
                    {
                        Ok(signed_in) => {
                            success.set(Some("Signed in successfully!".to_string()));
                            on_success.call(signed_in.user);
                        }
                        Err(failure) => error.set(Some(failure.message)),
                    }
                }
            }
            loading.set(false);
        });
    };

    let current = form();
    let mode = current.mode;

    rsx! {
        BentoCard {
            variant: BentoVariant::Cultural,
            size: BentoSize::Lg,
            class: "max-w-md mx-auto",

            div {
                class: "text-center mb-6",
                h2 { class: "auth-title", {mode.title()} }
                p { class: "auth-subtitle", {mode.subtitle()} }
            }

            if let Some(message) = error() {
                div { class: "alert alert-error", role: "alert", "{message}" }
            }
            if let Some(message) = success() {
                div { class: "alert alert-success", role: "status", "{message}" }
            }

            form {
                class: "auth-fields",
                onsubmit,

                if mode == AuthMode::SignUp {
                    div {
                        label { class: "form-label", r#for: "display-name", "Display Name" }
                        input {
                            id: "display-name",
                            class: "form-input",
                            r#type: "text",
                            required: true,
                            placeholder: "How should we address you?",
                            value: current.display_name.clone(),
                            oninput: move |evt: FormEvent| form.write().display_name = evt.value(),
                        }
                    }

                    div {
                        label { class: "form-label", r#for: "primary-language", "Preferred Language" }
                        select {
                            id: "primary-language",
                            class: "form-input",
                            value: current.language.code(),
                            onchange: move |evt: FormEvent| {
                                if let Some(language) = Language::from_code(&evt.value()) {
                                    form.write().language = language;
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
                    }

                    div {
                        label { class: "form-label", r#for: "primary-cuisine", "Primary Cuisine Preference" }
                        select {
                            id: "primary-cuisine",
                            class: "form-input",
                            value: current.cuisine.clone(),
                            onchange: move |evt: FormEvent| form.write().cuisine = evt.value(),
                            for choice in CUISINE_OPTIONS {
                                option {
                                    key: "{choice.value}",
                                    value: choice.value,
                                    selected: choice.value == current.cuisine,
                                    {choice.label}
                                }
                            }
                        }
                    }

                    div {
                        label { class: "form-label", r#for: "family-size", "Family Size" }
                        input {
                            id: "family-size",
                            class: "form-input",
                            r#type: "number",
                            min: "1",
                            max: "20",
                            required: true,
                            value: current.family_size.clone(),
                            oninput: move |evt: FormEvent| form.write().family_size = evt.value(),
                        }
                    }

                    div {
                        label { class: "form-label", r#for: "monthly-budget", "Monthly Food Budget (Optional)" }
                        input {
                            id: "monthly-budget",
                            class: "form-input",
                            r#type: "number",
                            min: "0",
                            step: "0.01",
                            placeholder: "e.g., 400.00",
                            value: current.monthly_budget.clone(),
                            oninput: move |evt: FormEvent| form.write().monthly_budget = evt.value(),
                        }
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
                                        onchange: move |_| form.write().toggle_dietary(choice.value),
                                    }
                                    span { {choice.label} }
                                }
                            }
                        }
                    }
                }

                div {
                    label { class: "form-label", r#for: "email", "Email" }
                    input {
                        id: "email",
                        class: "form-input",
                        r#type: "email",
                        required: true,
                        placeholder: "your@email.com",
                        value: current.email.clone(),
                        oninput: move |evt: FormEvent| form.write().email = evt.value(),
                    }
                }

                div {
                    label { class: "form-label", r#for: "password", "Password" }
                    input {
                        id: "password",
                        class: "form-input",
                        r#type: "password",
                        required: true,
                        minlength: (mode == AuthMode::SignUp).then(|| MIN_PASSWORD_LEN.to_string()),
                        placeholder: if mode == AuthMode::SignUp { "At least 6 characters" } else { "Your password" },
                        value: current.password.clone(),
                        oninput: move |evt: FormEvent| form.write().password = evt.value(),
                    }
                }

                if mode == AuthMode::SignUp {
                    div {
                        label { class: "form-label", r#for: "confirm-password", "Confirm Password" }
                        input {
                            id: "confirm-password",
                            class: "form-input",
                            r#type: "password",
                            required: true,
                            minlength: MIN_PASSWORD_LEN.to_string(),
                            placeholder: "Confirm your password",
                            value: current.confirm_password.clone(),
                            oninput: move |evt: FormEvent| form.write().confirm_password = evt.value(),
                        }
                    }
                }

                button {
                    r#type: "submit",
                    class: "btn-primary w-full",
                    disabled: loading(),
                    if loading() { "Processing..." } else { {mode.submit_label()} }
                }
            }

            div {
                class: "mt-6",
                div { class: "divider", span { "Or continue with" } }
                div {
                    class: "oauth-grid",
                    OAuthButton {
                        provider: OAuthProvider::Google,
                        disabled: loading(),
                        on_error: move |message| error.set(Some(message)),
                    }
                    OAuthButton {
                        provider: OAuthProvider::Facebook,
                        disabled: loading(),
                        on_error: move |message| error.set(Some(message)),
                    }
                }
            }

            div {
                class: "mt-6 text-center",
                button {
                    r#type: "button",
                    class: "link-button",
                    onclick: move |_| {
                        form.write().switch_mode();
                        error.set(None);
                        success.set(None);
                        on_mode_change.call(mode.toggled());
                    },
                    {mode.switch_prompt()}
                }
            }
        }
    }
}
