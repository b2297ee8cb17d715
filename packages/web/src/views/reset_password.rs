//! Choose a new password after following a reset link.

use dioxus::prelude::*;
use ui::{check_new_password, use_auth, use_coordinator, BentoCard, BentoSize, BentoVariant, MIN_PASSWORD_LEN};

use crate::Route;

#[component]
pub fn ResetPassword() -> Element {
    let coordinator = use_coordinator();
    let auth = use_auth();
    let nav = use_navigator();
    let mut password = use_signal(String::new);
    let mut confirm = use_signal(String::new);
    let mut saving = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let mut done = use_signal(|| false);

    // The reset link lands here with the recovery tokens in the fragment.
    use_hook({
        let coordinator = coordinator.clone();
        move || {
            #[cfg(target_arch = "wasm32")]
            spawn(async move {
                let Some(href) = web_sys::window().and_then(|w| w.location().href().ok()) else {
                    return;
                };
                if let Err(failure) = coordinator.gateway().complete_redirect(&href).await {
                    tracing::error!(error = %failure.message, "password reset link rejected");
                    error.set(Some(failure.message));
                }
            });
            #[cfg(not(target_arch = "wasm32"))]
            let _ = coordinator;
        }
    });

    let handle_submit = move |evt: FormEvent| {
        evt.prevent_default();
        let coordinator = coordinator.clone();
        spawn(async move {
            error.set(None);
            if let Err(message) = check_new_password(&password(), &confirm()) {
                error.set(Some(message.to_string()));
                return;
            }

            saving.set(true);
            match coordinator.gateway().change_password(&password()).await {
                Ok(_) => {
                    done.set(true);
                    password.set(String::new());
                    confirm.set(String::new());
                }
                Err(failure) => error.set(Some(failure.message)),
            }
            saving.set(false);
        });
    };

    let signed_in = auth.read().is_authenticated();

    rsx! {
        section {
            class: "page auth-page",
            BentoCard {
                variant: BentoVariant::Cultural,
                size: BentoSize::Lg,
                class: "max-w-md mx-auto",

                h2 { class: "auth-title", "Set a new password" }

                if let Some(message) = error() {
                    div { class: "alert alert-error", role: "alert", "{message}" }
                }

                if done() {
                    div { class: "alert alert-success", role: "status", "Your password has been updated." }
                    button {
                        r#type: "button",
                        class: "btn-primary w-full",
                        onclick: move |_| {
                            nav.push(Route::Home {});
                        },
                        "Continue"
                    }
                } else if !signed_in {
                    p { "Open the link from your reset email to continue." }
                } else {
                    form {
                        class: "auth-fields",
                        onsubmit: handle_submit,

                        label { class: "form-label", r#for: "new-password", "New Password" }
                        input {
                            id: "new-password",
                            class: "form-input",
                            r#type: "password",
                            minlength: MIN_PASSWORD_LEN.to_string(),
                            value: password(),
                            oninput: move |evt: FormEvent| password.set(evt.value()),
                        }

                        label { class: "form-label", r#for: "confirm-new-password", "Confirm Password" }
                        input {
                            id: "confirm-new-password",
                            class: "form-input",
                            r#type: "password",
                            minlength: MIN_PASSWORD_LEN.to_string(),
                            value: confirm(),
                            oninput: move |evt: FormEvent| confirm.set(evt.value()),
                        }

                        button {
                            r#type: "submit",
                            class: "btn-primary w-full",
                            disabled: saving(),
                            if saving() { "Updating..." } else { "Update Password" }
                        }
                    }
                }
            }
        }
    }
}
