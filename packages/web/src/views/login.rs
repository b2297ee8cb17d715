//! Login page view with the sign-in form and password reset request.

use dioxus::prelude::*;
use ui::{use_auth, use_coordinator, AuthForm, AuthMode};

use crate::Route;

/// Login page component.
#[component]
pub fn Login() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    // If already logged in, go home
    use_effect(move || {
        if auth.read().is_authenticated() {
            nav.replace(Route::Home {});
        }
    });

    rsx! {
        section {
            class: "page auth-page",
            AuthForm {
                mode: AuthMode::SignIn,
                on_success: move |_| {
                    nav.push(Route::Home {});
                },
                on_mode_change: move |mode| {
                    if mode == AuthMode::SignUp {
                        nav.push(Route::Register {});
                    }
                },
            }
            ForgotPassword {}
        }
    }
}

#[component]
fn ForgotPassword() -> Element {
    let coordinator = use_coordinator();
    let auth = use_auth();
    let mut open = use_signal(|| false);
    let mut email = use_signal(String::new);
    let mut sending = use_signal(|| false);
    let mut notice = use_signal(|| Option::<Result<String, String>>::None);

    let handle_reset = move |evt: FormEvent| {
        evt.prevent_default();
        let coordinator = coordinator.clone();
        spawn(async move {
            let address = email().trim().to_string();
            if address.is_empty() {
                notice.set(Some(Err("Please enter your email address".to_string())));
                return;
            }

            sending.set(true);
            let language = auth.read().language();
            let outcome = coordinator
                .gateway()
                .request_password_reset(&address, language)
                .await;
            notice.set(Some(match outcome {
                Ok(()) => Ok("Check your email for a link to reset your password.".to_string()),
                Err(failure) => Err(failure.message),
            }));
            sending.set(false);
        });
    };

    rsx! {
        div {
            class: "forgot-password",
            if !open() {
                button {
                    r#type: "button",
                    class: "link-button",
                    onclick: move |_| open.set(true),
                    "Forgot your password?"
                }
            } else {
                form {
                    class: "auth-fields",
                    onsubmit: handle_reset,

                    match notice() {
                        Some(Ok(message)) => rsx! {
                            div { class: "alert alert-success", role: "status", "{message}" }
                        },
                        Some(Err(message)) => rsx! {
                            div { class: "alert alert-error", role: "alert", "{message}" }
                        },
                        None => rsx! {},
                    }

                    label { class: "form-label", r#for: "reset-email", "Email" }
                    input {
                        id: "reset-email",
                        class: "form-input",
                        r#type: "email",
                        placeholder: "your@email.com",
                        value: email(),
                        oninput: move |evt: FormEvent| email.set(evt.value()),
                    }
                    button {
                        r#type: "submit",
                        class: "btn-outline w-full",
                        disabled: sending(),
                        if sending() { "Sending..." } else { "Send reset link" }
                    }
                }
            }
        }
    }
}
