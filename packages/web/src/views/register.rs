//! Registration page view with the sign-up form.

use dioxus::prelude::*;
use ui::{use_auth, AuthForm, AuthMode};

use crate::Route;

/// Register page component.
#[component]
pub fn Register() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    use_effect(move || {
        if auth.read().is_authenticated() {
            nav.replace(Route::ProfilePage {});
        }
    });

    rsx! {
        section {
            class: "page auth-page",
            AuthForm {
                mode: AuthMode::SignUp,
                on_success: move |_| {
                    nav.push(Route::ProfilePage {});
                },
                on_mode_change: move |mode| {
                    if mode == AuthMode::SignIn {
                        nav.push(Route::Login {});
                    }
                },
            }
        }
    }
}
