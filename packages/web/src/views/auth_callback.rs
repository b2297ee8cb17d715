//! Landing route for OAuth and email-link redirects.

use api::AuthChangeEvent;
use dioxus::prelude::*;
use ui::use_coordinator;

use crate::Route;

fn current_href() -> Option<String> {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window().and_then(|window| window.location().href().ok())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        None
    }
}

#[component]
pub fn AuthCallback() -> Element {
    let coordinator = use_coordinator();
    let nav = use_navigator();
    let mut failure = use_signal(|| Option::<String>::None);

    use_hook(move || {
        spawn(async move {
            let Some(href) = current_href() else {
                nav.replace(Route::Home {});
                return;
            };

            let next = match coordinator.gateway().complete_redirect(&href).await {
                Ok(Some(AuthChangeEvent::PasswordRecovery)) => Route::ResetPassword {},
                Ok(Some(_)) => Route::Home {},
                Ok(None) => Route::Login {},
                Err(rejected) => {
                    failure.set(Some(rejected.message));
                    return;
                }
            };
            nav.replace(next);
        });
    });

    rsx! {
        section {
            class: "page auth-page",
            if let Some(message) = failure() {
                div { class: "alert alert-error", role: "alert", "{message}" }
                Link { to: Route::Login {}, "Back to sign in" }
            } else {
                div { class: "loading", role: "status", "Completing sign-in..." }
            }
        }
    }
}
