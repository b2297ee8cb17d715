use api::{BackendConfig, ConfigError};
use dioxus::prelude::*;

use ui::icons::FaUser;
use ui::{use_auth, AuthProvider, Icon, SignOutButton};
use views::{AuthCallback, Home, Login, ProfilePage, Register, ResetPassword};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(Shell)]
        #[route("/")]
        Home {},
        #[route("/login")]
        Login {},
        #[route("/register")]
        Register {},
        #[route("/profile")]
        ProfilePage {},
        #[route("/auth/callback")]
        AuthCallback {},
        #[route("/auth/reset-password")]
        ResetPassword {},
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    dioxus::launch(App);
}

fn load_config() -> Result<BackendConfig, ConfigError> {
    #[cfg(target_arch = "wasm32")]
    {
        BackendConfig::from_build_env()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        BackendConfig::from_env()
    }
}

#[component]
fn App() -> Element {
    let config = use_hook(|| {
        load_config().inspect_err(|e| tracing::error!(error = %e, "backend is not configured"))
    });

    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }

        match config {
            Ok(config) => rsx! {
                AuthProvider {
                    config,
                    Router::<Route> {}
                }
            },
            Err(e) => rsx! {
                ConfigMissing { message: e.to_string() }
            },
        }
    }
}

#[component]
fn ConfigMissing(message: String) -> Element {
    rsx! {
        div {
            class: "config-missing",
            h1 { "PlateWise is not configured" }
            p { "{message}" }
            p {
                "Set PLATEWISE_SUPABASE_URL and PLATEWISE_SUPABASE_ANON_KEY, then restart."
            }
        }
    }
}

/// Page chrome. Text direction and language follow the signed-in user.
#[component]
fn Shell() -> Element {
    let auth = use_auth();
    let state = auth();
    let language = state.language();
    let dir = if language.is_rtl() { "rtl" } else { "ltr" };
    let nav = use_navigator();

    rsx! {
        div {
            class: "app-shell",
            dir,
            lang: language.code(),

            header {
                class: "app-header",
                Link { class: "brand", to: Route::Home {}, "PlateWise" }
                nav {
                    class: "app-nav",
                    if state.is_authenticated() {
                        Link {
                            to: Route::ProfilePage {},
                            Icon { icon: FaUser, width: 14, height: 14 }
                            " Profile"
                        }
                        SignOutButton {
                            on_signed_out: move |_| {
                                nav.push(Route::Home {});
                            },
                        }
                    } else {
                        Link { to: Route::Login {}, "Sign In" }
                        Link { class: "btn-primary", to: Route::Register {}, "Get Started" }
                    }
                }
            }

            main {
                class: "app-main",
                if state.is_loading() {
                    div { class: "loading", role: "status", "Loading..." }
                } else {
                    Outlet::<Route> {}
                }
            }
        }
    }
}
