//! Authentication context and hooks for the UI.

use std::rc::Rc;

use api::session::AUTO_REFRESH_TICK;
use api::{AuthGateway, BackendConfig, OAuthProvider, SessionCoordinator, SessionState, SupabaseClient};
use dioxus::prelude::*;

use crate::Icon;
use crate::brand_icons::{FaFacebook, FaGithub, FaGoogle};

/// The coordinator the app runs on: the Supabase client in every build.
pub type AppCoordinator = SessionCoordinator<SupabaseClient>;

/// Current session state. Re-renders whenever the coordinator publishes.
pub fn use_auth() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

pub fn use_coordinator() -> Rc<AppCoordinator> {
    use_context::<Rc<AppCoordinator>>()
}

async fn sleep(duration: std::time::Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// Send the browser to `url`.
pub(crate) fn navigate_external(url: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            if window.location().set_href(url).is_err() {
                tracing::error!(url, "failed to redirect");
            }
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    tracing::info!(url, "open this URL to continue signing in");
}

/// Provider component that owns the session coordinator.
///
/// Wrap the app with it. It restores the persisted session, applies session
/// changes for as long as it is mounted, and refreshes the access token before
/// it expires.
#[component]
pub fn AuthProvider(config: BackendConfig, children: Element) -> Element {
    let coordinator = use_hook(|| {
        let client = SupabaseClient::new(config.clone());
        Rc::new(SessionCoordinator::new(AuthGateway::new(
            client,
            config.site_origin.clone(),
        )))
    });
    let mut state = use_signal(|| coordinator.snapshot());

    use_context_provider(|| coordinator.clone());
    use_context_provider(|| state);

    use_hook({
        let coordinator = coordinator.clone();
        move || {
            let startup = coordinator.clone();
            spawn(async move { startup.initialize().await });

            let listener = coordinator.clone();
            spawn(async move { listener.listen().await });

            let mut published = coordinator.watch();
            spawn(async move {
                while published.changed().await.is_ok() {
                    let next = published.borrow_and_update().clone();
                    state.set(next);
                }
            });

            let refresher = coordinator.clone();
            spawn(async move {
                loop {
                    sleep(AUTO_REFRESH_TICK).await;
                    if let Err(e) = refresher.tick_auto_refresh(chrono::Utc::now()).await {
                        tracing::warn!(error = %e, "automatic session refresh failed");
                    }
                }
            });
        }
    });

    use_drop({
        let coordinator = coordinator.clone();
        move || coordinator.shutdown()
    });

    rsx! {
        {children}
    }
}

fn provider_icon(provider: OAuthProvider) -> Element {
    match provider {
        OAuthProvider::Google => rsx! { Icon { icon: FaGoogle, width: 16, height: 16 } },
        OAuthProvider::Facebook => rsx! { Icon { icon: FaFacebook, width: 16, height: 16 } },
        OAuthProvider::Github => rsx! { Icon { icon: FaGithub, width: 16, height: 16 } },
    }
}

/// Button that starts an OAuth sign-in with `provider`.
#[component]
pub fn OAuthButton(
    provider: OAuthProvider,
    #[props(default)] disabled: bool,
    #[props(default = "btn-outline w-full".to_string())] class: String,
    #[props(default)] on_error: EventHandler<String>,
) -> Element {
    let coordinator = use_coordinator();
    let mut redirecting = use_signal(|| false);

    let onclick = move |_| match coordinator.gateway().authenticate_via_provider(provider) {
        Ok(url) => {
            redirecting.set(true);
            navigate_external(&url);
        }
        Err(failure) => {
            tracing::error!(provider = %provider, error = %failure, "could not start OAuth sign-in");
            on_error.call(failure.message);
        }
    };

    rsx! {
        button {
            r#type: "button",
            class: "{class}",
            disabled: disabled || redirecting(),
            onclick,
            {provider_icon(provider)}
            span { {provider.label()} }
        }
    }
}

/// Button to sign the current user out.
#[component]
pub fn SignOutButton(
    #[props(default = "Sign Out".to_string())] label: String,
    #[props(default = "btn-outline".to_string())] class: String,
    #[props(default)] on_signed_out: EventHandler<()>,
) -> Element {
    let coordinator = use_coordinator();
    let mut busy = use_signal(|| false);

    let onclick = move |_| {
        let coordinator = coordinator.clone();
        spawn(async move {
            busy.set(true);
            match coordinator.gateway().terminate_session().await {
                Ok(()) => on_signed_out.call(()),
                Err(failure) => tracing::error!(error = %failure, "sign-out failed"),
            }
            busy.set(false);
        });
    };

    rsx! {
        button {
            r#type: "button",
            class: "{class}",
            disabled: busy(),
            onclick,
            "{label}"
        }
    }
}
