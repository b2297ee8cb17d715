use crate::backend::{AuthBackend, OAuthProvider, ProfileBackend, SignUpRequest};
use crate::error::BackendError;
use crate::events::{AuthChangeEvent, Subscription};
use crate::models::{Profile, ProfileSeed, Session, UserIdentity};
use crate::profiles::ProfileStore;

use super::i18n::{AuthErrorKind, AuthFailure, Language};

/// Path the identity provider sends the browser back to after OAuth.
pub const OAUTH_CALLBACK_PATH: &str = "/auth/callback";
/// Path linked from the password reset email.
pub const PASSWORD_RESET_PATH: &str = "/auth/reset-password";

/// Outcome of a successful sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub user: UserIdentity,
    /// The created profile. `None` while confirmation is pending, or when the
    /// account was created but the profile insert failed.
    pub profile: Option<Profile>,
    pub needs_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    pub user: UserIdentity,
    pub session: Session,
}

/// Typed front door to the backend's auth operations.
#[derive(Clone, Debug)]
pub struct AuthGateway<B> {
    backend: B,
    profiles: ProfileStore<B>,
    site_origin: String,
}

impl<B> AuthGateway<B>
where
    B: AuthBackend + ProfileBackend + Clone,
{
    pub fn new(backend: B, site_origin: impl Into<String>) -> Self {
        Self {
            profiles: ProfileStore::new(backend.clone()),
            backend,
            site_origin: site_origin.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn profiles(&self) -> &ProfileStore<B> {
        &self.profiles
    }

    pub fn redirect_url(&self, path: &str) -> String {
        format!("{}{}", self.site_origin, path)
    }

    /// Create an account. When the backend confirms the email immediately the
    /// profile row is created from `seed` as well; a failed insert is logged
    /// and does not fail the registration.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        seed: &ProfileSeed,
    ) -> Result<Registration, AuthFailure> {
        let language = Language::from_code(seed.language_or_default()).unwrap_or_default();
        let request = SignUpRequest::new(email, password)
            .with_metadata("display_name", seed.display_name_or_default())
            .with_metadata("primary_language", seed.language_or_default());

        let response = self
            .backend
            .sign_up(&request)
            .await
            .map_err(|e| AuthFailure::localized(&e, language))?;

        let Some(user) = response.user else {
            return Err(AuthFailure::new(
                AuthErrorKind::Unknown("Unknown error occurred during signup".to_string()),
                language,
            ));
        };

        if !user.is_confirmed() {
            tracing::info!(user = %user.id, "registered, awaiting email confirmation");
            return Ok(Registration {
                user,
                profile: None,
                needs_confirmation: true,
            });
        }

        let profile = match self.profiles.create(&user.id, seed).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(user = %user.id, error = %e, "account created but profile insert failed");
                None
            }
        };
        tracing::info!(user = %user.id, "registered");

        Ok(Registration {
            user,
            profile,
            needs_confirmation: false,
        })
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        language: Language,
    ) -> Result<SignIn, AuthFailure> {
        let session = self
            .backend
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| AuthFailure::localized(&e, language))?;
        tracing::info!(user = %session.user.id, "signed in");

        Ok(SignIn {
            user: session.user.clone(),
            session,
        })
    }

    /// The provider's authorize URL. Navigating there is up to the caller.
    pub fn authenticate_via_provider(&self, provider: OAuthProvider) -> Result<String, AuthFailure> {
        self.backend
            .authorize_url(provider, &self.redirect_url(OAUTH_CALLBACK_PATH))
            .map_err(|e| AuthFailure::plain(&e))
    }

    pub async fn terminate_session(&self) -> Result<(), AuthFailure> {
        self.backend
            .sign_out()
            .await
            .map_err(|e| AuthFailure::plain(&e))?;
        tracing::info!("signed out");
        Ok(())
    }

    pub async fn request_password_reset(
        &self,
        email: &str,
        language: Language,
    ) -> Result<(), AuthFailure> {
        self.backend
            .reset_password_for_email(email, &self.redirect_url(PASSWORD_RESET_PATH))
            .await
            .map_err(|e| AuthFailure::localized(&e, language))
    }

    pub async fn change_password(&self, password: &str) -> Result<UserIdentity, AuthFailure> {
        self.backend
            .update_password(password)
            .await
            .map_err(|e| AuthFailure::plain(&e))
    }

    pub async fn fetch_current_session(&self) -> Result<Option<Session>, AuthFailure> {
        self.backend
            .get_session()
            .await
            .map_err(|e| AuthFailure::plain(&e))
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthFailure> {
        self.backend
            .refresh_session()
            .await
            .map_err(|e| AuthFailure::plain(&e))
    }

    /// Finish the redirect that landed on `href`. Returns the event the
    /// backend announced, `PasswordRecovery` for reset links, or `None` when
    /// the URL carried no tokens.
    pub async fn complete_redirect(
        &self,
        href: &str,
    ) -> Result<Option<AuthChangeEvent>, AuthFailure> {
        let completed = self
            .backend
            .session_from_url(href)
            .await
            .map_err(|e| AuthFailure::plain(&e))?;
        Ok(completed.map(|(event, session)| {
            tracing::info!(user_id = %session.user.id, ?event, "redirect completed");
            event
        }))
    }

    /// Raw session fetch for callers that keep the backend error.
    pub(crate) async fn load_session(&self) -> Result<Option<Session>, BackendError> {
        self.backend.get_session().await
    }

    pub fn subscribe_to_session_changes(&self) -> Subscription {
        self.backend.on_auth_state_change()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;

    fn gateway(backend: &MemoryBackend) -> AuthGateway<MemoryBackend> {
        AuthGateway::new(backend.clone(), "https://platewise.app/")
    }

    fn seed(name: &str, language: &str) -> ProfileSeed {
        ProfileSeed {
            display_name: Some(name.to_string()),
            primary_language: Some(language.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_creates_profile_with_defaults() {
        let backend = MemoryBackend::new().with_auto_confirm(true);
        let gateway = gateway(&backend);

        let registration = gateway
            .register("a@x.com", "secret1", &seed("A", "es"))
            .await
            .unwrap();

        assert!(!registration.needs_confirmation);
        let profile = registration.profile.unwrap();
        assert_eq!(profile.id, registration.user.id);
        assert_eq!(profile.primary_language.as_deref(), Some("es"));
        assert_eq!(profile.family_size, Some(1));
        assert_eq!(profile.primary_cuisine.as_deref(), Some("american"));
        assert_eq!(
            registration.user.user_metadata.get("primary_language"),
            Some(&serde_json::Value::from("es"))
        );
    }

    #[tokio::test]
    async fn test_register_pending_confirmation_skips_profile() {
        let backend = MemoryBackend::new();
        let gateway = gateway(&backend);

        let registration = gateway
            .register("a@x.com", "secret1", &seed("A", "en"))
            .await
            .unwrap();

        assert!(registration.needs_confirmation);
        assert!(registration.profile.is_none());
        assert!(backend.profile(&registration.user.id).is_none());
    }

    #[tokio::test]
    async fn test_register_survives_profile_insert_failure() {
        let backend = MemoryBackend::new().with_auto_confirm(true);
        backend.fail_profile_inserts(true);
        let gateway = gateway(&backend);

        let registration = gateway
            .register("a@x.com", "secret1", &seed("A", "en"))
            .await
            .unwrap();

        assert!(!registration.user.id.is_empty());
        assert!(registration.profile.is_none());
    }

    #[tokio::test]
    async fn test_register_errors_use_seed_language() {
        let backend = MemoryBackend::new();
        backend.seed_account("a@x.com", "secret1", true);
        let gateway = gateway(&backend);

        let failure = gateway
            .register("a@x.com", "secret1", &seed("A", "es"))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, AuthErrorKind::UserAlreadyRegistered);
        assert_eq!(failure.message, "Ya existe una cuenta con este email.");
    }

    #[tokio::test]
    async fn test_authenticate_localizes_rejection() {
        let backend = MemoryBackend::new();
        backend.seed_account("a@x.com", "secret1", false);
        let gateway = gateway(&backend);

        let failure = gateway
            .authenticate("a@x.com", "secret1", Language::Ar)
            .await
            .unwrap_err();
        assert_eq!(failure.kind, AuthErrorKind::EmailNotConfirmed);
        assert_eq!(
            failure.message,
            "يرجى التحقق من بريدك الإلكتروني والنقر على رابط التأكيد."
        );
    }

    #[tokio::test]
    async fn test_sign_in_and_out_notify_subscribers() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        let gateway = gateway(&backend);
        let mut changes = gateway.subscribe_to_session_changes();

        let signed_in = gateway
            .authenticate("a@x.com", "secret1", Language::En)
            .await
            .unwrap();
        assert_eq!(signed_in.user.id, user.id);
        assert!(gateway.fetch_current_session().await.unwrap().is_some());

        gateway.terminate_session().await.unwrap();
        assert!(gateway.fetch_current_session().await.unwrap().is_none());

        assert_eq!(changes.next().await.unwrap().event, AuthChangeEvent::SignedIn);
        assert_eq!(changes.next().await.unwrap().event, AuthChangeEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_redirects_use_site_origin() {
        let backend = MemoryBackend::new();
        let gateway = gateway(&backend);

        let url = gateway
            .authenticate_via_provider(OAuthProvider::Github)
            .unwrap();
        assert!(url.contains("provider=github"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fplatewise.app%2Fauth%2Fcallback"));

        gateway
            .request_password_reset("a@x.com", Language::En)
            .await
            .unwrap();
        assert_eq!(
            backend.reset_requests(),
            vec![(
                "a@x.com".to_string(),
                "https://platewise.app/auth/reset-password".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let backend = MemoryBackend::new();
        backend.seed_account("a@x.com", "secret1", true);
        let gateway = gateway(&backend);

        let failure = gateway.change_password("newpass1").await.unwrap_err();
        assert_eq!(failure.message, "Auth session missing!");

        gateway
            .authenticate("a@x.com", "secret1", Language::En)
            .await
            .unwrap();
        let user = gateway.change_password("newpass1").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert!(gateway.refresh_session().await.is_ok());
    }

    #[tokio::test]
    async fn test_complete_redirect_signs_in() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        let gateway = gateway(&backend);
        let mut changes = gateway.subscribe_to_session_changes();

        let href = backend.redirect_url_for(&user, false);
        let event = gateway.complete_redirect(&href).await.unwrap();
        assert_eq!(event, Some(AuthChangeEvent::SignedIn));
        let session = gateway.fetch_current_session().await.unwrap().unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(changes.next().await.unwrap().event, AuthChangeEvent::SignedIn);

        // A redirect token is good for one use.
        let failure = gateway.complete_redirect(&href).await.unwrap_err();
        assert_eq!(failure.message, "invalid JWT");
    }

    #[tokio::test]
    async fn test_complete_redirect_recovery_link() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        let gateway = gateway(&backend);

        let href = backend.redirect_url_for(&user, true);
        let event = gateway.complete_redirect(&href).await.unwrap();
        assert_eq!(event, Some(AuthChangeEvent::PasswordRecovery));

        let updated = gateway.change_password("newpass1").await.unwrap();
        assert_eq!(updated.id, user.id);
    }

    #[tokio::test]
    async fn test_complete_redirect_without_tokens() {
        let backend = MemoryBackend::new();
        let gateway = gateway(&backend);

        for href in [
            "https://platewise.app/auth/callback",
            "https://platewise.app/auth/callback?type=recovery",
            "https://platewise.app/auth/callback#type=recovery",
        ] {
            assert_eq!(gateway.complete_redirect(href).await.unwrap(), None, "{href}");
        }
        assert!(gateway.fetch_current_session().await.unwrap().is_none());

        let failure = gateway
            .complete_redirect(
                "https://platewise.app/auth/callback#error=access_denied&error_description=User+denied+access",
            )
            .await
            .unwrap_err();
        assert_eq!(failure.message, "User denied access");
    }
}
