use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::BackendError;

/// Interface languages offered by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Es,
    Ar,
    Zh,
    Hi,
    Fr,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Es,
        Language::Ar,
        Language::Zh,
        Language::Hi,
        Language::Fr,
    ];

    /// Parse a language code such as `es` or `es-MX`. Only the primary subtag
    /// is looked at.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            "ar" => Some(Self::Ar),
            "zh" => Some(Self::Zh),
            "hi" => Some(Self::Hi),
            "fr" => Some(Self::Fr),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Ar => "ar",
            Self::Zh => "zh",
            Self::Hi => "hi",
            Self::Fr => "fr",
        }
    }

    /// The language's name in that language.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
            Self::Ar => "العربية",
            Self::Zh => "中文",
            Self::Hi => "हिन्दी",
            Self::Fr => "Français",
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("Unsupported language: {s}"))
    }
}

/// Auth failures the backend reports with a fixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    EmailNotConfirmed,
    UserAlreadyRegistered,
    WeakPassword,
    /// Anything else, holding the backend's text unchanged.
    Unknown(String),
}

impl AuthErrorKind {
    pub fn from_message(message: &str) -> Self {
        match message {
            "Invalid login credentials" => Self::InvalidCredentials,
            "Email not confirmed" => Self::EmailNotConfirmed,
            "User already registered" => Self::UserAlreadyRegistered,
            "Password should be at least 6 characters" => Self::WeakPassword,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The message as the backend sent it.
    pub fn backend_message(&self) -> &str {
        match self {
            Self::InvalidCredentials => "Invalid login credentials",
            Self::EmailNotConfirmed => "Email not confirmed",
            Self::UserAlreadyRegistered => "User already registered",
            Self::WeakPassword => "Password should be at least 6 characters",
            Self::Unknown(message) => message.as_str(),
        }
    }

    /// The message to show a user reading `language`. Languages without a
    /// translation table get the English text; unknown messages are returned
    /// verbatim in every language.
    pub fn localize(&self, language: Language) -> String {
        let table = messages(language).unwrap_or(&EN);
        match self {
            Self::InvalidCredentials => table.invalid_credentials,
            Self::EmailNotConfirmed => table.email_not_confirmed,
            Self::UserAlreadyRegistered => table.user_already_registered,
            Self::WeakPassword => table.weak_password,
            Self::Unknown(message) => message.as_str(),
        }
        .to_string()
    }
}

struct Messages {
    invalid_credentials: &'static str,
    email_not_confirmed: &'static str,
    user_already_registered: &'static str,
    weak_password: &'static str,
}

const EN: Messages = Messages {
    invalid_credentials: "Invalid email or password. Please try again.",
    email_not_confirmed: "Please check your email and click the confirmation link.",
    user_already_registered: "An account with this email already exists.",
    weak_password: "Password must be at least 6 characters long.",
};

const ES: Messages = Messages {
    invalid_credentials: "Email o contraseña inválidos. Por favor, inténtalo de nuevo.",
    email_not_confirmed: "Por favor, revisa tu email y haz clic en el enlace de confirmación.",
    user_already_registered: "Ya existe una cuenta con este email.",
    weak_password: "La contraseña debe tener al menos 6 caracteres.",
};

const AR: Messages = Messages {
    invalid_credentials: "بيانات اعتماد تسجيل الدخول غير صحيحة. يرجى المحاولة مرة أخرى.",
    email_not_confirmed: "يرجى التحقق من بريدك الإلكتروني والنقر على رابط التأكيد.",
    user_already_registered: "يوجد حساب بهذا البريد الإلكتروني بالفعل.",
    weak_password: "يجب أن تكون كلمة المرور 6 أحرف على الأقل.",
};

fn messages(language: Language) -> Option<&'static Messages> {
    match language {
        Language::En => Some(&EN),
        Language::Es => Some(&ES),
        Language::Ar => Some(&AR),
        Language::Zh | Language::Hi | Language::Fr => None,
    }
}

/// A failed gateway call, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: AuthErrorKind,
    /// `kind` rendered in the caller's language.
    pub message: String,
}

impl AuthFailure {
    pub fn new(kind: AuthErrorKind, language: Language) -> Self {
        let message = kind.localize(language);
        Self { kind, message }
    }

    /// Convert a backend error, translating known rejections. Faults where no
    /// answer came back are logged here and surface as [`AuthErrorKind::Unknown`].
    pub fn localized(error: &BackendError, language: Language) -> Self {
        let kind = match error {
            BackendError::Api { message, .. } => AuthErrorKind::from_message(message),
            BackendError::SessionMissing => AuthErrorKind::Unknown(error.to_string()),
            BackendError::Network(_) | BackendError::Decode(_) => {
                tracing::error!(error = %error, "auth backend call failed");
                AuthErrorKind::Unknown(error.to_string())
            }
        };
        Self::new(kind, language)
    }

    /// Convert a backend error without translation.
    pub fn plain(error: &BackendError) -> Self {
        if !error.is_rejection() {
            tracing::error!(error = %error, "auth backend call failed");
        }
        Self::new(AuthErrorKind::Unknown(error.to_string()), Language::En)
    }
}
