mod home;
pub use home::Home;

mod login;
pub use login::Login;

mod register;
pub use register::Register;

mod profile;
pub use profile::ProfilePage;

mod auth_callback;
pub use auth_callback::AuthCallback;

mod reset_password;
pub use reset_password::ResetPassword;
