pub mod credentials;
pub use credentials::{ApiKeyValidator, AuthError, BearerTokenValidator, CredentialValidator};

pub mod mailer;
pub use mailer::{DisabledMailer, Mailer};

pub mod password_reset;
pub use password_reset::{PasswordResetService, ResetError};

pub mod token;
pub use token::{Claims, TokenError, TokenService};
