use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::dto::{LoginRequest, RegisterRequest};
use crate::auth::error::AuthError;
use crate::auth::password::PasswordHasher;
use crate::auth::store::{NewUser, User, UserStore};
use crate::auth::token::TokenIssuer;
use crate::notify::Notifier;

/// Outcome of a successful register or login.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token: String,
}

/// Register and login flows: validation, uniqueness, verification,
/// token issuance and the welcome notification.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    notifier: Arc<dyn Notifier>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: TokenIssuer,
        hasher: PasswordHasher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher,
            notifier,
        }
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: RegisterRequest) -> Result<Authenticated, AuthError> {
        let new_user = NewUser::new(&payload.name, &payload.email, &payload.password)?;

        if self.store.find_by_email(&new_user.email).await?.is_some() {
            warn!("email already registered");
            return Err(AuthError::EmailAlreadyExists);
        }

        let user = self.store.create(new_user).await?;
        let token = self.tokens.issue(user.id)?;
        self.send_welcome(&user);

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Authenticated { user, token })
    }

    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn login(&self, payload: LoginRequest) -> Result<Authenticated, AuthError> {
        let record = self
            .store
            .find_by_email_with_hash(&payload.email)
            .await?
            .ok_or_else(|| {
                warn!("login unknown email");
                AuthError::UserNotFound
            })?;

        let hasher = self.hasher.clone();
        let stored_hash = record.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&payload.password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))??;
        if !ok {
            warn!(user_id = %record.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(record.id)?;
        info!(user_id = %record.id, email = %record.email, "user logged in");
        Ok(Authenticated {
            user: record.into_user(),
            token,
        })
    }

    /// Best-effort welcome mail, detached from the request. Failures end
    /// up in the logs and nowhere else.
    fn send_welcome(&self, user: &User) {
        let notifier = Arc::clone(&self.notifier);
        let email = user.email.clone();
        let name = user.name.clone();
        tokio::spawn(async move {
            if let Err(error) = notifier.welcome(&email, &name).await {
                warn!(error = %error, email = %email, "welcome email failed");
            }
        });
    }
}
