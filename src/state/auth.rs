use super::ClientContext;
use crate::medusa::{ApiError, ApiResult, Customer, NewCustomer};
use crate::storage::{StateStore, StorageKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub status: AuthStatus,
    pub customer: Option<Customer>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone)]
pub enum AuthAction {
    LoggedIn,
    CustomerLoaded(Customer),
    Failed(ApiError),
    LoggedOut,
}

pub fn reduce(state: AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::LoggedIn => AuthState {
            status: AuthStatus::Authenticated,
            error: None,
            ..state
        },
        AuthAction::CustomerLoaded(customer) => AuthState {
            status: AuthStatus::Authenticated,
            customer: Some(customer),
            error: None,
        },
        AuthAction::Failed(error) => AuthState {
            error: Some(error),
            ..state
        },
        AuthAction::LoggedOut => AuthState::default(),
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

/// Token obtained from a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    /// Whether the token was written to durable storage. If not, the caller
    /// keeps it for the browser session only.
    pub remembered: bool,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Login, registration and logout for one profile.
pub struct AuthSession<'a, S: StateStore> {
    ctx: ClientContext<'a, S>,
    state: AuthState,
}

impl<'a, S: StateStore> AuthSession<'a, S> {
    pub fn new(ctx: ClientContext<'a, S>) -> Self {
        Self {
            ctx,
            state: AuthState::default(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    fn dispatch(&mut self, action: AuthAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    pub async fn stored_token(&self) -> Option<String> {
        self.ctx.read(&StorageKey::AuthToken).await
    }

    pub async fn remembered_email(&self) -> Option<String> {
        self.ctx.read(&StorageKey::RememberedEmail).await
    }

    pub async fn remember_flag(&self) -> bool {
        self.ctx.read(&StorageKey::AuthRemember).await.as_deref() == Some("true")
    }

    /// Exchange credentials for a token. With `remember` the token and e-mail are kept
    /// durably; without it any previously remembered values are dropped.
    pub async fn login(&mut self, email: &str, password: &str, remember: bool) -> ApiResult<LoginOutcome> {
        let token = match self.ctx.medusa.login(email, password).await {
            Ok(token) => token,
            Err(e) => {
                self.dispatch(AuthAction::Failed(e.clone()));
                return Err(e);
            }
        };

        if remember {
            self.ctx.write(&StorageKey::AuthToken, &token).await;
            self.ctx.write(&StorageKey::AuthRemember, "true").await;
            self.ctx.write(&StorageKey::RememberedEmail, email).await;
        } else {
            self.ctx.clear(&StorageKey::AuthToken).await;
            self.ctx.write(&StorageKey::AuthRemember, "false").await;
            self.ctx.clear(&StorageKey::RememberedEmail).await;
        }
        self.dispatch(AuthAction::LoggedIn);

        // The token is valid either way; a failed profile fetch only leaves the mirror thinner.
        if let Err(e) = self.load_customer(&token).await {
            log::warn!("Logged in but could not load customer: {e}");
        }

        Ok(LoginOutcome {
            token,
            remembered: remember,
        })
    }

    /// Create the auth identity and the customer, then log in (session-scoped).
    pub async fn register(&mut self, registration: &Registration) -> ApiResult<LoginOutcome> {
        let result = self.try_register(registration).await;
        if let Err(e) = &result {
            self.dispatch(AuthAction::Failed(e.clone()));
        }
        result
    }

    async fn try_register(&mut self, registration: &Registration) -> ApiResult<LoginOutcome> {
        let registration_token = self
            .ctx
            .medusa
            .register_identity(&registration.email, &registration.password)
            .await?;

        let new_customer = NewCustomer {
            email: registration.email.clone(),
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            phone: registration.phone.clone(),
        };
        let customer = self
            .ctx
            .medusa
            .create_customer(&registration_token, &new_customer)
            .await?;
        log::info!("Registered customer {}", customer.id);

        self.login(&registration.email, &registration.password, false)
            .await
    }

    /// Fetch the customer behind `token`. A 401 means the token expired: it is forgotten.
    pub async fn load_customer(&mut self, token: &str) -> ApiResult<Customer> {
        match self.ctx.medusa.retrieve_customer(token).await {
            Ok(customer) => {
                self.dispatch(AuthAction::CustomerLoaded(customer.clone()));
                Ok(customer)
            }
            Err(e) if e.is_unauthorized() => {
                self.logout().await;
                Err(e)
            }
            Err(e) => {
                self.dispatch(AuthAction::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Forget the token. The remembered e-mail stays if the shopper asked for it.
    pub async fn logout(&mut self) {
        self.ctx.clear(&StorageKey::AuthToken).await;
        if !self.remember_flag().await {
            self.ctx.clear(&StorageKey::RememberedEmail).await;
        }
        self.dispatch(AuthAction::LoggedOut);
    }
}
