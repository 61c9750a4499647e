use tracing::{debug, info, warn};

use crate::auth::dto::{
    LoginResponse, PasswordRequest, ProfileResponse, RegisterRequest, RegisterResponse,
};
use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::{ApiError, ApiResult};

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub fn validate_registration(req: RegisterRequest) -> ApiResult<NewUser> {
    let (Some(username), Some(email), Some(full_name)) = (
        required(req.username),
        required(req.email),
        required(req.full_name),
    ) else {
        return Err(ApiError::InvalidInput("Missing required fields".into()));
    };

    Ok(NewUser {
        username,
        email,
        full_name,
    })
}

/// The password is taken verbatim; only absence or emptiness is rejected.
pub fn require_password(req: PasswordRequest) -> ApiResult<String> {
    match req.password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ApiError::InvalidInput("Password is required".into())),
    }
}

pub async fn register(
    store: &dyn CredentialStore,
    req: RegisterRequest,
) -> ApiResult<RegisterResponse> {
    let new_user = validate_registration(req).map_err(|e| {
        warn!(error = %e, "invalid registration");
        e
    })?;

    let (user_id, password) = store.create_user(&new_user).await?;

    info!(%user_id, username = %new_user.username, "user registered");
    Ok(RegisterResponse {
        message: "User registered successfully".into(),
        password,
        warning: "Save this password! It will not be shown again.".into(),
    })
}

async fn authenticate(store: &dyn CredentialStore, password: &str) -> ApiResult<User> {
    match store.find_by_password(password).await? {
        Some(user) => Ok(user),
        None => {
            warn!("no user matches supplied password");
            Err(ApiError::AuthenticationFailure)
        }
    }
}

pub async fn login(store: &dyn CredentialStore, req: PasswordRequest) -> ApiResult<LoginResponse> {
    let password = require_password(req)?;
    let user = authenticate(store, &password).await?;

    store.touch_last_login(user.id).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(LoginResponse {
        message: "Login successful".into(),
        user: user.into(),
    })
}

/// Same lookup as `login`, without touching `last_login`.
pub async fn profile(
    store: &dyn CredentialStore,
    req: PasswordRequest,
) -> ApiResult<ProfileResponse> {
    let password = require_password(req)?;
    let user = authenticate(store, &password).await?;

    debug!(user_id = %user.id, "profile fetched");
    Ok(ProfileResponse { user: user.into() })
}
