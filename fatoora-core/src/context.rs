//! Caller context: the `(user, team)` pair every invoice operation is
//! scoped to.
//!
//! Resolution runs once per request, after token verification and before
//! any handler. A previously unseen identity is provisioned here: its user
//! row is created (or an existing row with the same email is linked to the
//! new subject), and a user without a team gets a fresh team it owns.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, instrument, warn};

use crate::auth::Identity;
use crate::error::AppError;
use crate::models::{NewUser, Team, User};
use crate::store::{IdentityStore, StoreError, StoreResult};
use crate::AppState;

/// Resolved caller, attached to request extensions.
#[derive(Clone, Debug)]
pub struct CallerContext {
    pub user: User,
    pub team: Team,
}

/// Name given to a team created for a user without one.
pub fn default_team_name(user: &User) -> String {
    format!("{}'s Team", user.display_label())
}

/// Resolves or provisions the caller behind `identity`.
///
/// A uniqueness conflict means a concurrent request provisioned the same
/// caller first; resolution is retried once and then sees those rows.
///
/// # Errors
///
/// Returns [`AppError::Provisioning`] when the user or team cannot be
/// resolved or created.
#[instrument(skip(store, identity), fields(external_id = %identity.external_id))]
pub async fn resolve_caller(
    store: &dyn IdentityStore,
    identity: &Identity,
) -> Result<CallerContext, AppError> {
    match provision(store, identity).await {
        Err(StoreError::Conflict(msg)) => {
            warn!("Provisioning raced with another request ({}), retrying", msg);
            provision(store, identity).await.map_err(provisioning_failed)
        }
        other => other.map_err(provisioning_failed),
    }
}

fn provisioning_failed(err: StoreError) -> AppError {
    error!("Caller provisioning failed: {}", err);
    AppError::Provisioning(err.to_string())
}

async fn provision(store: &dyn IdentityStore, identity: &Identity) -> StoreResult<CallerContext> {
    let user = resolve_user(store, identity).await?;

    let team = match store.team_for_user(user.id).await? {
        Some(team) => team,
        None => {
            let team = store
                .create_owned_team(user.id, &default_team_name(&user))
                .await?;
            info!(user_id = user.id, team_id = team.id, "Created team for new user");
            team
        }
    };

    Ok(CallerContext { user, team })
}

async fn resolve_user(store: &dyn IdentityStore, identity: &Identity) -> StoreResult<User> {
    if let Some(user) = store.find_user_by_external_id(&identity.external_id).await? {
        return Ok(user);
    }

    if let Some(existing) = store.find_user_by_email(&identity.email).await? {
        info!(user_id = existing.id, "Linking identity to existing user by email");
        return store
            .link_external_id(existing.id, &identity.external_id, identity.name.as_deref())
            .await;
    }

    let user = store
        .create_user(NewUser {
            external_id: identity.external_id.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
        })
        .await?;
    info!(user_id = user.id, "Provisioned user");
    Ok(user)
}

/// Middleware resolving the verified [`Identity`] into a [`CallerContext`].
///
/// Must run after [`crate::auth::jwt_middleware`].
pub async fn caller_context_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Request is not authenticated".to_string()))?;

    let caller = resolve_caller(state.identity.as_ref(), &identity).await?;
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
