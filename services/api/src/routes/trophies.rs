//! Trophy claims submitted by signed-in users

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::trophy::{CreateTrophyRequest, parse_competition, parse_season},
};

/// Whose award this is and whether it skips the approval queue.
///
/// Users claim for themselves and wait for approval; admins grant to
/// someone else and the award counts immediately.
pub fn claim_target(caller: &AuthUser, requested: Option<Uuid>) -> ApiResult<(Uuid, bool)> {
    if caller.is_admin() {
        let owner = requested
            .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
        if owner == caller.id {
            return Err(ApiError::Forbidden("Admins cannot award themselves".to_string()));
        }
        return Ok((owner, true));
    }

    match requested {
        Some(owner) if owner != caller.id => Err(ApiError::Forbidden(
            "You can only submit trophies for yourself".to_string(),
        )),
        _ => Ok((caller.id, false)),
    }
}

/// Submit a claim (user) or grant an award (admin)
pub async fn create_trophy(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateTrophyRequest>,
) -> ApiResult<impl IntoResponse> {
    let competition = parse_competition(&payload.competition)?;
    let season = parse_season(payload.season.as_deref())?;
    let (owner_id, approved) = claim_target(&caller, payload.user_id)?;

    state
        .user_repository
        .find_by_id(owner_id)
        .await?
        .filter(|owner| owner.approved)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let award = state
        .trophy_repository
        .create(owner_id, competition, season.as_deref(), approved, caller.id)
        .await?;
    state.leaderboard.invalidate().await;

    info!(award = %award.id, by = %caller.id, approved, "Trophy submitted");
    Ok((StatusCode::CREATED, Json(award)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Role;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
            approved: true,
            name: "Rama".to_string(),
            email: "rama@example.com".to_string(),
        }
    }

    #[test]
    fn users_claim_for_themselves_pending() {
        let user = caller(Role::User);
        assert_eq!(claim_target(&user, None).unwrap(), (user.id, false));
        assert_eq!(claim_target(&user, Some(user.id)).unwrap(), (user.id, false));
        assert!(matches!(
            claim_target(&user, Some(Uuid::new_v4())),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn admins_grant_to_others_approved() {
        let admin = caller(Role::Admin);
        let owner = Uuid::new_v4();
        assert_eq!(claim_target(&admin, Some(owner)).unwrap(), (owner, true));
        assert!(matches!(claim_target(&admin, None), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            claim_target(&admin, Some(admin.id)),
            Err(ApiError::Forbidden(_))
        ));
    }
}
