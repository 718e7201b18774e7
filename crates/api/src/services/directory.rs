//! User directory: identity claims to users, roles and profiles.

use tracing::instrument;

use stocksavvy_core::{Email, Role, UserId};

use super::ServiceError;
use crate::db::{RepositoryError, ResourceStore};
use crate::identity::IdentityClaim;
use crate::models::{NewUser, ProfileUpdate, User};

/// User lookups and updates on behalf of an authenticated actor.
pub struct UserDirectory<'a> {
    store: &'a dyn ResourceStore,
    bootstrap_admin: Option<&'a Email>,
}

impl<'a> UserDirectory<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn ResourceStore, bootstrap_admin: Option<&'a Email>) -> Self {
        Self {
            store,
            bootstrap_admin,
        }
    }

    /// Return the user for a verified claim, creating it on first sight.
    ///
    /// A placeholder user left by an invite for the same email is claimed
    /// instead of inserting a second row, so the invite's grants carry over.
    /// Calling this twice with the same subject yields the same user.
    ///
    /// Claiming an invite and bootstrap admin promotion both key off the
    /// email address, so they only happen for provider-verified emails. An
    /// unverified login always becomes a fresh worker.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self, claim), fields(subject_id = %claim.subject_id))]
    pub async fn ensure_user(&self, claim: &IdentityClaim) -> Result<User, ServiceError> {
        if let Some(user) = self.store.find_user_by_identity(&claim.subject_id).await? {
            return Ok(user);
        }

        if claim.email_verified
            && let Some(placeholder) = self.store.find_user_by_email(&claim.email).await?
            && placeholder.is_placeholder()
        {
            return self.claim_placeholder(placeholder, claim).await;
        }

        let role = if claim.email_verified && self.is_bootstrap_admin(&claim.email).await? {
            tracing::info!(email = %claim.email, "promoting bootstrap admin");
            Role::Admin
        } else {
            Role::Worker
        };

        let new_user = NewUser {
            external_identity_id: claim.subject_id.clone(),
            email: claim.email.clone(),
            display_name: Some(
                claim
                    .display_name
                    .clone()
                    .unwrap_or_else(|| claim.email.local_part().to_owned()),
            ),
            role,
            avatar_url: claim.avatar_url.clone(),
        };

        match self.store.create_user(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "created user");
                Ok(user)
            }
            // Another request for the same subject won the insert.
            Err(RepositoryError::Conflict(_)) => self.refetch(claim).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_placeholder(
        &self,
        placeholder: User,
        claim: &IdentityClaim,
    ) -> Result<User, ServiceError> {
        let claimed = match self
            .store
            .attach_identity(
                placeholder.id,
                &placeholder.external_identity_id,
                &claim.subject_id,
            )
            .await
        {
            Ok(user) => user,
            Err(RepositoryError::NotFound | RepositoryError::Conflict(_)) => {
                return self.refetch(claim).await;
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user_id = %claimed.id, "claimed invited user");

        let fill = ProfileUpdate {
            display_name: claimed
                .display_name
                .is_none()
                .then(|| {
                    claim
                        .display_name
                        .clone()
                        .unwrap_or_else(|| claim.email.local_part().to_owned())
                }),
            avatar_url: claimed
                .avatar_url
                .is_none()
                .then(|| claim.avatar_url.clone())
                .flatten(),
        }
        .normalized();
        if fill.is_empty() {
            return Ok(claimed);
        }
        Ok(self.store.update_profile(claimed.id, &fill).await?)
    }

    async fn refetch(&self, claim: &IdentityClaim) -> Result<User, ServiceError> {
        self.store
            .find_user_by_identity(&claim.subject_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    async fn is_bootstrap_admin(&self, email: &Email) -> Result<bool, RepositoryError> {
        if self.bootstrap_admin != Some(email) {
            return Ok(false);
        }
        Ok(self.store.count_users_with_role(Role::Admin).await? == 0)
    }

    /// Change a user's global role. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admin actors, `NotFound` for an unknown target.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn set_role(
        &self,
        actor: &User,
        target: UserId,
        role: Role,
    ) -> Result<User, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Forbidden("admin access required"));
        }
        if actor.id == target && role != Role::Admin {
            tracing::warn!(user_id = %actor.id, %role, "admin is demoting themselves");
        }
        let user = self.store.set_role(target, role).await.map_err(|e| match e {
            RepositoryError::NotFound => ServiceError::NotFound("user"),
            other => other.into(),
        })?;
        tracing::info!(user_id = %user.id, %role, "role updated");
        Ok(user)
    }

    /// Update the caller's own profile. Blank fields keep their value.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn update_profile(
        &self,
        user: &User,
        update: ProfileUpdate,
    ) -> Result<User, ServiceError> {
        let update = update.normalized();
        if update.is_empty() {
            return Ok(user.clone());
        }
        Ok(self.store.update_profile(user.id, &update).await?)
    }

    /// Every user. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admin actors.
    pub async fn list_users(&self, actor: &User) -> Result<Vec<User>, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Forbidden("admin access required"));
        }
        Ok(self.store.list_users().await?)
    }

    /// A single user. Admins may read anyone, others only themselves.
    ///
    /// # Errors
    ///
    /// `Forbidden` when reading someone else, `NotFound` for an unknown id.
    pub async fn get_user(&self, actor: &User, id: UserId) -> Result<User, ServiceError> {
        if actor.role != Role::Admin && actor.id != id {
            return Err(ServiceError::Forbidden("cannot view other users"));
        }
        self.store
            .get_user(id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}
