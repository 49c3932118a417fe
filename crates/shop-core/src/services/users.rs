//! User profile service.

use crate::error::{ShopError, ShopResult};
use crate::repository::SharedUserRepository;
use crate::user::{User, UserProfile};
use crate::UserId;
use tracing::{info, instrument};

pub struct UserService {
    users: SharedUserRepository,
}

impl UserService {
    pub fn new(users: SharedUserRepository) -> Self {
        Self { users }
    }

    pub async fn profile(&self, user_id: UserId) -> ShopResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(ShopError::UserNotFound { user_id })
    }

    /// Create or update the caller's profile. Returns `true` if it was created.
    #[instrument(skip(self, profile))]
    pub async fn save_profile(
        &self,
        user_id: UserId,
        profile: UserProfile,
    ) -> ShopResult<(User, bool)> {
        let profile = profile.normalized();
        profile.validate()?;
        let (user, created) = self.users.save_profile(user_id, profile).await?;
        if created {
            info!(user_id, "User profile created");
        }
        Ok((user, created))
    }

    /// Remove the profile. Carts, orders and payments are kept.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId) -> ShopResult<User> {
        let user = self.users.delete_user(user_id).await?;
        info!(user_id, "User profile deleted");
        Ok(user)
    }
}
