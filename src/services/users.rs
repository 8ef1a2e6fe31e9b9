//! Caller profile service

use crate::{
    error::AppResult,
    models::{User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Mirror the caller from their token and return the stored record
    pub async fn me(&self, caller: &UserClaims) -> AppResult<User> {
        self.repository.upsert_user(&User::from(caller)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{LibraryStore, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_me_refreshes_mirror() {
        let store = Arc::new(MemoryStore::new());
        let service = UsersService::new(store.clone());
        let mut claims = UserClaims {
            sub: "user@user.com".to_string(),
            user_id: 4,
            email: "user@user.com".to_string(),
            is_staff: false,
            exp: 0,
            iat: 0,
        };

        let user = service.me(&claims).await.unwrap();
        assert_eq!(user, User { id: 4, email: "user@user.com".to_string(), is_staff: false });

        claims.is_staff = true;
        service.me(&claims).await.unwrap();
        assert!(store.get_user(4).await.unwrap().is_staff);
    }
}
