use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::crypto::{hash_password, verify_password, CryptoError, CryptoVault};
use crate::database::{DatabaseError, Filter, Repository};
use crate::models::User;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub company: Option<String>,
}

fn default_role() -> String {
    "user".to_string()
}

/// Decrypted view of a user, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub company: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    vault: CryptoVault,
}

impl UserService {
    pub fn new(users: Repository<User>, vault: CryptoVault) -> Self {
        Self { users, vault }
    }

    pub async fn create(&self, new: NewUser) -> ServiceResult<UserProfile> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Name is required"));
        }
        if new.password.len() < 8 {
            return Err(ServiceError::validation("Password must be at least 8 characters"));
        }
        let email_index = CryptoVault::blind_index(&new.email)
            .filter(|_| new.email.contains('@'))
            .ok_or_else(|| ServiceError::validation("A valid email is required"))?;

        if self.users.count(Filter::all().eq("email_index", email_index.as_str())).await? > 0 {
            return Err(ServiceError::precondition("A user with this email already exists"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: self.vault.seal(name)?,
            email: self.vault.seal(&new.email.trim().to_lowercase())?,
            email_index,
            role: new.role,
            company: new.company,
            password_hash: hash_off_runtime(new.password).await?,
            active: true,
            created_at: Utc::now(),
        };

        match self.users.insert(&user).await {
            Ok(_) => {}
            Err(DatabaseError::Duplicate(_)) => {
                return Err(ServiceError::precondition("A user with this email already exists"))
            }
            Err(e) => return Err(e.into()),
        }

        info!("Created user {} with role {}", user.id, user.role);
        Ok(self.profile(&user))
    }

    /// Look up by blind index and check the password. Every failure is the
    /// same `Unauthorized` so callers cannot probe for accounts.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<UserProfile> {
        let denied = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let user = self.find_by_email_raw(email).await?.ok_or_else(denied)?;
        if !user.active || !verify_off_runtime(password, &user.password_hash).await? {
            return Err(denied());
        }
        Ok(self.profile(&user))
    }

    pub async fn find_by_email_index(&self, email_index: &str) -> ServiceResult<Option<UserProfile>> {
        let user = self
            .users
            .select_one(Filter::all().eq("email_index", email_index))
            .await?;
        Ok(user.filter(|u| u.active).map(|u| self.profile(&u)))
    }

    async fn find_by_email_raw(&self, email: &str) -> ServiceResult<Option<User>> {
        let Some(index) = CryptoVault::blind_index(email) else {
            return Ok(None);
        };
        Ok(self.users.select_one(Filter::all().eq("email_index", index)).await?)
    }

    fn profile(&self, user: &User) -> UserProfile {
        UserProfile {
            id: user.id.clone(),
            name: self.vault.decrypt(&user.name),
            email: self.vault.decrypt(&user.email),
            role: user.role.clone(),
            company: user.company.clone(),
        }
    }
}

// Argon2id at 64 MiB takes far longer than a scheduler tick; it runs on
// the blocking pool so request handling keeps moving.
async fn hash_off_runtime(password: String) -> ServiceResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))??;
    Ok(hash)
}

async fn verify_off_runtime(password: &str, hash: &str) -> ServiceResult<bool> {
    let (password, hash) = (password.to_string(), hash.to_string());
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::is_ciphertext;
    use crate::database::MemoryCollection;
    use std::sync::Arc;

    fn service() -> UserService {
        let repo = Repository::new(Arc::new(MemoryCollection::new("users").with_unique("email_index")));
        UserService::new(repo, CryptoVault::new([9u8; 32]))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana Rojas".into(),
            email: email.into(),
            password: "correcto-123".into(),
            role: "admin".into(),
            company: None,
        }
    }

    #[tokio::test]
    async fn create_encrypts_pii() {
        let svc = service();
        let profile = svc.create(new_user("Ana@Example.com")).await.unwrap();
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(profile.name, "Ana Rojas");

        let stored = svc.users.select_404(Filter::by_id(profile.id.as_str())).await.unwrap();
        assert!(is_ciphertext(&stored.name));
        assert!(is_ciphertext(&stored.email));
        assert!(!stored.email_index.contains("ana"));
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_precondition_failure() {
        let svc = service();
        svc.create(new_user("ana@example.com")).await.unwrap();
        let err = svc.create(new_user(" ANA@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn authenticate() {
        let svc = service();
        svc.create(new_user("ana@example.com")).await.unwrap();

        let ok = svc.authenticate("ANA@example.com", "correcto-123").await.unwrap();
        assert_eq!(ok.role, "admin");
        assert!(matches!(
            svc.authenticate("ana@example.com", "incorrecto").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.authenticate("nadie@example.com", "correcto-123").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn hashing_does_not_stall_the_runtime() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
            })
        };

        let svc = service();
        svc.create(new_user("ana@example.com")).await.unwrap();
        svc.authenticate("ana@example.com", "correcto-123").await.unwrap();
        ticker.abort();

        assert!(ticks.load(Ordering::Relaxed) > 0, "runtime was blocked while hashing");
    }

    #[tokio::test]
    async fn create_validates_input() {
        let svc = service();
        let mut short = new_user("ana@example.com");
        short.password = "corta".into();
        assert!(matches!(svc.create(short).await, Err(ServiceError::Validation(_))));
        assert!(matches!(svc.create(new_user("sin-arroba")).await, Err(ServiceError::Validation(_))));
    }
}
