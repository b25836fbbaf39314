use chrono::Utc;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::{AppError, Result};
use crate::models::{Account, FederatedAccount, LocalAccount};

/// Account storage. Local and federated accounts live under separate key
/// prefixes but share one subject-id space; [`UserRepository::resolve`] is
/// the single place that bridges the two.
///
/// Key layout:
///   user:{id}            -> LocalAccount JSON
///   user:email:{email}   -> local account id (uniqueness index)
///   user:name:{username} -> local account id (uniqueness index)
///   guser:{id}           -> FederatedAccount JSON
///   guser:google:{sub}   -> federated account id
#[derive(Clone)]
pub struct UserRepository {
    pool: Pool,
}

impl UserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // ==================== Local accounts ====================

    /// Persist a new local account. Duplicate email or username is detected
    /// at the storage layer via SETNX on the index keys and reported as a
    /// conflict, not a validation failure.
    pub async fn create_local(&self, account: &LocalAccount) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let email_key = format!("user:email:{}", account.email);
        let name_key = format!("user:name:{}", account.username);

        let claimed: bool = conn.set_nx(&email_key, &account.id).await?;
        if !claimed {
            return Err(AppError::Conflict("email already in use".to_string()));
        }

        let claimed: bool = conn.set_nx(&name_key, &account.id).await?;
        if !claimed {
            // Roll back the email index so the address stays usable.
            conn.del::<_, ()>(&email_key).await?;
            return Err(AppError::Conflict("username already taken".to_string()));
        }

        let json = serde_json::to_string(account)?;
        conn.set::<_, _, ()>(format!("user:{}", account.id), json)
            .await?;

        tracing::info!(user_id = %account.id, "Local account created");
        Ok(())
    }

    pub async fn get_local(&self, id: &str) -> Result<Option<LocalAccount>> {
        let mut conn = self.pool.get().await?;

        let json: Option<String> = conn.get(format!("user:{}", id)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn find_local_by_email(&self, email: &str) -> Result<Option<LocalAccount>> {
        let mut conn = self.pool.get().await?;

        let id: Option<String> = conn.get(format!("user:email:{}", email)).await?;
        match id {
            Some(id) => self.get_local(&id).await,
            None => Ok(None),
        }
    }

    /// Partial update of last_seen after a successful login. Rewrites the
    /// stored document without re-running registration validation.
    pub async fn touch_last_seen(&self, id: &str) -> Result<()> {
        let Some(mut account) = self.get_local(id).await? else {
            return Ok(());
        };
        account.last_seen = Utc::now();

        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(&account)?;
        conn.set::<_, _, ()>(format!("user:{}", id), json).await?;
        Ok(())
    }

    // ==================== Federated accounts ====================

    pub async fn get_federated(&self, id: &str) -> Result<Option<FederatedAccount>> {
        let mut conn = self.pool.get().await?;

        let json: Option<String> = conn.get(format!("guser:{}", id)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Look up a federated account by provider subject id, creating it on
    /// first sign-in. Idempotent: two concurrent first sign-ins race on
    /// SETNX and the loser adopts the winner's record.
    pub async fn find_or_create_google(
        &self,
        google_id: &str,
        username: &str,
        avatar: Option<String>,
    ) -> Result<FederatedAccount> {
        let index_key = format!("guser:google:{}", google_id);

        {
            let mut conn = self.pool.get().await?;
            let existing: Option<String> = conn.get(&index_key).await?;
            if let Some(id) = existing {
                if let Some(account) = self.get_federated(&id).await? {
                    return Ok(account);
                }
            }
        }

        let account =
            FederatedAccount::new(username.to_string(), google_id.to_string(), avatar);

        let mut conn = self.pool.get().await?;
        let claimed: bool = conn.set_nx(&index_key, &account.id).await?;
        if !claimed {
            // Lost the race; read back whoever won.
            let id: Option<String> = conn.get(&index_key).await?;
            if let Some(id) = id {
                if let Some(account) = self.get_federated(&id).await? {
                    return Ok(account);
                }
            }
            return Err(AppError::Redis(
                "federated account index points nowhere".to_string(),
            ));
        }

        let json = serde_json::to_string(&account)?;
        conn.set::<_, _, ()>(format!("guser:{}", account.id), json)
            .await?;

        tracing::info!(user_id = %account.id, "Federated account created");
        Ok(account)
    }

    // ==================== Identity resolution ====================

    /// Resolve a token subject id to an account: local store first, then
    /// federated. A well-signed token whose subject matches neither store is
    /// treated as unauthenticated.
    pub async fn resolve(&self, id: &str) -> Result<Account> {
        if let Some(local) = self.get_local(id).await? {
            return Ok(Account::Local(local));
        }
        if let Some(federated) = self.get_federated(id).await? {
            return Ok(Account::Federated(federated));
        }
        Err(AppError::Auth("account not found".to_string()))
    }

    // ==================== Health Check ====================

    /// Check Redis connection health
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.get().await?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        Ok(pong == "PONG")
    }
}
