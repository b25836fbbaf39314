use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Password-based account stored in Redis.
///
/// `password_hash` is part of the stored document only; responses always go
/// through [`PublicUser`], which has no password field at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LocalAccount {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            avatar: None,
            last_seen: now,
            created_at: now,
        }
    }
}

/// Account created through the Google sign-in flow. No password; identified
/// by the provider subject id, which is unique per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedAccount {
    pub id: String,
    pub username: String,
    pub google_id: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FederatedAccount {
    pub fn new(username: String, google_id: String, avatar: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            google_id,
            avatar,
            created_at: Utc::now(),
        }
    }
}

/// The two account kinds share one token subject-id space. A validated token
/// resolves to exactly one of these, or to nothing at all.
#[derive(Debug, Clone)]
pub enum Account {
    Local(LocalAccount),
    Federated(FederatedAccount),
}

impl Account {
    pub fn id(&self) -> &str {
        match self {
            Account::Local(a) => &a.id,
            Account::Federated(a) => &a.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Account::Local(a) => &a.username,
            Account::Federated(a) => &a.username,
        }
    }

    pub fn public_view(&self) -> PublicUser {
        match self {
            Account::Local(a) => PublicUser {
                id: a.id.clone(),
                username: a.username.clone(),
                email: Some(a.email.clone()),
                avatar: a.avatar.clone(),
            },
            Account::Federated(a) => PublicUser {
                id: a.id.clone(),
                username: a.username.clone(),
                email: None,
                avatar: a.avatar.clone(),
            },
        }
    }
}

/// Normalized user view returned to clients. Optional fields are omitted from
/// the JSON entirely when absent rather than serialized as null.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
