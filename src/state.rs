use std::sync::Arc;

use crate::auth::{AuthService, GoogleAuth};
use crate::config::Config;
use crate::redis::{RoomRepository, UserRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserRepository>,
    pub rooms: Arc<RoomRepository>,
    /// None when Google credentials are not configured; the federated login
    /// routes then answer "feature disabled".
    pub google: Option<Arc<GoogleAuth>>,
}

impl AppState {
    pub fn new(
        config: Config,
        auth: AuthService,
        users: UserRepository,
        rooms: RoomRepository,
        google: Option<GoogleAuth>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            users: Arc::new(users),
            rooms: Arc::new(rooms),
            google: google.map(Arc::new),
        }
    }
}
