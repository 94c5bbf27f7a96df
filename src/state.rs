use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::store::RecordStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn RecordStore>,
    pub config: Config,
    /// Signed-out token ids, with their expiry as a unix timestamp.
    revoked: RwLock<HashMap<Uuid, usize>>,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> AppState {
        Arc::new(Self {
            store,
            config,
            revoked: RwLock::new(HashMap::new()),
        })
    }

    pub async fn revoke(&self, jti: Uuid, exp: usize, now: usize) {
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti, exp);
    }

    pub async fn is_revoked(&self, jti: Uuid) -> bool {
        self.revoked.read().await.contains_key(&jti)
    }
}
