//! 工作階段儲存

use std::collections::HashMap;
use std::sync::Arc;

use agro_core::{ApprovedScenario, SessionId};
use parking_lot::Mutex;
use tracing::debug;

/// 核准情境的記憶體儲存，由模擬與計劃畫面共用
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Arc<ApprovedScenario>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 存入核准情境，回傳其 ID
    pub fn insert(&self, approved: ApprovedScenario) -> SessionId {
        let id = approved.id;
        debug!(%id, scenario = %approved.scenario, rows = approved.baseline.len(), "存入核准情境");
        self.sessions.lock().insert(id, Arc::new(approved));
        id
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<ApprovedScenario>> {
        self.sessions.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<ApprovedScenario>> {
        self.sessions.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
