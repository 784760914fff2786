use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{PricingFailure, PricingTicket, QuoteWizard};
use crate::error::AppError;
use crate::models::selection::QuoteSelection;
use crate::pricing::price_selection;
use crate::store::CatalogStore;

struct Session {
    wizard: QuoteWizard,
    touched: Instant,
}

/// Wizards held on behalf of browser sessions.
///
/// The lock is only taken inside the synchronous closures passed to
/// [`WizardSessions::with`], never across an `.await`.
pub struct WizardSessions {
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl WizardSessions {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), ttl }
    }

    pub fn create(&self) -> (Uuid, QuoteWizard) {
        self.prune_expired();
        let id = Uuid::new_v4();
        let wizard = QuoteWizard::new();
        self.sessions
            .write()
            .insert(id, Session { wizard: wizard.clone(), touched: Instant::now() });
        debug!(%id, "Wizard session created");
        (id, wizard)
    }

    /// Runs `f` against the wizard for `id`. Returns `None` for unknown or
    /// expired sessions.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut QuoteWizard) -> R) -> Option<R> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id)?;
        if session.touched.elapsed() > self.ttl {
            sessions.remove(&id);
            return None;
        }
        session.touched = Instant::now();
        Some(f(&mut session.wizard))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_expired(&self) {
        let ttl = self.ttl;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.touched.elapsed() <= ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, "Expired wizard sessions removed");
        }
    }

    /// Prices `selection` in the background and reports the outcome to the
    /// session's wizard under `ticket`.
    pub fn spawn_pricing(
        self: &Arc<Self>,
        catalog: Arc<dyn CatalogStore>,
        id: Uuid,
        ticket: PricingTicket,
        selection: QuoteSelection,
    ) -> JoinHandle<()> {
        let sessions = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = price_selection(catalog.as_ref(), &selection)
                .await
                .map_err(|e| match e {
                    AppError::Validation { message, fields } => PricingFailure { message, fields },
                    other => {
                        error!(%id, error = %other, "Background pricing failed");
                        PricingFailure::unavailable()
                    }
                });
            let applied = sessions.with(id, |wizard| wizard.apply_pricing(ticket, outcome));
            match applied {
                Some(true) => debug!(%id, ticket = ticket.value(), "Pricing applied"),
                Some(false) => debug!(%id, ticket = ticket.value(), "Stale pricing result ignored"),
                None => debug!(%id, "Pricing finished for a session that no longer exists"),
            }
        })
    }
}
