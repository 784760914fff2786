//! Lead delivery to people and systems outside the database.
//!
//! Deliveries are best effort. A persisted quote is never rolled back because
//! an email or CRM call failed; failures are logged for manual follow-up.

pub mod crm;
pub mod email;
pub mod outbox;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::quote::Quote;

pub use crm::{CrmChannel, CrmSession, CrmSettings};
pub use email::{EmailAudience, EmailChannel, SmtpSettings};
pub use outbox::{Outbox, RetryPolicy};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("email delivery failed: {0}")]
    Email(String),
    #[error("CRM request failed: {0}")]
    Crm(String),
}

/// One destination a new quote is announced to.
#[async_trait]
pub trait LeadChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, quote: &Quote) -> Result<(), IntegrationError>;
}
