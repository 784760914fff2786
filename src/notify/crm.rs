use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{IntegrationError, LeadChannel};
use crate::models::quote::Quote;

/// Refresh tokens this long before the provider says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmSettings {
    pub token_url: String,
    pub leads_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// OAuth access token for the CRM, owned by the client that uses it.
pub struct CrmSession {
    settings: CrmSettings,
    token: Mutex<Option<CachedToken>>,
}

impl CrmSession {
    pub fn new(settings: CrmSettings) -> Self {
        Self { settings, token: Mutex::new(None) }
    }

    /// Returns a valid access token, refreshing it when needed.
    pub async fn acquire(&self, http: &reqwest::Client) -> Result<String, IntegrationError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Refreshing CRM access token");
        let response = http
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.settings.refresh_token.as_str()),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| IntegrationError::Crm(format!("token refresh: {e}")))?;
        if !response.status().is_success() {
            return Err(IntegrationError::Crm(format!("token refresh: HTTP {}", response.status())));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| IntegrationError::Crm(format!("token refresh: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        let token = CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Forgets the cached token so the next `acquire` refreshes it.
    pub async fn release(&self) {
        *self.token.lock().await = None;
    }
}

pub struct CrmChannel {
    http: reqwest::Client,
    session: CrmSession,
    leads_url: String,
}

impl CrmChannel {
    pub fn new(http: reqwest::Client, settings: CrmSettings) -> Self {
        let leads_url = settings.leads_url.clone();
        Self { http, session: CrmSession::new(settings), leads_url }
    }

    async fn post_lead(&self, token: &str, payload: &Value) -> Result<StatusCode, IntegrationError> {
        let response = self
            .http
            .post(&self.leads_url)
            .bearer_auth(token)
            .json(payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| IntegrationError::Crm(e.to_string()))?;
        Ok(response.status())
    }
}

#[async_trait]
impl LeadChannel for CrmChannel {
    fn name(&self) -> &'static str {
        "crm"
    }

    async fn deliver(&self, quote: &Quote) -> Result<(), IntegrationError> {
        let payload = lead_payload(quote);
        let token = self.session.acquire(&self.http).await?;
        let mut status = self.post_lead(&token, &payload).await?;

        if status == StatusCode::UNAUTHORIZED {
            self.session.release().await;
            let token = self.session.acquire(&self.http).await?;
            status = self.post_lead(&token, &payload).await?;
        }

        if status.is_success() {
            Ok(())
        } else {
            Err(IntegrationError::Crm(format!("lead creation returned HTTP {status}")))
        }
    }
}

pub fn lead_payload(quote: &Quote) -> Value {
    let c = &quote.contact;
    let systems: Vec<&str> = quote.systems.iter().map(|s| s.as_str()).collect();
    json!({
        "data": [{
            "firstName": c.first_name,
            "lastName": c.last_name,
            "email": c.email,
            "phone": c.phone,
            "street": c.address,
            "city": c.suburb,
            "zipCode": c.postcode,
            "state": c.state,
            "description": c.notes,
            "leadSource": "Website quote",
            "quoteId": quote.id,
            "systems": systems,
            "powerSupply": quote.power_supply.as_str(),
            "totalPrice": quote.total_price.to_string(),
            "rebateAmount": quote.rebate_amount.to_string(),
            "finalPrice": quote.final_price.to_string(),
        }]
    })
}
