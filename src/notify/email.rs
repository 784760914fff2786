use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use super::{IntegrationError, LeadChannel};
use crate::models::quote::Quote;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub team_inbox: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailAudience {
    /// Confirmation sent to the person who asked for the quote.
    Customer,
    /// Lead notification for the sales team.
    Team,
}

/// Sends one kind of quote email. Customer and team emails are separate
/// channels so a retry never re-sends a message that already went out.
pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    team: Mailbox,
    audience: EmailAudience,
}

fn mailbox(address: &str) -> Result<Mailbox, IntegrationError> {
    address
        .parse()
        .map_err(|e| IntegrationError::Email(format!("invalid address '{address}': {e}")))
}

impl EmailChannel {
    /// Builds the customer and team channels over one SMTP transport.
    pub fn pair(settings: &SmtpSettings) -> Result<(Self, Self), IntegrationError> {
        let mailer = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| IntegrationError::Email(format!("SMTP relay error: {e}")))?
                .port(settings.port)
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
                .build(),
        };
        let from = mailbox(&settings.from)?;
        let team = mailbox(&settings.team_inbox)?;

        let customer = Self {
            mailer: mailer.clone(),
            from: from.clone(),
            team: team.clone(),
            audience: EmailAudience::Customer,
        };
        let internal = Self { mailer, from, team, audience: EmailAudience::Team };
        Ok((customer, internal))
    }

    fn message(&self, quote: &Quote) -> Result<Message, IntegrationError> {
        let (to, subject, body) = match self.audience {
            EmailAudience::Customer => (
                mailbox(&quote.contact.email)?,
                "We've received your quote request".to_string(),
                customer_body(quote),
            ),
            EmailAudience::Team => (
                self.team.clone(),
                format!("New quote #{} from {}", quote.id, quote.contact.full_name()),
                team_body(quote),
            ),
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| IntegrationError::Email(format!("could not build message: {e}")))
    }
}

#[async_trait]
impl LeadChannel for EmailChannel {
    fn name(&self) -> &'static str {
        match self.audience {
            EmailAudience::Customer => "customer-email",
            EmailAudience::Team => "team-email",
        }
    }

    async fn deliver(&self, quote: &Quote) -> Result<(), IntegrationError> {
        let message = self.message(quote)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| IntegrationError::Email(e.to_string()))?;
        Ok(())
    }
}

fn systems_line(quote: &Quote) -> String {
    quote.systems.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

pub fn customer_body(quote: &Quote) -> String {
    format!(
        "Hi {first},\n\n\
         Thanks for requesting a quote (reference #{id}) for: {systems}.\n\n\
         Estimated price: ${total}\n\
         Rebates: -${rebate}\n\
         Estimated total: ${final_price}\n\n\
         One of our energy consultants will be in touch shortly to confirm the details.\n",
        first = quote.contact.first_name,
        id = quote.id,
        systems = systems_line(quote),
        total = quote.total_price,
        rebate = quote.rebate_amount,
        final_price = quote.final_price,
    )
}

pub fn team_body(quote: &Quote) -> String {
    let c = &quote.contact;
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let product = |v: Option<i64>| v.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    format!(
        "Quote #{id}\n\n\
         Name: {name}\nEmail: {email}\nPhone: {phone}\n\
         Address: {address}, {suburb} {postcode} {state}\n\
         Notes: {notes}\n\n\
         Systems: {systems}\nPower supply: {supply}\n\
         Solar package: {solar}\nBattery: {battery}\nEV charger: {ev}\n\n\
         Total: ${total}\nRebate: ${rebate}\nFinal: ${final_price}\n\
         Photo: {photo}\n",
        id = quote.id,
        name = c.full_name(),
        email = c.email,
        phone = optional(&c.phone),
        address = c.address,
        suburb = c.suburb,
        postcode = c.postcode,
        state = optional(&c.state),
        notes = optional(&c.notes),
        systems = systems_line(quote),
        supply = quote.power_supply,
        solar = product(quote.solar_package_id),
        battery = product(quote.battery_system_id),
        ev = product(quote.ev_charger_id),
        total = quote.total_price,
        rebate = quote.rebate_amount,
        final_price = quote.final_price,
        photo = optional(&quote.photo_path),
    )
}
