use std::sync::LazyLock;

use regex::Regex;

use crate::error::FieldErrors;
use crate::models::quote::ContactDetails;
use crate::models::selection::QuoteSelection;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

fn require(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), format!("{label} is required"));
    }
}

/// Checks the fields needed to submit a quote.
pub fn validate_contact(contact: &ContactDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, "firstName", "First name", &contact.first_name);
    require(&mut errors, "lastName", "Last name", &contact.last_name);
    require(&mut errors, "email", "Email", &contact.email);
    require(&mut errors, "address", "Address", &contact.address);
    require(&mut errors, "suburb", "Suburb", &contact.suburb);
    require(&mut errors, "postcode", "Postcode", &contact.postcode);

    if !errors.contains_key("email") && !EMAIL.is_match(contact.email.trim()) {
        errors.insert("email".to_string(), "Email address is not valid".to_string());
    }
    errors
}

/// Checks that the requirements step was completed.
pub fn validate_requirements(selection: &QuoteSelection) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if selection.systems().is_empty() {
        errors.insert("systems".to_string(), "Select at least one system".to_string());
    }
    if selection.power_supply().is_none() {
        errors.insert("powerSupply".to_string(), "Choose the property's power supply".to_string());
    }
    errors
}
