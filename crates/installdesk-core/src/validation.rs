//! Field validation for insert and patch payloads.
//!
//! Validation runs before any store call. A failed check yields a
//! [`ValidationErrors`] map of field name to message; nothing is written.

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::model::{
    ClientPatch, NewClient, NewOrder, NewPayment, OrderPatch, PaymentPatch, ProfileUpdate,
};
use crate::schedule::MAX_LEAD_TIME_DAYS;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Per-field validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. The first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, (field, message)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, field, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Payloads that can be checked before persisting.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn require(errors: &mut ValidationErrors, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", label));
    }
}

fn check_email(errors: &mut ValidationErrors, value: &str) {
    if !value.is_empty() && !EMAIL.is_match(value) {
        errors.add("email", "Please enter a valid email address");
    }
}

fn check_amount(errors: &mut ValidationErrors, field: &str, value: Decimal) {
    if value <= Decimal::ZERO {
        errors.add(field, "Amount must be greater than 0");
    } else if value.normalize().scale() > 2 {
        errors.add(field, "Amount can have at most 2 decimal places");
    }
}

fn check_lead_time(errors: &mut ValidationErrors, value: i32) {
    if value < 1 {
        errors.add("lead_time_days", "Lead time must be at least 1 day");
    } else if value > MAX_LEAD_TIME_DAYS {
        errors.add(
            "lead_time_days",
            format!("Lead time must be at most {MAX_LEAD_TIME_DAYS} days"),
        );
    }
}

impl Validate for NewClient {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "name", &self.name, "Name");
        require(&mut errors, "email", &self.email, "Email");
        require(&mut errors, "phone", &self.phone, "Phone");
        require(&mut errors, "address", &self.address, "Address");
        check_email(&mut errors, &self.email);
        errors.into_result()
    }
}

impl Validate for ClientPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name, "Name");
        }
        if let Some(email) = &self.email {
            require(&mut errors, "email", email, "Email");
            check_email(&mut errors, email);
        }
        if let Some(phone) = &self.phone {
            require(&mut errors, "phone", phone, "Phone");
        }
        if let Some(address) = &self.address {
            require(&mut errors, "address", address, "Address");
        }
        errors.into_result()
    }
}

impl Validate for NewOrder {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "title", &self.title, "Title");
        require(&mut errors, "description", &self.description, "Description");
        if self.client_id.is_nil() {
            errors.add("client_id", "Client is required");
        }
        check_amount(&mut errors, "total_amount", self.total_amount);
        check_lead_time(&mut errors, self.lead_time_days);
        errors.into_result()
    }
}

impl Validate for OrderPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            require(&mut errors, "title", title, "Title");
        }
        if let Some(description) = &self.description {
            require(&mut errors, "description", description, "Description");
        }
        if self.client_id.is_some_and(|id| id.is_nil()) {
            errors.add("client_id", "Client is required");
        }
        if let Some(total) = self.total_amount {
            check_amount(&mut errors, "total_amount", total);
        }
        if let Some(lead_time) = self.lead_time_days {
            check_lead_time(&mut errors, lead_time);
        }
        errors.into_result()
    }
}

impl Validate for NewPayment {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.order_id.is_nil() {
            errors.add("order_id", "Order is required");
        }
        check_amount(&mut errors, "amount", self.amount);
        errors.into_result()
    }
}

impl Validate for PaymentPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(amount) = self.amount {
            check_amount(&mut errors, "amount", amount);
        }
        errors.into_result()
    }
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "full_name", &self.full_name, "Full name");
        errors.into_result()
    }
}
