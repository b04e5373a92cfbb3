//! Order draft, form fields and the two validation passes.
//!
//! Checkout is split into two forms that never validate each other's fields:
//!
//! | Form | Fields | Error event |
//! |---|---|---|
//! | Delivery/payment | `payment`, `address` | `formErrors:change` |
//! | Contacts | `email`, `phone` | `formErrorsContacts:change` |
//!
//! Each pass produces a complete [`FormErrors`] map; an empty map means the
//! form is valid. Within one pass later checks overwrite earlier messages on
//! the same key, so only the most specific message per field survives.

use crate::catalog::ProductId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors raised when parsing form fields and values from strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFieldError {
    /// The name is not one of the order form fields
    #[error("Unknown order field: '{0}'")]
    UnknownField(String),

    /// The value is not a payment method
    #[error("Unknown payment method: '{0}'")]
    UnknownPayment(String),
}

/// A user-editable field of the order draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderField {
    /// Payment method (delivery/payment form)
    Payment,
    /// Delivery address (delivery/payment form)
    Address,
    /// Contact email (contacts form)
    Email,
    /// Contact phone (contacts form)
    Phone,
}

impl OrderField {
    /// Field name as used in event names and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Address => "address",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderField {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(Self::Payment),
            "address" => Ok(Self::Address),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            other => Err(ParseFieldError::UnknownField(other.to_string())),
        }
    }
}

/// How the customer pays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Online, by card
    Card,
    /// Cash on delivery
    Cash,
    /// Not chosen yet
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl PaymentMethod {
    /// Wire value: `"card"`, `"cash"` or `""`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
            Self::Unset => "",
        }
    }

    /// Whether a method has been chosen.
    #[must_use]
    pub const fn is_chosen(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "cash" => Ok(Self::Cash),
            "" => Ok(Self::Unset),
            other => Err(ParseFieldError::UnknownPayment(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a form field edit intent: `{ "field": "address", "value": "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// The edited field
    pub field: OrderField,
    /// The new raw value
    pub value: String,
}

impl FieldChange {
    /// Build a field edit.
    #[must_use]
    pub fn new(field: OrderField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// The in-progress checkout.
///
/// `items` and `total` mirror the basket and are rewritten by every basket
/// mutation; the other fields are written by the checkout forms.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Delivery address
    pub address: String,
    /// Payment method
    pub payment: PaymentMethod,
    /// Ids of the basket entries, in basket order
    pub items: Vec<ProductId>,
    /// Sum of the priced basket entries
    pub total: u64,
}

impl OrderDraft {
    /// Write one form field from its raw string value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseFieldError::UnknownPayment`] if `field` is
    /// [`OrderField::Payment`] and `value` is not a payment method. The draft
    /// is left unchanged in that case.
    pub fn set_field(&mut self, field: OrderField, value: &str) -> Result<(), ParseFieldError> {
        match field {
            OrderField::Payment => self.payment = value.parse()?,
            OrderField::Address => self.address = value.to_string(),
            OrderField::Email => self.email = value.to_string(),
            OrderField::Phone => self.phone = value.to_string(),
        }
        Ok(())
    }

    /// Raw string value of a form field.
    #[must_use]
    pub fn field(&self, field: OrderField) -> &str {
        match field {
            OrderField::Payment => self.payment.as_str(),
            OrderField::Address => self.address.as_str(),
            OrderField::Email => self.email.as_str(),
            OrderField::Phone => self.phone.as_str(),
        }
    }
}

/// Validation messages keyed by field. Empty means valid.
pub type FormErrors = BTreeMap<OrderField, String>;

/// Message: no payment method chosen
pub const MSG_PAYMENT_REQUIRED: &str = "Необходимо указать способ оплаты";
/// Message: address is empty
pub const MSG_ADDRESS_REQUIRED: &str = "Необходимо указать адрес";
/// Message: address has characters outside the allowed set
pub const MSG_ADDRESS_INVALID: &str = "Некорректный адрес";
/// Message: email is empty
pub const MSG_EMAIL_REQUIRED: &str = "Необходимо указать email";
/// Message: email is not well formed
pub const MSG_EMAIL_INVALID: &str = "Пожалуйста, введите действительный адрес электронной почты.";
/// Message: phone is empty
pub const MSG_PHONE_REQUIRED: &str = "Необходимо указать телефон";
/// Message: phone is not well formed
pub const MSG_PHONE_INVALID: &str = "Пожалуйста, введите действительный номер телефона.";

// Literal patterns: compilation cannot fail.
#[allow(clippy::expect_used)]
static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s,.'-]+$").expect("address pattern"));

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

// A leading `+`, then 7 to 15 digits, each optionally followed by one space.
#[allow(clippy::expect_used)]
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+(?:[0-9] ?){6,14}[0-9]$").expect("phone pattern"));

/// Delivery/payment pass: payment chosen, address present and well formed.
///
/// All three checks report under [`OrderField::Address`], the only error slot
/// the delivery form displays; the last failing check wins.
#[must_use]
pub fn validate_order_form(order: &OrderDraft) -> FormErrors {
    let mut errors = FormErrors::new();

    if !order.payment.is_chosen() {
        errors.insert(OrderField::Address, MSG_PAYMENT_REQUIRED.to_string());
    }
    if order.address.is_empty() {
        errors.insert(OrderField::Address, MSG_ADDRESS_REQUIRED.to_string());
    }
    if !ADDRESS_PATTERN.is_match(&order.address) {
        errors.insert(OrderField::Address, MSG_ADDRESS_INVALID.to_string());
    }

    errors
}

/// Contacts pass: email and phone present and well formed.
#[must_use]
pub fn validate_contacts_form(order: &OrderDraft) -> FormErrors {
    let mut errors = FormErrors::new();

    if order.email.is_empty() {
        errors.insert(OrderField::Email, MSG_EMAIL_REQUIRED.to_string());
    }
    if order.phone.is_empty() {
        errors.insert(OrderField::Phone, MSG_PHONE_REQUIRED.to_string());
    }
    if !EMAIL_PATTERN.is_match(&order.email) {
        errors.insert(OrderField::Email, MSG_EMAIL_INVALID.to_string());
    }
    if !PHONE_PATTERN.is_match(&order.phone) {
        errors.insert(OrderField::Phone, MSG_PHONE_INVALID.to_string());
    }

    errors
}

/// Backend response to a submitted order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Backend order id
    pub id: String,
    /// Amount charged
    pub total: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_with(payment: PaymentMethod, address: &str) -> OrderDraft {
        OrderDraft {
            payment,
            address: address.to_string(),
            ..OrderDraft::default()
        }
    }

    #[test]
    fn test_order_form_valid() {
        let errors = validate_order_form(&order_with(PaymentMethod::Card, "Lenina 1"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_order_form_missing_payment() {
        let errors = validate_order_form(&order_with(PaymentMethod::Unset, "Lenina 1"));
        assert_eq!(errors.get(&OrderField::Address).map(String::as_str), Some(MSG_PAYMENT_REQUIRED));
    }

    #[test]
    fn test_order_form_empty_address_reports_pattern_message() {
        // The pattern check runs last and an empty string cannot match `+`.
        let errors = validate_order_form(&order_with(PaymentMethod::Cash, ""));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(&OrderField::Address).map(String::as_str), Some(MSG_ADDRESS_INVALID));
    }

    #[test]
    fn test_order_form_rejects_disallowed_characters() {
        let errors = validate_order_form(&order_with(PaymentMethod::Card, "Ленина 1"));
        assert_eq!(errors.get(&OrderField::Address).map(String::as_str), Some(MSG_ADDRESS_INVALID));

        let errors = validate_order_form(&order_with(PaymentMethod::Card, "221B Baker St."));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_contacts_form_valid() {
        let order = OrderDraft {
            email: "user@example.com".to_string(),
            phone: "+7 999 123 45 67".to_string(),
            ..OrderDraft::default()
        };
        assert!(validate_contacts_form(&order).is_empty());
    }

    #[test]
    fn test_contacts_form_bad_email() {
        let order = OrderDraft {
            email: "bad-email".to_string(),
            phone: "+79991234567".to_string(),
            ..OrderDraft::default()
        };
        let errors = validate_contacts_form(&order);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(&OrderField::Email).map(String::as_str), Some(MSG_EMAIL_INVALID));
    }

    #[test]
    fn test_phone_digit_bounds() {
        let phone = |value: &str| OrderDraft {
            email: "a@b.co".to_string(),
            phone: value.to_string(),
            ..OrderDraft::default()
        };

        assert!(validate_contacts_form(&phone("+1234567")).is_empty());
        assert!(validate_contacts_form(&phone("+123456789012345")).is_empty());
        assert!(!validate_contacts_form(&phone("+123456")).is_empty());
        assert!(!validate_contacts_form(&phone("+1234567890123456")).is_empty());
        assert!(!validate_contacts_form(&phone("79991234567")).is_empty());
        assert!(!validate_contacts_form(&phone("+7  999")).is_empty());
    }

    #[test]
    fn test_contacts_form_empty_reports_both_fields() {
        let errors = validate_contacts_form(&OrderDraft::default());
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key(&OrderField::Email));
        assert!(errors.contains_key(&OrderField::Phone));
        assert!(!errors.contains_key(&OrderField::Address));
    }

    #[test]
    fn test_set_field_parses_payment() {
        let mut order = OrderDraft::default();
        order.set_field(OrderField::Payment, "cash").unwrap();
        order.set_field(OrderField::Address, "Main St 5").unwrap();

        assert_eq!(order.payment, PaymentMethod::Cash);
        assert_eq!(order.field(OrderField::Address), "Main St 5");

        let error = order.set_field(OrderField::Payment, "crypto").unwrap_err();
        assert_eq!(error, ParseFieldError::UnknownPayment("crypto".to_string()));
        assert_eq!(order.payment, PaymentMethod::Cash);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in [OrderField::Payment, OrderField::Address, OrderField::Email, OrderField::Phone] {
            assert_eq!(field.as_str().parse::<OrderField>().unwrap(), field);
        }
        assert!("zip".parse::<OrderField>().is_err());
    }

    #[test]
    fn test_draft_serializes_with_wire_names() {
        let order = OrderDraft {
            payment: PaymentMethod::Card,
            items: vec![ProductId::from("a")],
            total: 750,
            ..OrderDraft::default()
        };
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["payment"], "card");
        assert_eq!(json["items"][0], "a");
        assert_eq!(json["total"], 750);
    }

    #[test]
    fn test_field_change_deserializes() {
        let change: FieldChange =
            serde_json::from_str(r#"{"field": "address", "value": "Lenina 1"}"#).unwrap();
        assert_eq!(change, FieldChange::new(OrderField::Address, "Lenina 1"));
    }
}
