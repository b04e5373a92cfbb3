//! The checkout flow as an explicit state machine.
//!
//! ```text
//!            open_order (basket not empty)
//! Browsing ─────────────────────────────► AddressPayment
//!    ▲                                          │ submit_order
//!    │ acknowledge                              ▼
//! Submitted ◄────────────────────────────── Contacts
//!                  submit_contacts
//! ```
//!
//! `cancel` (closing the modal) returns to `Browsing` from any step. The flow
//! only tracks *where* the user is; the data lives in
//! [`AppState`](crate::state::AppState), which exposes no gates of its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by rejected checkout transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Checkout cannot start with an empty basket
    #[error("Cannot open the order form with an empty basket")]
    EmptyBasket,

    /// A form was submitted while its validation pass still reports errors
    #[error("Cannot submit the {form} form: it has validation errors")]
    IncompleteForm {
        /// Which form was submitted
        form: &'static str,
    },

    /// The action is not allowed from the current step
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        /// Step the flow was in
        from: CheckoutStep,
        /// Rejected action
        action: CheckoutAction,
    },
}

/// Where the user is in the checkout flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutStep {
    /// Looking at the catalog or basket
    #[default]
    Browsing,
    /// Filling in payment method and address
    AddressPayment,
    /// Filling in email and phone
    Contacts,
    /// Order sent; success screen shown
    Submitted,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Browsing => "browsing",
            Self::AddressPayment => "entering address and payment",
            Self::Contacts => "entering contacts",
            Self::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

/// Something the user does that moves the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckoutAction {
    /// Open the delivery/payment form from the basket
    OpenOrder,
    /// Submit the delivery/payment form
    SubmitOrder,
    /// Submit the contacts form
    SubmitContacts,
    /// Close the success screen
    Acknowledge,
    /// Dismiss the modal
    Cancel,
}

impl fmt::Display for CheckoutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OpenOrder => "open the order form",
            Self::SubmitOrder => "submit the order form",
            Self::SubmitContacts => "submit the contacts form",
            Self::Acknowledge => "acknowledge the order",
            Self::Cancel => "cancel",
        };
        f.write_str(label)
    }
}

impl CheckoutStep {
    /// Apply `action` and return the next step.
    ///
    /// `basket_len` is only consulted by [`CheckoutAction::OpenOrder`].
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyBasket`] when opening the order with no items
    /// - [`CheckoutError::InvalidTransition`] when `action` is not allowed
    ///   from this step
    pub const fn apply(self, action: CheckoutAction, basket_len: usize) -> Result<Self, CheckoutError> {
        match (self, action) {
            (_, CheckoutAction::Cancel) => Ok(Self::Browsing),
            (Self::Browsing, CheckoutAction::OpenOrder) => {
                if basket_len == 0 {
                    Err(CheckoutError::EmptyBasket)
                } else {
                    Ok(Self::AddressPayment)
                }
            },
            (Self::AddressPayment, CheckoutAction::SubmitOrder) => Ok(Self::Contacts),
            (Self::Contacts, CheckoutAction::SubmitContacts) => Ok(Self::Submitted),
            (Self::Submitted, CheckoutAction::Acknowledge) => Ok(Self::Browsing),
            (from, action) => Err(CheckoutError::InvalidTransition { from, action }),
        }
    }
}
