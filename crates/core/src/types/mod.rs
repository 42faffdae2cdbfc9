//! Core types for Charity Yeti.
//!
//! The JSON field names here are the wire contract with the donation front end
//! and the payment middleware. Stored names live on [`DonationRecord`]
//! (`amount` on the wire is stored as `donation_value`).

mod de;
pub mod donation;
pub mod id;
pub mod payment;
pub mod social;
pub mod transaction;

pub use donation::{DonationRecord, DonorDocumentId};
pub use id::*;
pub use payment::{
    PaymentAuthorizationRequest, ProcessingOption, ProcessingOptions, ValidationError,
};
pub use social::{Mention, SocialUser};
pub use transaction::{BillingDetails, Transaction};
