//! Accounts and access control
//!
//! Capabilities are granted per user per database. The super-user is
//! exempt from every check.

mod account;
mod capability;
mod crypto;

pub use account::{AccountStore, UserAccount, SUPER_USER};
pub use capability::{Capability, CapabilitySet};
pub use crypto::{hash_password, is_valid_hash, verify_password, PasswordPolicy};
