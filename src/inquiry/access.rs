//! Who may read or post to an inquiry.
//!
//! Two proofs exist and each maps to exactly one sender tag:
//!
//! | Proof | Grant | May post as |
//! |---|---|---|
//! | admin session | [`Grant::Admin`] | [`Sender::Admin`] |
//! | email equal to `inquiry.email` | [`Grant::Owner`] | [`Sender::Customer`] |
//!
//! Customer accounts are not linked to inquiries: a signed-in customer
//! proves ownership with the email, same as an anonymous visitor. The email
//! match is exact (no trimming or case folding) and is the whole capability;
//! it is weak and deliberately not hardened here.

use super::Sender;

/// Identity of the caller as reported by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// No session.
    Anonymous,
    /// Signed-in, non-admin account.
    Customer,
    /// Back-office session.
    Admin,
}

impl Caller {
    /// `true` for admin sessions.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Short label for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

/// Proven access to one inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Admin session; full access.
    Admin,
    /// Email matched the inquiry's submitter.
    Owner,
}

impl Grant {
    /// The only sender tag this grant may post under.
    pub fn sender(&self) -> Sender {
        match self {
            Self::Admin => Sender::Admin,
            Self::Owner => Sender::Customer,
        }
    }
}

/// Access was refused.
///
/// Carries no detail so a refusal never reveals whether the inquiry exists
/// or which proof was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unauthorized")]
pub struct Denied;

/// Decide read access to an inquiry whose submitter email is `inquiry_email`.
///
/// # Errors
///
/// Returns [`Denied`] unless the caller is an admin or `email` equals
/// `inquiry_email` exactly.
pub fn authorize_read(
    caller: Caller,
    email: Option<&str>,
    inquiry_email: &str,
) -> Result<Grant, Denied> {
    if caller.is_admin() {
        return Ok(Grant::Admin);
    }
    match email {
        Some(email) if email == inquiry_email => Ok(Grant::Owner),
        _ => Err(Denied),
    }
}

/// Decide whether the caller may post under `sender`.
///
/// The proof must match the tag: an admin posts as admin, an email owner
/// posts as customer, and neither can forge the other.
///
/// # Errors
///
/// Returns [`Denied`] when the caller lacks the proof for `sender`.
pub fn authorize_append(
    caller: Caller,
    email: Option<&str>,
    inquiry_email: &str,
    sender: Sender,
) -> Result<Grant, Denied> {
    let grant = match sender {
        Sender::Admin if caller.is_admin() => Grant::Admin,
        Sender::Customer if !caller.is_admin() => match email {
            Some(email) if email == inquiry_email => Grant::Owner,
            _ => return Err(Denied),
        },
        _ => return Err(Denied),
    };
    debug_assert_eq!(grant.sender(), sender);
    Ok(grant)
}

/// Admin-only operations (listing, status changes, dashboard).
///
/// # Errors
///
/// Returns [`Denied`] for any non-admin caller.
pub fn require_admin(caller: Caller) -> Result<(), Denied> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(Denied)
    }
}
