//! Pure checks gating submission. No I/O.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;
use crate::types::{MintRef, TokenHolding, TransferRequest};

/// Digits with an optional fractional part; a bare ".5" is allowed.
static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d*(\.\d+)?$").expect("amount pattern is a valid regex")
});

pub fn validate_address(candidate: &str) -> Result<(), ValidationError> {
    chain_sol::validate_address(candidate).map_err(|_| ValidationError::InvalidAddress)
}

pub fn validate_not_self(candidate: &str, sender: &str) -> Result<(), ValidationError> {
    if candidate == sender {
        return Err(ValidationError::SelfTransfer);
    }
    Ok(())
}

/// Parse the amount the user typed. Must be a positive decimal number.
pub fn validate_amount_format(text: &str) -> Result<Decimal, ValidationError> {
    let text = text.trim();
    if text.is_empty() || !AMOUNT_PATTERN.is_match(text) {
        return Err(ValidationError::InvalidAmount);
    }
    let amount = match Decimal::from_str(text) {
        Ok(amount) => amount,
        // Well-formed but past Decimal's range: larger than any balance.
        Err(_) if significant_integer_digits(text) > MAX_DECIMAL_INTEGER_DIGITS => {
            return Err(ValidationError::InsufficientBalance);
        }
        Err(_) => return Err(ValidationError::InvalidAmount),
    };
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(amount)
}

/// `Decimal::MAX` has 29 integer digits; anything with more cannot parse.
const MAX_DECIMAL_INTEGER_DIGITS: usize = 28;

fn significant_integer_digits(text: &str) -> usize {
    text.split('.')
        .next()
        .unwrap_or_default()
        .trim_start_matches('0')
        .len()
}

pub fn validate_amount_within_balance(
    amount: Decimal,
    holding: &TokenHolding,
) -> Result<(), ValidationError> {
    if amount > holding.balance() {
        return Err(ValidationError::InsufficientBalance);
    }
    Ok(())
}

/// Run all four checks in order and return the amount in minor units.
///
/// The native holding is scaled by `native_decimals`, tokens by their own
/// decimals. An amount that rounds to zero minor units is `InvalidAmount`.
pub fn validate_request(
    request: &TransferRequest,
    sender: &str,
    native_decimals: u32,
) -> Result<u64, ValidationError> {
    validate_address(&request.recipient_address)?;
    validate_not_self(&request.recipient_address, sender)?;
    let amount = validate_amount_format(&request.amount_text)?;
    validate_amount_within_balance(amount, &request.selected_holding)?;

    let holding = &request.selected_holding;
    let decimals = match holding.mint() {
        MintRef::Native => native_decimals,
        MintRef::Token(_) => holding.decimals(),
    };
    to_minor_units(amount, decimals)
}

/// Scale a human amount to integer minor units (`amount * 10^decimals`),
/// rounding half away from zero.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<u64, ValidationError> {
    let scale = 10u64
        .checked_pow(decimals)
        .ok_or(ValidationError::InvalidAmount)?;
    let minor = amount
        .checked_mul(Decimal::from(scale))
        .ok_or(ValidationError::InvalidAmount)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(ValidationError::InvalidAmount)?;
    if minor == 0 {
        // Below one minor unit: nothing would move.
        return Err(ValidationError::InvalidAmount);
    }
    Ok(minor)
}

/// Whether the submit action should be enabled, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionVerdict {
    pub failed: Option<ValidationError>,
}

impl SubmissionVerdict {
    pub fn is_enabled(&self) -> bool {
        self.failed.is_none()
    }
}

/// Same checks as a transfer run performs, without sending anything.
pub fn submission_verdict(
    request: &TransferRequest,
    sender: &str,
    native_decimals: u32,
) -> SubmissionVerdict {
    SubmissionVerdict {
        failed: validate_request(request, sender, native_decimals).err(),
    }
}
