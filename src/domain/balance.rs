use std::fmt;

/// Account balances are whole monetary units and can never go below zero.
pub type Balance = u64;

/// Format a balance the way it is kept in world state: plain base-10 digits,
/// no sign, no separators.
pub fn format_balance(balance: Balance) -> String {
    balance.to_string()
}

/// Parse a base-10 integer string into a balance.
/// Example: "1000" -> 1000, "+25" -> 25, "007" -> 7
pub fn parse_balance(input: &str) -> Result<Balance, ParseBalanceError> {
    let digits = input.strip_prefix('+').unwrap_or(input);

    if digits.is_empty() {
        return Err(ParseBalanceError::Empty);
    }
    if digits.starts_with('-') {
        return Err(ParseBalanceError::Negative);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseBalanceError::InvalidDigit);
    }

    digits.parse().map_err(|_| ParseBalanceError::OutOfRange)
}

/// Add a credit to a balance, refusing to wrap.
pub fn checked_credit(balance: Balance, delta: Balance) -> Option<Balance> {
    balance.checked_add(delta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseBalanceError {
    Empty,
    Negative,
    InvalidDigit,
    OutOfRange,
}

impl fmt::Display for ParseBalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseBalanceError::Empty => write!(f, "empty amount"),
            ParseBalanceError::Negative => write!(f, "amount must not be negative"),
            ParseBalanceError::InvalidDigit => write!(f, "amount is not a base-10 integer"),
            ParseBalanceError::OutOfRange => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseBalanceError {}
