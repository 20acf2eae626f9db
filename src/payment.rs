use jiff::civil::Date;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Upi,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("card number must be 16 digits")]
    InvalidCardNumber,
    #[error("expiry must be in MM/YY format")]
    InvalidExpiry,
    #[error("this card has expired")]
    CardExpired,
    #[error("CVV must be 3 or 4 digits")]
    InvalidCvv,
    #[error("enter the name on the card")]
    MissingCardholder,
    #[error("enter a valid UPI ID (e.g. name@bank)")]
    InvalidUpiId,
}

/// Raw payment form as posted by the browser; unused fields arrive as empty strings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiry: String,
    #[serde(default)]
    pub card_cvv: String,
    #[serde(default)]
    pub card_name: String,
    #[serde(default)]
    pub upi_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentDetails {
    Card { last4: String },
    Upi { id: String },
}

impl PaymentDetails {
    pub fn label(&self) -> String {
        match self {
            PaymentDetails::Card { last4 } => format!("Card •••• {last4}"),
            PaymentDetails::Upi { id } => format!("UPI {id}"),
        }
    }
}

impl PaymentForm {
    /// Format checks only; nothing here talks to a payment provider.
    pub fn validate(&self, today: Date) -> Result<PaymentDetails, PaymentError> {
        match self.method {
            PaymentMethod::Card => {
                let digits = card_digits(&self.card_number)?;
                check_expiry(&self.card_expiry, today)?;
                check_cvv(&self.card_cvv)?;
                let holder = self.card_name.trim();
                if holder.is_empty() {
                    return Err(PaymentError::MissingCardholder);
                }
                Ok(PaymentDetails::Card { last4: digits[digits.len() - 4..].to_string() })
            },
            PaymentMethod::Upi => {
                let id = self.upi_id.trim();
                if !is_valid_upi_id(id) {
                    return Err(PaymentError::InvalidUpiId);
                }
                Ok(PaymentDetails::Upi { id: id.to_string() })
            },
        }
    }
}

fn card_digits(number: &str) -> Result<String, PaymentError> {
    let digits: String = number.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCardNumber);
    }
    Ok(digits)
}

fn check_expiry(expiry: &str, today: Date) -> Result<(), PaymentError> {
    let (mm, yy) = expiry.trim().split_once('/').ok_or(PaymentError::InvalidExpiry)?;
    let (mm, yy) = (mm.trim(), yy.trim());
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(mm) || !two_digits(yy) {
        return Err(PaymentError::InvalidExpiry);
    }
    let month: i8 = mm.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    let year: i16 = yy.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    if !(1..=12).contains(&month) {
        return Err(PaymentError::InvalidExpiry);
    }
    if (2000 + year, month) < (today.year(), today.month()) {
        return Err(PaymentError::CardExpired);
    }
    Ok(())
}

fn check_cvv(cvv: &str) -> Result<(), PaymentError> {
    let cvv = cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCvv);
    }
    Ok(())
}

fn is_valid_upi_id(id: &str) -> bool {
    let Some((handle, provider)) = id.split_once('@') else {
        return false;
    };
    (2..=256).contains(&handle.len())
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && (2..=64).contains(&provider.len())
        && provider.chars().all(|c| c.is_ascii_alphabetic())
}
