use core::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use storefront_core::{FieldErrors, Lenient};

/// Card fields as they arrive from the client. A missing or mistyped value
/// becomes a field-tagged error instead of a parse failure.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPaymentDetails {
    pub card_number: Lenient<String>,
    pub expiry: Lenient<String>,
    pub cvv: Lenient<String>,
    pub card_name: Lenient<String>,
}

impl fmt::Debug for RawPaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPaymentDetails")
            .field("card_number", &self.card_number.value().map(|_| "<redacted>"))
            .field("expiry", &self.expiry)
            .field("cvv", &self.cvv.value().map(|_| "<redacted>"))
            .field("card_name", &self.card_name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentField {
    CardNumber,
    Expiry,
    Cvv,
    CardName,
}

impl PaymentField {
    /// Wire name of the field, as the client sent it.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentField::CardNumber => "cardNumber",
            PaymentField::Expiry => "expiry",
            PaymentField::Cvv => "cvv",
            PaymentField::CardName => "cardName",
        }
    }
}

/// Calendar month a card expires in (or the current month, for comparison).
///
/// Ordering is chronological: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryMonth {
    year: u16,
    month: u8,
}

impl ExpiryMonth {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        // chrono months are always 1..=12
        let month = at.month() as u8;
        let year = u16::try_from(at.year()).unwrap_or(0);
        Self { year, month }
    }

    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Parse `MM/YY` (or `MMYY`). Two-digit years are in the 2000s.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.is_ascii() {
            return None;
        }
        let (mm, yy) = match input.len() {
            5 if input.as_bytes()[2] == b'/' => (&input[..2], &input[3..]),
            4 => (&input[..2], &input[2..]),
            _ => return None,
        };
        if !all_digits(mm) || !all_digits(yy) {
            return None;
        }

        let month: u8 = mm.parse().ok()?;
        let year: u16 = yy.parse().ok()?;
        Self::new(2000 + year, month)
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

}

impl fmt::Display for ExpiryMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year % 100)
    }
}

/// Structurally valid card details. Transient: never persisted, never logged in
/// full. `Debug` shows only the last four digits. The CVV is checked during
/// validation and not retained.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    card_number: String,
    expiry: ExpiryMonth,
    card_name: String,
}

impl PaymentDetails {
    pub fn expiry(&self) -> ExpiryMonth {
        self.expiry
    }

    pub fn card_name(&self) -> &str {
        &self.card_name
    }

    pub fn last_four(&self) -> &str {
        &self.card_number[self.card_number.len() - 4..]
    }

    /// `**** **** **** 4242`
    pub fn masked_card(&self) -> String {
        format!("**** **** **** {}", self.last_four())
    }

    /// Full digits, for a gateway that actually submits them.
    pub fn card_number(&self) -> &str {
        &self.card_number
    }
}

impl fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card", &self.masked_card())
            .field("expiry", &self.expiry)
            .field("card_name", &self.card_name)
            .finish_non_exhaustive()
    }
}

impl RawPaymentDetails {
    /// Check every field, collecting all problems.
    ///
    /// `current` is the month the expiry is compared against; a card that expires
    /// in `current` is still valid.
    pub fn validate(&self, current: ExpiryMonth) -> Result<PaymentDetails, FieldErrors> {
        let mut errors = FieldErrors::new();

        let card_number = match present(&self.card_number) {
            Field::Invalid => {
                errors.add(
                    PaymentField::CardNumber.as_str(),
                    "Invalid card number format",
                );
                None
            }
            Field::Missing => {
                errors.add(PaymentField::CardNumber.as_str(), "Card number is required");
                None
            }
            Field::Text(raw) => {
                let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                if digits.len() == 16 && all_digits(&digits) {
                    Some(digits)
                } else {
                    errors.add(
                        PaymentField::CardNumber.as_str(),
                        "Invalid card number format",
                    );
                    None
                }
            }
        };

        let expiry = match present(&self.expiry) {
            Field::Missing => {
                errors.add(PaymentField::Expiry.as_str(), "Expiry date is required");
                None
            }
            Field::Invalid => {
                errors.add(
                    PaymentField::Expiry.as_str(),
                    "Invalid expiry date format (MM/YY)",
                );
                None
            }
            Field::Text(raw) => match ExpiryMonth::parse(raw) {
                None => {
                    errors.add(
                        PaymentField::Expiry.as_str(),
                        "Invalid expiry date format (MM/YY)",
                    );
                    None
                }
                Some(month) if month < current => {
                    errors.add(PaymentField::Expiry.as_str(), "Card has expired");
                    None
                }
                Some(month) => Some(month),
            },
        };

        let cvv = match present(&self.cvv) {
            Field::Missing => {
                errors.add(PaymentField::Cvv.as_str(), "CVV is required");
                None
            }
            Field::Invalid => {
                errors.add(PaymentField::Cvv.as_str(), "Invalid CVV format");
                None
            }
            Field::Text(raw) => {
                let raw = raw.trim();
                if (3..=4).contains(&raw.len()) && all_digits(raw) {
                    Some(())
                } else {
                    errors.add(PaymentField::Cvv.as_str(), "Invalid CVV format");
                    None
                }
            }
        };

        let card_name = match present(&self.card_name) {
            Field::Missing => {
                errors.add(PaymentField::CardName.as_str(), "Cardholder name is required");
                None
            }
            Field::Invalid => {
                errors.add(PaymentField::CardName.as_str(), "Invalid cardholder name");
                None
            }
            Field::Text(name) => Some(name.trim().to_string()),
        };

        match (card_number, expiry, cvv, card_name) {
            (Some(card_number), Some(expiry), Some(()), Some(card_name)) if errors.is_empty() => {
                Ok(PaymentDetails {
                    card_number,
                    expiry,
                    card_name,
                })
            }
            _ => Err(errors),
        }
    }
}

enum Field<'a> {
    Missing,
    Invalid,
    Text(&'a str),
}

/// Blank text counts as missing.
fn present(value: &Lenient<String>) -> Field<'_> {
    match value {
        Lenient::Missing => Field::Missing,
        Lenient::Invalid => Field::Invalid,
        Lenient::Value(v) if v.trim().is_empty() => Field::Missing,
        Lenient::Value(v) => Field::Text(v),
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> ExpiryMonth {
        ExpiryMonth::new(2026, 10).unwrap()
    }

    fn raw(card: &str, expiry: &str, cvv: &str, name: &str) -> RawPaymentDetails {
        RawPaymentDetails {
            card_number: Lenient::Value(card.to_string()),
            expiry: Lenient::Value(expiry.to_string()),
            cvv: Lenient::Value(cvv.to_string()),
            card_name: Lenient::Value(name.to_string()),
        }
    }

    #[test]
    fn valid_details_strip_card_whitespace() {
        let details = raw("4242 4242 4242 4242", "12/28", "123", "  Ada Lovelace ")
            .validate(now())
            .unwrap();

        assert_eq!(details.card_number(), "4242424242424242");
        assert_eq!(details.masked_card(), "**** **** **** 4242");
        assert_eq!(details.card_name(), "Ada Lovelace");
        assert_eq!(details.expiry(), ExpiryMonth::new(2028, 12).unwrap());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let errors = raw("4242", "13/28", "12", "   ")
            .validate(now())
            .unwrap_err();

        assert_eq!(errors.get("cardNumber"), Some("Invalid card number format"));
        assert_eq!(errors.get("expiry"), Some("Invalid expiry date format (MM/YY)"));
        assert_eq!(errors.get("cvv"), Some("Invalid CVV format"));
        assert_eq!(errors.get("cardName"), Some("Cardholder name is required"));
    }

    #[test]
    fn missing_fields_are_required_errors() {
        let errors = RawPaymentDetails::default().validate(now()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("cvv"), Some("CVV is required"));
    }

    #[test]
    fn current_month_is_accepted_prior_month_is_not() {
        let current = now();
        assert!(raw("4242424242424242", "10/26", "123", "A").validate(current).is_ok());

        let errors = raw("4242424242424242", "09/26", "123", "A")
            .validate(current)
            .unwrap_err();
        assert_eq!(errors.get("expiry"), Some("Card has expired"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn expiry_accepts_slashless_form_and_rejects_noise() {
        assert_eq!(ExpiryMonth::parse("0127"), ExpiryMonth::new(2027, 1));
        assert_eq!(ExpiryMonth::parse("01/27"), ExpiryMonth::new(2027, 1));
        assert_eq!(ExpiryMonth::parse("00/27"), None);
        assert_eq!(ExpiryMonth::parse("1/27"), None);
        assert_eq!(ExpiryMonth::parse("01-27"), None);
        assert_eq!(ExpiryMonth::parse("ab/cd"), None);
    }

    #[test]
    fn cvv_allows_three_or_four_digits() {
        assert!(raw("4242424242424242", "12/30", "1234", "A").validate(now()).is_ok());
        assert!(raw("4242424242424242", "12/30", "12345", "A").validate(now()).is_err());
        assert!(raw("4242424242424242", "12/30", "12a", "A").validate(now()).is_err());
    }

    #[test]
    fn expiry_displays_as_month_and_short_year() {
        let jan = ExpiryMonth::new(2027, 1).unwrap();
        assert_eq!(jan.to_string(), "01/27");
        assert!(jan > ExpiryMonth::new(2026, 12).unwrap());
    }

    #[test]
    fn debug_output_never_contains_full_card_or_cvv() {
        let raw = raw("4242424242421234", "12/30", "987", "A");
        assert!(!format!("{raw:?}").contains("4242424242421234"));

        let details = raw.validate(now()).unwrap();
        let shown = format!("{details:?}");
        assert!(shown.contains("1234"));
        assert!(!shown.contains("4242424242421234"));
        assert!(!shown.contains("987"));
    }

    #[test]
    fn mistyped_fields_are_format_errors() {
        let raw: RawPaymentDetails = serde_json::from_str(
            r#"{"cardNumber":4242424242424242,"expiry":1228,"cvv":123,"cardName":["A"]}"#,
        )
        .unwrap();
        let errors = raw.validate(now()).unwrap_err();

        assert_eq!(errors.get("cardNumber"), Some("Invalid card number format"));
        assert_eq!(errors.get("expiry"), Some("Invalid expiry date format (MM/YY)"));
        assert_eq!(errors.get("cvv"), Some("Invalid CVV format"));
        assert_eq!(errors.get("cardName"), Some("Invalid cardholder name"));
    }

    #[test]
    fn deserializes_camel_case_with_missing_fields() {
        let raw: RawPaymentDetails =
            serde_json::from_str(r#"{"cardNumber":"4242424242424242","cardName":"A"}"#).unwrap();
        assert_eq!(raw.expiry, Lenient::Missing);
        let errors = raw.validate(now()).unwrap_err();
        assert!(errors.contains("expiry"));
        assert!(errors.contains("cvv"));
    }
}
