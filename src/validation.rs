use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

/// Customer contact block submitted at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_whatsapp: String,
    pub customer_email: String,
}

/// Contact details after validation; WhatsApp is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCustomer {
    pub name: String,
    pub whatsapp: String,
    pub email: String,
}

const WHATSAPP_PATTERN: &str = r"^\+?[1-9]\d{1,14}$";
const EMAIL_PATTERN: &str = r"^\S+@\S+\.\S+$";

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Drop the spaces, dashes and parentheses people type into phone numbers.
pub fn normalize_whatsapp(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}

pub fn is_valid_whatsapp(raw: &str) -> bool {
    matches(WHATSAPP_PATTERN, &normalize_whatsapp(raw))
}

pub fn is_valid_email(raw: &str) -> bool {
    matches(EMAIL_PATTERN, raw.trim())
}

impl CustomerDetails {
    pub fn validate(&self) -> Result<ValidCustomer, HashMap<String, String>> {
        let mut errors = HashMap::new();

        let name = self.customer_name.trim();
        let name_len = name.chars().count();
        if name_len < 3 || name_len > 255 {
            errors.insert(
                "customer_name".to_string(),
                "Please enter your full name (3 to 255 characters)".to_string(),
            );
        }

        let whatsapp = normalize_whatsapp(self.customer_whatsapp.trim());
        if whatsapp.is_empty() {
            errors.insert(
                "customer_whatsapp".to_string(),
                "A WhatsApp number is required for delivery updates".to_string(),
            );
        } else if !matches(WHATSAPP_PATTERN, &whatsapp) {
            errors.insert(
                "customer_whatsapp".to_string(),
                "Please enter a valid international phone number".to_string(),
            );
        }

        let email = self.customer_email.trim();
        if !is_valid_email(email) {
            errors.insert(
                "customer_email".to_string(),
                "Please enter a valid email address".to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidCustomer {
            name: name.to_string(),
            whatsapp,
            email: email.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str, whatsapp: &str, email: &str) -> CustomerDetails {
        CustomerDetails {
            customer_name: name.to_string(),
            customer_whatsapp: whatsapp.to_string(),
            customer_email: email.to_string(),
        }
    }

    #[test]
    fn accepts_formatted_international_number() {
        let ok = details("Layla Haddad", "+971 (50) 123-4567", " layla@example.com ")
            .validate()
            .unwrap();
        assert_eq!(ok.whatsapp, "+971501234567");
        assert_eq!(ok.email, "layla@example.com");
    }

    #[test]
    fn rejects_short_name_and_bad_contacts() {
        let errs = details("Al", "0501234567", "not-an-email").validate().unwrap_err();
        assert!(errs.contains_key("customer_name"));
        assert!(errs.contains_key("customer_whatsapp"));
        assert!(errs.contains_key("customer_email"));
    }

    #[test]
    fn whatsapp_rules() {
        assert!(is_valid_whatsapp("+12"));
        assert!(!is_valid_whatsapp("+1"));
        assert!(!is_valid_whatsapp("+1234567890123456"));
        assert!(!is_valid_whatsapp("+97150abc"));
    }

    #[test]
    fn name_length_counts_characters() {
        let long = "x".repeat(256);
        assert!(details(&long, "+971501234567", "a@b.co").validate().is_err());
        assert!(details("علي", "+971501234567", "a@b.co").validate().is_ok());
    }
}
