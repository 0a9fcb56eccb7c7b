//! Payment references and transfer instructions
//!
//! A reference looks like `R1-<base36 ms timestamp>-<5 random base36 chars>`,
//! all uppercase. It is generated per page view and never stored or checked
//! against anything.

use rand::Rng;
use serde::{Deserialize, Serialize};

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Prefix shared by every reference
pub const REFERENCE_PREFIX: &str = "R1";

/// Length of the random suffix
pub const SUFFIX_LEN: usize = 5;

/// Generate a payment reference for `now_ms`
pub fn generate_reference<R: Rng + ?Sized>(now_ms: i64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        REFERENCE_PREFIX,
        to_base36(now_ms.max(0) as u64),
        suffix
    )
}

/// Uppercase base-36 rendering of `n`
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Whether `reference` matches `R1-[0-9A-Z]+-[0-9A-Z]{5}`
pub fn is_valid_reference(reference: &str) -> bool {
    let is_digit = |c: char| c.is_ascii_digit() || c.is_ascii_uppercase();
    let mut parts = reference.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(stamp), Some(suffix), None) => {
            prefix == REFERENCE_PREFIX
                && !stamp.is_empty()
                && stamp.chars().all(is_digit)
                && suffix.chars().count() == SUFFIX_LEN
                && suffix.chars().all(is_digit)
        }
        _ => false,
    }
}

/// Bank account shown on the payment page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankDetails {
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub sort_code: String,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub swift_bic: String,
}

impl Default for BankDetails {
    fn default() -> Self {
        Self {
            account_name: "EXAMPLE HOLDINGS LTD".to_string(),
            account_number: "00000000".to_string(),
            sort_code: "00-00-00".to_string(),
            iban: "GB00XXXX00000000000000".to_string(),
            swift_bic: "XXXXGB00".to_string(),
        }
    }
}

/// Everything the payment page needs
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInstructions {
    pub reference: String,
    pub bank: BankDetails,
}

impl PaymentInstructions {
    pub fn new(bank: &BankDetails, now_ms: i64) -> Self {
        Self {
            reference: generate_reference(now_ms, &mut rand::thread_rng()),
            bank: bank.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        // 2024-01-01T00:00:00Z
        assert_eq!(to_base36(1_704_067_200_000), "LQU5M2O0");
    }

    #[test]
    fn test_generated_references_match_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..500 {
            let reference = generate_reference(1_704_067_200_000 + i * 7919, &mut rng);
            assert!(is_valid_reference(&reference), "bad reference {}", reference);
        }
    }

    #[test]
    fn test_negative_timestamp_still_valid() {
        let mut rng = StdRng::seed_from_u64(1);
        let reference = generate_reference(-5, &mut rng);
        assert!(reference.starts_with("R1-0-"));
        assert!(is_valid_reference(&reference));
    }

    #[test]
    fn test_is_valid_reference_rejects() {
        assert!(!is_valid_reference("R1-ABC-1234"));
        assert!(!is_valid_reference("R2-ABC-12345"));
        assert!(!is_valid_reference("R1--12345"));
        assert!(!is_valid_reference("R1-abc-12345"));
        assert!(!is_valid_reference("R1-ABC-12345-X"));
        assert!(is_valid_reference("R1-LQU5M2O0-0Z9AB"));
    }

    #[test]
    fn test_instructions_carry_bank_details() {
        let bank = BankDetails::default();
        let instructions = PaymentInstructions::new(&bank, 1_704_067_200_000);
        assert!(instructions.reference.starts_with("R1-LQU5M2O0-"));
        assert_eq!(instructions.bank, bank);
    }
}
