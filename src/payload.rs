// 4.0: untrusted structured callback payload. the executor delivers settlement
// results as named address/uint items; every expected slot is checked by name
// before use. an unexpected name at an expected position fails validation
// instead of being silently ignored.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Wei};

pub const OUTPUT_TOKEN_KEY: &str = "outputToken";
pub const OUTPUT_AMOUNT_KEY: &str = "outputAmount";
pub const SECONDARY_OUTPUT_TOKEN_KEY: &str = "secondaryOutputToken";
pub const SECONDARY_OUTPUT_AMOUNT_KEY: &str = "secondaryOutputAmount";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAddress {
    pub name: String,
    pub value: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedUint {
    pub name: String,
    pub value: Wei,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("Expected payload key '{expected}' at position {position}, found '{found}'")]
    UnexpectedKeyName {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Missing expected payload key '{expected}' at position {position}")]
    MissingExpectedKey { position: usize, expected: String },
}

// Event data as delivered by the executor. dynamically shaped, so every
// access goes through a name-checked lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackData {
    pub addresses: Vec<NamedAddress>,
    pub uints: Vec<NamedUint>,
}

impl CallbackData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, name: &str, value: Address) -> Self {
        self.addresses.push(NamedAddress {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn with_uint(mut self, name: &str, value: Wei) -> Self {
        self.uints.push(NamedUint {
            name: name.to_string(),
            value,
        });
        self
    }

    // required slot: missing or misnamed both fail
    pub fn address_named(&self, position: usize, expected: &str) -> Result<Address, PayloadError> {
        match self.addresses.get(position) {
            None => Err(PayloadError::MissingExpectedKey {
                position,
                expected: expected.to_string(),
            }),
            Some(item) if item.name != expected => Err(PayloadError::UnexpectedKeyName {
                position,
                expected: expected.to_string(),
                found: item.name.clone(),
            }),
            Some(item) => Ok(item.value),
        }
    }

    pub fn uint_named(&self, position: usize, expected: &str) -> Result<Wei, PayloadError> {
        match self.uints.get(position) {
            None => Err(PayloadError::MissingExpectedKey {
                position,
                expected: expected.to_string(),
            }),
            Some(item) if item.name != expected => Err(PayloadError::UnexpectedKeyName {
                position,
                expected: expected.to_string(),
                found: item.name.clone(),
            }),
            Some(item) => Ok(item.value),
        }
    }

    // optional slot: absent is fine, present-but-misnamed still fails
    pub fn address_named_opt(
        &self,
        position: usize,
        expected: &str,
    ) -> Result<Option<Address>, PayloadError> {
        if self.addresses.len() <= position {
            return Ok(None);
        }
        self.address_named(position, expected).map(Some)
    }

    pub fn uint_named_opt(
        &self,
        position: usize,
        expected: &str,
    ) -> Result<Option<Wei>, PayloadError> {
        if self.uints.len() <= position {
            return Ok(None);
        }
        self.uint_named(position, expected).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn named_lookup_succeeds() {
        let data = CallbackData::new()
            .with_address(OUTPUT_TOKEN_KEY, Address(0xEE))
            .with_uint(OUTPUT_AMOUNT_KEY, Wei::new_unchecked(dec!(997)));

        assert_eq!(data.address_named(0, OUTPUT_TOKEN_KEY).unwrap(), Address(0xEE));
        assert_eq!(
            data.uint_named(0, OUTPUT_AMOUNT_KEY).unwrap().value(),
            dec!(997)
        );
    }

    #[test]
    fn wrong_name_at_expected_position_fails() {
        let data = CallbackData::new().with_address("wrongKey", Address(0xEE));

        let result = data.address_named(0, OUTPUT_TOKEN_KEY);
        assert!(matches!(
            result,
            Err(PayloadError::UnexpectedKeyName { ref found, .. }) if found == "wrongKey"
        ));
    }

    #[test]
    fn missing_required_slot_fails() {
        let data = CallbackData::new();

        assert!(matches!(
            data.address_named(0, OUTPUT_TOKEN_KEY),
            Err(PayloadError::MissingExpectedKey { .. })
        ));
        assert!(matches!(
            data.uint_named(0, OUTPUT_AMOUNT_KEY),
            Err(PayloadError::MissingExpectedKey { .. })
        ));
    }

    #[test]
    fn optional_slot_absent_is_none() {
        let data = CallbackData::new()
            .with_address(OUTPUT_TOKEN_KEY, Address(0xEE))
            .with_uint(OUTPUT_AMOUNT_KEY, Wei::new_unchecked(dec!(1)));

        assert_eq!(
            data.address_named_opt(1, SECONDARY_OUTPUT_TOKEN_KEY).unwrap(),
            None
        );
        assert_eq!(
            data.uint_named_opt(1, SECONDARY_OUTPUT_AMOUNT_KEY).unwrap(),
            None
        );
    }

    #[test]
    fn optional_slot_misnamed_still_fails() {
        let data = CallbackData::new()
            .with_address(OUTPUT_TOKEN_KEY, Address(0xEE))
            .with_address("bogus", Address(0xFF));

        assert!(matches!(
            data.address_named_opt(1, SECONDARY_OUTPUT_TOKEN_KEY),
            Err(PayloadError::UnexpectedKeyName { .. })
        ));
    }
}
