//! The Message Type Indicator.
//!
//! Four decimal digits encoding, left to right: protocol version, message
//! class, message function and transaction origin. The numeric constant
//! sets below carry the scaled digit values, so `mti.version()` compares
//! directly against `VERSION_ISO8583_1993` and a composed MTI is just the
//! sum of one constant from each set.

use std::fmt;
use std::str::FromStr;

use crate::error::{CodecError, CodecResult};

pub const ORIGIN_ACQUIRER: u16 = 0;
pub const ORIGIN_ACQUIRER_REPEAT: u16 = 1;
pub const ORIGIN_ISSUER: u16 = 2;
pub const ORIGIN_ISSUER_REPEAT: u16 = 3;
pub const ORIGIN_OTHER: u16 = 4;
pub const ORIGIN_OTHER_REPEAT: u16 = 5;
pub const ORIGIN_RESERVED_6: u16 = 6;
pub const ORIGIN_RESERVED_7: u16 = 7;
pub const ORIGIN_RESERVED_8: u16 = 8;
pub const ORIGIN_RESERVED_9: u16 = 9;

pub const FUNCTION_REQUEST: u16 = 0;
pub const FUNCTION_REQUEST_RESPONSE: u16 = 10;
pub const FUNCTION_ADVICE: u16 = 20;
pub const FUNCTION_ADVICE_RESPONSE: u16 = 30;
pub const FUNCTION_NOTIFICATION: u16 = 40;
pub const FUNCTION_NOTIFICATION_ACKNOWLEDGEMENT: u16 = 50;
pub const FUNCTION_INSTRUCTION: u16 = 60;
pub const FUNCTION_INSTRUCTION_ACKNOWLEDGEMENT: u16 = 70;
pub const FUNCTION_RESERVED_8: u16 = 80;
pub const FUNCTION_RESERVED_9: u16 = 90;

pub const CLASS_RESERVED_0: u16 = 0;
pub const CLASS_AUTHORIZATION: u16 = 100;
pub const CLASS_FINANCIAL: u16 = 200;
pub const CLASS_FILE_ACTIONS: u16 = 300;
pub const CLASS_REVERSAL_CHARGEBACK: u16 = 400;
pub const CLASS_RECONCILIATION: u16 = 500;
pub const CLASS_ADMINISTRATIVE: u16 = 600;
pub const CLASS_FEE_COLLECTION: u16 = 700;
pub const CLASS_NETWORK_MANAGEMENT: u16 = 800;
pub const CLASS_RESERVED_9: u16 = 900;

pub const VERSION_ISO8583_1987: u16 = 0;
pub const VERSION_ISO8583_1993: u16 = 1000;
pub const VERSION_ISO8583_2003: u16 = 2000;
pub const VERSION_RESERVED_3: u16 = 3000;
pub const VERSION_RESERVED_4: u16 = 4000;
pub const VERSION_RESERVED_5: u16 = 5000;
pub const VERSION_RESERVED_6: u16 = 6000;
pub const VERSION_RESERVED_7: u16 = 7000;
pub const VERSION_NATIONAL_USE: u16 = 8000;
pub const VERSION_PRIVATE_USE: u16 = 9000;

/// A validated four-digit message type indicator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mti(String);

impl Mti {
    /// Accepts exactly four ASCII decimal digits.
    pub fn new(text: &str) -> CodecResult<Self> {
        if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::MtiMalformed(text.to_string()));
        }
        Ok(Self(text.to_string()))
    }

    /// Builds an MTI from one constant of each digit set.
    pub fn compose(origin: u16, function: u16, class: u16, version: u16) -> Self {
        Self(format!("{:04}", origin + function + class + version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The whole indicator as a number.
    pub fn value(&self) -> u16 {
        // Constructor guarantees four digits.
        self.0.parse().unwrap_or(0)
    }

    fn digit(&self, position: usize) -> u16 {
        u16::from(self.0.as_bytes()[position] - b'0')
    }

    /// Transaction origin, digit 4.
    pub fn origin(&self) -> u16 {
        self.digit(3)
    }

    /// Message function, digit 3 scaled by 10.
    pub fn function(&self) -> u16 {
        self.digit(2) * 10
    }

    /// Message class, digit 2 scaled by 100.
    pub fn class(&self) -> u16 {
        self.digit(1) * 100
    }

    /// Protocol version, digit 1 scaled by 1000.
    pub fn version(&self) -> u16 {
        self.digit(0) * 1000
    }

    pub fn equal(&self, other: &str) -> bool {
        Self::new(other).map_or(false, |o| o.value() == self.value())
    }

    pub fn higher_than(&self, other: &str) -> bool {
        Self::new(other).map_or(false, |o| self.value() > o.value())
    }

    pub fn higher_or_equal_than(&self, other: &str) -> bool {
        Self::new(other).map_or(false, |o| self.value() >= o.value())
    }

    pub fn lower_than(&self, other: &str) -> bool {
        Self::new(other).map_or(false, |o| self.value() < o.value())
    }

    pub fn lower_or_equal_than(&self, other: &str) -> bool {
        Self::new(other).map_or(false, |o| self.value() <= o.value())
    }
}

impl fmt::Display for Mti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Mti {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
