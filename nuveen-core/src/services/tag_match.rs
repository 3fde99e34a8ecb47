//! Tag validation
//!
//! Decides whether a scanned tag identifier may dismiss an alarm.
//!
//! Lenient mode also accepts tags whose checksum matches the configured
//! one. The checksum is a 32-bit rolling hash, not a cryptographic digest:
//! distinct identifiers can collide, so lenient matching trades tag
//! identity for tolerance of readers that report identifiers differently.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strictly a scanned tag must match the configured one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Strict,
    Lenient,
}

impl FromStr for MatchMode {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(MatchMode::Strict),
            "lenient" => Ok(MatchMode::Lenient),
            other => Err(AppError::Generic(format!(
                "Invalid match mode '{}'. Use 'strict' or 'lenient'",
                other
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Strict => f.write_str("strict"),
            MatchMode::Lenient => f.write_str("lenient"),
        }
    }
}

/// Why a tag was accepted or refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    NoTagData,
    NoTagConfigured,
    ExactMatch,
    ChecksumMatch,
    Mismatch,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationReason::NoTagData => "no tag data read",
            ValidationReason::NoTagConfigured => "no tag configured — any tag accepted",
            ValidationReason::ExactMatch => "exact match",
            ValidationReason::ChecksumMatch => "checksum matches",
            ValidationReason::Mismatch => "does not match",
        };
        f.write_str(text)
    }
}

/// Result of validating one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub reason: ValidationReason,
}

impl Validation {
    fn accept(reason: ValidationReason) -> Self {
        Self {
            valid: true,
            reason,
        }
    }

    fn reject(reason: ValidationReason) -> Self {
        Self {
            valid: false,
            reason,
        }
    }
}

/// Validate a scanned tag against the configured one.
///
/// With no configured tag every scan is accepted, so a fresh install can
/// dismiss alarms before a tag has been registered. Empty identifiers count
/// as absent on both sides.
pub fn validate(scanned: Option<&str>, configured: Option<&str>, mode: MatchMode) -> Validation {
    let Some(scanned) = scanned.filter(|s| !s.is_empty()) else {
        return Validation::reject(ValidationReason::NoTagData);
    };

    let Some(configured) = configured.filter(|s| !s.is_empty()) else {
        return Validation::accept(ValidationReason::NoTagConfigured);
    };

    if scanned == configured {
        return Validation::accept(ValidationReason::ExactMatch);
    }

    if mode == MatchMode::Lenient && checksum(scanned) == checksum(configured) {
        return Validation::accept(ValidationReason::ChecksumMatch);
    }

    Validation::reject(ValidationReason::Mismatch)
}

/// 32-bit rolling checksum rendered as lowercase hex.
///
/// Iterates UTF-16 code units with `h = h * 31 + c` in wrapping signed
/// arithmetic and returns `|h|`; identifiers checksummed by the mobile app
/// produce identical output.
pub fn checksum(s: &str) -> String {
    let h = s.encode_utf16().fold(0i32, |h, c| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(c))
    });
    format!("{:x}", h.unsigned_abs())
}
