//! Error kinds shared by every part of the library.

use core::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// The closed set of failures a library operation can report.
///
/// Success is represented by `Ok(..)`; every other outcome maps to exactly one
/// of these variants. The numeric codes returned by [`Error::code`] match the
/// codes used by the platform's other device SDKs, so logs and persisted
/// diagnostics stay comparable across implementations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// Generic failure with no more specific kind.
    Failed,
    /// An argument or received value is not acceptable.
    BadValue,
    /// A required argument or field is absent or empty.
    MissingValue,
    /// An allocation failed. Partially built state has been released.
    OutOfMemory,
    /// Malformed JSON, or JSON that lacks the expected structure.
    ParsingError,
    /// The configuration is inconsistent with the requested operation.
    ConfigError,
    /// The session has not been configured yet.
    ConfigMissing,
    /// A bounded buffer was too small for the output.
    Overflow,
    /// Valid input that is not addressed to this library, such as a message
    /// on an unrelated topic.
    Ignored,
}

impl Error {
    /// Numeric code of this error. Success would be `0`.
    pub const fn code(self) -> i32 {
        match self {
            Error::Failed => 1,
            Error::BadValue => 2,
            Error::MissingValue => 3,
            Error::OutOfMemory => 4,
            Error::ParsingError => 5,
            Error::ConfigError => 6,
            Error::ConfigMissing => 7,
            Error::Overflow => 8,
            Error::Ignored => 9,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Error::Failed => "Failed",
            Error::BadValue => "BadValue",
            Error::MissingValue => "MissingValue",
            Error::OutOfMemory => "OutOfMemory",
            Error::ParsingError => "ParsingError",
            Error::ConfigError => "ConfigError",
            Error::ConfigMissing => "ConfigMissing",
            Error::Overflow => "Overflow",
            Error::Ignored => "Ignored",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<alloc::collections::TryReserveError> for Error {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Failed => defmt::write!(f, "Failed"),
            Error::BadValue => defmt::write!(f, "BadValue"),
            Error::MissingValue => defmt::write!(f, "MissingValue"),
            Error::OutOfMemory => defmt::write!(f, "OutOfMemory"),
            Error::ParsingError => defmt::write!(f, "ParsingError"),
            Error::ConfigError => defmt::write!(f, "ConfigError"),
            Error::ConfigMissing => defmt::write!(f, "ConfigMissing"),
            Error::Overflow => defmt::write!(f, "Overflow"),
            Error::Ignored => defmt::write!(f, "Ignored"),
        }
    }
}
