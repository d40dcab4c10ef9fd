//! Error types for the codec crate.

use osmsync_core::CoreError;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading or writing OSM XML.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The input is not well-formed XML.
    #[error("malformed XML: {message}")]
    Xml {
        /// Description from the XML reader.
        message: String,
    },

    /// A required attribute is absent.
    #[error("<{element}> is missing attribute '{key}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        key: String,
    },

    /// An element appeared where a different one was expected.
    #[error("unexpected element <{found}>, expected {expected}")]
    UnexpectedElement {
        /// What was expected.
        expected: String,
        /// Name of the element found.
        found: String,
    },

    /// The document structure is invalid.
    #[error("invalid document structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Decoded data violates the primitive model.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Reading or writing a file failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error.
        message: String,
    },
}

impl CodecError {
    /// Create a malformed XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(element: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            key: key.into(),
        }
    }

    /// Create an unexpected element error.
    pub fn unexpected_element(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedElement {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(value: quick_xml::Error) -> Self {
        Self::xml(value.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CodecError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Self::xml(value.to_string())
    }
}

impl From<std::io::Error> for CodecError {
    fn from(value: std::io::Error) -> Self {
        Self::Io {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_element_and_key() {
        let err = CodecError::missing_attribute("nd", "ref");
        assert_eq!(err.to_string(), "<nd> is missing attribute 'ref'");
    }

    #[test]
    fn core_errors_pass_through() {
        let err = CodecError::from(CoreError::invalid_attribute("version", "x"));
        assert_eq!(err.to_string(), "invalid value \"x\" for attribute 'version'");
    }
}
