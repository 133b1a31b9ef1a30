//! Query string parsing for the QR endpoint.

use qrcode::EcLevel;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_BOX_SIZE: u32 = 10;
const MAX_BOX_SIZE: u32 = 50;
const DEFAULT_BORDER: u32 = 4;
const MAX_BORDER: u32 = 100;
const MAX_VERSION: i16 = 40;

/// A query argument that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// `data` was not supplied.
    #[error("Missing required `data` GET argument")]
    MissingData,

    /// The named argument had an unusable value.
    #[error("Invalid argument value ({0})")]
    Invalid(&'static str),
}

/// Rendering options taken from the request query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOptions {
    /// Payload to encode.
    pub data: String,
    /// Symbol version, chosen automatically when `None`.
    pub version: Option<i16>,
    /// Error correction level.
    pub error_correction: EcLevel,
    /// Pixels per module edge.
    pub box_size: u32,
    /// Quiet zone width in modules.
    pub border: u32,
    /// Answer with a JSON data URL instead of raw PNG.
    pub base64: bool,
}

impl QrOptions {
    /// Options for `data` with every other argument at its default.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            version: None,
            error_correction: EcLevel::M,
            box_size: DEFAULT_BOX_SIZE,
            border: DEFAULT_BORDER,
            base64: false,
        }
    }

    /// Parses and validates the query parameters.
    ///
    /// Arguments are checked in a fixed order and the first failure is
    /// reported.
    ///
    /// # Errors
    ///
    /// [`ArgumentError::MissingData`] when `data` is absent, otherwise
    /// [`ArgumentError::Invalid`] naming the offending argument.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qrgate::{ArgumentError, QrOptions};
    /// use std::collections::HashMap;
    ///
    /// let mut query = HashMap::new();
    /// query.insert("data".to_string(), "hello".to_string());
    /// query.insert("box_size".to_string(), "4".to_string());
    ///
    /// let options = QrOptions::from_query(&query).unwrap();
    /// assert_eq!(options.box_size, 4);
    ///
    /// query.insert("version".to_string(), "41".to_string());
    /// assert_eq!(
    ///     QrOptions::from_query(&query),
    ///     Err(ArgumentError::Invalid("version"))
    /// );
    /// ```
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ArgumentError> {
        let data = query.get("data").ok_or(ArgumentError::MissingData)?;
        let mut options = Self::new(data.as_str());

        options.version = optional_int_arg(query, "version")?;
        if matches!(options.version, Some(v) if !(1..=MAX_VERSION).contains(&v)) {
            return Err(ArgumentError::Invalid("version"));
        }

        let level = choice_arg(query, "error_correction", &["l", "m", "q", "h"])?;
        options.error_correction = match level {
            Some("l") => EcLevel::L,
            Some("q") => EcLevel::Q,
            Some("h") => EcLevel::H,
            _ => EcLevel::M,
        };

        options.box_size = int_arg(query, "box_size", DEFAULT_BOX_SIZE)?;
        if !(1..=MAX_BOX_SIZE).contains(&options.box_size) {
            return Err(ArgumentError::Invalid("box_size"));
        }

        options.border = int_arg(query, "border", DEFAULT_BORDER)?;
        if options.border > MAX_BORDER {
            return Err(ArgumentError::Invalid("border"));
        }

        options.base64 = bool_arg(query, "base64", false)?;

        Ok(options)
    }
}

fn optional_int_arg<T: FromStr>(
    query: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ArgumentError> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => raw
            .parse()
            .map(Some)
            .map_err(|_| ArgumentError::Invalid(name)),
        Some(_) => Err(ArgumentError::Invalid(name)),
    }
}

fn int_arg<T: FromStr>(
    query: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ArgumentError> {
    Ok(optional_int_arg(query, name)?.unwrap_or(default))
}

fn bool_arg(
    query: &HashMap<String, String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ArgumentError> {
    let Some(raw) = query.get(name) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "" | "0" | "no" | "n" | "false" => Ok(false),
        "1" | "yes" | "y" | "true" => Ok(true),
        _ => Err(ArgumentError::Invalid(name)),
    }
}

fn choice_arg(
    query: &HashMap<String, String>,
    name: &'static str,
    choices: &[&'static str],
) -> Result<Option<&'static str>, ArgumentError> {
    let Some(raw) = query.get(name) else {
        return Ok(None);
    };
    let lowered = raw.to_ascii_lowercase();
    choices
        .iter()
        .copied()
        .find(|choice| *choice == lowered)
        .map(Some)
        .ok_or(ArgumentError::Invalid(name))
}
