//! WAM message frames.

use std::fmt;

/// Data slot of a WAM controller message.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WamData {
    #[default]
    None,
    Number(f64),
    Text(String),
}

impl WamData {
    /// Numeric content, parsing text if needed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::None => None,
        }
    }

    /// Text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for `None` and for empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }
}

/// One `(verb, prop, data)` controller message.
#[derive(Debug, Clone, PartialEq)]
pub struct WamFrame {
    pub verb: String,
    pub prop: String,
    pub data: WamData,
}

impl WamFrame {
    pub fn new(verb: impl Into<String>, prop: impl Into<String>, data: WamData) -> Self {
        Self {
            verb: verb.into(),
            prop: prop.into(),
            data,
        }
    }
}

impl fmt::Display for WamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.verb, self.prop)?;
        match &self.data {
            WamData::None => Ok(()),
            WamData::Number(n) => write!(f, " {}", n),
            WamData::Text(s) => write!(f, " ({} chars)", s.len()),
        }
    }
}
