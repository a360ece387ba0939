//! Declared numeric reply formatting
//!
//! Instrument protocols fix the byte-level rendering of every numeric
//! field: width, decimal places, zero padding, explicit sign. Handlers
//! render through the [`NumberFormat`] declared for a field so that any
//! two commands emitting the same logical value produce identical byte
//! strings; conformance tests compare exact bytes.

use serde::{Deserialize, Serialize};

/// Fixed rendering of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NumberFormat {
    /// Decimal places; `None` renders shortest form
    pub precision: Option<usize>,
    /// Minimum total width, including sign
    pub width: Option<usize>,
    /// Pad to width with leading zeros (after the sign) instead of spaces
    pub zero_pad: bool,
    /// Emit an explicit `+` on non-negative values
    pub plus_sign: bool,
}

impl NumberFormat {
    /// Fixed decimal places, natural width
    pub const fn fixed(precision: usize) -> Self {
        Self {
            precision: Some(precision),
            width: None,
            zero_pad: false,
            plus_sign: false,
        }
    }

    /// Rounded integer rendering
    pub const fn integer() -> Self {
        Self::fixed(0)
    }

    /// Set the minimum width
    pub const fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Pad with leading zeros
    pub const fn zero_pad(mut self) -> Self {
        self.zero_pad = true;
        self
    }

    /// Emit an explicit plus sign on non-negative values
    pub const fn plus_sign(mut self) -> Self {
        self.plus_sign = true;
        self
    }

    /// Render a value to its declared byte string
    pub fn format(&self, value: f64) -> String {
        let body = match self.precision {
            Some(p) => format!("{value:.p$}"),
            None => format!("{value}"),
        };

        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest.to_string()),
            None if self.plus_sign => ("+", body),
            None => ("", body),
        };

        match self.width {
            Some(width) if sign.len() + digits.len() < width => {
                let pad = width - sign.len() - digits.len();
                if self.zero_pad {
                    format!("{sign}{}{digits}", "0".repeat(pad))
                } else {
                    format!("{}{sign}{digits}", " ".repeat(pad))
                }
            }
            _ => format!("{sign}{digits}"),
        }
    }
}
