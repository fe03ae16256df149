//! Response decoding.
//!
//! A SIP2 response is a command code, a block of fixed width fields whose
//! widths depend on the message type, and a block of tagged variable fields.
//! [`VariableFields`] owns the variable block; [`ParsedResponse`] combines it
//! with constant-offset extraction driven by a [`ResponseLayout`].
//!
//! # Examples
//!
//! ```
//! use sip2_core::FrameOptions;
//! use sip2_protocol::response::VariableFields;
//!
//! let fields = VariableFields::decode("AOINST|AApatron1|AApatron2|AY1AZF2B6", 0, &FrameOptions::default());
//!
//! assert_eq!(fields.get("AO"), Some(&["INST".to_string()][..]));
//! assert_eq!(fields.get("AA").map(|v| v.len()), Some(2));
//! assert_eq!(fields.checksum(), "F2B6");
//! ```

use crate::checksum::trim_frame;
use serde::Serialize;
use sip2_core::{
    Error, FrameOptions, Result, SipTimestamp,
    constants::{CHECKSUM_LENGTH, COMMAND_CODE_LENGTH, TAG_CHECKSUM, TAG_LENGTH},
};
use std::collections::BTreeMap;

/// Variable field block of a response, grouped by tag.
///
/// Tags may repeat (one `AS` per hold item, one `AF` per screen message line),
/// so every tag maps to the ordered list of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableFields {
    fields: BTreeMap<String, Vec<String>>,
    raw: Vec<String>,
    checksum: String,
}

impl VariableFields {
    /// Decode the variable region of `raw`, starting at character `start`.
    ///
    /// With checksums enabled the last four characters are taken as the
    /// checksum and removed together with a preceding `AZ` tag. The remaining
    /// region is split on the field terminator. Every segment is kept in
    /// [`raw`](Self::raw); non-empty segments are grouped by their first two
    /// characters.
    pub fn decode(raw: &str, start: usize, options: &FrameOptions) -> Self {
        let mut body = trim_frame(raw);
        let mut checksum = String::new();

        if options.checksum {
            if let Some((idx, _)) = body.char_indices().rev().nth(CHECKSUM_LENGTH - 1) {
                checksum = body[idx..].to_string();
                body = &body[..idx];
                body = body.strip_suffix(TAG_CHECKSUM).unwrap_or(body);
            } else {
                checksum = body.to_string();
                body = "";
            }
        }

        let region = match body.char_indices().nth(start) {
            Some((idx, _)) => &body[idx..],
            None => "",
        };

        let mut decoded = VariableFields {
            checksum,
            ..Self::default()
        };

        if region.is_empty() {
            return decoded;
        }

        for segment in region.split(options.field_terminator) {
            decoded.raw.push(segment.to_string());
            if segment.is_empty() {
                continue;
            }

            let (tag, value) = split_tag(segment);
            decoded
                .fields
                .entry(tag.to_string())
                .or_default()
                .push(value.to_string());
        }

        decoded
    }

    /// All values recorded for `tag`, in order of appearance.
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.fields.get(tag).map(Vec::as_slice)
    }

    /// First value recorded for `tag`.
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.fields
            .get(tag)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.fields.contains_key(tag)
    }

    /// Tags present in the response.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Every segment of the variable region before grouping, including empty
    /// segments produced by a trailing terminator.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Checksum digits received with the response, empty when checksums are
    /// disabled.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Free-function form of [`VariableFields::decode`].
pub fn decode_variable(raw: &str, start: usize, options: &FrameOptions) -> VariableFields {
    VariableFields::decode(raw, start, options)
}

fn split_tag(segment: &str) -> (&str, &str) {
    match segment.char_indices().nth(TAG_LENGTH) {
        Some((idx, _)) => segment.split_at(idx),
        None => (segment, ""),
    }
}

/// One fixed width field of a response layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedField {
    pub name: &'static str,
    pub width: usize,
}

impl FixedField {
    pub const fn new(name: &'static str, width: usize) -> Self {
        FixedField { name, width }
    }
}

/// Fixed region layout of one response message type.
///
/// Fields follow the command code back to back; the variable region starts
/// right after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLayout {
    pub code: &'static str,
    pub fixed: &'static [FixedField],
}

impl ResponseLayout {
    pub const fn new(code: &'static str, fixed: &'static [FixedField]) -> Self {
        ResponseLayout { code, fixed }
    }

    /// Character offset at which the variable region begins.
    pub fn variable_start(&self) -> usize {
        COMMAND_CODE_LENGTH + self.fixed.iter().map(|f| f.width).sum::<usize>()
    }
}

/// A decoded response: fixed fields by name plus the variable block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    pub code: String,
    pub fixed: BTreeMap<&'static str, String>,
    pub variable: VariableFields,
}

impl ParsedResponse {
    /// Decode `raw` with the given layout.
    ///
    /// Fixed fields are plain substrings at constant offsets; a response that
    /// is shorter than its layout yields shortened or empty values.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the response does not start
    /// with the layout's command code.
    pub fn parse(raw: &str, layout: &ResponseLayout, options: &FrameOptions) -> Result<Self> {
        let code: String = raw.chars().take(COMMAND_CODE_LENGTH).collect();
        if code != layout.code {
            return Err(Error::InvalidMessageFormat {
                message: format!("expected response {}, received {:?}", layout.code, code),
            });
        }

        let mut fixed = BTreeMap::new();
        let mut chars = raw.chars().skip(COMMAND_CODE_LENGTH);
        for field in layout.fixed {
            let value: String = chars.by_ref().take(field.width).collect();
            fixed.insert(field.name, value);
        }

        Ok(ParsedResponse {
            code,
            fixed,
            variable: VariableFields::decode(raw, layout.variable_start(), options),
        })
    }

    /// Raw text of a fixed field.
    pub fn fixed(&self, name: &str) -> Option<&str> {
        self.fixed.get(name).map(String::as_str)
    }

    /// A single character fixed field read as a flag (`Y` or `1`).
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.fixed(name)? {
            "Y" | "1" => Some(true),
            "N" | "0" => Some(false),
            _ => None,
        }
    }

    /// A numeric fixed field such as an item count.
    pub fn count(&self, name: &str) -> Option<u32> {
        self.fixed(name)?.trim().parse().ok()
    }

    /// A date fixed field.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the field is missing or not a
    /// SIP2 timestamp.
    pub fn timestamp(&self, name: &str) -> Result<SipTimestamp> {
        let value = self.fixed(name).ok_or_else(|| Error::InvalidMessageFormat {
            message: format!("no fixed field named {name}"),
        })?;
        SipTimestamp::parse(value)
    }

    pub fn first(&self, tag: &str) -> Option<&str> {
        self.variable.first(tag)
    }

    pub fn all(&self, tag: &str) -> &[String] {
        self.variable.get(tag).unwrap_or_default()
    }
}
