use crate::{
    Result,
    constants::{TIMESTAMP_FORMAT, TIMESTAMP_LENGTH},
    error::Error,
};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SIP2 date/time stamp (`YYYYMMDD    HHMMSS`, local time)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipTimestamp(DateTime<Local>);

impl SipTimestamp {
    pub fn new(datetime: DateTime<Local>) -> Self {
        SipTimestamp(datetime)
    }

    pub fn now() -> Self {
        SipTimestamp(Local::now())
    }

    /// Build a timestamp from a Unix timestamp in seconds.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the value is out of range.
    pub fn from_unix(secs: i64) -> Result<Self> {
        Local
            .timestamp_opt(secs, 0)
            .single()
            .map(SipTimestamp)
            .ok_or_else(|| Error::InvalidMessageFormat {
                message: format!("Timestamp out of range: {secs}"),
            })
    }

    /// Parse a timestamp from the 18 character wire format.
    ///
    /// The four zone characters are not interpreted; the date is read as
    /// local time whether they are blank or carry a marker such as `   Z`.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the text is not exactly
    /// `YYYYMMDDZZZZHHMMSS`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidMessageFormat {
            message: format!("Invalid SIP2 timestamp '{s}': {reason}"),
        };

        if !s.is_ascii() || s.len() != TIMESTAMP_LENGTH {
            return Err(invalid("expected 18 characters"));
        }
        let (date, rest) = s.split_at(8);
        let time = &rest[4..];
        if !date.bytes().chain(time.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected digits"));
        }

        let date =
            NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|e| invalid(&e.to_string()))?;
        let time =
            NaiveTime::parse_from_str(time, "%H%M%S").map_err(|e| invalid(&e.to_string()))?;

        Local
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(SipTimestamp)
            .ok_or_else(|| Error::InvalidMessageFormat {
                message: format!("Ambiguous local time: {s}"),
            })
    }

    #[must_use]
    pub fn format(&self) -> String {
        self.0.format(TIMESTAMP_FORMAT).to_string()
    }

    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Local> {
        &self.0
    }
}

impl fmt::Display for SipTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Character encoding used on the wire by the ACS.
///
/// Most servers speak UTF-8; some older installations still send Latin-1
/// (ISO-8859-1) text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    /// Encode text for transmission.
    ///
    /// # Errors
    /// Returns `Error::InvalidEncoding` if a character cannot be represented
    /// in Latin-1.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| Error::InvalidEncoding {
                        encoding: self.name(),
                        message: format!("character {c:?} has no Latin-1 representation"),
                    })
                })
                .collect(),
        }
    }

    /// Decode bytes received from the ACS.
    ///
    /// # Errors
    /// Returns `Error::InvalidEncoding` if the bytes are not valid UTF-8.
    /// Latin-1 decoding never fails.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => {
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::InvalidEncoding {
                    encoding: self.name(),
                    message: e.to_string(),
                })
            }
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_timestamp_round_trip() {
        let ts = SipTimestamp::parse("20160419    122008").unwrap();
        assert_eq!(ts.format(), "20160419    122008");
        assert_eq!(ts.to_string().len(), 18);
    }

    #[rstest]
    #[case("2016-04-19 12:20:08")]
    #[case("20160419122008")]
    #[case("20160419 122008")]
    #[case("20160419    1220089")]
    #[case("2016041a    122008")]
    #[case("20161319    122008")]
    #[case("20160419    ü22008")]
    #[case("")]
    fn test_timestamp_invalid(#[case] input: &str) {
        assert!(SipTimestamp::parse(input).is_err());
    }

    #[test]
    fn test_timestamp_accepts_zone_marker() {
        let blank = SipTimestamp::parse("20160419    122008").unwrap();
        let utc = SipTimestamp::parse("20160419   Z122008").unwrap();
        assert_eq!(blank, utc);
        assert_eq!(utc.format(), "20160419    122008");
    }

    #[test]
    fn test_timestamp_now_has_wire_width() {
        assert_eq!(SipTimestamp::now().format().len(), 18);
    }

    #[rstest]
    #[case(TextEncoding::Utf8, "AEMüller|", "AEMüller|".as_bytes().to_vec())]
    #[case(TextEncoding::Latin1, "AEMüller|", vec![b'A', b'E', b'M', 0xFC, b'l', b'l', b'e', b'r', b'|'])]
    fn test_encoding_round_trip(
        #[case] encoding: TextEncoding,
        #[case] text: &str,
        #[case] bytes: Vec<u8>,
    ) {
        assert_eq!(encoding.encode(text).unwrap(), bytes);
        assert_eq!(encoding.decode(&bytes).unwrap(), text);
    }

    #[test]
    fn test_latin1_rejects_wide_chars() {
        let result = TextEncoding::Latin1.encode("AJ€");
        assert!(matches!(result, Err(Error::InvalidEncoding { .. })));
    }

    #[test]
    fn test_utf8_rejects_invalid_bytes() {
        let result = TextEncoding::Utf8.decode(&[0x39, 0x34, 0xFF]);
        assert!(matches!(result, Err(Error::InvalidEncoding { .. })));
    }

    #[test]
    fn test_encoding_serde_names() {
        let enc: TextEncoding = serde_json::from_str("\"latin1\"").unwrap();
        assert_eq!(enc, TextEncoding::Latin1);
        assert_eq!(serde_json::to_string(&TextEncoding::Utf8).unwrap(), "\"utf8\"");
    }
}
