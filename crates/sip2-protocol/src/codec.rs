//! Tokio codec for SIP2 frames.
//!
//! SIP2 frames are text terminated by a single message terminator character
//! (carriage return by default). [`SipCodec`] splits a byte stream on that
//! terminator, decodes each frame with the configured [`TextEncoding`] and
//! encodes outgoing frames the same way, so it plugs straight into
//! `tokio_util::codec::Framed`.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use sip2_protocol::SipCodec;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn example() -> sip2_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:6001").await?;
//! let mut framed = Framed::new(stream, SipCodec::default());
//!
//! framed.send("9900802.00AY1AZFCA5\r".to_string()).await?;
//! if let Some(Ok(response)) = framed.next().await {
//!     println!("Received: {response:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Frame size limit
//!
//! A peer that never sends a terminator would make the read buffer grow
//! without bound. Once the buffered bytes exceed the maximum frame size
//! (64 KB by default) decoding fails with `Error::FrameTooLarge`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use sip2_core::{
    Error, Result, Sip2Config, TextEncoding,
    constants::{DEFAULT_MAX_FRAME_SIZE, MESSAGE_TERMINATOR},
};

/// Codec for terminator-delimited SIP2 text frames.
#[derive(Debug, Clone)]
pub struct SipCodec {
    terminator: u8,
    encoding: TextEncoding,
    max_frame_size: usize,
    /// Bytes of the current buffer already searched for a terminator.
    scanned: usize,
}

impl SipCodec {
    /// Create a codec for the given terminator and text encoding.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the terminator is not ASCII.
    pub fn new(message_terminator: char, encoding: TextEncoding) -> Result<Self> {
        if !message_terminator.is_ascii() {
            return Err(Error::Configuration(format!(
                "message terminator {message_terminator:?} is not ASCII"
            )));
        }

        Ok(Self {
            terminator: message_terminator as u8,
            encoding,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            scanned: 0,
        })
    }

    /// Create a codec matching a client configuration.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the configured terminator is not
    /// ASCII.
    pub fn from_config(config: &Sip2Config) -> Result<Self> {
        Ok(Self::new(config.message_terminator, config.encoding)?
            .with_max_frame_size(config.max_frame_size))
    }

    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn take_frame(&mut self, src: &mut BytesMut, len: usize) -> Result<String> {
        self.scanned = 0;
        let frame = src.split_to(len);
        let text = self.encoding.decode(&frame)?;
        // A CR LF terminated stream leaves the LF at the start of the next frame
        Ok(text.trim_start_matches('\n').to_string())
    }
}

impl Default for SipCodec {
    fn default() -> Self {
        Self {
            terminator: MESSAGE_TERMINATOR as u8,
            encoding: TextEncoding::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            scanned: 0,
        }
    }
}

impl Decoder for SipCodec {
    type Item = String;
    type Error = Error;

    /// Extract one frame, terminator included.
    ///
    /// Returns `Ok(None)` until a terminator has been received.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let start = self.scanned.min(src.len());
        let position = src[start..]
            .iter()
            .position(|&b| b == self.terminator)
            .map(|offset| start + offset);

        match position {
            Some(idx) => {
                if idx + 1 > self.max_frame_size {
                    let size = idx + 1;
                    src.advance(size);
                    self.scanned = 0;
                    return Err(Error::FrameTooLarge {
                        size,
                        max_size: self.max_frame_size,
                    });
                }
                self.take_frame(src, idx + 1).map(Some)
            }
            None if src.len() > self.max_frame_size => Err(Error::FrameTooLarge {
                size: src.len(),
                max_size: self.max_frame_size,
            }),
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    /// Like [`decode`](Self::decode), but a peer that closes the connection
    /// right after an unterminated frame still yields that frame.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = src.len();
        let frame = self.take_frame(src, len)?;
        if frame.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Encoder<&str> for SipCodec {
    type Error = Error;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<()> {
        let bytes = self.encoding.encode(item)?;

        if bytes.len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: bytes.len(),
                max_size: self.max_frame_size,
            });
        }

        dst.reserve(bytes.len());
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Encoder<String> for SipCodec {
    type Error = Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&str>::encode(self, item.as_str(), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_default() {
        let codec = SipCodec::default();
        assert_eq!(codec.max_frame_size(), DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(codec.encoding(), TextEncoding::Utf8);
    }

    #[test]
    fn test_codec_rejects_non_ascii_terminator() {
        let result = SipCodec::new('§', TextEncoding::Utf8);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_codec_from_config() {
        let config = Sip2Config {
            message_terminator: '\n',
            max_frame_size: 512,
            encoding: TextEncoding::Latin1,
            ..Sip2Config::new("acs.example.org", 6001)
        };
        let codec = SipCodec::from_config(&config).unwrap();
        assert_eq!(codec.max_frame_size(), 512);
        assert_eq!(codec.encoding(), TextEncoding::Latin1);
    }

    #[test]
    fn test_decode_complete_frame() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&b"941AY1AZFDFC\r"[..]);

        let frame = codec.decode(&mut buffer).unwrap();
        assert_eq!(frame.as_deref(), Some("941AY1AZFDFC\r"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&b"941AY1"[..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"AZFDFC\r");
        let frame = codec.decode(&mut buffer).unwrap();
        assert_eq!(frame.as_deref(), Some("941AY1AZFDFC\r"));
    }

    #[test]
    fn test_decode_multiple_frames_in_buffer() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&b"941\r940\r"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("941\r"));
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("940\r"));
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decode_skips_line_feed_after_cr() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&b"941\r\n940\r\n"[..]);

        codec.decode(&mut buffer).unwrap();
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("940\r"));
    }

    #[test]
    fn test_decode_empty_buffer() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::new();
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut codec = SipCodec::default().with_max_frame_size(10);
        let mut buffer = BytesMut::from("A".repeat(100).as_bytes());

        match codec.decode(&mut buffer) {
            Err(Error::FrameTooLarge { size, max_size }) => {
                assert_eq!(max_size, 10);
                assert!(size > max_size);
            }
            other => panic!("Expected FrameTooLarge error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_terminated_frame_too_large() {
        let mut codec = SipCodec::default().with_max_frame_size(4);
        let mut buffer = BytesMut::from(&b"941AY1\r940\r"[..]);

        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::FrameTooLarge { size: 7, .. })
        ));
        // The oversized frame is discarded, the next one still decodes
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("940\r"));
    }

    #[test]
    fn test_decode_latin1() {
        let mut codec = SipCodec::new('\r', TextEncoding::Latin1).unwrap();
        let mut buffer = BytesMut::from(&[b'6', b'4', b'A', b'E', 0xFC, b'|', b'\r'][..]);
        assert_eq!(codec.decode(&mut buffer).unwrap().as_deref(), Some("64AEü|\r"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&[b'9', b'4', 0xFF, b'\r'][..]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_decode_eof_returns_unterminated_frame() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::from(&b"941AY1AZFDFC"[..]);
        assert_eq!(
            codec.decode_eof(&mut buffer).unwrap().as_deref(),
            Some("941AY1AZFDFC")
        );
        assert!(codec.decode_eof(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_encode_frame() {
        let mut codec = SipCodec::default();
        let mut buffer = BytesMut::new();

        codec.encode("9300CNuser|COpass|AY0AZF83E\r", &mut buffer).unwrap();
        codec.encode("97AZFEF5\r".to_string(), &mut buffer).unwrap();

        assert_eq!(&buffer[..], b"9300CNuser|COpass|AY0AZF83E\r97AZFEF5\r");
    }

    #[test]
    fn test_encode_frame_too_large() {
        let mut codec = SipCodec::default().with_max_frame_size(10);
        let mut buffer = BytesMut::new();

        let result = codec.encode("A".repeat(100), &mut buffer);
        assert!(matches!(
            result,
            Err(Error::FrameTooLarge { size: 100, max_size: 10 })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_encode_latin1_unrepresentable() {
        let mut codec = SipCodec::new('\r', TextEncoding::Latin1).unwrap();
        let mut buffer = BytesMut::new();
        assert!(matches!(
            codec.encode("AE€\r", &mut buffer),
            Err(Error::InvalidEncoding { .. })
        ));
    }
}
