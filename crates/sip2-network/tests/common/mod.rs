//! Mock ACS helpers for the network integration tests.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use sip2_core::{Sip2Config, TlsConfig};
use sip2_protocol::{SipCodec, checksum};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

pub const TEST_DATE: &str = "20160419    122008";

/// Client configuration for a plain TCP ACS on localhost.
pub fn plain_config(port: u16) -> Sip2Config {
    Sip2Config {
        socket_timeout_ms: 1000,
        tls: TlsConfig::disabled(),
        ..Sip2Config::new("127.0.0.1", port)
    }
}

/// Append `AY<seq>AZ<checksum>` and a carriage return to a response body.
pub fn acs_frame(body: &str, seq: u8) -> String {
    let mut frame = format!("{body}AY{seq}AZ");
    let crc = checksum::compute(&frame);
    frame.push_str(&crc);
    frame.push('\r');
    frame
}

/// Like [`acs_frame`] but with a checksum that never matches.
pub fn corrupt_frame(body: &str, seq: u8) -> String {
    let good = acs_frame(body, seq);
    let crc = &good[good.len() - 5..good.len() - 1];
    let bad = if crc == "0000" { "0001" } else { "0000" };
    format!("{body}AY{seq}AZ{bad}\r")
}

/// Sequence digit of a request frame, 0 when it carries none.
pub fn request_sequence(frame: &str) -> u8 {
    frame
        .find("AY")
        .and_then(|i| frame[i + 2..].bytes().next())
        .filter(u8::is_ascii_digit)
        .map_or(0, |b| b - b'0')
}

/// Frames received by a mock ACS, in order.
pub type Received = Arc<Mutex<Vec<String>>>;

/// Serve one connection on a fresh port.
///
/// `handler` sees every request frame and returns the response to write,
/// or `None` to close the connection.
pub async fn spawn_acs<F>(mut handler: F) -> (u16, Received)
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&received);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, SipCodec::default());

        while let Some(Ok(frame)) = framed.next().await {
            log.lock().unwrap().push(frame.clone());
            match handler(&frame) {
                Some(response) => {
                    if framed.send(response).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    });

    (port, received)
}
