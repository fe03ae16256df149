//! Integration tests for Sip2Client over plain TCP.
//!
//! These tests run the client against a mock ACS on localhost and cover the
//! connect-execute-disconnect cycle, checksum resends, timeouts and the
//! session wrapper.

mod common;

use common::{TEST_DATE, acs_frame, corrupt_frame, plain_config, request_sequence, spawn_acs};
use sip2_core::Sip2Config;
use sip2_network::{ClientError, ConnectionMode, Session, SessionError, Sip2Client};
use sip2_protocol::commands::{Checkout, Login, PatronStatus, Summary};
use tokio::net::TcpListener;

fn login_response(frame: &str) -> Option<String> {
    Some(acs_frame("941", request_sequence(frame)))
}

#[tokio::test]
async fn test_full_lifecycle_plain() {
    let (port, received) = spawn_acs(login_response).await;

    let mut client = Sip2Client::new(plain_config(port));
    assert!(!client.is_connected());

    let mode = client.connect().await.unwrap();
    assert_eq!(mode, ConnectionMode::Plain);
    assert!(client.is_connected());
    assert_eq!(client.mode(), Some(ConnectionMode::Plain));

    let response = client.request(&Login::new("sc01", "pw")).await.unwrap();
    assert_eq!(response.flag("Ok"), Some(true));

    client.disconnect().await;
    assert!(!client.is_connected());
    assert_eq!(client.mode(), None);

    let frames = received.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].starts_with("9300CNsc01|COpw|"));
}

#[tokio::test]
async fn test_tls_disabled_sends_no_handshake() {
    let (port, received) = spawn_acs(login_response).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();
    client.request(&Login::new("sc01", "pw")).await.unwrap();

    let frames = received.lock().unwrap();
    assert!(!frames[0].starts_with('\u{16}'), "TLS ClientHello sent");
    assert!(frames[0].starts_with("93"));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = Sip2Client::new(plain_config(port));
    let result = client.connect().await;

    match result {
        Err(ClientError::Connection { host, port: p, .. }) => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(p, port);
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_checksum_failure_without_retries() {
    let (port, received) =
        spawn_acs(|frame| Some(corrupt_frame("941", request_sequence(frame)))).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let result = client.execute("9300CNuser|COpass|AY0AZF83E\r").await;
    assert!(matches!(result, Err(ClientError::ChecksumExhausted { attempts: 1 })));
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checksum_retries_exhausted() {
    let (port, received) =
        spawn_acs(|frame| Some(corrupt_frame("941", request_sequence(frame)))).await;

    let config = Sip2Config {
        max_retries: 2,
        ..plain_config(port)
    };
    let mut client = Sip2Client::new(config);
    client.connect().await.unwrap();

    let result = client.execute("9300CNuser|COpass|AY0AZF83E\r").await;
    assert!(matches!(result, Err(ClientError::ChecksumExhausted { attempts: 3 })));
    assert_eq!(client.retry_count(), 3);
    assert_eq!(received.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_checksum_retry_recovers() {
    let mut answered = 0;
    let (port, received) = spawn_acs(move |frame| {
        answered += 1;
        let seq = request_sequence(frame);
        if answered <= 2 {
            Some(corrupt_frame("941", seq))
        } else {
            Some(acs_frame("941", seq))
        }
    })
    .await;

    let config = Sip2Config {
        max_retries: 2,
        ..plain_config(port)
    };
    let mut client = Sip2Client::new(config);
    client.connect().await.unwrap();

    let response = client.execute("9300CNuser|COpass|AY0AZF83E\r").await.unwrap();
    assert_eq!(response, acs_frame("941", 0));
    assert_eq!(client.retry_count(), 0);

    // Resends repeat the original request byte for byte
    let frames = received.lock().unwrap();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f == "9300CNuser|COpass|AY0AZF83E\r"));
}

#[tokio::test]
async fn test_checksum_disabled_accepts_any_response() {
    let (port, _) = spawn_acs(|_| Some("941AY0AZ0000\r".to_string())).await;

    let config = Sip2Config {
        checksum: false,
        ..plain_config(port)
    };
    let mut client = Sip2Client::new(config);
    client.connect().await.unwrap();

    let response = client.request(&Login::new("user", "pass")).await.unwrap();
    assert_eq!(response.flag("Ok"), Some(true));
    assert_eq!(client.last_request(), Some("9300CNuser|COpass|AY0\r"));
}

#[tokio::test]
async fn test_server_closes_connection() {
    let (port, _) = spawn_acs(|_| None).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let result = client.request(&Login::new("user", "pass")).await;
    assert!(matches!(result, Err(ClientError::ConnectionLost(_))));
}

#[tokio::test]
async fn test_read_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    });

    let config = Sip2Config {
        socket_timeout_ms: 200,
        ..plain_config(port)
    };
    let mut client = Sip2Client::new(config);
    client.connect().await.unwrap();

    let result = client.execute("9300CNuser|COpass|AY0AZF83E\r").await;
    assert!(matches!(result, Err(ClientError::ReadTimeout(200))));
}

#[tokio::test]
async fn test_last_request_and_response() {
    let (port, _) = spawn_acs(login_response).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();
    client.execute("9300CNuser|COpass|AY0AZF83E\r").await.unwrap();

    assert_eq!(client.last_request(), Some("9300CNuser|COpass|AY0AZF83E\r"));
    assert_eq!(client.last_response(), Some(acs_frame("941", 0).as_str()));
}

#[tokio::test]
async fn test_request_resend_returns_last_response() {
    let mut last = String::new();
    let (port, received) = spawn_acs(move |frame| {
        if frame.starts_with("97") {
            return Some(last.clone());
        }
        last = acs_frame("941", request_sequence(frame));
        Some(last.clone())
    })
    .await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let first = client.execute("9300CNuser|COpass|AY0AZF83E\r").await.unwrap();
    let repeated = client.request_resend().await.unwrap();
    assert_eq!(first, repeated);
    assert_eq!(received.lock().unwrap()[1], "97AZFEF5\r");
}

#[tokio::test]
async fn test_sequence_advances_per_request() {
    let (port, received) = spawn_acs(|frame| {
        Some(acs_frame(
            &format!("24              000{TEST_DATE}AOTUB|AAP1|BLY|"),
            request_sequence(frame),
        ))
    })
    .await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();
    for _ in 0..3 {
        client.request(&PatronStatus).await.unwrap();
    }

    let sequences: Vec<u8> = received
        .lock()
        .unwrap()
        .iter()
        .map(|f| request_sequence(f))
        .collect();
    assert_eq!(sequences, vec![0, 1, 2]);
}

/// Mock ACS answering the messages a patron session needs.
fn library_acs(frame: &str) -> Option<String> {
    let seq = request_sequence(frame);
    let body = match &frame[..2] {
        "93" => "941".to_string(),
        "99" => format!("98YYYYNN100003{TEST_DATE}2.00AOTUB|BXYYYYYYYYYYYYYNNN|"),
        "23" => format!(
            "24              001{TEST_DATE}AOTUB|AAP123|AEJane Roe|BLY|CQY|AFFines due|AFSee desk|"
        ),
        "63" => format!(
            "64              001{TEST_DATE}000000000002000000000000AOTUB|AAP123|BV4.50|\
             AUB100|AUB200|CGF1|FA2.00|FBOverdue|CGF2|FA2.50|FBLost item|"
        ),
        "11" => format!("121NNY{TEST_DATE}AOTUB|AAP123|ABB300|AJNew Book|"),
        "35" => format!("36Y{TEST_DATE}AOTUB|AAP123|"),
        _ => return None,
    };
    Some(acs_frame(&body, seq))
}

#[tokio::test]
async fn test_session_flow() {
    let (port, received) = spawn_acs(library_acs).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.context_mut().institution_id = "TUB".to_string();
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    session.login_device("sc01", "secret", true).await.unwrap();
    assert!(session.acs_status().is_some());

    assert!(session.login_patron("P123", "1234").await.unwrap());
    assert!(session.in_patron_session());
    assert_eq!(session.client().context().patron, "P123");

    let items = session.patron_items(Summary::Charged).await.unwrap();
    assert_eq!(items, vec!["B100", "B200"]);

    let checkout = session.request(&Checkout::new("B300")).await.unwrap();
    assert_eq!(checkout.first("AJ"), Some("New Book"));

    session.end_patron_session().await.unwrap();
    assert!(!session.in_patron_session());
    assert!(session.client().context().patron.is_empty());

    let codes: Vec<String> = received
        .lock()
        .unwrap()
        .iter()
        .map(|f| f[..2].to_string())
        .collect();
    assert_eq!(codes, vec!["93", "99", "23", "63", "11", "35"]);
}

#[tokio::test]
async fn test_session_patron_fees_and_messages() {
    let (port, _) = spawn_acs(library_acs).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    assert!(session.login_patron("P123", "1234").await.unwrap());
    assert_eq!(session.patron_screen_messages(), ["Fines due", "See desk"]);

    assert_eq!(session.patron_fines_total().await.unwrap(), 4.5);

    let fees = session.patron_fee_items().await.unwrap();
    assert_eq!(fees.keys().copied().collect::<Vec<_>>(), vec!["CG", "FA", "FB"]);
    assert_eq!(fees["CG"], ["F1", "F2"]);
    assert_eq!(fees["FA"], ["2.00", "2.50"]);
    assert_eq!(fees["FB"], ["Overdue", "Lost item"]);
}

#[tokio::test]
async fn test_session_fines_default_to_zero() {
    let (port, _) = spawn_acs(|frame| {
        let body = match &frame[..2] {
            "23" => format!("24              001{TEST_DATE}AOTUB|AAP123|BLY|"),
            "63" => format!("64              001{TEST_DATE}000000000000000000000000AOTUB|AAP123|"),
            _ => return None,
        };
        Some(acs_frame(&body, request_sequence(frame)))
    })
    .await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    assert!(session.login_patron("P123", "").await.unwrap());
    assert!(session.patron_screen_messages().is_empty());
    assert_eq!(session.patron_fines_total().await.unwrap(), 0.0);
    assert!(session.patron_fee_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_refuses_unsupported_command() {
    let (port, received) = spawn_acs(library_acs).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    session.login_device("sc01", "secret", true).await.unwrap();

    // BX ends in NNN: hold, renew and renew all are not supported
    let result = session
        .request(&sip2_protocol::commands::RenewAll::default())
        .await;
    assert!(matches!(result, Err(SessionError::Unsupported(_))));
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_login_rejected() {
    let (port, _) =
        spawn_acs(|frame| Some(acs_frame("940", request_sequence(frame)))).await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    let result = session.login_device("sc01", "wrong", true).await;
    assert!(matches!(result, Err(SessionError::LoginFailed)));
}

#[tokio::test]
async fn test_session_invalid_patron_password() {
    let (port, _) = spawn_acs(|frame| {
        Some(acs_frame(
            &format!("24              001{TEST_DATE}AOTUB|AAP123|BLY|CQN|"),
            request_sequence(frame),
        ))
    })
    .await;

    let mut client = Sip2Client::new(plain_config(port));
    client.connect().await.unwrap();

    let mut session = Session::new(client);
    assert!(!session.login_patron("P123", "wrong").await.unwrap());
    assert!(!session.in_patron_session());
    assert!(session.patron_status().is_some());
}
