//! Cancellation behavior around the send window.

use std::sync::Arc;

use prism::config::DataSource;
use prism::xmla::{CancelObservation, CancelToken, NoCredentials, XmlaClient, XmlaError};

fn dead_endpoint() -> DataSource {
    DataSource {
        name: "ds".to_string(),
        // discard port on loopback; connections are refused immediately
        url: "http://127.0.0.1:9/xmla".to_string(),
        catalog: "Sales".to_string(),
        ..DataSource::default()
    }
}

#[test]
fn cancel_before_send_skips_the_network_entirely() {
    let client = XmlaClient::new(&dead_endpoint(), Arc::new(NoCredentials)).unwrap();

    let token = CancelToken::new();
    assert_eq!(token.cancel(), CancelObservation::NotSent);

    // the endpoint refuses connections, so reaching the wire would
    // surface a transport error; Cancelled proves no call was attempted
    let result = client.execute("SELECT {} ON COLUMNS FROM [Sales]", &token);
    assert!(matches!(result, Err(XmlaError::Cancelled)));
}

#[test]
fn failure_after_cancel_is_swallowed_as_cancelled() {
    // A request already on the wire gets its connection torn down right
    // after the token is marked; the surfaced condition is Cancelled,
    // not the underlying transport error.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let ds = DataSource {
        name: "ds".to_string(),
        url: format!("http://{addr}/xmla"),
        catalog: "Sales".to_string(),
        ..DataSource::default()
    };
    let client = XmlaClient::new(&ds, Arc::new(NoCredentials)).unwrap();

    let token = CancelToken::new();
    let t2 = token.clone();
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // the request is on the wire; mark the token, then slam the door
        t2.cancel();
        drop(stream);
    });

    let result = client.execute("SELECT {} ON COLUMNS FROM [Sales]", &token);
    server.join().unwrap();
    assert!(matches!(result, Err(XmlaError::Cancelled)));
}

#[test]
fn uncancelled_transport_failure_propagates() {
    let client = XmlaClient::new(&dead_endpoint(), Arc::new(NoCredentials)).unwrap();
    let token = CancelToken::new();
    let result = client.execute("SELECT {} ON COLUMNS FROM [Sales]", &token);
    assert!(matches!(result, Err(XmlaError::Transport(_))));
}

#[test]
fn token_observation_order() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled());
    // nothing in flight, so a second cancel still observes NotSent
    assert_eq!(token.cancel(), CancelObservation::NotSent);
}
