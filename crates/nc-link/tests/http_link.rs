//! HttpLink against a throwaway local server.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use nc_link::{HttpLink, LinkError, PlantLink};

/// Serve `responses` in order, one per connection, and report each request line.
fn serve(responses: Vec<&'static str>) -> (u16, mpsc::Receiver<String>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // drain headers
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            tx.send(request_line.trim_end().to_string()).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    (port, rx, handle)
}

#[test]
fn read_returns_trimmed_body() {
    let (port, rx, handle) = serve(vec![
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 8\r\n\r\n312,75\r\n",
    ]);
    let mut link = HttpLink::new("127.0.0.1", port).with_timeout(Duration::from_secs(5));

    assert_eq!(link.read("CORE_TEMP").unwrap(), "312,75");
    assert_eq!(rx.recv().unwrap(), "GET /?variable=CORE_TEMP HTTP/1.1");
    handle.join().unwrap();
}

#[test]
fn write_posts_value_in_query() {
    let (port, rx, handle) = serve(vec!["HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]);
    let mut link = HttpLink::new("127.0.0.1", port);

    link.write("RODS_POS_ORDERED", "42.5").unwrap();
    assert_eq!(
        rx.recv().unwrap(),
        "POST /?variable=RODS_POS_ORDERED&value=42.5 HTTP/1.1"
    );
    handle.join().unwrap();
}

#[test]
fn error_status_is_reported() {
    let (port, _rx, handle) = serve(vec![
        "HTTP/1.1 404 Not Found\r\nContent-Length: 16\r\n\r\nunknown variable",
    ]);
    let mut link = HttpLink::new("127.0.0.1", port);

    match link.read("NOT_A_VARIABLE") {
        Err(LinkError::Status {
            variable,
            status,
            body,
        }) => {
            assert_eq!(variable, "NOT_A_VARIABLE");
            assert_eq!(status, 404);
            assert_eq!(body, "unknown variable");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    handle.join().unwrap();
}

#[test]
fn closed_port_is_a_connect_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut link = HttpLink::new("127.0.0.1", port).with_timeout(Duration::from_millis(500));

    let err = link.read("CORE_TEMP").unwrap_err();
    assert!(matches!(err, LinkError::Connect { .. }));
    assert!(err.is_transport());
}

/// Answer once, then hold the connection open until `release` fires.
fn serve_and_hold(response: &'static str) -> (u16, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (release, held) = mpsc::channel();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        stream.write_all(response.as_bytes()).unwrap();
        let _ = held.recv_timeout(Duration::from_secs(10));
    });

    (port, release, handle)
}

#[test]
fn read_completes_while_server_keeps_connection_open() {
    let (port, release, handle) =
        serve_and_hold("HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\n312.75");
    let mut link = HttpLink::new("127.0.0.1", port).with_timeout(Duration::from_secs(2));

    let started = Instant::now();
    assert_eq!(link.read("CORE_TEMP").unwrap(), "312.75");
    assert!(started.elapsed() < Duration::from_secs(1));

    release.send(()).unwrap();
    handle.join().unwrap();
}

#[test]
fn chunked_read_completes_while_server_keeps_connection_open() {
    let (port, release, handle) = serve_and_hold(
        "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\n312\r\n3\r\n,75\r\n0\r\n\r\n",
    );
    let mut link = HttpLink::new("127.0.0.1", port).with_timeout(Duration::from_secs(2));

    assert_eq!(link.read("CORE_TEMP").unwrap(), "312,75");

    release.send(()).unwrap();
    handle.join().unwrap();
}
