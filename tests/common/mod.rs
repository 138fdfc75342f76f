#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// A local stand-in for the Keybase API that answers a fixed sequence of
/// requests, one canned response per connection, then stops.
pub struct MockApi {
    pub base_url: String,
    handle: JoinHandle<Vec<String>>,
}

impl MockApi {
    /// Wait for every canned response to be served and return the request
    /// lines received, in order.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().expect("mock server panicked")
    }
}

pub fn serve(responses: Vec<(u16, &str)>) -> MockApi {
    let responses: Vec<(u16, String)> = responses
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read request line");
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).expect("read header");
                if n == 0 || header == "\r\n" {
                    break;
                }
            }

            let reason = match status {
                200 => "OK",
                404 => "Not Found",
                _ => "Internal Server Error",
            };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().ok();
            requests.push(request_line.trim_end().to_string());
        }
        requests
    });

    MockApi { base_url, handle }
}

pub fn ok(body: &str) -> Vec<(u16, &str)> {
    vec![(200, body)]
}

/// A base URL nothing is listening on.
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
