//! In-memory scripted MPD peer for unit tests.

use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use super::connection::Connection;

/// Greet, then answer each expected request line with a canned reply.
///
/// A request that does not match the script ends the conversation, which the
/// client observes as `CommandError::Closed`.
pub(crate) fn serve(server: DuplexStream, script: Vec<(&'static str, &'static str)>) {
    tokio::spawn(async move {
        let mut server = BufReader::new(server);
        if server.write_all(b"OK MPD 0.23.5\n").await.is_err() {
            return;
        }
        for (expected, reply) in script {
            let mut line = String::new();
            if server.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            if line.trim_end() != expected {
                eprintln!("scripted MPD: expected {:?}, got {:?}", expected, line);
                return;
            }
            if server.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    });
}

/// Connection already past the greeting, talking to a scripted peer.
pub(crate) async fn scripted(script: Vec<(&'static str, &'static str)>) -> Connection<DuplexStream> {
    let (client, server) = duplex(4096);
    serve(server, script);
    Connection::handshake(client, "scripted")
        .await
        .expect("scripted greeting")
}
