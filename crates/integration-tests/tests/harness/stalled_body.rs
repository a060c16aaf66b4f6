//! Raw TCP endpoint that sends response headers and then stops writing

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct StalledBody {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl StalledBody {
    /// Answer every request with `status_line`, a 1000-byte content length and
    /// only the first few bytes of the body
    pub async fn start(status_line: &'static str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    () = token.cancelled() => break,
                    accepted = listener.accept() => accepted,
                };
                let Ok((mut socket, _)) = accepted else {
                    break;
                };

                let token = token.clone();
                tokio::spawn(async move {
                    let mut request = [0u8; 8192];
                    if socket.read(&mut request).await.is_err() {
                        return;
                    }

                    let head = format!(
                        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{{\"message\":"
                    );
                    if socket.write_all(head.as_bytes()).await.is_err() {
                        return;
                    }

                    // hold the connection open with the body unfinished
                    token.cancelled().await;
                });
            }
        });

        Ok(Self { addr, shutdown })
    }

    pub fn endpoint(&self) -> url::Url {
        url::Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }
}

impl Drop for StalledBody {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
