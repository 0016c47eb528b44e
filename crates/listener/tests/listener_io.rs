#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Listener behaviour over real sockets, against a recording relay.

use std::{io::Write, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    herald_config::ListenerConfig,
    herald_listener::{Listener, Relay, Result},
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
    secrecy::Secret,
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
        net::TcpStream,
        sync::mpsc,
        time::timeout,
    },
    tokio_rustls::TlsConnector,
    tokio_util::sync::CancellationToken,
};

const PASSWORD: &str = "s3cret";
const WAIT: Duration = Duration::from_secs(5);

struct RecordingRelay {
    sent: mpsc::UnboundedSender<(String, String)>,
    channels: Vec<String>,
}

#[async_trait]
impl Relay for RecordingRelay {
    fn send(&self, channel: &str, message: &str) -> Result<()> {
        let _ = self.sent.send((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn channels(&self) -> Result<Vec<String>> {
        Ok(self.channels.clone())
    }
}

struct Running {
    port: u16,
    sent: mpsc::UnboundedReceiver<(String, String)>,
    cancel: CancellationToken,
    _certs: Option<tempfile::TempDir>,
}

impl Running {
    async fn next(&mut self) -> (String, String) {
        timeout(WAIT, self.sent.recv()).await.unwrap().unwrap()
    }

    async fn nothing_more(&mut self) {
        assert!(
            timeout(Duration::from_millis(200), self.sent.recv())
                .await
                .is_err()
        );
    }
}

fn plain_config() -> ListenerConfig {
    ListenerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        password: Secret::new(PASSWORD.into()),
        ..ListenerConfig::default()
    }
}

async fn start(config: ListenerConfig, certs: Option<tempfile::TempDir>) -> Running {
    let (tx, sent) = mpsc::unbounded_channel();
    let relay = RecordingRelay {
        sent: tx,
        channels: vec!["#chan1".into(), "bob".into()],
    };
    let listener = Listener::bind(&config, Arc::new(relay)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let cancel = CancellationToken::new();
    tokio::spawn(listener.serve(cancel.clone()));
    Running {
        port,
        sent,
        cancel,
        _certs: certs,
    }
}

async fn connect(port: u16) -> TcpStream {
    TcpStream::connect(("127.0.0.1", port)).await.unwrap()
}

#[tokio::test]
async fn line_without_newline_is_relayed_on_close() {
    let mut running = start(plain_config(), None).await;
    let mut sock = connect(running.port).await;
    sock.write_all(format!("{PASSWORD}:#chan1:Hello, world").as_bytes())
        .await
        .unwrap();
    drop(sock);
    assert_eq!(running.next().await, ("#chan1".into(), "Hello, world".into()));
    running.nothing_more().await;
}

#[tokio::test]
async fn many_lines_on_one_connection() {
    let mut running = start(plain_config(), None).await;
    let mut sock = connect(running.port).await;
    let mut payload = String::new();
    for i in 0..10 {
        payload.push_str(&format!("{PASSWORD}:#chan{i}:Line {i}\n"));
    }
    sock.write_all(payload.as_bytes()).await.unwrap();
    for i in 0..10 {
        assert_eq!(running.next().await, (format!("#chan{i}"), format!("Line {i}")));
    }
}

#[tokio::test]
async fn bad_lines_are_skipped_without_closing() {
    let mut running = start(plain_config(), None).await;
    let mut sock = connect(running.port).await;
    sock.write_all(b"wrong:#chan:nope\n").await.unwrap();
    sock.write_all(b"only-one-field\n").await.unwrap();
    sock.write_all(b"s3cret:#chan:\xff\xfe\n").await.unwrap();
    sock.write_all(b"\n   \n").await.unwrap();
    sock.write_all(format!("{PASSWORD}:#chan:still here: yes\n").as_bytes())
        .await
        .unwrap();
    assert_eq!(running.next().await, ("#chan".into(), "still here: yes".into()));
    running.nothing_more().await;
}

#[tokio::test]
async fn channels_command_lists_tracked_channels() {
    let running = start(plain_config(), None).await;
    let sock = connect(running.port).await;
    let (read, mut write) = sock.into_split();
    write
        .write_all(format!("{PASSWORD}::channels\n").as_bytes())
        .await
        .unwrap();
    let mut lines = BufReader::new(read).lines();
    let mut reply = Vec::new();
    loop {
        let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
        if line.is_empty() {
            break;
        }
        reply.push(line);
    }
    assert_eq!(reply, ["#chan1", "bob"]);
}

#[tokio::test]
async fn cancel_stops_accepting() {
    let running = start(plain_config(), None).await;
    running.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(TcpStream::connect(("127.0.0.1", running.port)).await.is_err());
}

#[tokio::test]
async fn tls_requires_a_certificate() {
    let config = ListenerConfig {
        ssl: true,
        ..plain_config()
    };
    let relay = RecordingRelay {
        sent: mpsc::unbounded_channel().0,
        channels: Vec::new(),
    };
    assert!(Listener::bind(&config, Arc::new(relay)).await.is_err());
}

fn write_pem(dir: &tempfile::TempDir, name: &str, pem: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::File::create(&path)
        .unwrap()
        .write_all(pem.as_bytes())
        .unwrap();
    path
}

async fn tls_client<S>(
    sock: S,
    cert_der: rustls::pki_types::CertificateDer<'static>,
) -> impl AsyncRead + AsyncWrite + Unpin
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = rustls::crypto::ring::default_provider().install_default();
    let mut roots = RootCertStore::empty();
    roots.add(cert_der).unwrap();
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
        .connect(ServerName::try_from("localhost").unwrap(), sock)
        .await
        .unwrap()
}

#[rstest::rstest]
#[case::separate_key_file(false)]
#[case::combined_pem(true)]
#[tokio::test]
async fn relays_over_tls(#[case] combined: bool) {
    let generated = rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
    let cert_pem = generated.cert.pem();
    let key_pem = generated.key_pair.serialize_pem();
    let dir = tempfile::tempdir().unwrap();
    let (ssl_cert, ssl_key) = if combined {
        (write_pem(&dir, "combined.pem", &format!("{cert_pem}{key_pem}")), None)
    } else {
        (
            write_pem(&dir, "cert.pem", &cert_pem),
            Some(write_pem(&dir, "key.pem", &key_pem)),
        )
    };
    let config = ListenerConfig {
        ssl: true,
        ssl_cert: Some(ssl_cert),
        ssl_key,
        ..plain_config()
    };
    let mut running = start(config, Some(dir)).await;

    let sock = connect(running.port).await;
    let mut tls = tls_client(sock, generated.cert.der().clone()).await;
    tls.write_all(format!("{PASSWORD}:#secure:over tls\n").as_bytes())
        .await
        .unwrap();
    tls.flush().await.unwrap();
    assert_eq!(running.next().await, ("#secure".into(), "over tls".into()));
}
