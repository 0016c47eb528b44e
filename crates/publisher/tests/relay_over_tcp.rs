#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end runs of the engine against an in-process IRC server.

use std::{sync::Arc, time::Duration};

use {
    herald_irc::{ConnectParams, IrcConnector},
    herald_publisher::{Error, JoinBackoff, Publisher, PublisherConfig, PublisherHandle, Result},
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::{TcpListener, TcpStream},
        sync::{Notify, mpsc},
        task::JoinHandle,
        time::timeout,
    },
};

const WAIT: Duration = Duration::from_secs(5);

/// Behaviour of the fake server.
#[derive(Clone, Default)]
struct Script {
    /// Channels whose JOIN is answered with 473.
    unjoinable: Vec<String>,
    /// Answer NICK with 433.
    nickname_taken: bool,
}

/// A line received by the fake server, tagged with the connection number.
type Received = (usize, String);

struct FakeIrcd {
    port: u16,
    received: mpsc::UnboundedReceiver<Received>,
    hangup: Arc<Notify>,
}

impl FakeIrcd {
    async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, received) = mpsc::unbounded_channel();
        let hangup = Arc::new(Notify::new());
        let server_hangup = Arc::clone(&hangup);
        tokio::spawn(async move {
            let mut index = 0;
            while let Ok((sock, _)) = listener.accept().await {
                tokio::spawn(serve(
                    index,
                    sock,
                    script.clone(),
                    tx.clone(),
                    Arc::clone(&server_hangup),
                ));
                index += 1;
            }
        });
        Self {
            port,
            received,
            hangup,
        }
    }

    /// Read until a line satisfies `done`, returning everything seen.
    async fn until(&mut self, done: impl Fn(&Received) -> bool) -> Vec<Received> {
        let mut seen = Vec::new();
        timeout(WAIT, async {
            while let Some(line) = self.received.recv().await {
                let finished = done(&line);
                seen.push(line);
                if finished {
                    return;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out, saw {seen:?}"));
        seen
    }

    async fn until_line(&mut self, wanted: &str) -> Vec<Received> {
        self.until(|(_, line)| line == wanted).await
    }
}

async fn serve(
    index: usize,
    sock: TcpStream,
    script: Script,
    received: mpsc::UnboundedSender<Received>,
    hangup: Arc<Notify>,
) {
    let (read, mut write) = sock.into_split();
    let mut lines = BufReader::new(read).lines();
    loop {
        let line = tokio::select! {
            () = hangup.notified() => return,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                _ => return,
            },
        };
        let reply = if line.starts_with("NICK ") && script.nickname_taken {
            Some(":irc.test 433 * herald :Nickname is already in use".to_string())
        } else if line.starts_with("USER ") {
            Some(":irc.test 001 herald :Welcome to the test network".to_string())
        } else if let Some(channel) = line.strip_prefix("JOIN ") {
            if script.unjoinable.iter().any(|c| c == channel) {
                Some(format!(
                    ":irc.test 473 herald {channel} :Cannot join channel (+i)"
                ))
            } else {
                Some(format!(":herald!herald@test JOIN {channel}"))
            }
        } else {
            None
        };
        if let Some(reply) = reply {
            let _ = write.write_all(format!("{reply}\r\n").as_bytes()).await;
        }
        let _ = received.send((index, line));
    }
}

fn config(port: u16, fallback: Option<&str>) -> PublisherConfig {
    PublisherConfig {
        connect: ConnectParams {
            server: "127.0.0.1".into(),
            port,
            tls: false,
            nickname: "herald".into(),
            username: "herald".into(),
            realname: "herald test".into(),
            password: None,
            connect_timeout: Duration::from_secs(2),
            keepalive_interval: None,
        },
        reconnection_interval: Duration::from_millis(100),
        line_sleep: Duration::from_millis(10),
        fallback_channel: fallback.map(str::to_string),
        backoff: JoinBackoff {
            max_attempts: 3,
            memory_timeout: Duration::from_secs(60),
        },
        channel_maxlen: 64,
    }
}

fn start(config: PublisherConfig) -> (PublisherHandle, JoinHandle<Result<()>>) {
    let (publisher, handle) = Publisher::new(config, Arc::new(IrcConnector::new()));
    (handle, tokio::spawn(publisher.run()))
}

fn lines_equal(seen: &[Received], wanted: &str) -> usize {
    seen.iter().filter(|(_, line)| line == wanted).count()
}

#[tokio::test]
async fn hello_world_is_joined_and_published() {
    let mut ircd = FakeIrcd::start(Script::default()).await;
    let (handle, task) = start(config(ircd.port, None));

    ircd.until_line("USER herald 0 * :herald test").await;
    handle.send("#chan1", "Hello, world").unwrap();
    let seen = ircd.until_line("PRIVMSG #chan1 :Hello, world").await;
    assert_eq!(lines_equal(&seen, "JOIN #chan1"), 1);

    handle.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn unjoinable_channel_falls_back() {
    let mut ircd = FakeIrcd::start(Script {
        unjoinable: vec!["#unjoinable-chan".into()],
        ..Script::default()
    })
    .await;
    let (handle, task) = start(config(ircd.port, Some("#fallback")));

    handle.send("#unjoinable-chan", "secret").unwrap();
    let seen = ircd.until_line("PRIVMSG #fallback :secret").await;
    assert_eq!(lines_equal(&seen, "JOIN #unjoinable-chan"), 3);
    assert!(
        !seen
            .iter()
            .any(|(_, line)| line.starts_with("PRIVMSG #unjoinable-chan"))
    );
    assert!(handle.channels().await.unwrap().contains(&"#fallback".to_string()));

    handle.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn long_message_arrives_in_ordered_chunks() {
    let mut ircd = FakeIrcd::start(Script::default()).await;
    let (handle, task) = start(config(ircd.port, None));

    let text: String = ('a'..='z').cycle().take(2000).collect();
    handle.send("#abcd", text.clone()).unwrap();

    let mut received = String::new();
    while received.len() < text.len() {
        let seen = ircd
            .until(|(_, line)| line.starts_with("PRIVMSG #abcd :"))
            .await;
        let (_, line) = seen.last().unwrap();
        assert!(line.len() + 2 <= 512);
        received.push_str(line.trim_start_matches("PRIVMSG #abcd :"));
    }
    assert_eq!(received, text);

    handle.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn reconnects_after_server_hangup() {
    let mut ircd = FakeIrcd::start(Script::default()).await;
    let (handle, task) = start(config(ircd.port, None));

    handle.send("#a", "one").unwrap();
    let seen = ircd.until_line("PRIVMSG #a :one").await;
    assert!(seen.iter().all(|(conn, _)| *conn == 0));

    ircd.hangup.notify_one();
    ircd.until(|(conn, line)| *conn == 1 && line.starts_with("USER ")).await;

    handle.send("#a", "two").unwrap();
    let seen = ircd.until_line("PRIVMSG #a :two").await;
    assert_eq!(seen.last().map(|(conn, _)| *conn), Some(1));
    // membership was forgotten with the old connection
    assert_eq!(lines_equal(&seen, "JOIN #a"), 1);

    handle.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn stop_sends_quit() {
    let mut ircd = FakeIrcd::start(Script::default()).await;
    let (handle, task) = start(config(ircd.port, None));

    ircd.until(|(_, line)| line.starts_with("USER ")).await;
    handle.stop();
    task.await.unwrap().unwrap();
    let quit = format!("QUIT :{}", herald_publisher::engine::QUIT_REASON);
    ircd.until_line(&quit).await;
    assert!(matches!(handle.send("#a", "late"), Err(Error::Stopped)));
}

#[tokio::test]
async fn nickname_in_use_stops_the_engine() {
    let ircd = FakeIrcd::start(Script {
        nickname_taken: true,
        ..Script::default()
    })
    .await;
    let (handle, task) = start(config(ircd.port, None));

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(matches!(result, Err(Error::NicknameInUse)));
    assert!(handle.is_stopped());
}
