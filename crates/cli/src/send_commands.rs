use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::Args,
    tokio::{
        io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
        net::TcpStream,
    },
    tracing::info,
};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Host of the relay's listener.
    pub host: String,
    /// Port of the relay's listener.
    pub port: u16,
    /// Listener password.
    pub password: String,
    /// Channel or nickname to publish to.
    pub channel: String,
    /// Message to send. Without it, every line read from stdin is sent.
    #[arg(short, long)]
    pub message: Option<String>,
    /// Connect with TLS.
    #[arg(long)]
    pub ssl: bool,
    /// Extra CA certificate (PEM) to trust, e.g. for a self-signed listener.
    #[arg(long, requires = "ssl")]
    pub ca: Option<PathBuf>,
}

pub async fn send(args: SendArgs) -> Result<()> {
    let tcp = TcpStream::connect((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("connect to {}:{}", args.host, args.port))?;

    let sent = if args.ssl {
        let config = herald_irc::tls::client_config(args.ca.as_deref())?;
        let stream = herald_irc::tls::connect(tcp, &args.host, config)
            .await
            .context("TLS handshake")?;
        write_requests(stream, &args).await?
    } else {
        write_requests(tcp, &args).await?
    };

    info!(sent, channel = %args.channel, "notifications sent");
    Ok(())
}

async fn write_requests<S>(mut stream: S, args: &SendArgs) -> Result<usize>
where
    S: AsyncWrite + Unpin,
{
    let mut sent = 0;
    match &args.message {
        Some(message) => {
            for request in requests(&args.password, &args.channel, message) {
                stream.write_all(request.as_bytes()).await?;
                sent += 1;
            }
        },
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                for request in requests(&args.password, &args.channel, &line) {
                    stream.write_all(request.as_bytes()).await?;
                    sent += 1;
                }
            }
        },
    }
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(sent)
}

/// One `password:channel:line` request per non-blank line of `text`.
fn requests<'a>(
    password: &'a str,
    channel: &'a str,
    text: &'a str,
) -> impl Iterator<Item = String> + 'a {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(move |line| format!("{password}:{channel}:{line}\n"))
}
