//! Minimal HTTP/1.0 server used to benchmark the runtime.
//!
//! Every connection is read until the end of the request headers, answered
//! with a fixed 14-byte body and closed. `SIGINT` or `SIGHUP` stops the
//! server.
//!
//! ```text
//! cargo run --release --example hello_server -- --addr 127.0.0.1:8000
//! ```

use clap::Parser;
use ember::net::{Family, Socket};
use ember::{Error, RuntimeBuilder};
use log::{debug, error, info, warn};
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::process::ExitCode;

const RESPONSE: &[u8] =
    b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 14\r\n\r\nHello, World 1";

const REQUEST_END: &[u8] = b"\r\n\r\n";

#[derive(Parser)]
#[command(name = "hello_server")]
#[command(about = "Answers every HTTP request with a canned response.", long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    addr: SocketAddr,

    /// Listen backlog.
    #[arg(long, default_value_t = libc::SOMAXCONN)]
    backlog: i32,
}

fn main() -> ExitCode {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let runtime = match RuntimeBuilder::new()
        .shutdown_on(&[libc::SIGINT, libc::SIGHUP])
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(cli.addr, cli.backlog)) {
        Ok(Ok(())) | Err(Error::Shutdown) => {
            info!("server stopped");
            ExitCode::SUCCESS
        }
        Ok(Err(err)) => {
            error!("server failed: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("runtime failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(addr: SocketAddr, backlog: i32) -> io::Result<()> {
    let listener = Socket::new(Family::of(&addr))?;
    listener.set_reuse_address(true)?;
    listener.bind(addr)?;
    listener.listen(backlog)?;

    info!("listening on {}", listener.local_addr()?);

    loop {
        let (client, peer) = listener.accept().await?;
        debug!("accepted {peer}");

        ember::spawn(async move {
            if let Err(err) = handle(client).await {
                warn!("{peer}: {err}");
            }
        });
    }
}

async fn handle(client: Socket) -> io::Result<()> {
    if !recv_request(&client).await? {
        return Ok(());
    }

    client.sendall(RESPONSE).await?;
    client.shutdown(Shutdown::Both)?;
    client.close()
}

/// Reads until the end of the request headers. Returns `false` if the peer
/// closed the connection first.
async fn recv_request(client: &Socket) -> io::Result<bool> {
    let mut request = Vec::new();

    loop {
        let incoming = client.recv(16384).await?;
        if incoming.is_empty() {
            return Ok(false);
        }

        // The terminator may straddle two reads.
        let start = request.len().saturating_sub(REQUEST_END.len() - 1);
        request.extend_from_slice(&incoming);

        if request[start..]
            .windows(REQUEST_END.len())
            .any(|window| window == REQUEST_END)
        {
            return Ok(true);
        }
    }
}
