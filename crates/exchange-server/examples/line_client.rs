//! Interactive line client for manual testing.
//!
//! Reads commands from stdin, sends the JSON requests, prints whatever
//! the server answers, and listens on a UDP port for closed-trade
//! notifications.
//!
//! ```text
//! cargo run -p exchange-server --example line_client
//! > register alice secret
//! > login alice secret
//! > limit bid 10 50
//! > market ask 4
//! > stop ask 5 45
//! > cancel 3
//! ```

use std::net::SocketAddr;

use exchange_protocol::Request;
use exchange_core::Side;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string())
        .parse()?;

    let udp = UdpSocket::bind("0.0.0.0:0").await?;
    let udp_port = udp.local_addr()?.port();
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            match udp.recv(&mut buf).await {
                Ok(n) => println!("<notify> {}", String::from_utf8_lossy(&buf[..n])),
                Err(_) => break,
            }
        }
    });

    let stream = TcpStream::connect(server).await?;
    let (read_half, mut write_half) = stream.into_split();

    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("<reply> {}", line);
        }
        println!("server closed the connection");
        std::process::exit(0);
    });

    println!("connected to {}; notifications on UDP port {}", server, udp_port);
    println!("commands: register/login/logout/update/limit/market/stop/cancel/help/exit");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let request = match parse_command(&words, udp_port) {
            Ok(Some(req)) => req,
            Ok(None) => break,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        let is_login = matches!(request, Request::Login { .. });
        send(&mut write_half, &request).await?;

        // After login, tell the server where notifications should go.
        if is_login {
            send(&mut write_half, &Request::UdpConnection { port: udp_port }).await?;
        }
    }

    Ok(())
}

async fn send(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    request: &Request,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    write_half.write_all(line.as_bytes()).await?;
    Ok(())
}

fn parse_command(words: &[&str], _udp_port: u16) -> Result<Option<Request>, String> {
    let usage = |msg: &str| Err(msg.to_string());

    match words {
        [] => usage("empty command; try 'help'"),
        ["exit"] => Ok(None),
        ["help"] => Ok(Some(Request::Help { command: None })),
        ["help", cmd] => Ok(Some(Request::Help {
            command: Some(cmd.to_string()),
        })),
        ["register", user, pwd] => Ok(Some(Request::Register {
            username: user.to_string(),
            password: pwd.to_string(),
        })),
        ["login", user, pwd] => Ok(Some(Request::Login {
            username: user.to_string(),
            password: pwd.to_string(),
        })),
        ["update", user, old, new] => Ok(Some(Request::UpdateCredentials {
            username: user.to_string(),
            old_password: old.to_string(),
            new_password: new.to_string(),
        })),
        ["logout"] => Ok(Some(Request::Logout {})),
        ["limit", side, size, price] => Ok(Some(Request::InsertLimitOrder {
            side: parse_side(side)?,
            size: parse_num(size)?,
            price: parse_num(price)?,
        })),
        ["market", side, size] => Ok(Some(Request::InsertMarketOrder {
            side: parse_side(side)?,
            size: parse_num(size)?,
        })),
        ["stop", side, size, stop_price] => Ok(Some(Request::InsertStopOrder {
            side: parse_side(side)?,
            size: parse_num(size)?,
            stop_price: parse_num(stop_price)?,
        })),
        ["cancel", order_id] => Ok(Some(Request::CancelOrder {
            order_id: parse_num(order_id)?,
        })),
        _ => usage("unrecognized command; try 'help'"),
    }
}

fn parse_side(s: &str) -> Result<Side, String> {
    Side::parse(s).ok_or_else(|| format!("bad side '{}', expected bid or ask", s))
}

fn parse_num(s: &str) -> Result<u64, String> {
    s.parse().map_err(|_| format!("bad number '{}'", s))
}
