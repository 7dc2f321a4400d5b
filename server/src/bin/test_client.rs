//! Headless smoke-test client: connects to a running server, answers the
//! ready handshake, plays a few moves, and prints every server message.
//! Useful for exercising the protocol by hand without a real client.

use shared::{decode, encode, Command, Direction};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5000".to_string());

    let stream = TcpStream::connect(&addr).await?;
    println!("Connected to {}", addr);
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let mut updates = 0u32;

    while let Some(line) = lines.next_line().await? {
        let message = match decode(&line) {
            Some(message) => message,
            None => {
                println!("Undecodable line from server: {:?}", line);
                continue;
            }
        };

        match message.command {
            Command::Id => {
                println!("Assigned player id {}", message.payload.unwrap_or_default())
            }
            Command::Wait => println!("Waiting for a second player..."),
            Command::Room => {
                println!(
                    "Entered ready room, board {}",
                    message.payload.unwrap_or_default()
                );
                send_line(&mut writer, &encode(Command::Ready, None)).await?;
                println!("Sent READY");
            }
            Command::ReadyStatus => {
                println!("Ready votes: {}", message.payload.unwrap_or_default())
            }
            Command::Start => {
                println!("Match started: {}", message.payload.unwrap_or_default())
            }
            Command::Update => {
                updates += 1;

                // Wiggle the paddle occasionally so the server has input
                // to apply.
                if updates % 10 == 0 {
                    let direction = if updates % 20 == 0 {
                        Direction::Down
                    } else {
                        Direction::Up
                    };
                    send_line(&mut writer, &encode(Command::Move, Some(direction.as_str())))
                        .await?;
                }

                if updates % 30 == 0 {
                    println!("Update #{}: {}", updates, message.payload.unwrap_or_default());
                }

                if updates == 600 {
                    send_line(&mut writer, &encode(Command::Quit, None)).await?;
                    println!("Sent QUIT after {} updates", updates);
                }
            }
            Command::Over => {
                println!(
                    "Match over, winner: player {}",
                    message.payload.unwrap_or_default()
                );
                break;
            }
            Command::OpponentDisconnected => {
                println!(
                    "Opponent (player {}) disconnected, match frozen",
                    message.payload.unwrap_or_default()
                );
            }
            Command::OpponentReconnected => println!("Opponent reconnected"),
            Command::Reconnected => println!("Rejoined the match"),
            Command::Resume => {
                println!("Match resumed: {}", message.payload.unwrap_or_default())
            }
            other => println!("Unexpected server command: {}", other),
        }
    }

    println!("Test client finished");
    Ok(())
}

async fn send_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    line: &str,
) -> std::io::Result<()> {
    writer.write_all(format!("{}\n", line).as_bytes()).await
}
