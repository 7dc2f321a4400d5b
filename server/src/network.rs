//! Session orchestrator: accepts the two peer connections and drives the
//! match life cycle.
//!
//! The flow loops forever: accept both players, run the ready room, run the
//! fixed-rate tick loop, and tear the match down on a decided winner, a
//! quit, or an expired reconnect window. A mid-match disconnect freezes the
//! simulation while the dead slot waits for a replacement connection.
//!
//! Each connection gets its own receive task that decodes inbound lines and
//! applies them to the shared state under one lock; the lock is never held
//! across a blocking operation.

use crate::game::GameState;
use crate::slots::{PlayerSlot, SlotStatus};
use log::{debug, info, warn};
use shared::{csv, decode, encode, Command, Direction, LineBuffer, Message, PlayerId};
use shared::{BOARD_HEIGHT, BOARD_WIDTH, PADDLE_HEIGHT, WINNING_SCORE};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

/// Match and timing parameters. The polling intervals are tunables rather
/// than hidden constants; integration tests shrink them.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub board_width: i32,
    pub board_height: i32,
    pub paddle_height: i32,
    pub winning_score: u32,
    /// Target simulation tick interval. An overrunning tick delays the
    /// next one; ticks are never skipped or applied twice.
    pub tick_interval: Duration,
    /// How often the ready room re-broadcasts the vote tally.
    pub ready_poll_interval: Duration,
    /// Wall-clock window in which a disconnected slot may be rebound
    /// before the match is abandoned.
    pub reconnect_window: Duration,
    /// Accept-poll granularity while waiting for a reconnect.
    pub reconnect_poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            paddle_height: PADDLE_HEIGHT,
            winning_score: WINNING_SCORE,
            tick_interval: Duration::from_millis(33), // ~30 ticks/second
            ready_poll_interval: Duration::from_millis(100),
            reconnect_window: Duration::from_secs(30),
            reconnect_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Everything the receive tasks and the tick loop both touch, behind a
/// single lock: the simulation plus the ready votes and any pending quit.
struct SharedState {
    game: GameState,
    ready: [bool; 2],
    quit: Option<PlayerId>,
}

/// Authoritative game server for one board and two player slots.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    shared: Arc<Mutex<SharedState>>,
    slots: [PlayerSlot; 2],
    tick_count: u64,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let game = GameState::new(
            config.board_width,
            config.board_height,
            config.paddle_height,
            config.winning_score,
        );
        Ok(Server {
            listener,
            config,
            shared: Arc::new(Mutex::new(SharedState {
                game,
                ready: [false, false],
                quit: None,
            })),
            slots: [
                PlayerSlot::empty(PlayerId::One),
                PlayerSlot::empty(PlayerId::Two),
            ],
            tick_count: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop. Runs matches back to back until the process is
    /// stopped; only a listener failure propagates out.
    pub async fn run(&mut self) -> io::Result<()> {
        info!("Server listening on {}", self.listener.local_addr()?);

        loop {
            self.accept_players().await?;
            match self.run_match().await {
                Some(winner) => {
                    info!("Match over: player {} wins", winner);
                    let over = encode(Command::Over, Some(&winner.to_string()));
                    self.broadcast(&over).await;
                }
                None => info!("Match abandoned"),
            }
            self.reset_match().await;
        }
    }

    /// Accepts exactly two connections, assigning identities in arrival
    /// order. The first player is told to wait for the second.
    async fn accept_players(&mut self) -> io::Result<()> {
        info!("Waiting for two players...");
        for id in PlayerId::BOTH {
            let (stream, addr) = self.listener.accept().await?;
            info!("Player {} connected from {}", id, addr);
            self.attach(id, stream);
            let assignment = encode(Command::Id, Some(&id.to_string()));
            self.send(id, &assignment).await;
            if id == PlayerId::One {
                self.send(id, &encode(Command::Wait, None)).await;
            }
        }
        Ok(())
    }

    /// Binds a connection to a slot and spawns its receive task. Any
    /// previous connection in the slot is closed first.
    fn attach(&mut self, id: PlayerId, stream: TcpStream) {
        stream.set_nodelay(true).ok();
        let (reader, writer) = stream.into_split();
        let status = SlotStatus::connected_now();
        let receiver = spawn_receiver(id, reader, Arc::clone(&status), Arc::clone(&self.shared));
        self.slots[id.index()].bind(writer, status, receiver);
    }

    async fn run_match(&mut self) -> Option<PlayerId> {
        if !self.run_room().await {
            return None;
        }
        let start = encode(Command::Start, Some(&self.board_payload()));
        self.broadcast(&start).await;
        info!("Match started");
        self.run_playing().await
    }

    /// Ready room: announce the board, then poll the vote tally out to both
    /// players until both have opted in. Returns false when the room is
    /// abandoned (a disconnect or quit before the match starts).
    async fn run_room(&mut self) -> bool {
        {
            let mut shared = self.shared.lock().await;
            shared.game.reset();
            shared.ready = [false, false];
            shared.quit = None;
        }
        let room = encode(Command::Room, Some(&self.board_payload()));
        self.broadcast(&room).await;

        let mut poll = interval(self.config.ready_poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            poll.tick().await;

            if self.first_disconnected().is_some() {
                warn!("A player left the ready room, abandoning match");
                return false;
            }
            let (ready, quit) = {
                let shared = self.shared.lock().await;
                (shared.ready, shared.quit)
            };
            if quit.is_some() {
                info!("Player quit from the ready room, abandoning match");
                return false;
            }

            let tally = csv(&[ready[0] as i32, ready[1] as i32]);
            self.broadcast(&encode(Command::ReadyStatus, Some(&tally))).await;
            if ready[0] && ready[1] {
                return true;
            }
        }
    }

    /// Fixed-rate tick loop. Each tick checks liveness, advances the
    /// simulation under one lock acquisition, and broadcasts the snapshot
    /// taken under that same acquisition so both peers see consistent
    /// scores for the tick.
    async fn run_playing(&mut self) -> Option<PlayerId> {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            // A pending quit ends the match even if the quitter's socket is
            // already gone, so it is consumed before the liveness check.
            let quitter = self.shared.lock().await.quit.take();
            if let Some(quitter) = quitter {
                // Resolution of the quit ambiguity: the remaining player is
                // declared winner, since OVER always names one.
                info!(
                    "Player {} quit, match goes to player {}",
                    quitter,
                    quitter.opponent()
                );
                return Some(quitter.opponent());
            }

            if let Some(lost) = self.first_disconnected() {
                if !self.run_disconnect_wait(lost).await {
                    return None;
                }
                ticker.reset();
                continue;
            }

            let (winner, snapshot) = {
                let mut shared = self.shared.lock().await;
                shared.game.tick();
                (shared.game.winner(), shared.game.snapshot())
            };

            if let Some(winner) = winner {
                return Some(winner);
            }

            let update = encode(Command::Update, Some(&csv(&snapshot)));
            self.broadcast(&update).await;

            self.tick_count += 1;
            if self.tick_count % 300 == 0 {
                self.log_latency();
            }
        }
    }

    /// Holds the frozen match while a dead slot waits for a replacement
    /// connection. Returns true when the match may resume, false when it
    /// was abandoned.
    async fn run_disconnect_wait(&mut self, lost: PlayerId) -> bool {
        warn!(
            "Player {} disconnected, match frozen for up to {:?}",
            lost, self.config.reconnect_window
        );
        self.slots[lost.index()].teardown();
        let notice = encode(Command::OpponentDisconnected, Some(&lost.to_string()));
        self.send(lost.opponent(), &notice).await;

        // Wall-clock deadline measured from the detected disconnect;
        // nothing extends it.
        let deadline = Instant::now() + self.config.reconnect_window;
        let mut last_logged_secs = u64::MAX;

        loop {
            if !self.slots[lost.opponent().index()].is_connected() {
                warn!("Both players gone, abandoning match");
                return false;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("Reconnect window for player {} expired", lost);
                return false;
            }

            let secs = remaining.as_secs();
            if secs != last_logged_secs {
                info!("Waiting {}s more for player {} to reconnect", secs, lost);
                last_logged_secs = secs;
            }

            let slice = remaining.min(self.config.reconnect_poll_interval);
            let accepted = timeout(slice, self.listener.accept()).await;
            match accepted {
                Ok(Ok((stream, addr))) => {
                    info!("Player {} reconnected from {}", lost, addr);
                    self.attach(lost, stream);
                    self.send(lost, &encode(Command::Id, Some(&lost.to_string()))).await;
                    self.send(lost, &encode(Command::Reconnected, None)).await;
                    self.send(
                        lost.opponent(),
                        &encode(Command::OpponentReconnected, None),
                    )
                    .await;
                    let resume = encode(Command::Resume, Some(&self.board_payload()));
                    self.broadcast(&resume).await;
                    return true;
                }
                Ok(Err(e)) => warn!("Accept failed during reconnect wait: {}", e),
                Err(_) => {} // poll slice elapsed, check the clock again
            }
        }
    }

    /// Clears all match-scoped state: both connections, the simulation,
    /// the votes, and any pending quit.
    async fn reset_match(&mut self) {
        for slot in &mut self.slots {
            slot.teardown();
        }
        let mut shared = self.shared.lock().await;
        shared.game.reset();
        shared.ready = [false, false];
        shared.quit = None;
    }

    fn first_disconnected(&self) -> Option<PlayerId> {
        PlayerId::BOTH
            .into_iter()
            .find(|id| !self.slots[id.index()].is_connected())
    }

    fn board_payload(&self) -> String {
        csv(&[self.config.board_width, self.config.board_height])
    }

    fn log_latency(&self) {
        for slot in &self.slots {
            if let Some(status) = slot.status() {
                debug!(
                    "Player {}: {}ms since last client message",
                    slot.id,
                    status.millis_since_last_message()
                );
            }
        }
    }

    /// Best-effort send of one protocol line. A failed write is only
    /// logged: it means the peer is gone, which the receive path will
    /// notice and report through the slot status.
    async fn send(&mut self, id: PlayerId, line: &str) {
        if let Some(writer) = self.slots[id.index()].writer_mut() {
            if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()).await {
                debug!("Send to player {} failed: {}", id, e);
            }
        }
    }

    async fn broadcast(&mut self, line: &str) {
        for id in PlayerId::BOTH {
            self.send(id, line).await;
        }
    }
}

/// Spawns the receive task for one connection: re-frame the byte stream
/// into lines, decode each, and apply it to the shared state. On EOF or a
/// read error the task marks the slot status disconnected and exits; it
/// never touches the slot itself.
fn spawn_receiver(
    id: PlayerId,
    mut reader: OwnedReadHalf,
    status: Arc<SlotStatus>,
    shared: Arc<Mutex<SharedState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut frames = LineBuffer::new();
        let mut buffer = [0u8; 1024];
        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => {
                    status.touch();
                    for line in frames.push(&buffer[..n]) {
                        match decode(&line) {
                            Some(message) => apply_message(id, message, &shared).await,
                            None => {
                                debug!("Player {}: ignoring malformed line {:?}", id, line)
                            }
                        }
                    }
                }
                Err(e) => {
                    debug!("Player {} read error: {}", id, e);
                    break;
                }
            }
        }
        status.mark_disconnected();
        info!("Player {} connection closed", id);
    })
}

/// Applies one decoded client message. Unknown or malformed messages are
/// dropped without disturbing the match.
async fn apply_message(id: PlayerId, message: Message, shared: &Mutex<SharedState>) {
    match message.command {
        Command::Move => match message.payload.as_deref().and_then(Direction::parse) {
            Some(direction) => shared.lock().await.game.move_paddle(id, direction),
            None => debug!("Player {}: MOVE with bad payload {:?}", id, message.payload),
        },
        Command::Ready => {
            shared.lock().await.ready[id.index()] = true;
            info!("Player {} is ready", id);
        }
        Command::Quit => {
            shared.lock().await.quit = Some(id);
        }
        other => debug!("Player {}: ignoring unexpected {} message", id, other),
    }
}
