//! # Pong Game Server Library
//!
//! Authoritative server for two-player networked Pong. The server owns the
//! canonical simulation: it accepts exactly two TCP connections, runs a
//! ready room, advances the match at a fixed tick rate, and broadcasts
//! state snapshots that clients render verbatim.
//!
//! ## Architecture
//!
//! Three concerns, each in its own module:
//!
//! - [`game`] — the simulation. A pure, tick-driven state machine over
//!   integer cells: ball movement, wall and paddle reflection, scoring, and
//!   the win condition. No I/O; the only non-determinism is the seeded
//!   random serve direction, so tests replay exact trajectories.
//! - [`slots`] — the two player connection slots. Each slot owns the write
//!   half of its stream and the handle of its receive task, and shares an
//!   atomic status with that task so a dead connection is observed without
//!   locking.
//! - [`network`] — the session orchestrator. Accepts players, drives the
//!   room/playing/disconnect-wait life cycle, and re-frames the inbound
//!   byte stream into protocol lines. All cross-task state (simulation,
//!   ready votes, pending quit) lives behind a single mutex that is never
//!   held across I/O.
//!
//! A match survives a transient disconnect: the simulation freezes, the
//! surviving peer is notified, and a connection arriving within the
//! reconnect window is rebound to the dead slot with the score intact.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind("0.0.0.0:5000", ServerConfig::default()).await?;
//!     // Runs matches back to back until the process is stopped.
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod slots;
