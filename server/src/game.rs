//! Authoritative Pong simulation.
//!
//! The state is advanced one cell per tick and mutated only by the session
//! orchestrator under its lock. Apart from the two random direction draws in
//! [`GameState::reset_ball`], every transition is deterministic, so tests
//! inject a seeded RNG and replay exact trajectories.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Direction, PlayerId};

#[derive(Debug)]
pub struct GameState {
    pub board_width: i32,
    pub board_height: i32,
    pub paddle_height: i32,
    pub winning_score: u32,
    pub ball_x: i32,
    pub ball_y: i32,
    pub ball_dx: i32,
    pub ball_dy: i32,
    pub paddle1_y: i32,
    pub paddle2_y: i32,
    pub score1: u32,
    pub score2: u32,
    rng: StdRng,
}

impl GameState {
    pub fn new(board_width: i32, board_height: i32, paddle_height: i32, winning_score: u32) -> Self {
        Self::with_rng(
            board_width,
            board_height,
            paddle_height,
            winning_score,
            StdRng::from_entropy(),
        )
    }

    /// Deterministic variant for tests: same state, seeded direction draws.
    pub fn with_seed(
        board_width: i32,
        board_height: i32,
        paddle_height: i32,
        winning_score: u32,
        seed: u64,
    ) -> Self {
        Self::with_rng(
            board_width,
            board_height,
            paddle_height,
            winning_score,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(
        board_width: i32,
        board_height: i32,
        paddle_height: i32,
        winning_score: u32,
        rng: StdRng,
    ) -> Self {
        let mut state = GameState {
            board_width,
            board_height,
            paddle_height,
            winning_score,
            ball_x: 0,
            ball_y: 0,
            ball_dx: 1,
            ball_dy: 1,
            paddle1_y: 0,
            paddle2_y: 0,
            score1: 0,
            score2: 0,
            rng,
        };
        state.reset();
        state
    }

    /// Returns the whole match to its initial state: scores zeroed, ball and
    /// paddles re-centered.
    pub fn reset(&mut self) {
        self.score1 = 0;
        self.score2 = 0;
        self.reset_ball();
        self.reset_paddles();
    }

    /// Places the ball at the board center with a fresh random diagonal
    /// direction. Each velocity component is drawn independently, so all
    /// four diagonals are equally likely.
    pub fn reset_ball(&mut self) {
        self.ball_x = self.board_width / 2;
        self.ball_y = self.board_height / 2;
        self.ball_dx = if self.rng.gen_bool(0.5) { 1 } else { -1 };
        self.ball_dy = if self.rng.gen_bool(0.5) { 1 } else { -1 };
    }

    fn reset_paddles(&mut self) {
        let center = (self.board_height - self.paddle_height) / 2;
        self.paddle1_y = center;
        self.paddle2_y = center;
    }

    /// Moves a paddle one cell, clamped to the playable range. Out-of-range
    /// moves are a no-op: client input is untrusted and must never fault
    /// the match.
    pub fn move_paddle(&mut self, player: PlayerId, direction: Direction) {
        let lower_limit = self.board_height - self.paddle_height - 1;
        let paddle = match player {
            PlayerId::One => &mut self.paddle1_y,
            PlayerId::Two => &mut self.paddle2_y,
        };
        match direction {
            Direction::Up if *paddle > 1 => *paddle -= 1,
            Direction::Down if *paddle < lower_limit => *paddle += 1,
            _ => {}
        }
    }

    /// Advances the simulation by one tick. Returns true exactly when a
    /// point was scored this tick. Once the match is decided this is a
    /// no-op.
    pub fn tick(&mut self) -> bool {
        if self.is_game_over() {
            return false;
        }

        self.ball_x += self.ball_dx;
        self.ball_y += self.ball_dy;

        // Top/bottom walls: reflect and clamp back into bounds so the ball
        // can never tunnel past a wall in a single step.
        if self.ball_y <= 1 || self.ball_y >= self.board_height - 2 {
            self.ball_dy = -self.ball_dy;
            self.ball_y = self.ball_y.clamp(1, self.board_height - 2);
        }

        // Left paddle: reflect and nudge one cell clear so the next tick
        // cannot re-collide with the same paddle.
        if self.ball_x == 2
            && self.ball_y >= self.paddle1_y
            && self.ball_y < self.paddle1_y + self.paddle_height
        {
            self.ball_dx = -self.ball_dx;
            self.ball_x = 3;
        }

        // Right paddle, mirrored.
        if self.ball_x == self.board_width - 3
            && self.ball_y >= self.paddle2_y
            && self.ball_y < self.paddle2_y + self.paddle_height
        {
            self.ball_dx = -self.ball_dx;
            self.ball_x = self.board_width - 4;
        }

        if self.ball_x <= 0 {
            self.score2 += 1;
            info!("Player 2 scores ({} - {})", self.score1, self.score2);
            self.reset_ball();
            return true;
        }

        if self.ball_x >= self.board_width - 1 {
            self.score1 += 1;
            info!("Player 1 scores ({} - {})", self.score1, self.score2);
            self.reset_ball();
            return true;
        }

        false
    }

    /// Game-over is a pure function of the scores, never a cached flag.
    pub fn is_game_over(&self) -> bool {
        self.score1 >= self.winning_score || self.score2 >= self.winning_score
    }

    pub fn winner(&self) -> Option<PlayerId> {
        if self.score1 >= self.winning_score {
            Some(PlayerId::One)
        } else if self.score2 >= self.winning_score {
            Some(PlayerId::Two)
        } else {
            None
        }
    }

    /// Consistent snapshot for the `UPDATE` broadcast:
    /// `[ball_x, ball_y, paddle1_y, paddle2_y, score1, score2]`.
    pub fn snapshot(&self) -> [i32; 6] {
        [
            self.ball_x,
            self.ball_y,
            self.paddle1_y,
            self.paddle2_y,
            self.score1 as i32,
            self.score2 as i32,
        ]
    }
}
