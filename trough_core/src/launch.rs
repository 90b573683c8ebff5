//! Launch requests and the FIFO queue the sequencer services.

use std::collections::VecDeque;

/// What to call once the last ball of a request has been ejected.
#[derive(Default)]
pub enum LaunchCallback {
    #[default]
    None,
    /// Route to the controller's `on_ball_saved` hook at fire time.
    BallSaved,
    Custom(Box<dyn FnOnce()>),
}

impl LaunchCallback {
    pub fn custom<F: FnOnce() + 'static>(f: F) -> Self {
        Self::Custom(Box::new(f))
    }
}

impl core::fmt::Debug for LaunchCallback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::BallSaved => f.write_str("BallSaved"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One call to `request_launch`.
#[derive(Debug)]
pub struct LaunchRequest {
    balls_remaining: u32,
    stealth: bool,
    autoplunge: bool,
    callback: LaunchCallback,
}

impl LaunchRequest {
    /// Stealth balls are always autoplunged; nobody is expected to shoot them.
    pub fn new(count: u32, stealth: bool, autoplunge: bool, callback: LaunchCallback) -> Self {
        Self {
            balls_remaining: count,
            stealth,
            autoplunge: autoplunge || stealth,
            callback,
        }
    }

    pub fn balls_remaining(&self) -> u32 {
        self.balls_remaining
    }

    pub fn is_stealth(&self) -> bool {
        self.stealth
    }

    pub fn autoplunge(&self) -> bool {
        self.autoplunge
    }

    /// Take the callback so it can fire at most once.
    pub(crate) fn take_callback(&mut self) -> LaunchCallback {
        std::mem::take(&mut self.callback)
    }
}

/// A ball confirmed in the shooter lane, as seen by the head request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FedBall {
    pub(crate) stealth: bool,
    pub(crate) autoplunge: bool,
    /// The head request has no balls left and was popped.
    pub(crate) request_done: bool,
}

/// FIFO of launch requests plus the running total of balls still to feed.
///
/// `pending` always equals the sum of `balls_remaining` over the queue; both
/// only change through `push`, `ball_fed` and `clear`.
#[derive(Debug, Default)]
pub(crate) struct LaunchQueue {
    requests: VecDeque<LaunchRequest>,
    pending: u32,
}

impl LaunchQueue {
    /// Append a request. Returns whether the queue was idle before.
    pub(crate) fn push(&mut self, req: LaunchRequest) -> bool {
        let was_empty = self.requests.is_empty();
        self.pending = self.pending.saturating_add(req.balls_remaining);
        self.requests.push_back(req);
        was_empty
    }

    pub(crate) fn head_mut(&mut self) -> Option<&mut LaunchRequest> {
        self.requests.front_mut()
    }

    /// Account for one ball from the head request reaching the shooter lane.
    pub(crate) fn ball_fed(&mut self) -> Option<FedBall> {
        let head = self.requests.front_mut()?;
        head.balls_remaining = head.balls_remaining.saturating_sub(1);
        self.pending = self.pending.saturating_sub(1);
        let fed = FedBall {
            stealth: head.stealth,
            autoplunge: head.autoplunge,
            request_done: head.balls_remaining == 0,
        };
        if fed.request_done {
            self.requests.pop_front();
        }
        Some(fed)
    }

    pub(crate) fn clear(&mut self) {
        self.requests.clear();
        self.pending = 0;
    }

    pub(crate) fn pending(&self) -> u32 {
        self.pending
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Balls still to feed that will count as live once they land.
    pub(crate) fn non_stealth_remaining(&self) -> u32 {
        self.requests
            .iter()
            .filter(|r| !r.stealth)
            .map(|r| r.balls_remaining)
            .sum()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LaunchRequest> {
        self.requests.iter()
    }
}
