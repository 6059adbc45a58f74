use tokio_util::sync::{CancellationToken, DropGuard};

/// Single-shot "task finished" signal.
///
/// Exactly one task owns the [`CompletionGuard`]; when the guard is dropped
/// (normal return, early return or panic) every waiter is released. Any
/// number of clones may wait, before or after the signal fires.
#[derive(Debug, Clone)]
pub struct Completion {
    token: CancellationToken,
}

/// Fires the associated [`Completion`] when dropped.
#[derive(Debug)]
pub struct CompletionGuard {
    _guard: DropGuard,
}

impl Completion {
    pub fn new() -> (Self, CompletionGuard) {
        let token = CancellationToken::new();
        let guard = CompletionGuard {
            _guard: token.clone().drop_guard(),
        };
        (Self { token }, guard)
    }

    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }
}
