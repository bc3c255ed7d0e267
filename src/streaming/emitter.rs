//! Timed character emission.
//!
//! [`spawn_emitter`] starts a task that pushes a finished reply into a
//! one-slot channel, one character at a time, sleeping before each. The
//! returned [`CharStream`] owns a cancellation guard: dropping it (for
//! example when an HTTP client disconnects) stops the task at its current
//! sleep instead of letting it run out the remaining delays.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::delay::Pacing;
use crate::utilities::random::RandomSource;

/// One emitted character and the pause that preceded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    pub ch: char,
    pub delay: Duration,
}

/// Live, consume-once character stream.
pub struct CharStream {
    inner: ReceiverStream<StreamToken>,
    task: JoinHandle<()>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl std::fmt::Debug for CharStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

impl CharStream {
    /// Next token, or `None` once the reply is exhausted or cancelled.
    pub async fn next_token(&mut self) -> Option<StreamToken> {
        self.inner.next().await
    }

    /// Stop emitting. Returns the emitter task so callers can wait for it.
    pub fn cancel(self) -> JoinHandle<()> {
        self.cancel.cancel();
        let CharStream { task, .. } = self;
        task
    }

    /// Drain the remaining characters into a string.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(token) = self.next_token().await {
            text.push(token.ch);
        }
        text
    }
}

impl Stream for CharStream {
    type Item = StreamToken;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Emit `text` with the given pacing on a background task.
///
/// Must be called from within a tokio runtime.
pub fn spawn_emitter(text: String, pacing: Pacing, rng: Arc<dyn RandomSource>) -> CharStream {
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let total = text.chars().count();
        let mut sent = 0usize;
        for ch in text.chars() {
            if token.is_cancelled() {
                break;
            }
            let delay = pacing.delay_for(ch, rng.as_ref());
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent_ok = tx.send(StreamToken { ch, delay }) => {
                    if sent_ok.is_err() {
                        break;
                    }
                }
            }
            sent += 1;
        }
        if sent < total {
            log::debug!("Stream stopped after {} of {} chars", sent, total);
        }
    });

    CharStream {
        inner: ReceiverStream::new(rx),
        task,
        _guard: cancel.clone().drop_guard(),
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::delay::DelayProfile;
    use crate::utilities::random::{ScriptedRandom, ThreadRandom};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_emits_every_char_in_order() {
        let text = "Hi, there. Slow 🦥";
        let stream = spawn_emitter(
            text.to_string(),
            Pacing::Profile(DelayProfile::default()),
            Arc::new(ThreadRandom::seeded(5)),
        );
        assert_eq!(stream.collect_text().await, text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_before_each_char_within_bounds() {
        let profile = DelayProfile::default();
        let text = "Ok, so. Hm";
        let mut stream = spawn_emitter(
            text.to_string(),
            Pacing::Profile(profile.clone()),
            Arc::new(ThreadRandom::seeded(9)),
        );

        let mut last = Instant::now();
        let mut emitted = String::new();
        while let Some(token) = stream.next_token().await {
            let now = Instant::now();
            let (min, max) = profile.bounds(token.ch);
            assert!(token.delay >= min && token.delay <= max);
            // Paused clock: elapsed time is exactly the sleep.
            assert!(now - last >= token.delay);
            last = now;
            emitted.push(token.ch);
        }
        assert_eq!(emitted, text);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flat_pacing_total_time() {
        let start = Instant::now();
        let stream = spawn_emitter(
            "abcde".to_string(),
            Pacing::Flat(Duration::from_millis(200)),
            Arc::new(ScriptedRandom::constant(0.5)),
        );
        assert_eq!(stream.collect_text().await, "abcde");
        assert!(Instant::now() - start >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_mid_delay() {
        let mut stream = spawn_emitter(
            "slow reply".to_string(),
            Pacing::Flat(Duration::from_secs(10)),
            Arc::new(ScriptedRandom::constant(0.0)),
        );
        assert_eq!(stream.next_token().await.map(|t| t.ch), Some('s'));

        let before = Instant::now();
        let task = stream.cancel();
        tokio::time::timeout(Duration::from_millis(1), task)
            .await
            .expect("emitter should stop without waiting out its delay")
            .unwrap();
        assert!(Instant::now() - before < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_emitter() {
        let rng: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::constant(0.0));
        let mut stream = spawn_emitter(
            "abcdef".to_string(),
            Pacing::Flat(Duration::from_secs(1)),
            Arc::clone(&rng),
        );
        stream.next_token().await;
        drop(stream);

        for _ in 0..10 {
            if Arc::strong_count(&rng) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&rng), 1, "emitter task should have exited");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_ends_immediately() {
        let mut stream = spawn_emitter(
            String::new(),
            Pacing::Flat(Duration::from_secs(1)),
            Arc::new(ScriptedRandom::constant(0.0)),
        );
        assert!(stream.next_token().await.is_none());
    }
}
