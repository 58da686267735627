//! Scheduler handle for hosts that handle chunks concurrently.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use super::scheduler::{ChunkOutcome, PlaybackScheduler};
use super::sink::AudioSink;
use crate::error::PianoDjError;
use crate::pcm::{decode_chunk, AudioBuffer};

/// Serializes every write to the scheduler clock behind one lock.
///
/// [`SharedScheduler::handle_chunk`] decodes without holding the lock and
/// only takes it to check the state and start the buffer, so pause/stop
/// never wait on a decode and still suppress its output.
#[derive(Debug, Clone)]
pub struct SharedScheduler {
    inner: Arc<Mutex<PlaybackScheduler>>,
}

impl SharedScheduler {
    pub fn new(scheduler: PlaybackScheduler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, PlaybackScheduler> {
        self.inner.lock()
    }

    /// Decode a payload with the scheduler's channel layout.
    ///
    /// Returns `Ok(None)` when playback is not active, so no work is wasted
    /// on chunks that would be dropped anyway.
    pub fn decode(&self, payload: &str) -> Result<Option<AudioBuffer>, PianoDjError> {
        let (sample_rate, channels, accepting) = {
            let scheduler = self.inner.lock();
            (
                scheduler.sample_rate(),
                scheduler.channels(),
                scheduler.state().accepts_audio(),
            )
        };
        if !accepting {
            return Ok(None);
        }
        decode_chunk(payload, sample_rate, channels).map(Some)
    }

    pub fn commit<S: AudioSink>(&self, buffer: AudioBuffer, sink: &mut S) -> ChunkOutcome {
        self.inner.lock().commit(buffer, sink)
    }

    pub fn handle_chunk<S: AudioSink>(&self, payload: &str, sink: &mut S) -> ChunkOutcome {
        match self.decode(payload) {
            Ok(Some(buffer)) => self.commit(buffer, sink),
            Ok(None) => ChunkOutcome::Ignored(self.inner.lock().state()),
            Err(err) => {
                warn!(%err, "dropping undecodable audio chunk");
                ChunkOutcome::Rejected(err)
            }
        }
    }
}
