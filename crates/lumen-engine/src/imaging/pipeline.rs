use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::decode::{decode_image, DecodeError, ImageSource, PendingImage};

/// Receiver of decode results.
///
/// `begin_request` hands out a ticket for each new selection; `deliver` must
/// drop any result whose ticket is no longer the newest, so a slow decode
/// that finishes after a newer selection never reaches the engine.
pub trait ImageSink: Send + Sync + 'static {
    fn begin_request(&self) -> u64;
    fn deliver(&self, ticket: u64, result: Result<PendingImage, DecodeError>);
}

/// Runs decodes on short-lived helper threads.
pub struct ImagePipeline {
    sink: Arc<dyn ImageSink>,
    helpers: Mutex<Vec<JoinHandle<()>>>,
}

impl ImagePipeline {
    pub fn new(sink: Arc<dyn ImageSink>) -> Self {
        Self {
            sink,
            helpers: Mutex::new(Vec::new()),
        }
    }

    /// Starts decoding `source` and returns its ticket. Never blocks on the
    /// decode itself.
    pub fn request(&self, source: ImageSource) -> u64 {
        let ticket = self.sink.begin_request();
        let sink = Arc::clone(&self.sink);

        log::info!("decoding image #{ticket} from {source}");

        let spawned = thread::Builder::new()
            .name(format!("lumen-decode-{ticket}"))
            .spawn(move || {
                let result = decode_image(&source);
                if let Err(e) = &result {
                    log::warn!("image #{ticket} ({source}): {e}");
                }
                sink.deliver(ticket, result);
            });

        let mut helpers = self.helpers.lock().unwrap_or_else(PoisonError::into_inner);
        helpers.retain(|h| !h.is_finished());

        match spawned {
            Ok(handle) => helpers.push(handle),
            Err(e) => self.sink.deliver(ticket, Err(DecodeError::Spawn(e))),
        }

        ticket
    }

    /// Blocks until every in-flight decode has delivered its result.
    pub fn wait_idle(&self) {
        let helpers: Vec<_> = self
            .helpers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for helper in helpers {
            if helper.join().is_err() {
                log::error!("image decode helper panicked");
            }
        }
    }
}

impl Drop for ImagePipeline {
    fn drop(&mut self) {
        self.wait_idle();
    }
}
