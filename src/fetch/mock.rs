//! Scripted transport and counting renewer for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ClientProfile, FetchError, FetchOutcome, FetchRequest, IdentityRenewer, Transport};

/// Replays queued results; the last one repeats once the queue is drained.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
    last: Result<FetchOutcome, FetchError>,
    profiles: Mutex<Vec<ClientProfile>>,
}

impl ScriptedTransport {
    pub(crate) fn always(result: Result<FetchOutcome, FetchError>) -> Self {
        Self::sequence(Vec::new(), result)
    }

    pub(crate) fn sequence(
        first: Vec<Result<FetchOutcome, FetchError>>,
        then: Result<FetchOutcome, FetchError>,
    ) -> Self {
        Self {
            script: Mutex::new(first.into()),
            last: then,
            profiles: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn page(status: u16, final_url: &str, body: &str) -> FetchOutcome {
        FetchOutcome {
            status,
            body: body.as_bytes().to_vec(),
            final_url: final_url.to_string(),
            headers: HashMap::new(),
        }
    }

    pub(crate) fn profiles_seen(&self) -> Vec<ClientProfile> {
        self.profiles.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        profile: &ClientProfile,
    ) -> Result<FetchOutcome, FetchError> {
        self.profiles.lock().unwrap().push(profile.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.last.clone())
    }
}

#[derive(Debug, Default)]
pub(crate) struct CountingRenewer {
    calls: AtomicUsize,
}

impl CountingRenewer {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityRenewer for CountingRenewer {
    async fn renew(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
