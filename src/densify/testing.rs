//! Scripted densifiers for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::DensifyError;
use super::factory::DensifierFactory;
use super::{Densifier, DensifyOutput, DensifyRequest, Provider};

type Reply = Result<DensifyOutput, DensifyError>;

/// Replays `script` in order, then repeats `fallback` forever.
pub struct ScriptedDensifier {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<DensifyRequest>>,
}

impl ScriptedDensifier {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(DensifyError::Rejected("script exhausted".into())),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self {
            fallback: reply,
            ..Self::new(Vec::new())
        }
    }

    pub fn succeeding(content: &str, title: Option<&str>) -> Self {
        Self::always(Ok(DensifyOutput {
            content: content.to_string(),
            title: title.map(str::to_string),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<DensifyRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Densifier for ScriptedDensifier {
    async fn densify(&self, request: &DensifyRequest) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
    }
}

/// Hands out the same scripted densifier for every provider.
pub struct ScriptedFactory(pub Arc<ScriptedDensifier>);

impl DensifierFactory for ScriptedFactory {
    fn densifier(&self, _provider: Provider) -> Arc<dyn Densifier> {
        self.0.clone()
    }
}
