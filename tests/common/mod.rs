#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use orbitllm::{
  Adapter, Error, LlmRequest, LlmResponse, Orchestrator, OrchestratorConfig
, Provider, Usage
};

pub fn init_logger()
{   let _ = env_logger::builder().is_test(true).try_init();
}

/// Canned adapter recording what it was asked
pub struct StubAdapter
{   provider: Provider
  , model: String
  , replies: Arc<Mutex<Vec<Result<LlmResponse, Error>>>>
  , seen: Arc<Mutex<Vec<LlmRequest>>>
  , calls: Arc<AtomicUsize>
}

#[async_trait]
impl Adapter for StubAdapter
{   fn provider(&self) -> Provider
    {   self.provider
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn generate(&self, request: &LlmRequest)
      -> Result<LlmResponse, Error>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1
        {   replies.remove(0)
        } else
        {   replies[0].clone()
        }
    }
}

/// Shared handles to inspect a stubbed orchestrator after the fact
#[derive(Clone, Default)]
pub struct StubHandles
{   pub builds: Arc<Mutex<Vec<(Provider, String)>>>
  , pub seen: Arc<Mutex<Vec<LlmRequest>>>
  , pub calls: Arc<AtomicUsize>
}

impl StubHandles
{   pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    pub fn builds(&self) -> Vec<(Provider, String)>
    {   self.builds.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> LlmRequest
    {   self.seen.lock().unwrap().last().cloned().expect("no request seen")
    }
}

pub fn reply(text: &str) -> LlmResponse
{   LlmResponse
    {   text: text.to_string()
      , usage: Usage
        {   prompt_tokens: 12
          , completion_tokens: 1
          , total_tokens: 13
        }
      , model_name: Some("stub-model".to_string())
      , finish_reason: Some("stop".to_string())
    }
}

/// Orchestrator whose adapters replay `replies` in order; the last
/// reply repeats once the others are used up.
pub fn stub_orchestrator(
  config: OrchestratorConfig
, replies: Vec<Result<LlmResponse, Error>>
) -> (Orchestrator, StubHandles)
{   let handles = StubHandles::default();
    let replies = Arc::new(Mutex::new(replies));
    let h = handles.clone();
    let orchestrator = Orchestrator::with_factory(
      config,
      move |provider: Provider, model: &str|
        -> Result<Box<dyn Adapter>, Error>
      {   h.builds.lock().unwrap().push((provider, model.to_string()));
          Ok(Box::new(StubAdapter
          {   provider
            , model: model.to_string()
            , replies: replies.clone()
            , seen: h.seen.clone()
            , calls: h.calls.clone()
          }))
      }
    );
    (orchestrator, handles)
}

pub fn default_config() -> OrchestratorConfig
{   OrchestratorConfig
    {   default_provider: "openai".to_string()
      , default_model: "gpt-4o-mini".to_string()
    }
}
