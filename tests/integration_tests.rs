mod common;

use std::time::Duration;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orbitllm::providers::{AnthropicAdapter, OpenAiAdapter};
use orbitllm::{
  Adapter, Error, GenerateOptions, LlmRequest, Message, Orchestrator
, OrchestratorConfig, ProviderConfig, Provider, Role
};
use common::{default_config, init_logger, reply, stub_orchestrator};

fn mock_config(server: &MockServer) -> ProviderConfig
{   ProviderConfig::default().with_api_base(server.uri())
}

fn openai_ok() -> serde_json::Value
{   json!({
      "id": "chatcmpl-1",
      "model": "gpt-4o-mini-2024-07-18",
      "choices": [{
        "index": 0,
        "message": {"role": "assistant", "content": "ok"},
        "finish_reason": "stop"
      }],
      "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
    })
}

fn say_ok() -> LlmRequest
{   LlmRequest::new(vec![
      Message::system("You are terse.")
    , Message::user("Say 'ok'.")
    ])
    .with_max_tokens(10)
}

// ===== Orchestrator =====

#[tokio::test]
async fn test_stubbed_adapter_returns_text()
{   init_logger();
    let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("ok"))]
    );
    let request = LlmRequest::new(vec![Message::user("Say 'ok'.")])
      .with_temperature(0.2)
      .with_max_tokens(10);

    let response = orch
      .generate(request.clone(), GenerateOptions::new())
      .await
      .unwrap();

    assert_eq!(response.text, "ok");
    assert_eq!(response.model_name.as_deref(), Some("stub-model"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(handles.calls(), 1);
    assert_eq!(handles.last_request(), request);
}

#[tokio::test]
async fn test_empty_prompt_is_invalid()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("never"))]
    );

    for input in ["", "   \n\t"]
    {   let err = orch
          .generate(input, GenerateOptions::new())
          .await
          .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)), "{:?}", err);
    }
    let err = orch
      .generate(Vec::<Message>::new(), GenerateOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    assert_eq!(handles.calls(), 0);
    assert!(handles.builds().is_empty());
}

#[tokio::test]
async fn test_unknown_provider_makes_no_calls()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("never"))]
    );

    let err = orch
      .generate("hello", GenerateOptions::new().provider("nonexistent"))
      .await
      .unwrap_err();

    assert_eq!(err, Error::UnknownProvider("nonexistent".to_string()));
    assert_eq!(handles.calls(), 0);
    assert!(handles.builds().is_empty());
}

#[tokio::test]
async fn test_unknown_default_provider_fails_at_call_time()
{   let config = OrchestratorConfig::resolve(
      Some("mystery".to_string()),
      Some("m-1".to_string())
    );
    let (orch, handles) = stub_orchestrator(config, vec![Ok(reply("x"))]);

    assert_eq!(orch.info().default_provider, "mystery");
    let err = orch
      .generate("hello", GenerateOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::UnknownProvider(_)));

    // A per-call override still works
    let response = orch
      .generate("hello", GenerateOptions::new().provider("openai"))
      .await
      .unwrap();
    assert_eq!(response.text, "x");
    assert_eq!(handles.builds(), vec![(Provider::OpenAI, "gpt-4o-mini".to_string())]);
}

#[tokio::test]
async fn test_string_prompt_becomes_user_message()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("hi"))]
    );

    orch
      .generate("Hello there", GenerateOptions::new().max_tokens(32))
      .await
      .unwrap();

    let sent = handles.last_request();
    assert_eq!(sent.messages, vec![Message::user("Hello there")]);
    assert_eq!(sent.messages[0].role, Role::User);
    assert_eq!(sent.temperature, 0.2);
    assert_eq!(sent.max_tokens, Some(32));
}

#[tokio::test]
async fn test_request_overrides_only_when_passed()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("ok"))]
    );
    let request = say_ok().with_temperature(0.9);

    orch.generate(request.clone(), GenerateOptions::new()).await.unwrap();
    let sent = handles.last_request();
    assert_eq!(sent.temperature, 0.9);
    assert_eq!(sent.max_tokens, Some(10));

    orch
      .generate(request, GenerateOptions::new().temperature(1.5))
      .await
      .unwrap();
    let sent = handles.last_request();
    assert_eq!(sent.temperature, 1.5);
    assert_eq!(sent.max_tokens, Some(10));
}

#[tokio::test]
async fn test_out_of_range_parameters_are_invalid()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("ok"))]
    );

    let err = orch
      .generate("hi", GenerateOptions::new().temperature(2.5))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = orch
      .generate("hi", GenerateOptions::new().max_tokens(0))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(handles.calls(), 0);
}

#[test]
fn test_model_selection_keeps_defaults()
{   let (orch, handles) = stub_orchestrator(
      default_config(),
      vec![Ok(reply("ok"))]
    );

    tokio_test::block_on(async {
      orch.generate("a", GenerateOptions::new()).await.unwrap();
      orch
        .generate("b", GenerateOptions::new().provider("Claude"))
        .await
        .unwrap();
      orch
        .generate("c", GenerateOptions::new().provider("anthropic").model("claude-3-haiku"))
        .await
        .unwrap();
      orch
        .generate("d", GenerateOptions::new().model("gpt-4o"))
        .await
        .unwrap();
    });

    assert_eq!(handles.builds(), vec![
      (Provider::OpenAI, "gpt-4o-mini".to_string())
    , (Provider::Anthropic, "claude-3-opus-20240229".to_string())
    , (Provider::Anthropic, "claude-3-haiku".to_string())
    , (Provider::OpenAI, "gpt-4o".to_string())
    ]);
    assert_eq!(orch.info().default_model, "gpt-4o-mini");
    assert_eq!(orch.info().default_provider, "openai");
}

#[tokio::test]
async fn test_adapter_errors_propagate_unchanged()
{   let (orch, _) = stub_orchestrator(
      default_config(),
      vec![Err(Error::RateLimited("slow down".to_string()))]
    );

    let err = orch
      .generate("hi", GenerateOptions::new())
      .await
      .unwrap_err();
    assert_eq!(err, Error::RateLimited("slow down".to_string()));
    assert!(err.is_retryable());
}

// ===== Configuration =====

#[test]
#[serial]
fn test_config_resolution_order()
{   std::env::set_var("DEFAULT_PROVIDER", "Claude");
    std::env::set_var("DEFAULT_MODEL", "claude-3-sonnet");

    let from_env = OrchestratorConfig::from_env();
    assert_eq!(from_env.default_provider, "claude");
    assert_eq!(from_env.default_model, "claude-3-sonnet");

    let explicit = OrchestratorConfig::resolve(
      Some("OpenAI".to_string()),
      Some("gpt-4o".to_string())
    );
    assert_eq!(explicit.default_provider, "openai");
    assert_eq!(explicit.default_model, "gpt-4o");

    std::env::remove_var("DEFAULT_PROVIDER");
    std::env::remove_var("DEFAULT_MODEL");

    let fallback = Orchestrator::new(None, None).info();
    assert_eq!(fallback.default_provider, "openai");
    assert_eq!(fallback.default_model, "gpt-4o-mini");
}

#[tokio::test]
#[serial]
async fn test_default_model_follows_default_provider()
{   std::env::remove_var("DEFAULT_PROVIDER");
    std::env::remove_var("DEFAULT_MODEL");

    let claude = OrchestratorConfig::resolve(Some("claude".to_string()), None);
    assert_eq!(claude.default_model, "claude-3-opus-20240229");

    let unknown = OrchestratorConfig::resolve(Some("mistral".to_string()), None);
    assert_eq!(unknown.default_model, "gpt-4o-mini");

    std::env::set_var("DEFAULT_PROVIDER", "anthropic");
    let from_env = OrchestratorConfig::from_env();
    std::env::remove_var("DEFAULT_PROVIDER");
    assert_eq!(from_env.default_model, "claude-3-opus-20240229");

    let (orch, handles) = stub_orchestrator(claude, vec![Ok(reply("ok"))]);
    orch.generate("hi", GenerateOptions::default()).await.unwrap();
    assert_eq!(
      handles.builds(),
      vec![(Provider::Anthropic, "claude-3-opus-20240229".to_string())]
    );
}

#[test]
#[serial]
fn test_provider_config_from_env()
{   std::env::set_var("OPENAI_API_BASE", "http://localhost:9999/v1");
    std::env::set_var("LLM_TIMEOUT_SECS", "5");
    let config = ProviderConfig::from_env(Provider::OpenAI);
    assert_eq!(config.api_base.as_deref(), Some("http://localhost:9999/v1"));
    assert_eq!(config.timeout_secs, 5);

    std::env::set_var("LLM_TIMEOUT_SECS", "soon");
    assert_eq!(ProviderConfig::from_env(Provider::OpenAI).timeout_secs, 60);

    std::env::remove_var("OPENAI_API_BASE");
    std::env::remove_var("LLM_TIMEOUT_SECS");
    assert_eq!(ProviderConfig::from_env(Provider::OpenAI), ProviderConfig::default());
}

// ===== Credentials =====

#[tokio::test]
#[serial]
async fn test_missing_credential_fails_before_network()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok()))
      .expect(0)
      .mount(&server)
      .await;

    std::env::remove_var("OPENAI_API_KEY");
    let err = OpenAiAdapter::new("gpt-4o-mini", &mock_config(&server))
      .err()
      .unwrap();
    assert!(matches!(err, Error::Configuration(_)), "{:?}", err);

    std::env::set_var("ANTHROPIC_API_KEY", "   ");
    let err = AnthropicAdapter::new("claude-3-haiku", &mock_config(&server))
      .err()
      .unwrap();
    assert!(matches!(err, Error::Configuration(_)), "{:?}", err);
    std::env::remove_var("ANTHROPIC_API_KEY");

    // Same through the orchestrator's environment factory
    std::env::set_var("OPENAI_API_BASE", server.uri());
    let err = Orchestrator::new(Some("openai".to_string()), None)
      .generate("hello", GenerateOptions::new())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{:?}", err);
    std::env::remove_var("OPENAI_API_BASE");
}

#[tokio::test]
#[serial]
async fn test_env_factory_end_to_end()
{   init_logger();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer env-key"))
      .and(body_partial_json(json!({"model": "gpt-4o-mini", "temperature": 0.2})))
      .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok()))
      .expect(1)
      .mount(&server)
      .await;

    std::env::set_var("OPENAI_API_KEY", "env-key");
    std::env::set_var("OPENAI_API_BASE", server.uri());

    let response = Orchestrator::new(Some("openai".to_string()), None)
      .generate("Say 'ok'.", GenerateOptions::new())
      .await;

    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("OPENAI_API_BASE");

    let response = response.unwrap();
    assert_eq!(response.text, "ok");
    assert_eq!(response.usage.total_tokens, 10);
}

// ===== OpenAI adapter =====

#[tokio::test]
async fn test_openai_generate()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("authorization", "Bearer test-key"))
      .and(body_partial_json(json!({
        "model": "gpt-4o-mini",
        "max_tokens": 10,
        "messages": [
          {"role": "system", "content": "You are terse."},
          {"role": "user", "content": "Say 'ok'."}
        ]
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok()))
      .expect(1)
      .mount(&server)
      .await;

    let adapter = OpenAiAdapter::with_key(
      "test-key".to_string(),
      "gpt-4o-mini",
      &mock_config(&server)
    ).unwrap();
    assert_eq!(adapter.provider(), Provider::OpenAI);
    assert_eq!(adapter.model(), "gpt-4o-mini");

    let response = adapter.generate(&say_ok()).await.unwrap();
    assert_eq!(response.text, "ok");
    assert_eq!(response.model_name.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.prompt_tokens, 9);
    assert_eq!(response.usage.completion_tokens, 1);
    assert_eq!(response.usage.total_tokens, 10);
}

#[tokio::test]
async fn test_openai_partial_reply_still_has_text()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
          "message": {"role": "assistant", "content": null},
          "finish_reason": "length"
        }]
      })))
      .mount(&server)
      .await;

    let adapter = OpenAiAdapter::with_key(
      "k".to_string(), "gpt-4o-mini", &mock_config(&server)
    ).unwrap();
    let response = adapter.generate(&say_ok()).await.unwrap();

    assert_eq!(response.text, "");
    assert_eq!(response.finish_reason.as_deref(), Some("length"));
    assert_eq!(response.usage, orbitllm::Usage::default());
    assert_eq!(response.model_name.as_deref(), Some("gpt-4o-mini"));
}

#[tokio::test]
async fn test_openai_no_choices()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
      .mount(&server)
      .await;

    let adapter = OpenAiAdapter::with_key(
      "k".to_string(), "gpt-4o-mini", &mock_config(&server)
    ).unwrap();
    let response = adapter.generate(&say_ok()).await.unwrap();
    assert_eq!(response.text, "");
    assert_eq!(response.finish_reason, None);
}

#[tokio::test]
async fn test_openai_error_translation()
{   let cases = vec![
      (429, json!({"error": {"message": "Rate limit reached"}}))
    , (401, json!({"error": {"message": "Incorrect API key provided"}}))
    , (403, json!({"error": {"message": "Forbidden"}}))
    , (500, json!({"error": {"message": "The server had an error"}}))
    ];

    for (status, body) in cases
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .respond_with(ResponseTemplate::new(status).set_body_json(body))
          .expect(1)
          .mount(&server)
          .await;

        let adapter = OpenAiAdapter::with_key(
          "k".to_string(), "gpt-4o-mini", &mock_config(&server)
        ).unwrap();
        let err = adapter.generate(&say_ok()).await.unwrap_err();

        match status
        {   429 => assert_eq!(err, Error::RateLimited("Rate limit reached".to_string()))
          , 401 => assert_eq!(
              err,
              Error::AuthenticationFailed("Incorrect API key provided".to_string())
            )
          , 403 => assert!(matches!(err, Error::AuthenticationFailed(_)))
          , _ => {
              assert!(matches!(&err, Error::VendorError(m) if m.contains("The server had an error")));
              assert!(!err.is_retryable());
            }
        }
    }
}

#[tokio::test]
async fn test_openai_unreadable_body_is_vendor_error()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
      .mount(&server)
      .await;

    let adapter = OpenAiAdapter::with_key(
      "k".to_string(), "gpt-4o-mini", &mock_config(&server)
    ).unwrap();
    let err = adapter.generate(&say_ok()).await.unwrap_err();
    assert!(matches!(err, Error::VendorError(_)), "{:?}", err);
}

#[tokio::test]
async fn test_timeout_is_connection_failure()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(openai_ok())
          .set_delay(Duration::from_secs(3))
      )
      .mount(&server)
      .await;

    let adapter = OpenAiAdapter::with_key(
      "k".to_string(),
      "gpt-4o-mini",
      &mock_config(&server).with_timeout_secs(1)
    ).unwrap();
    let err = adapter.generate(&say_ok()).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed(_)), "{:?}", err);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_connection_failure()
{   // Port 9 (discard) is closed on test machines
    let config = ProviderConfig::default()
      .with_api_base("http://127.0.0.1:9/v1")
      .with_timeout_secs(2);
    let adapter = OpenAiAdapter::with_key("k".to_string(), "gpt-4o-mini", &config)
      .unwrap();
    let err = adapter.generate(&say_ok()).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed(_)), "{:?}", err);
}

// ===== Anthropic adapter =====

#[tokio::test]
async fn test_anthropic_generate()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/messages"))
      .and(header("x-api-key", "test-key"))
      .and(header("anthropic-version", "2023-06-01"))
      .and(body_partial_json(json!({
        "model": "claude-3-haiku",
        "max_tokens": 10,
        "system": "You are terse.",
        "messages": [{"role": "user", "content": "Say 'ok'."}]
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-haiku-20240307",
        "content": [
          {"type": "text", "text": "o"},
          {"type": "text", "text": "k"}
        ],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 14, "output_tokens": 2}
      })))
      .expect(1)
      .mount(&server)
      .await;

    let adapter = AnthropicAdapter::with_key(
      "test-key".to_string(),
      "claude-3-haiku",
      &mock_config(&server)
    ).unwrap();
    assert_eq!(adapter.provider(), Provider::Anthropic);

    let response = adapter.generate(&say_ok()).await.unwrap();
    assert_eq!(response.text, "ok");
    assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.model_name.as_deref(), Some("claude-3-haiku-20240307"));
    assert_eq!(response.usage.prompt_tokens, 14);
    assert_eq!(response.usage.completion_tokens, 2);
    assert_eq!(response.usage.total_tokens, 16);
}

#[tokio::test]
async fn test_anthropic_defaults_max_tokens_and_tolerates_missing_usage()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({"max_tokens": 256})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"type": "text", "text": "hello"}]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let adapter = AnthropicAdapter::with_key(
      "k".to_string(), "claude-3-haiku", &mock_config(&server)
    ).unwrap();
    let response = adapter
      .generate(&LlmRequest::from_prompt("hi"))
      .await
      .unwrap();

    assert_eq!(response.text, "hello");
    assert_eq!(response.usage, orbitllm::Usage::default());
    assert_eq!(response.finish_reason, None);
    assert_eq!(response.model_name.as_deref(), Some("claude-3-haiku"));
}

#[tokio::test]
async fn test_anthropic_error_translation()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(429).set_body_json(json!({
        "type": "error",
        "error": {"type": "rate_limit_error", "message": "Number of requests has exceeded your rate limit"}
      })))
      .mount(&server)
      .await;

    let adapter = AnthropicAdapter::with_key(
      "k".to_string(), "claude-3-haiku", &mock_config(&server)
    ).unwrap();
    let err = adapter.generate(&say_ok()).await.unwrap_err();
    assert_eq!(
      err,
      Error::RateLimited("Number of requests has exceeded your rate limit".to_string())
    );
}

#[test]
fn test_provider_names()
{   assert_eq!(Provider::from_name("OpenAI").unwrap(), Provider::OpenAI);
    assert_eq!(Provider::from_name(" claude ").unwrap(), Provider::Anthropic);
    assert_eq!(Provider::from_name("anthropic").unwrap(), Provider::Anthropic);
    assert_eq!(
      Provider::from_name("llama").unwrap_err(),
      Error::UnknownProvider("llama".to_string())
    );
    for provider in Provider::ALL
    {   assert_eq!(Provider::from_name(provider.name()).unwrap(), provider);
    }
}

#[tokio::test]
async fn test_anthropic_rejects_system_only_requests()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let adapter = AnthropicAdapter::with_key(
      "k".to_string(), "claude-3-haiku", &mock_config(&server)
    ).unwrap();
    let request = LlmRequest::new(vec![Message::system("You are terse.")]);
    let err = adapter.generate(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[test]
fn test_provider_serde_matches_public_name()
{   for provider in Provider::ALL
    {   assert_eq!(
          serde_json::to_value(provider).unwrap(),
          json!(provider.name())
        );
    }
    let legacy: Provider = serde_json::from_value(json!("anthropic")).unwrap();
    assert_eq!(legacy, Provider::Anthropic);
}
