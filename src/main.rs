use std::path::{Path, PathBuf};
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use log::{debug, error};
use serde::Serialize;

use orbitllm::compose::{
  Advisor, AdvisorRequest, AdvisorStyle, ConceptComposer, FixedDeltaVPlanner
, KbHit, MissionTarget, RocketSpecDraft
};
use orbitllm::recovery::Composed;
use orbitllm::{Error, GenerateOptions, LlmRequest, Message, Orchestrator, RetryPolicy};

#[derive(Debug, Parser)]
#[command(name = "orbitllm", about = "Rocket concept composer backed by LLM providers")]
struct Cli
{   /// Default provider (overrides DEFAULT_PROVIDER)
    #[arg(long, global = true)]
    default_provider: Option<String>
  , /// Default model (overrides DEFAULT_MODEL)
    #[arg(long, global = true)]
    default_model: Option<String>
  , #[command(subcommand)]
    command: Command
}

#[derive(Debug, Subcommand)]
enum Command
{   /// Send one prompt and print the normalized response
    Chat
    {   prompt: String
      , #[arg(long)]
        system: Option<String>
      , #[arg(long)]
        provider: Option<String>
      , #[arg(long)]
        model: Option<String>
      , #[arg(long)]
        temperature: Option<f32>
      , #[arg(long)]
        max_tokens: Option<u32>
    }
  , /// Show the active default provider and model
    Info
  , /// Ask the mission advisor a question about a spec
    Advise
    {   question: String
      , /// JSON file with the rocket spec
        #[arg(long)]
        spec: PathBuf
      , /// JSON file with the current concept
        #[arg(long)]
        concept: Option<PathBuf>
      , #[arg(long, default_value = "LEO")]
        target: MissionTarget
      , #[arg(long, default_value = "teacher")]
        style: AdvisorStyle
      , #[arg(long)]
        provider: Option<String>
      , #[arg(long)]
        model: Option<String>
      , #[arg(long, default_value_t = 0)]
        retries: usize
    }
  , /// Compose launch sites, lunar sites and a BoM around a spec
    Concept
    {   /// JSON file with the rocket spec draft
        #[arg(long)]
        spec: PathBuf
      , #[arg(long, default_value = "LEO")]
        target: MissionTarget
      , #[arg(long)]
        origin: Option<String>
      , /// JSON file with knowledge-base hits
        #[arg(long)]
        kb: Option<PathBuf>
      , #[arg(long)]
        provider: Option<String>
      , #[arg(long)]
        model: Option<String>
      , #[arg(long, default_value_t = 0)]
        retries: usize
    }
}

/// Failures of the command line itself, apart from the library taxonomy
#[derive(Debug)]
enum CliError
{   Llm(Error)
  , Output(String)
}

impl CliError
{   fn kind(&self) -> &'static str
    {   match self
        {   CliError::Llm(e) => e.kind()
          , CliError::Output(_) => "output"
        }
    }
}

impl From<Error> for CliError
{   fn from(e: Error) -> Self
    {   CliError::Llm(e)
    }
}

impl std::fmt::Display for CliError
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   match self
        {   CliError::Llm(e) => write!(f, "{}", e)
          , CliError::Output(msg) => write!(f, "Output error: {}", msg)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error>
{   let raw = std::fs::read_to_string(path).map_err(|e| {
      Error::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
      Error::InvalidRequest(format!("invalid JSON in {}: {}", path.display(), e))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError>
{   let out = serde_json::to_string_pretty(value).map_err(|e| {
      CliError::Output(format!("cannot render output: {}", e))
    })?;
    println!("{}", out);
    Ok(())
}

fn print_composed<T: Serialize>(composed: &Composed<T>) -> Result<(), CliError>
{   if composed.is_fallback()
    {   eprintln!("warning: AI did not return valid structured data");
    }
    print_json(composed.value())
}

fn retry_policy(retries: usize) -> RetryPolicy
{   if retries == 0
    {   RetryPolicy::disabled()
    } else
    {   RetryPolicy { max_retries: retries, ..RetryPolicy::default() }
    }
}

fn overrides(provider: Option<String>, model: Option<String>) -> GenerateOptions
{   GenerateOptions
    {   provider
      , model
      , ..GenerateOptions::default()
    }
}

async fn run(cli: Cli) -> Result<(), CliError>
{   let orchestrator = Orchestrator::new(cli.default_provider, cli.default_model);
    debug!("{:?}", orchestrator);

    match cli.command
    {   Command::Info => print_json(&orchestrator.info())
      , Command::Chat { prompt, system, provider, model, temperature, max_tokens } => {
          let mut options = overrides(provider, model);
          options.temperature = temperature;
          options.max_tokens = max_tokens;
          let response = match system
          {   Some(system) => {
                let request = LlmRequest::new(vec![
                  Message::system(system)
                , Message::user(prompt)
                ]);
                orchestrator.generate(request, options).await?
              }
            , None => orchestrator.generate(prompt, options).await?
          };
          print_json(&response)
        }
      , Command::Advise { question, spec, concept, target, style, provider, model, retries } => {
          let mut request = AdvisorRequest::new(question, read_json(&spec)?);
          request.concept = match concept
          {   Some(path) => Some(read_json(&path)?)
            , None => None
          };
          request.target = target;
          request.style = style;
          request.model = model;
          let advisor = Advisor::new(orchestrator)
            .with_options(overrides(provider, None))
            .with_retry(retry_policy(retries));
          print_composed(&advisor.ask(&request).await?)
        }
      , Command::Concept { spec, target, origin, kb, provider, model, retries } => {
          let spec: RocketSpecDraft = read_json(&spec)?;
          let kb_hits: Vec<KbHit> = match kb
          {   Some(path) => read_json(&path)?
            , None => vec![]
          };
          let composer = ConceptComposer::new(orchestrator, FixedDeltaVPlanner)
            .with_options(overrides(provider, model))
            .with_retry(retry_policy(retries));
          let report = composer
            .compose_from_spec(&spec, target, origin.as_deref(), &kb_hits)
            .await?;
          print_composed(&report)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode
{   let _ = dotenvy::dotenv();
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          error!("{}", e);
          eprintln!("operation failed [{}]: {}", e.kind(), e);
          ExitCode::FAILURE
        }
    }
}
