//! `docfill`: fill a form schema from a PDF with an LLM.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docfill_core::prompt::describe_field;
use docfill_core::{
    build_prompt_with, process_response, Cost, FieldValidator, FormState, ModelDescriptor,
    Pricing, SchemaCatalog, SchemaOption,
};
use docfill_runtime::{
    create_provider, ExtractionPipeline, LlmProvider, ModelCatalog, PdfTextExtractor,
    RunOutcome, RuntimeConfig, RuntimeError, Session, TextExtractor,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding schema files (.yaml, .yml, .json)
    #[arg(long, global = true, default_value = "schemas")]
    schemas: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the provider's models with pricing
    Models {
        /// Only show models whose id contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// List available schemas, or the fields of one
    Schemas { id: Option<String> },
    /// Print the prompt that would be sent for a document
    Prompt {
        /// PDF or plain-text document
        document: PathBuf,
        #[arg(long)]
        schema: Option<String>,
    },
    /// Validate a saved model reply against a schema, offline
    Validate {
        /// File holding the raw model reply
        response: PathBuf,
        #[arg(long)]
        schema: Option<String>,
    },
    /// Extract form values from a PDF
    Extract {
        document: PathBuf,
        #[arg(long)]
        schema: Option<String>,
        /// Model id; defaults to the configured model
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<RuntimeError>() {
                Some(runtime) => eprintln!("{}", runtime.user_message()),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "docfill=debug" } else { "docfill=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Models { filter } => list_models(&config, filter.as_deref(), cli.json).await,
        Commands::Schemas { id } => list_schemas(&cli.schemas, id.as_deref(), cli.json),
        Commands::Prompt { document, schema } => {
            let schema = pick_schema(&cli.schemas, schema.as_deref())?;
            let text = read_document(&document, &config)?;
            println!("{}", build_prompt_with(&text, &schema.fields, &config.denylist()));
            Ok(())
        }
        Commands::Validate { response, schema } => {
            let schema = pick_schema(&cli.schemas, schema.as_deref())?;
            validate_offline(&config, &schema, &response, cli.json)
        }
        Commands::Extract {
            document,
            schema,
            model,
        } => {
            let schema = pick_schema(&cli.schemas, schema.as_deref())?;
            let model = model.unwrap_or_else(|| config.default_model.clone());
            extract(&config, schema, &model, &document, cli.json).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    config.apply_env().context("applying environment overrides")?;
    Ok(config)
}

fn build_provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    create_provider(config)
        .map_err(RuntimeError::from)
        .with_context(|| format!("creating provider '{}'", config.provider))
}

fn pick_schema(dir: &Path, id: Option<&str>) -> Result<SchemaOption> {
    let catalog = SchemaCatalog::from_dir(dir)
        .with_context(|| format!("loading schemas from {}", dir.display()))?;

    let schema = match id {
        Some(id) => catalog.get(id),
        None => catalog.default_schema(),
    };
    match schema {
        Some(schema) => Ok(schema.clone()),
        None if catalog.is_empty() => bail!("no schemas found in {}", dir.display()),
        None => bail!(
            "unknown schema '{}', available: {}",
            id.unwrap_or_default(),
            catalog.ids().join(", ")
        ),
    }
}

/// Text of a PDF, or the file as-is for anything else.
fn read_document(path: &Path, config: &RuntimeConfig) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Ok(PdfTextExtractor::new(config.extractor.clone())
            .extract_file(path)
            .map_err(RuntimeError::from)?)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

async fn list_models(config: &RuntimeConfig, filter: Option<&str>, json: bool) -> Result<()> {
    let catalog = ModelCatalog::new(build_provider(config)?, config.catalog_ttl);
    let models = catalog.models().await.map_err(RuntimeError::from)?;
    let models: Vec<&ModelDescriptor> = models
        .iter()
        .filter(|m| filter.map_or(true, |f| m.id.contains(f)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    for model in models {
        let pricing = match Pricing::from_descriptor(model) {
            Ok(pricing) => {
                let (prompt, completion) = pricing.per_million();
                format!("${:.2} / ${:.2} per 1M", prompt, completion)
            }
            Err(_) => "pricing N/A".to_string(),
        };
        println!(
            "{:<48} {:<36} {:>24}  ctx {}",
            model.id, model.name, pricing, model.context_window
        );
    }
    Ok(())
}

fn list_schemas(dir: &Path, id: Option<&str>, json: bool) -> Result<()> {
    if let Some(id) = id {
        let schema = pick_schema(dir, Some(id))?;
        if json {
            let value = serde_json::json!({
                "id": schema.id,
                "name": schema.name,
                "fields": schema.fields,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{} ({})", schema.name, schema.id);
            for field in schema.fields.iter() {
                println!("  {:<28} {}", field.label, describe_field(field));
            }
        }
        return Ok(());
    }

    let catalog = SchemaCatalog::from_dir(dir)
        .with_context(|| format!("loading schemas from {}", dir.display()))?;

    if json {
        let entries: Vec<_> = catalog
            .iter()
            .map(|s| serde_json::json!({ "id": s.id, "name": s.name, "fields": s.fields.len() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for schema in catalog.iter() {
            println!("{:<24} {:<32} {} fields", schema.id, schema.name, schema.fields.len());
        }
    }
    Ok(())
}

fn validate_offline(
    config: &RuntimeConfig,
    schema: &SchemaOption,
    response: &Path,
    json: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(response)
        .with_context(|| format!("reading {}", response.display()))?;

    let validator = FieldValidator::new(config.denylist());
    let validation =
        process_response(&raw, &schema.fields, &validator).map_err(RuntimeError::from)?;

    let mut form = FormState::new(schema.fields.clone());
    form.apply(&validation);

    if json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else {
        print_form(&form);
    }
    Ok(())
}

async fn extract(
    config: &RuntimeConfig,
    schema: SchemaOption,
    model_id: &str,
    document: &Path,
    json: bool,
) -> Result<()> {
    let provider = build_provider(config)?;
    let catalog = Arc::new(ModelCatalog::new(provider.clone(), config.catalog_ttl));
    let pipeline = Arc::new(ExtractionPipeline::new(
        provider,
        catalog.clone(),
        FieldValidator::new(config.denylist()),
        config.completion_config(model_id),
    ));
    let extractor = Arc::new(PdfTextExtractor::new(config.extractor.clone()));
    let session = Session::new(pipeline, extractor, schema, model_id);

    let bytes = tokio::fs::read(document)
        .await
        .with_context(|| format!("reading {}", document.display()))?;
    let chars = session.load_document(bytes).await?;
    info!(chars, document = %document.display(), "document loaded");

    let outcome = match session.process().await? {
        RunOutcome::Applied(outcome) => outcome,
        RunOutcome::Stale => bail!("result discarded: session changed during the run"),
    };

    let form = session.form();
    let schema = session.schema();
    if json {
        let value = serde_json::json!({
            "schema": schema.id,
            "model": outcome.model,
            "values": outcome.validation.values,
            "filled_count": form.filled_count(),
            "total_fields": form.total_fields(),
            "usage": outcome.usage,
            "cost": outcome.cost,
            "processed_at": outcome.processed_at,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let descriptor = catalog.get(model_id).await.map_err(RuntimeError::from)?;
    print_form(&form);
    println!();
    print_summary(&schema, descriptor.as_ref(), model_id, &form, &outcome.cost);
    Ok(())
}

fn print_form(form: &FormState) {
    for field in form.fields().iter() {
        let value = form
            .value(&field.name)
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "-".to_string());
        let label = if field.label.is_empty() {
            &field.name
        } else {
            &field.label
        };
        println!("{:<28} {}", label, value);
    }
}

fn print_summary(
    schema: &SchemaOption,
    model: Option<&ModelDescriptor>,
    model_id: &str,
    form: &FormState,
    cost: &Cost,
) {
    println!("Schema:            {}", schema.name);
    println!("Model:             {}", model.map_or(model_id, |m| m.name.as_str()));
    if let Some(pricing) = model.and_then(|m| Pricing::from_descriptor(m).ok()) {
        let (prompt, completion) = pricing.per_million();
        println!("Prompt / 1M:       ${:.2}", prompt);
        println!("Completion / 1M:   ${:.2}", completion);
    }
    println!(
        "Tokens:            {} prompt, {} completion",
        cost.prompt_tokens, cost.completion_tokens
    );
    println!("Prompt cost:       ${:.4}", cost.prompt_cost);
    println!("Completion cost:   ${:.4}", cost.completion_cost);
    println!("Total cost:        ${:.4}", cost.total_cost);
    println!(
        "Completed fields:  {}/{}",
        form.filled_count(),
        form.total_fields()
    );
}
