use clap::Parser;
use cvsearch::{
    ConfigDb,
    DataDir,
    FieldWeights,
    ResumeField,
    TopK,
    VectorStore,
    config_db::{EMBEDDER_KEY, FIELD_WEIGHTS_KEY, MODEL_NAME_KEY},
    embedder::{Embedder, resolve_embedder},
    error::{self, Error},
    ingestion,
    mcp,
    model_manager::resolve_model_id,
    search::{self, SearchParams},
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{
    Cli,
    Command,
    GetArgs,
    IngestArgs,
    ModelAction,
    SearchArgs,
    WeightsAction,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("CVSEARCH_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config_db = ConfigDb::open(&data_dir.config_db())?;

    match cli.command {
        Command::Ingest(args) => {
            let store = VectorStore::open(&data_dir.vectors_db())?;
            let embedder =
                resolve_embedder(cli.embedder, cli.model.as_deref(), &config_db)?;
            cmd_ingest(&config_db, &store, embedder.as_ref(), &args)?;
        }
        Command::Search(args) => {
            let store = VectorStore::open(&data_dir.vectors_db())?;
            let embedder =
                resolve_embedder(cli.embedder, cli.model.as_deref(), &config_db)?;
            cmd_search(&config_db, &store, embedder.as_ref(), &args)?;
        }
        Command::Get(args) => {
            let store = VectorStore::open(&data_dir.vectors_db())?;
            cmd_get(&store, &args)?;
        }
        Command::Stats(args) => {
            let store = VectorStore::open(&data_dir.vectors_db())?;
            cmd_stats(&config_db, &data_dir, &store, args.json)?;
        }
        Command::Weights { action } => cmd_weights(&config_db, action)?,
        Command::Model { action } => {
            cmd_model(&config_db, cli.model.as_deref(), action)?
        }
        Command::Mcp => {
            let store = VectorStore::open(&data_dir.vectors_db())?;
            let embedder =
                resolve_embedder(cli.embedder, cli.model.as_deref(), &config_db)?;
            mcp::run_mcp(store, config_db, embedder)?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_ingest(
    config_db: &ConfigDb,
    store: &VectorStore,
    embedder: &dyn Embedder,
    args: &IngestArgs,
) -> error::Result<()> {
    if !args.path.is_file() {
        return Err(Error::NotFound {
            kind: "input file",
            name: args.path.display().to_string(),
        });
    }

    if args.reset {
        store.reset()?;
        config_db.remove_setting(EMBEDDER_KEY)?;
        tracing::info!("store cleared");
    }
    config_db.record_embedder(embedder.name())?;

    let stats = ingestion::ingest_jsonl(&args.path, store, embedder)?;

    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        println!(
            "Processed {} resume(s): {} stored, {} failed, {} field embedding(s)",
            stats.processed,
            stats.successful,
            stats.failed,
            stats.total_embeddings
        );
    }
    Ok(())
}

fn cmd_search(
    config_db: &ConfigDb,
    store: &VectorStore,
    embedder: &dyn Embedder,
    args: &SearchArgs,
) -> error::Result<()> {
    let count = TopK::try_from(args.count)?;

    let weights = match &args.weights {
        Some(path) => FieldWeights::load(path)?,
        None => config_db.field_weights()?.unwrap_or_default(),
    };

    config_db.check_embedder(embedder.name())?;

    let params = SearchParams {
        query: args.query.clone(),
        count,
        full: args.full,
    };
    let results = search::execute_search(&params, store, embedder, weights)?;

    if args.json {
        println!("{}", search::format_json(&results, &args.query, &weights)?);
    } else {
        print!("{}", search::format_human(&results, &weights));
    }
    Ok(())
}

fn cmd_get(store: &VectorStore, args: &GetArgs) -> error::Result<()> {
    let record = store.get_resume(&args.resume_id)?.ok_or_else(|| {
        Error::NotFound {
            kind: "resume",
            name: args.resume_id.clone(),
        }
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", search::format_record(&record));
    }
    Ok(())
}

fn cmd_stats(
    config_db: &ConfigDb,
    data_dir: &DataDir,
    store: &VectorStore,
    json: bool,
) -> error::Result<()> {
    let stats = store.stats()?;
    let embedder = config_db.get_setting(EMBEDDER_KEY)?;

    if json {
        let value = serde_json::json!({
            "data_dir": data_dir.root(),
            "embedder": embedder,
            "total_embeddings": stats.total_embeddings,
            "unique_resumes": stats.unique_resumes,
            "field_distribution": stats.field_distribution,
        });
        println!("{value}");
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Embedder: {}", embedder.as_deref().unwrap_or("(none)"));
        println!("Resumes: {}", stats.unique_resumes);
        println!("Field embeddings: {}", stats.total_embeddings);
        for (field, count) in &stats.field_distribution {
            println!("  {field}: {count}");
        }
    }
    Ok(())
}

fn print_weights(weights: &FieldWeights) {
    for field in ResumeField::ALL {
        println!("{:<16} {:.2}", field.as_str(), weights.get(field));
    }
    println!("{:<16} {:.2}", "total", weights.sum());
}

fn cmd_weights(config_db: &ConfigDb, action: WeightsAction) -> error::Result<()> {
    match action {
        WeightsAction::Show { json } => {
            let weights = config_db.field_weights()?.unwrap_or_default();
            if json {
                println!("{}", weights.to_json()?);
            } else {
                print_weights(&weights);
            }
        }
        WeightsAction::Set { field, value } => {
            let weights = config_db
                .field_weights()?
                .unwrap_or_default()
                .with(field, value)?;
            config_db.set_field_weights(&weights)?;
            println!("Set {field} weight to {value}");
        }
        WeightsAction::Reset => {
            config_db.remove_setting(FIELD_WEIGHTS_KEY)?;
            println!("Field weights reset to defaults");
        }
    }
    Ok(())
}

fn cmd_model(
    config_db: &ConfigDb,
    explicit: Option<&str>,
    action: ModelAction,
) -> error::Result<()> {
    match action {
        ModelAction::Show { json } => {
            let (model, source) = resolve_model_id(explicit, config_db)?;
            if json {
                let value = serde_json::json!({
                    "model": model,
                    "source": source.as_str(),
                });
                println!("{value}");
            } else {
                println!("{model} ({})", source.as_str());
            }
        }
        ModelAction::Set { model } => {
            config_db.set_setting(MODEL_NAME_KEY, &model)?;
            println!("Default model set to {model}");
        }
        ModelAction::Clear => {
            config_db.remove_setting(MODEL_NAME_KEY)?;
            println!("Model setting cleared");
        }
    }
    Ok(())
}
