use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use vtok_isolate::{
    current_user_name, FileIsolateCredentialManager, IsolateCredential, IsolateCredentialManager,
};
use vtok_pool::HandleGenerator;
use vtok_store::{FileObjectStore, ObjectStore, StoreKey};
use vtok_token::{TokenConfig, TokenFactory};
use vtok_types::{AttributeType, Attributes, ObjectClass};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Objects(args) => match args.action {
            ObjectsAction::List(store) => cmd_list(&config, &store, format),
            ObjectsAction::AddData(args) => cmd_add_data(&config, args, format),
            ObjectsAction::Compact(store) => cmd_compact(&config, &store, format),
        },
        Command::Isolate(args) => match args.action {
            IsolateAction::Show(user) => cmd_isolate_show(&config, &user, format),
            IsolateAction::Save { user, credential } => {
                cmd_isolate_save(&config, &user, &credential, format)
            }
            IsolateAction::Generate { user, force } => {
                cmd_isolate_generate(&config, &user, force, format)
            }
        },
        Command::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TokenConfig> {
    match path {
        Some(path) => TokenConfig::load(path)
            .with_context(|| format!("reading configuration {}", path.display())),
        None => Ok(TokenConfig::default()),
    }
}

fn store_path(config: &TokenConfig, args: &StoreArgs) -> PathBuf {
    args.store
        .clone()
        .unwrap_or_else(|| config.store_path(&args.token))
}

fn open_existing(config: &TokenConfig, args: &StoreArgs) -> anyhow::Result<FileObjectStore> {
    let path = store_path(config, args);
    if !path.exists() {
        bail!("no object store at {}", path.display());
    }
    Ok(FileObjectStore::open(&path, config.store_config())?)
}

/// Listing entry for one stored object. Attribute values other than the
/// label are never shown.
fn describe(key: &StoreKey, attributes: &Attributes) -> serde_json::Value {
    let label = attributes
        .get_bytes(AttributeType::LABEL)
        .map(|l| String::from_utf8_lossy(l).into_owned())
        .unwrap_or_default();
    json!({
        "key": key.to_string(),
        "class": attributes.class().map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()),
        "label": label,
        "private": attributes.is_private(),
        "modifiable": attributes.is_modifiable(),
        "attributes": attributes.len(),
    })
}

fn cmd_list(config: &TokenConfig, args: &StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_existing(config, args)?;
    let rows: Vec<serde_json::Value> = store
        .load_all()?
        .iter()
        .map(|(key, attributes)| describe(key, attributes))
        .collect();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No objects in {}", store.path().display());
        return Ok(());
    }
    for row in &rows {
        let key = row["key"].as_str().unwrap_or_default();
        let mut flags = Vec::new();
        if row["private"] == json!(true) {
            flags.push("private");
        }
        if row["modifiable"] == json!(false) {
            flags.push("read-only");
        }
        println!(
            "{}  {:<12} {}  {}",
            key.get(..8).unwrap_or(key).yellow(),
            row["class"].as_str().unwrap_or_default().cyan(),
            row["label"].as_str().unwrap_or_default().bold(),
            flags.join(",").dimmed(),
        );
    }
    println!("{} objects", rows.len());
    Ok(())
}

fn cmd_add_data(config: &TokenConfig, args: AddDataArgs, format: OutputFormat) -> anyhow::Result<()> {
    let value = hex::decode(args.value.trim()).context("--value must be hex")?;
    let mut template = Attributes::new()
        .with(AttributeType::CLASS, ObjectClass::Data)
        .with(AttributeType::TOKEN, true)
        .with(AttributeType::PRIVATE, args.private)
        .with(AttributeType::LABEL, args.label.as_str())
        .with(AttributeType::VALUE, value);
    if let Some(application) = &args.application {
        template.set(AttributeType::APPLICATION, application.as_str());
    }

    let path = store_path(config, &args.store);
    let store = FileObjectStore::open(&path, config.store_config())?;
    let factory = TokenFactory::new(HandleGenerator::global(), config.store_config());
    let pool = factory.create_object_pool(Arc::new(store))?;
    let handle = pool.create_object(&template)?;
    let key = pool
        .get_object(handle)?
        .store_key()
        .context("token object was not persisted")?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "key": key.to_string(), "store": path.display().to_string() })
        ),
        OutputFormat::Text => println!(
            "{} Added data object {} to {}",
            "✓".green().bold(),
            key.short_id().yellow(),
            path.display()
        ),
    }
    Ok(())
}

fn cmd_compact(config: &TokenConfig, args: &StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_existing(config, args)?;
    let reclaimed = store.compact()?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "objects": store.len(), "reclaimed_bytes": reclaimed })
        ),
        OutputFormat::Text => println!(
            "{} Compacted {}: {} objects, {} bytes reclaimed",
            "✓".green().bold(),
            store.path().display(),
            store.len(),
            reclaimed
        ),
    }
    Ok(())
}

fn isolate_manager(
    config: &TokenConfig,
    args: &UserArgs,
) -> anyhow::Result<(FileIsolateCredentialManager, String)> {
    let dir = args.dir.clone().unwrap_or_else(|| config.isolate_dir.clone());
    let user = match &args.user {
        Some(user) => user.clone(),
        None => current_user_name().context("cannot determine the current user; pass --user")?,
    };
    Ok((FileIsolateCredentialManager::for_user(dir, &user)?, user))
}

fn cmd_isolate_show(config: &TokenConfig, args: &UserArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (manager, user) = isolate_manager(config, args)?;
    let credential = manager.current_user_credential()?;
    let saved = credential.is_some();
    let default = credential.as_ref().is_some_and(IsolateCredential::is_default);

    match format {
        OutputFormat::Json => {
            println!("{}", json!({ "user": user, "saved": saved, "default": default }))
        }
        OutputFormat::Text if !saved => println!("No isolate credential saved for {}", user.bold()),
        OutputFormat::Text => println!(
            "Isolate credential saved for {}{}",
            user.bold(),
            if default { " (default isolate)".dimmed().to_string() } else { String::new() }
        ),
    }
    Ok(())
}

fn cmd_isolate_save(
    config: &TokenConfig,
    args: &UserArgs,
    credential: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (manager, user) = isolate_manager(config, args)?;
    let credential = IsolateCredential::from_hex(credential)?;
    manager.save_credential(&user, &credential)?;
    report_saved(&user, manager.dir(), format);
    Ok(())
}

fn cmd_isolate_generate(
    config: &TokenConfig,
    args: &UserArgs,
    force: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (manager, user) = isolate_manager(config, args)?;
    if !force && manager.user_credential(&user)?.is_some() {
        bail!("a credential is already saved for {user}; pass --force to replace it");
    }
    manager.save_credential(&user, &IsolateCredential::generate())?;
    report_saved(&user, manager.dir(), format);
    Ok(())
}

fn report_saved(user: &str, dir: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "user": user, "saved": true, "dir": dir.display().to_string() })
        ),
        OutputFormat::Text => println!(
            "{} Saved isolate credential for {} in {}",
            "✓".green().bold(),
            user.bold(),
            dir.display()
        ),
    }
}

fn cmd_config(config: &TokenConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
