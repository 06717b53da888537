use std::io::Write;

use aetree_datastore::{Datastore, Record};
use aetree_model::{AeClass, Domain, Entity, Instance, Method, Namespace, ObjectType};
use aetree_repo::{RepoConfig, Repository};
use aetree_types::{identifier, ObjectId};
use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RepoConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RepoConfig::default(),
    };
    let format = cli.format;
    let root = cli.repo;
    let open = || {
        Repository::open(&root, config.clone())
            .with_context(|| format!("opening repository {}", root.display()))
    };

    match cli.command {
        Command::Init => cmd_init(&Repository::create(&root, config.clone())?, format),
        Command::Ls(args) => cmd_ls(&open()?, args, format),
        Command::Cat(args) => cmd_cat(&open()?, args),
        Command::Show(args) => cmd_show(&Datastore::new(open()?), args, format),
        Command::Domain(args) => cmd_domain(&Datastore::new(open()?), args.action, format),
        Command::Resolve(args) => cmd_resolve(&Datastore::new(open()?), args, format),
        Command::Id(args) => cmd_id(args, format),
        Command::Unlock => cmd_unlock(&open()?),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_commit(as_of: Option<&str>) -> anyhow::Result<Option<ObjectId>> {
    as_of
        .map(|hex| ObjectId::from_hex(hex).with_context(|| format!("bad commit id {hex:?}")))
        .transpose()
}

fn cmd_init(repo: &Repository, format: OutputFormat) -> anyhow::Result<()> {
    let root = repo
        .root()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match format {
        OutputFormat::Text => {
            let check = "✓".green().bold();
            println!("{check} Initialized aetree repository in {}", root.bold());
        }
        OutputFormat::Json => print_json(&json!({ "root": root }))?,
    }
    Ok(())
}

fn cmd_ls(repo: &Repository, args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let as_of = parse_commit(args.as_of.as_deref())?;
    let mut rows = Vec::new();
    for entry in repo.list(&args.prefix, as_of)? {
        rows.push(entry?);
    }
    match format {
        OutputFormat::Text => {
            for entry in &rows {
                if entry.is_directory {
                    println!("{}/", entry.path.blue().bold());
                } else {
                    println!("{}", entry.path);
                }
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = rows
                .iter()
                .map(|e| {
                    json!({
                        "path": e.path,
                        "directory": e.is_directory,
                        "object": e.object_id.to_hex(),
                    })
                })
                .collect();
            print_json(&Value::Array(rows))?;
        }
    }
    Ok(())
}

fn cmd_cat(repo: &Repository, args: CatArgs) -> anyhow::Result<()> {
    let as_of = parse_commit(args.as_of.as_deref())?;
    let content = repo
        .read(&args.path, as_of)?
        .ok_or_else(|| anyhow!("{}: no such file", args.path))?;
    std::io::stdout().write_all(&content)?;
    Ok(())
}

/// The entity's document as JSON, with its name and id alongside.
fn entity_json<R: Record>(record: &R) -> anyhow::Result<Value> {
    let document: Value = serde_yaml::from_str(&record.to_document()?)?;
    Ok(json!({
        "kind": R::OBJECT_TYPE.as_str(),
        "fqname": record.fqname(),
        "id": record.id(),
        "document": document,
    }))
}

fn show<R: Record>(ds: &Datastore, fqname: &str, format: OutputFormat) -> anyhow::Result<()> {
    let kind = R::OBJECT_TYPE;
    let record = ds
        .find::<R>(fqname)?
        .ok_or_else(|| anyhow!("{kind} {fqname} not found"))?;
    let editable = ds.editable(kind, &record.fqname())?;
    match format {
        OutputFormat::Text => {
            println!("{} {}", kind.as_str().cyan(), record.fqname().bold());
            println!("  id: {}", record.id().dimmed());
            if !editable {
                println!("  {}", "locked".yellow());
            }
            print!("{}", record.to_document()?);
        }
        OutputFormat::Json => {
            let mut value = entity_json(&record)?;
            value["editable"] = json!(editable);
            print_json(&value)?;
        }
    }
    Ok(())
}

fn cmd_show(ds: &Datastore, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.kind {
        ObjectType::Domain => show::<Domain>(ds, &args.fqname, format),
        ObjectType::Namespace => show::<Namespace>(ds, &args.fqname, format),
        ObjectType::Class => show::<AeClass>(ds, &args.fqname, format),
        ObjectType::Instance => show::<Instance>(ds, &args.fqname, format),
        ObjectType::Method => show::<Method>(ds, &args.fqname, format),
    }
}

fn cmd_domain(ds: &Datastore, action: DomainAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        DomainAction::List => {
            let domains = ds.domains()?;
            match format {
                OutputFormat::Text => {
                    for d in domains.by_precedence() {
                        let mut flags = Vec::new();
                        if d.system {
                            flags.push("system".yellow().to_string());
                        }
                        if !d.enabled {
                            flags.push("disabled".red().to_string());
                        }
                        println!("{:>4}  {}  {}", d.priority(), d.name.bold(), flags.join(" "));
                    }
                }
                OutputFormat::Json => {
                    let rows: Vec<Value> = domains
                        .by_precedence()
                        .into_iter()
                        .map(|d| {
                            json!({
                                "name": d.name,
                                "id": d.id(),
                                "priority": d.priority(),
                                "enabled": d.enabled,
                                "system": d.system,
                            })
                        })
                        .collect();
                    print_json(&Value::Array(rows))?;
                }
            }
        }
        DomainAction::Add {
            name,
            priority,
            description,
            system,
            disabled,
        } => {
            let mut domain = Domain::new(name);
            domain.priority = priority;
            domain.description = description;
            domain.system = system;
            domain.enabled = !disabled;
            ds.create(&mut domain)?;
            println!(
                "{} Created domain {} (priority {})",
                "✓".green().bold(),
                domain.name.bold(),
                domain.priority()
            );
        }
        DomainAction::Rm { name } => {
            ds.destroy::<Domain>(&name)?;
            println!("Removed domain {}", name.bold());
        }
        DomainAction::Reorder { names } => {
            let ids: Vec<String> = names.iter().map(|n| identifier::encode(n)).collect();
            match ds.reorder_domains(&ids)? {
                Some(commit) => println!("Reordered domains ({})", commit.short_hex().dimmed()),
                None => println!("Domain order unchanged."),
            }
        }
        DomainAction::Enable { name } => set_enabled(ds, &name, true)?,
        DomainAction::Disable { name } => set_enabled(ds, &name, false)?,
    }
    Ok(())
}

fn set_enabled(ds: &Datastore, name: &str, enabled: bool) -> anyhow::Result<()> {
    let mut domain = ds
        .find::<Domain>(name)?
        .ok_or_else(|| anyhow!("domain {name} not found"))?;
    let state = if enabled { "enabled" } else { "disabled" };
    if domain.enabled == enabled {
        println!("Domain {} already {state}.", domain.name.bold());
        return Ok(());
    }
    domain.enabled = enabled;
    ds.save(&mut domain)?;
    println!("Domain {} {state}.", domain.name.bold());
    Ok(())
}

fn resolve<R: Record>(
    ds: &Datastore,
    args: &ResolveArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let found: Vec<R> = if args.all {
        ds.homonyms(&args.name, false)?
    } else {
        ds.resolve_homonym(&args.name)?.into_iter().collect()
    };
    if found.is_empty() {
        bail!("no domain defines {} {}", R::OBJECT_TYPE, args.name);
    }
    match format {
        OutputFormat::Text => {
            for record in &found {
                println!("{}", record.fqname());
            }
        }
        OutputFormat::Json => {
            let rows = found.iter().map(entity_json).collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&Value::Array(rows))?;
        }
    }
    Ok(())
}

fn cmd_resolve(ds: &Datastore, args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.kind {
        ObjectType::Domain => bail!("domains have no homonyms"),
        ObjectType::Namespace => resolve::<Namespace>(ds, &args, format),
        ObjectType::Class => resolve::<AeClass>(ds, &args, format),
        ObjectType::Instance => resolve::<Instance>(ds, &args, format),
        ObjectType::Method => resolve::<Method>(ds, &args, format),
    }
}

fn cmd_id(args: IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (fqname, id) = match args.action {
        IdAction::Encode { fqname } => {
            let id = identifier::encode(&fqname);
            (fqname, id)
        }
        IdAction::Decode { id } => (identifier::decode(&id)?, id),
    };
    match format {
        OutputFormat::Text => println!("{fqname}\t{id}"),
        OutputFormat::Json => print_json(&json!({ "fqname": fqname, "id": id }))?,
    }
    Ok(())
}

fn cmd_unlock(repo: &Repository) -> anyhow::Result<()> {
    if repo.force_unlock()? {
        println!("{} Removed the commit lock.", "✓".green().bold());
    } else {
        println!("No commit lock held.");
    }
    Ok(())
}
