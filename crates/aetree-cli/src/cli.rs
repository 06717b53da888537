use std::path::PathBuf;

use aetree_model::ObjectType;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aetree",
    about = "aetree: versioned datastore for automation scripts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository root
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Repository settings (TOML); defaults apply when not given
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository at --repo
    Init,
    /// List the tree beneath a directory
    Ls(LsArgs),
    /// Print a file from the tree
    Cat(CatArgs),
    /// Show an entity by fully-qualified name
    Show(ShowArgs),
    /// List, add, remove, and rank domains
    Domain(DomainArgs),
    /// Find the highest-priority domain defining a relative name
    Resolve(ResolveArgs),
    /// Convert between names and external identifiers
    Id(IdArgs),
    /// Remove a commit lock left by a crashed writer; only run this when
    /// no other aetree process is writing
    Unlock,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "")]
    pub prefix: String,
    /// Commit to read instead of the head (hex id)
    #[arg(long)]
    pub as_of: Option<String>,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    #[arg(long)]
    pub as_of: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// domain, namespace, class, instance, or method
    pub kind: ObjectType,
    pub fqname: String,
}

#[derive(Args)]
pub struct DomainArgs {
    #[command(subcommand)]
    pub action: DomainAction,
}

#[derive(Subcommand)]
pub enum DomainAction {
    /// Domains by precedence, highest priority first
    List,
    Add {
        name: String,
        /// Defaults to one above the highest existing priority
        #[arg(long)]
        priority: Option<u32>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        system: bool,
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a domain and everything in it
    Rm { name: String },
    /// Rank domains from lowest to highest priority
    Reorder {
        #[arg(required = true)]
        names: Vec<String>,
    },
    Enable { name: String },
    Disable { name: String },
}

#[derive(Args)]
pub struct ResolveArgs {
    /// namespace, class, instance, or method
    pub kind: ObjectType,
    /// Name relative to the domain, e.g. `System/Request/Call`
    pub name: String,
    /// Every domain defining the name, disabled ones included
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct IdArgs {
    #[command(subcommand)]
    pub action: IdAction,
}

#[derive(Subcommand)]
pub enum IdAction {
    Encode { fqname: String },
    Decode { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["aetree", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
        assert_eq!(cli.repo, PathBuf::from("."));
    }

    #[test]
    fn parse_global_repo_after_command() {
        let cli = Cli::try_parse_from(["aetree", "ls", "Acme", "--repo", "/tmp/ae"]).unwrap();
        assert_eq!(cli.repo, PathBuf::from("/tmp/ae"));
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.prefix, "Acme");
            assert_eq!(args.as_of, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_show_kind() {
        let cli = Cli::try_parse_from(["aetree", "show", "Class", "Acme/Infra/Vm"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.kind, ObjectType::Class);
            assert_eq!(args.fqname, "Acme/Infra/Vm");
        } else {
            panic!("wrong command");
        }
        assert!(Cli::try_parse_from(["aetree", "show", "widget", "x"]).is_err());
    }

    #[test]
    fn parse_domain_add() {
        let argv = ["aetree", "domain", "add", "Acme", "--priority", "4", "--disabled"];
        let cli = Cli::try_parse_from(argv).unwrap();
        if let Command::Domain(DomainArgs {
            action:
                DomainAction::Add {
                    name,
                    priority,
                    disabled,
                    system,
                    ..
                },
        }) = cli.command
        {
            assert_eq!(name, "Acme");
            assert_eq!(priority, Some(4));
            assert!(disabled);
            assert!(!system);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn reorder_needs_names() {
        assert!(Cli::try_parse_from(["aetree", "domain", "reorder"]).is_err());
        let cli = Cli::try_parse_from(["aetree", "domain", "reorder", "B", "A"]).unwrap();
        if let Command::Domain(DomainArgs {
            action: DomainAction::Reorder { names },
        }) = cli.command
        {
            assert_eq!(names, ["B", "A"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_id_decode() {
        let cli = Cli::try_parse_from(["aetree", "id", "decode", "Acme%2FInfra"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Id(IdArgs {
                action: IdAction::Decode { .. }
            })
        ));
    }

    #[test]
    fn parse_verbose_and_json() {
        let argv = ["aetree", "--verbose", "--format", "json", "unlock"];
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Unlock));
    }
}
