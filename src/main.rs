use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use holocron::{
    logging, seed, Backend, Config, NewUser, Store, TargetKind,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "holocron")]
#[command(about = "Catalog and favorites store for the Holocron API")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Catalog {
    Characters,
    Planets,
    Users,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    #[value(alias = "people")]
    Character,
    Planet,
}

impl From<Kind> for TargetKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Character => TargetKind::Character,
            Kind::Planet => TargetKind::Planet,
        }
    }
}

#[derive(Subcommand)]
enum FavoriteCommand {
    Add {
        kind: Kind,
        id: i64,
        #[arg(long)]
        user_id: Option<i64>,
    },
    Remove {
        kind: Kind,
        id: i64,
        #[arg(long)]
        user_id: Option<i64>,
    },
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema
    Init,
    /// Seed characters or planets from a CSV file
    Import { catalog: Catalog, csv: PathBuf },
    CreateUser {
        email: String,
        password: String,
        #[arg(long)]
        inactive: bool,
    },
    List { catalog: Catalog },
    /// List a user's favorites (defaults to user 1)
    Favorites {
        #[arg(long)]
        user_id: Option<i64>,
    },
    #[command(subcommand)]
    Favorite(FavoriteCommand),
    /// Delete a user and all of its favorites
    DeleteUser { id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.config.verbose, cli.config.json_logs);

    let store = Store::from_url(&cli.config.database_url)
        .with_context(|| format!("Failed to open database {}", cli.config.database_url))?;
    let backend = Backend::new(store);

    match cli.command {
        Command::Init => {
            println!("✓ Database ready: {}", cli.config.database_url);
        }
        Command::Import { catalog, csv } => {
            let imported = match catalog {
                Catalog::Characters => backend.import_characters(&seed::load_characters_csv(&csv)?)?,
                Catalog::Planets => backend.import_planets(&seed::load_planets_csv(&csv)?)?,
                Catalog::Users => anyhow::bail!("users cannot be imported from CSV"),
            };
            println!("✓ Imported {} rows from {}", imported, csv.display());
        }
        Command::CreateUser {
            email,
            password,
            inactive,
        } => {
            let new = NewUser {
                is_active: Some(!inactive),
                ..NewUser::new(&email, &password)
            };
            print_json(&backend.create_user(&new)?)?;
        }
        Command::List { catalog } => match catalog {
            Catalog::Characters => print_json(&backend.list_characters()?)?,
            Catalog::Planets => print_json(&backend.list_planets()?)?,
            Catalog::Users => print_json(&backend.list_users()?)?,
        },
        Command::Favorites { user_id } => {
            print_json(&backend.list_user_favorites(user_id)?)?;
        }
        Command::Favorite(FavoriteCommand::Add { kind, id, user_id }) => {
            print_json(&backend.add_favorite(kind.into(), id, user_id)?)?;
        }
        Command::Favorite(FavoriteCommand::Remove { kind, id, user_id }) => {
            backend.remove_favorite(kind.into(), id, user_id)?;
            println!("✓ Favorite removed");
        }
        Command::DeleteUser { id } => {
            let removed = backend.delete_user(id)?;
            println!("✓ User {} deleted ({} favorites removed)", id, removed);
        }
    }

    Ok(())
}
