use std::{
    error::Error,
    io::Write,
    path::{Path, PathBuf},
};

use api_types::boxes::BoxNew;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Card, CardNew, Engine, draw};
use migration::MigratorTrait;
use rand::{SeedableRng, rngs::StdRng};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "packattack_admin")]
#[command(about = "Admin utilities for Pack Attack (users, coins, boxes)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./packattack.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Coins(Coins),
    Box(BoxCmd),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Allow the user to manage boxes and cards.
    #[arg(long)]
    admin: bool,
}

#[derive(Args, Debug)]
struct Coins {
    #[command(subcommand)]
    command: CoinsCommand,
}

#[derive(Subcommand, Debug)]
enum CoinsCommand {
    Grant(CoinsGrantArgs),
}

#[derive(Args, Debug)]
struct CoinsGrantArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Args, Debug)]
struct BoxCmd {
    #[command(subcommand)]
    command: BoxCommand,
}

#[derive(Subcommand, Debug)]
enum BoxCommand {
    Import(BoxImportArgs),
    Simulate(BoxSimulateArgs),
}

#[derive(Args, Debug)]
struct BoxImportArgs {
    /// JSON file with the box and its cards.
    #[arg(long)]
    file: PathBuf,
    /// Administrator the box is created by.
    #[arg(long = "as", default_value = "admin")]
    as_user: String,
}

#[derive(Args, Debug)]
struct BoxSimulateArgs {
    #[arg(long)]
    box_id: Uuid,
    #[arg(long, default_value_t = 100_000)]
    trials: u64,
    /// Seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn read_box_file(path: &Path) -> Result<BoxNew, Box<dyn Error + Send + Sync>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Expected against observed frequency of every card over `trials` draws.
fn simulation_report(
    cards: &[Card],
    cards_per_pack: i32,
    price: i64,
    trials: u64,
    rng: &mut StdRng,
) -> String {
    let expected = draw::expected_distribution(cards);
    let hits = draw::simulate(cards, trials, rng);

    let mut report = format!(
        "{:<24} {:>10} {:>10} {:>10} {:>10}\n",
        "card", "value", "expected", "observed", "hits"
    );
    let mut pack_value = 0.0;
    for ((card, expected), hits) in cards.iter().zip(expected).zip(hits) {
        let observed = if trials == 0 {
            0.0
        } else {
            hits as f64 / trials as f64
        };
        pack_value += expected * card.coin_value as f64;
        report.push_str(&format!(
            "{:<24} {:>10} {:>9.4}% {:>9.4}% {:>10}\n",
            card.name,
            card.coin_value,
            expected * 100.0,
            observed * 100.0,
            hits
        ));
    }
    pack_value *= f64::from(cards_per_pack);
    report.push_str(&format!(
        "expected pack value: {pack_value:.2} coins (price {price})\n"
    ));
    report
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if engine.user(&args.username).await.is_ok() {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;
            let user = engine.new_user(&args.username, &password, args.admin).await?;
            let role = if user.is_admin { "admin" } else { "player" };
            println!("created user: {} ({role})", user.username);
        }
        Command::Coins(Coins {
            command: CoinsCommand::Grant(args),
        }) => {
            let balance = engine
                .grant_coins(&args.username, args.amount, args.reason.as_deref())
                .await?;
            println!("granted {} coins to {}, balance {balance}", args.amount, args.username);
        }
        Command::Box(BoxCmd {
            command: BoxCommand::Import(args),
        }) => {
            let definition = match read_box_file(&args.file) {
                Ok(definition) => definition,
                Err(err) => {
                    eprintln!("invalid box file {}: {err}", args.file.display());
                    std::process::exit(2);
                }
            };
            let cards = definition
                .cards
                .into_iter()
                .map(|card| CardNew {
                    name: card.name,
                    rarity: card.rarity.unwrap_or_default(),
                    coin_value: card.coin_value,
                    pull_rate: card.pull_rate,
                    image_url: card.image_url,
                })
                .collect::<Vec<_>>();
            let count = cards.len();
            let box_id = engine
                .new_box(
                    &args.as_user,
                    &definition.name,
                    definition.description.as_deref(),
                    definition.price,
                    definition.cards_per_pack,
                    cards,
                )
                .await?;
            println!("imported box: {} ({box_id}) with {count} cards", definition.name);
        }
        Command::Box(BoxCmd {
            command: BoxCommand::Simulate(args),
        }) => {
            let detail = engine.box_detail(args.box_id).await?;
            let cards: Vec<Card> = detail.cards.into_iter().map(|odds| odds.card).collect();
            if cards.is_empty() {
                eprintln!("box {} has no cards", args.box_id);
                std::process::exit(1);
            }

            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            println!("{} ({} trials)\n", detail.pack_box.name, args.trials);
            print!(
                "{}",
                simulation_report(
                    &cards,
                    detail.pack_box.cards_per_pack,
                    detail.pack_box.price,
                    args.trials,
                    &mut rng
                )
            );
        }
    }

    Ok(())
}
