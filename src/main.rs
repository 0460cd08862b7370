#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use std::path::PathBuf;
#[cfg(feature = "std")]
use std::sync::Arc;

#[cfg(feature = "std")]
use clap::{Parser, Subcommand};
#[cfg(feature = "std")]
use log::info;
#[cfg(feature = "std")]
use rand::rngs::SmallRng;
#[cfg(feature = "std")]
use rand::SeedableRng;
#[cfg(feature = "std")]
use tokio::time::Duration;

#[cfg(feature = "std")]
use seabattle::{
    cli::run_interactive, init_logging, placement::random_layout, Difficulty, GameClient,
    GameMode, GameServer, MemoryAuthenticator, MemorySaveStore, ServerConfig, TcpTransport,
    InMemoryTransport, DEFAULT_BIND_ADDR, DEFAULT_SAVE_DIR, MAX_MESSAGE_SIZE,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[cfg(feature = "std")]
enum Commands {
    /// Run the game server.
    Server {
        #[arg(long, default_value = DEFAULT_BIND_ADDR)]
        bind: String,
        #[arg(long, default_value = DEFAULT_SAVE_DIR)]
        saves: PathBuf,
        #[arg(long, default_value_t = MAX_MESSAGE_SIZE, help = "Largest accepted frame body in bytes")]
        max_frame: u32,
        #[arg(long, help = "Disconnect clients silent for this many seconds")]
        idle_timeout: Option<u64>,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Connect to a server and play.
    Play {
        #[arg(long, default_value = DEFAULT_BIND_ADDR)]
        connect: String,
        /// Let the computer play this account (needs --user and --password).
        #[arg(long)]
        auto: bool,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Create the account before playing.
        #[arg(long)]
        register: bool,
        #[arg(long, default_value = "normal")]
        difficulty: Difficulty,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Automatic practice game against an in-process server.
    Local {
        #[arg(long, default_value = "normal")]
        difficulty: Difficulty,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

#[cfg(feature = "std")]
fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_rng(&mut rand::rng()),
    }
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            bind,
            saves,
            max_frame,
            idle_timeout,
            seed,
        } => {
            let config = ServerConfig {
                bind_addr: bind,
                save_dir: saves,
                max_message_size: max_frame,
                idle_timeout: idle_timeout.map(Duration::from_secs),
                seed,
                ..ServerConfig::default()
            };
            if let Some(s) = seed {
                info!("using fixed seed {}", s);
            }
            let server = GameServer::from_config(&config)?;
            server.run(&config).await?;
        }
        Commands::Play {
            connect,
            auto,
            user,
            password,
            register,
            difficulty,
            seed,
        } => {
            let mut rng = make_rng(seed);
            let transport = TcpTransport::connect(&connect).await?;
            let mut client = GameClient::connect(transport).await?;
            println!("Connected to {}", connect);

            if !auto {
                if let (Some(user), Some(password)) = (user.as_deref(), password.as_deref()) {
                    if register {
                        client.register(user, password).await?;
                    } else {
                        client.login(user, password).await?;
                    }
                }
                return run_interactive(client, &mut rng).await;
            }

            let (user, password) = match (user, password) {
                (Some(u), Some(p)) => (u, p),
                _ => anyhow::bail!("--auto needs --user and --password"),
            };
            if register {
                client.register(&user, &password).await?;
            } else {
                client.login(&user, &password).await?;
            }
            client.start_new_game(GameMode::Practice(difficulty)).await?;
            client.place_ships(random_layout(&mut rng)?, None).await?;
            let summary = client.autoplay(Difficulty::Hard, &mut rng).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Local { difficulty, seed } => {
            let server = GameServer::new(
                Arc::new(MemoryAuthenticator::new()),
                Arc::new(MemorySaveStore::new()),
                seed,
            );
            let (server_end, client_end) = InMemoryTransport::pair();
            let serving = tokio::spawn(async move { server.serve_connection(server_end).await });

            let mut rng = make_rng(seed.map(|s| s.wrapping_add(1)));
            let mut client = GameClient::connect(client_end).await?;
            client.register("local", "local").await?;
            client.start_new_game(GameMode::Practice(difficulty)).await?;
            client.place_ships(random_layout(&mut rng)?, None).await?;
            let summary = client.autoplay(Difficulty::Hard, &mut rng).await?;
            if let Some(game) = client.game() {
                seabattle::cli::print_view(game);
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
            drop(client);
            serving.await??;
        }
    }
    Ok(())
}
