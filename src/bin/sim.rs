use std::sync::Arc;

use rand::{rngs::SmallRng, SeedableRng};
use seabattle::{
    placement::random_layout, CellState, Difficulty, GameClient, GameMode, GameServer,
    InMemoryTransport, MemoryAuthenticator, MemorySaveStore,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 && args.len() != 4 {
        eprintln!("Usage: {} <server_seed> <client_seed> [easy|normal|hard]", args[0]);
        std::process::exit(1);
    }
    let server_seed: u64 = args[1].parse()?;
    let client_seed: u64 = args[2].parse()?;
    let difficulty: Difficulty = match args.get(3) {
        Some(level) => level.parse().map_err(|e: &str| anyhow::anyhow!(e))?,
        None => Difficulty::default(),
    };

    let server = GameServer::new(
        Arc::new(MemoryAuthenticator::new()),
        Arc::new(MemorySaveStore::new()),
        Some(server_seed),
    );
    let (server_end, client_end) = InMemoryTransport::pair();
    let serving = tokio::spawn(async move { server.serve_connection(server_end).await });

    let mut rng = SmallRng::seed_from_u64(client_seed);
    let mut client = GameClient::connect(client_end).await?;
    client.register("sim", "sim").await?;
    client.start_new_game(GameMode::Practice(difficulty)).await?;
    client.place_ships(random_layout(&mut rng)?, None).await?;
    let summary = client.autoplay(Difficulty::Hard, &mut rng).await?;

    let computer_shots = client
        .game()
        .map(|g| {
            [CellState::Hit, CellState::Sunk, CellState::Miss]
                .iter()
                .map(|&s| g.own_board.count(s))
                .sum::<usize>()
        })
        .unwrap_or(0);
    let winner = if summary.won { "client" } else { "computer" };

    let result = json!({
        "difficulty": difficulty.as_str(),
        "client": {"shots": summary.shots, "hits": summary.hits},
        "computer": {"shots": computer_shots},
        "winner": winner,
    });
    println!("{}", serde_json::to_string(&result)?);

    drop(client);
    serving.await??;
    Ok(())
}
