#![cfg(feature = "std")]

//! Line-oriented text client. Reads commands from stdin and drives a
//! [`GameClient`]; fleet layout happens locally and is submitted whole.

use std::io::{self, Write};

use rand::Rng;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::ai::Difficulty;
use crate::board::{Board, CellState, Coord};
use crate::client::{ClientEvent, GameClient};
use crate::config::{BOARD_SIZE, MAX_SHIP_SIZE};
use crate::fleet::Fleet;
use crate::placement;
use crate::protocol::ConnPhase;
use crate::session::{GameMode, GameSnapshot};
use crate::ship::{Orientation, ShipPlacement};
use crate::transport::Transport;

/// Parse `B5 H 3`: origin, orientation (`H`/`V`), size.
pub fn parse_placement(input: &str) -> Result<ShipPlacement, String> {
    let mut parts = input.split_whitespace();
    let origin: Coord = parts
        .next()
        .ok_or("expected e.g. `B5 H 3`")?
        .parse()
        .map_err(|e: &str| e.to_string())?;
    let orientation = match parts.next().map(|p| p.to_ascii_uppercase()) {
        Some(p) if p == "H" => Orientation::Horizontal,
        Some(p) if p == "V" => Orientation::Vertical,
        _ => return Err("orientation must be H or V".into()),
    };
    let size: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .filter(|s| (1..=MAX_SHIP_SIZE).contains(s))
        .ok_or_else(|| format!("size must be 1-{}", MAX_SHIP_SIZE))?;
    Ok(ShipPlacement::new(origin, size, orientation))
}

fn cell_char(cell: CellState) -> char {
    match cell {
        CellState::Empty => '.',
        CellState::Ship => 'S',
        CellState::Hit => 'X',
        CellState::Sunk => '#',
        CellState::Miss => 'o',
    }
}

pub fn print_board(board: &Board) {
    print!("   ");
    for c in 0..BOARD_SIZE {
        print!(" {}", (b'A' + c) as char);
    }
    println!();
    for (r, row) in board.rows().enumerate() {
        print!("{:2} ", r + 1);
        for &cell in row.iter() {
            print!(" {}", cell_char(cell));
        }
        println!();
    }
}

fn print_remaining(label: &str, counts: &[usize; MAX_SHIP_SIZE]) {
    let parts: Vec<String> = (1..=MAX_SHIP_SIZE)
        .rev()
        .map(|size| format!("{}x{}", counts[size - 1], size))
        .collect();
    println!("{}: {}", label, parts.join(" "));
}

/// Opponent overlay on top, own board below.
pub fn print_view(game: &GameSnapshot) {
    println!("Opponent ({}):", game.opponent_name);
    print_board(&game.overlay);
    print_remaining("Afloat", &game.opponent_remaining);
    println!("\nYour board:");
    print_board(&game.own_board);
    print_remaining("Afloat", &game.own_remaining);
}

fn report(event: &ClientEvent) {
    match event {
        ClientEvent::ShotResolved { at, hit } => {
            println!("You fired at {}: {}", at, if *hit { "hit" } else { "miss" })
        }
        ClientEvent::OpponentShot { at, hit } => {
            println!("Opponent fired at {}: {}", at, if *hit { "hit" } else { "miss" })
        }
        ClientEvent::ShipSunk { cells, own_fleet } => {
            if *own_fleet {
                println!("Your {}-cell ship was sunk.", cells.len());
            } else {
                println!("You sank a {}-cell ship!", cells.len());
            }
        }
        ClientEvent::GameOver { you_won } => {
            println!("{}", if *you_won { "You won!" } else { "You lost." })
        }
        ClientEvent::Rejected(reason) | ClientEvent::AuthFailed(reason) => {
            println!("Rejected: {}", reason)
        }
        _ => {}
    }
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    async fn ask(&mut self, hint: &str) -> anyhow::Result<Option<String>> {
        print!("{}\n> ", hint);
        io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

/// Layout being prepared locally before `ready`.
#[derive(Default)]
struct Layout {
    board: Board,
    fleet: Fleet,
}

/// Interactive session until the user quits or stdin closes.
pub async fn run_interactive<T, R>(mut client: GameClient<T>, rng: &mut R) -> anyhow::Result<()>
where
    T: Transport,
    R: Rng + ?Sized + Send,
{
    let mut prompt = Prompt {
        lines: BufReader::new(stdin()).lines(),
    };
    let mut layout = Layout::default();
    let mut last_mode = GameMode::Practice(Difficulty::default());

    loop {
        match client.state().phase {
            ConnPhase::Waiting => {
                println!("Waiting for an opponent...");
                let event = client.next_event().await?;
                report(&event);
                continue;
            }
            ConnPhase::Placing if client.game().map(|g| g.ready).unwrap_or(false) => {
                println!("Fleet submitted, waiting for the opponent...");
                client.await_game_start().await?;
                continue;
            }
            ConnPhase::Battling if !client.state().your_turn() => {
                let event = client.next_event().await?;
                report(&event);
                continue;
            }
            _ => {}
        }

        let hint = match client.state().phase {
            ConnPhase::Authenticating => "login NAME PASS | register NAME PASS | quit",
            ConnPhase::Lobby => "new [easy|normal|hard|versus] | saves | continue NAME | delete NAME | quit",
            ConnPhase::Placing => {
                print_board(&layout.board);
                "place B5 H 3 | remove B5 | auto | clear | ready [easy|normal|hard] | resign | menu"
            }
            ConnPhase::Battling => {
                if let Some(game) = client.game() {
                    print_view(game);
                }
                "COORD (e.g. B5) | save | resign | menu"
            }
            ConnPhase::Finished | ConnPhase::Waiting => "restart | save | menu | quit",
        };
        let line = match prompt.ask(hint).await? {
            Some(line) => line,
            None => return Ok(()),
        };
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("").to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();
        if command == "quit" {
            return Ok(());
        }

        let outcome: anyhow::Result<()> = match (client.state().phase, command.as_str()) {
            (ConnPhase::Authenticating, "login") if rest.len() == 2 => {
                client.login(rest[0], rest[1]).await.map(|_| ())
            }
            (ConnPhase::Authenticating, "register") if rest.len() == 2 => {
                client.register(rest[0], rest[1]).await.map(|_| ())
            }
            (ConnPhase::Lobby, "new") => {
                let mode = match rest.first() {
                    Some(&"versus") => GameMode::Versus,
                    Some(level) => match level.parse::<Difficulty>() {
                        Ok(level) => GameMode::Practice(level),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    },
                    None => GameMode::Practice(Difficulty::default()),
                };
                last_mode = mode;
                layout = Layout::default();
                start(&mut client, mode).await
            }
            (ConnPhase::Lobby, "saves") => client.list_saves().await.map(|saves| {
                if saves.is_empty() {
                    println!("No saved games.");
                }
                for s in saves {
                    println!("{}  {}  {} {}  {} bytes", s.name, s.difficulty, s.date, s.time, s.size_bytes);
                }
            }),
            (ConnPhase::Lobby, "continue") if rest.len() == 1 => {
                client.continue_game(rest[0]).await.map(|_| ())
            }
            (ConnPhase::Lobby, "delete") if rest.len() == 1 => {
                client.delete_save(rest[0]).await.map(|_| ())
            }
            (ConnPhase::Placing, "place") => match parse_placement(&rest.join(" ")) {
                Ok(ship) => placement::place(&mut layout.board, &mut layout.fleet, ship)
                    .map(|_| ())
                    .map_err(|e| anyhow::anyhow!(e)),
                Err(e) => Err(anyhow::anyhow!(e)),
            },
            (ConnPhase::Placing, "remove") if rest.len() == 1 => match rest[0].parse::<Coord>() {
                Ok(at) => placement::remove_placement(&mut layout.board, &mut layout.fleet, at)
                    .map(|_| ())
                    .map_err(|e| anyhow::anyhow!(e)),
                Err(e) => Err(anyhow::anyhow!(e)),
            },
            (ConnPhase::Placing, "auto") => {
                placement::auto_place(&mut layout.board, &mut layout.fleet, rng)
                    .map_err(|e| anyhow::anyhow!(e))
            }
            (ConnPhase::Placing, "clear") => {
                placement::clear_placements(&mut layout.board, &mut layout.fleet)
                    .map_err(|e| anyhow::anyhow!(e))
            }
            (ConnPhase::Placing, "ready") => {
                let difficulty = rest.first().and_then(|d| d.parse::<Difficulty>().ok());
                let fleet: Vec<ShipPlacement> =
                    layout.fleet.ships().iter().map(|s| s.placement()).collect();
                client.place_ships(fleet, difficulty).await.map(|_| ())
            }
            (ConnPhase::Battling, "save") | (ConnPhase::Finished, "save") => {
                client.save().await.map(|name| println!("Saved as {}. Back in the lobby.", name))
            }
            (ConnPhase::Placing | ConnPhase::Battling, "resign") => client.resign().await,
            (ConnPhase::Placing | ConnPhase::Battling | ConnPhase::Finished, "menu") => {
                client.exit_to_lobby().await
            }
            (ConnPhase::Finished, "restart") => {
                layout = Layout::default();
                start(&mut client, last_mode).await
            }
            (ConnPhase::Battling, _) => match command.parse::<Coord>() {
                Ok(at) => client.shoot(at).await.map(|hit| {
                    report(&ClientEvent::ShotResolved { at, hit });
                    if client.state().game_over() {
                        println!("{}", if client.game().and_then(|g| g.you_won()) == Some(true) {
                            "You won!"
                        } else {
                            "You lost."
                        });
                    }
                }),
                Err(e) => Err(anyhow::anyhow!(e)),
            },
            _ => Err(anyhow::anyhow!("unknown command")),
        };
        if let Err(e) = outcome {
            println!("{}", e);
        }
    }
}

async fn start<T: Transport>(client: &mut GameClient<T>, mode: GameMode) -> anyhow::Result<()> {
    if mode == GameMode::Versus {
        println!("Looking for an opponent...");
    }
    client.start_new_game(mode).await.map(|_| ())
}
