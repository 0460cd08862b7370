//! Computer opponent targeting. Works from the shooter's overlay only, so the
//! computer never sees more than a human would.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::board::{Board, CellState, Coord};
use crate::config::BOARD_SIZE;
use crate::ship::{Orientation, ShipPlacement};
use rand::Rng;

const GRID_SIZE: usize = BOARD_SIZE as usize;

/// Probability matrix indexed `[row][col]`.
pub type Pdf = [[f64; GRID_SIZE]; GRID_SIZE];

/// Strength of the computer opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Difficulty {
    /// Uniform random shots.
    Easy,
    /// Hunt at random, then finish off damaged ships.
    #[default]
    Normal,
    /// Probability-density targeting.
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("easy") {
            Ok(Difficulty::Easy)
        } else if s.eq_ignore_ascii_case("normal") || s.eq_ignore_ascii_case("medium") {
            Ok(Difficulty::Normal)
        } else if s.eq_ignore_ascii_case("hard") {
            Ok(Difficulty::Hard)
        } else {
            Err("difficulty must be easy, normal or hard")
        }
    }
}

/// Cells that cannot hold a ship given what the overlay already shows: the
/// halo of a sunk ship, and the diagonals of a hit (ships are straight and
/// never touch).
fn known_water(overlay: &Board, at: Coord) -> bool {
    at.neighbors().any(|n| match overlay.get(n) {
        CellState::Sunk => true,
        CellState::Hit => n.row != at.row && n.col != at.col,
        _ => false,
    })
}

fn open_cells(overlay: &Board) -> Vec<Coord> {
    Coord::all()
        .filter(|&at| overlay.get(at) == CellState::Empty)
        .collect()
}

/// Compute a probability density over all unshot cells given the overlay and
/// the lengths of the opponent ships still afloat. Each entry sums the
/// relative likelihood of a ship segment occupying that coordinate.
pub fn calc_pdf(overlay: &Board, remaining_sizes: &[usize]) -> Pdf {
    // Placements covering observed hits get far more weight so the squares
    // next to a damaged ship stand out.
    const HIT_BIAS: f64 = 10.0;

    let mut matrix = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    for &len in remaining_sizes.iter() {
        for origin in Coord::all() {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                let cells = match ShipPlacement::new(origin, len, orientation).cells() {
                    Ok(cells) => cells,
                    Err(_) => continue,
                };
                let mut valid = true;
                let mut n_hits = 0i32;
                for &at in cells.iter() {
                    match overlay.get(at) {
                        CellState::Miss | CellState::Sunk => valid = false,
                        CellState::Hit => n_hits += 1,
                        _ => {
                            if known_water(overlay, at) {
                                valid = false;
                            }
                        }
                    }
                    if !valid {
                        break;
                    }
                }
                if !valid {
                    continue;
                }
                let weight = if n_hits == 0 {
                    1.0
                } else {
                    libm::pow(HIT_BIAS, n_hits as f64)
                };
                for &at in cells.iter() {
                    if overlay.get(at) == CellState::Empty {
                        matrix[at.row()][at.col()] += weight;
                    }
                }
            }
        }
    }
    normalize(matrix)
}

fn normalize(mut matrix: Pdf) -> Pdf {
    let total: f64 = matrix.iter().flat_map(|row| row.iter()).sum();
    if total == 0.0 {
        return matrix;
    }
    for row in matrix.iter_mut() {
        for v in row.iter_mut() {
            *v /= total;
        }
    }
    matrix
}

/// Sample a coordinate from a probability matrix. Lower temperatures favour
/// the most likely cells. Returns `None` for an all-zero matrix.
pub fn sample_pdf<R: Rng + ?Sized>(pdf: &Pdf, temperature: f64, rng: &mut R) -> Option<Coord> {
    let mut adjusted = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    let mut total = 0.0;
    for r in 0..GRID_SIZE {
        for c in 0..GRID_SIZE {
            let v = libm::pow(pdf[r][c], 1.0 / temperature);
            adjusted[r][c] = v;
            total += v;
        }
    }
    if total <= 0.0 {
        return None;
    }
    let threshold: f64 = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last = None;
    for at in Coord::all() {
        let v = adjusted[at.row()][at.col()];
        if v <= 0.0 {
            continue;
        }
        cumulative += v;
        last = Some(at);
        if threshold < cumulative {
            return Some(at);
        }
    }
    last
}

/// Cells worth shooting to finish a damaged ship: open orthogonal neighbours
/// of unsunk hits, kept on the ship's line once two hits are aligned.
fn target_candidates(overlay: &Board) -> Vec<Coord> {
    let hits: Vec<Coord> = Coord::all()
        .filter(|&at| overlay.get(at) == CellState::Hit)
        .collect();
    let mut out: Vec<Coord> = Vec::new();
    for &hit in hits.iter() {
        let aligned = hit.orthogonal().find(|&n| overlay.get(n) == CellState::Hit);
        for n in hit.orthogonal() {
            if overlay.get(n) != CellState::Empty || known_water(overlay, n) {
                continue;
            }
            if let Some(partner) = aligned {
                let horizontal = partner.row == hit.row;
                if (horizontal && n.row != hit.row) || (!horizontal && n.col != hit.col) {
                    continue;
                }
            }
            if !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

fn pick<R: Rng + ?Sized>(cells: &[Coord], rng: &mut R) -> Option<Coord> {
    if cells.is_empty() {
        None
    } else {
        Some(cells[rng.random_range(0..cells.len())])
    }
}

/// Choose the computer's next shot. `None` only when every cell has been shot.
pub fn choose_target<R: Rng + ?Sized>(
    difficulty: Difficulty,
    overlay: &Board,
    remaining_sizes: &[usize],
    rng: &mut R,
) -> Option<Coord> {
    let open = open_cells(overlay);
    let choice = match difficulty {
        Difficulty::Easy => pick(&open, rng),
        Difficulty::Normal => {
            let targets = target_candidates(overlay);
            if targets.is_empty() {
                let hunting: Vec<Coord> = open
                    .iter()
                    .copied()
                    .filter(|&at| !known_water(overlay, at))
                    .collect();
                pick(&hunting, rng)
            } else {
                pick(&targets, rng)
            }
        }
        Difficulty::Hard => {
            let pdf = calc_pdf(overlay, remaining_sizes);
            sample_pdf(&pdf, 0.5, rng)
        }
    };
    choice.or_else(|| pick(&open, rng))
}
