//! Evolution module - a genetic algorithm over exploration strategies.
//!
//! - **Genes**: nine behavioral reals plus per-source preferences, all in `[0, 1]`
//! - **Genomes**: genes with an exponentially weighted fitness
//! - **Population**: tournament selection for use, roulette selection for breeding
//! - **Parameters**: the concrete knobs an explorer reads off a genome

mod genome;
mod params;
mod population;

#[cfg(test)]
mod proptest;

pub use genome::*;
pub use params::*;
pub use population::*;
