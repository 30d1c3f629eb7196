//! Session, world and save/restore for the Ember top-down RPG.

mod game;
pub mod levels;
pub mod ports;
pub mod save;
pub mod session;
pub mod world;

#[cfg(test)]
mod testing;

pub use game::Game;
