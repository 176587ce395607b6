pub mod game;
pub mod scoreboard;

pub use game::{CardDrawAssignment, GameMeta, GameStatus};
pub use scoreboard::{ScoreboardRow, SideType};
