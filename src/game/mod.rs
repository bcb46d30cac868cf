pub mod constants;
pub mod game_loop;
pub mod scheduler;
pub mod state;
pub mod systems;
