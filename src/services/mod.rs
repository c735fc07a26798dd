pub mod session;
pub mod task_board;
pub mod token_gate;
