pub mod tool_calling;
pub mod workflow;
