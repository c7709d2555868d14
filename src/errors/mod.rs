mod mcp_error;
mod platform_error;
mod tool_error;

pub use mcp_error::{ErrorCode, McpError};
pub use platform_error::{NotConnectedReason, PlatformError};
pub use tool_error::{ToolError, ToolErrorKind};
