/// Confirm/decline prompt for bulk operations.
pub mod confirmation;
/// Generic embed builders shared across commands.
pub mod embed;
/// Single source of truth for the message-command prefix.
pub const COMMAND_PREFIX: char = '!';
/// Shared pagination helper utilities.
pub mod pagination;
/// Pure parser helpers for mentions and command targets.
pub mod parse;
/// Permission helper utilities.
pub mod permissions;
/// Applying computed role changes to guild members.
pub mod roles;
