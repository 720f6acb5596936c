//! FTP reply codes used by the session.

// 1xx: Positive Preliminary Reply
pub const ALREADY_OPEN: u32 = 125;
pub const ABOUT_TO_SEND: u32 = 150;

// 2xx: Positive Completion Reply
pub const COMMAND_OK: u32 = 200;
pub const READY: u32 = 220;
pub const CLOSING: u32 = 221;
pub const CLOSING_DATA_CONNECTION: u32 = 226;
pub const PASSIVE_MODE: u32 = 227;
pub const LOGGED_IN: u32 = 230;
pub const AUTH_OK: u32 = 234;
pub const REQUESTED_FILE_ACTION_OK: u32 = 250;

// 3xx: Positive intermediate Reply
pub const NEED_PASSWORD: u32 = 331;

// 4xx: Transient Negative Completion Reply
pub const NOT_AVAILABLE: u32 = 421;
pub const CANNOT_OPEN_DATA_CONNECTION: u32 = 425;

// 5xx: Permanent Negative Completion Reply
pub const NOT_IMPLEMENTED: u32 = 502;
pub const NOT_LOGGED_IN: u32 = 530;
pub const FILE_UNAVAILABLE: u32 = 550;

/// Returns true for a 2xx reply.
pub fn is_positive_completion(code: u32) -> bool {
    (200..300).contains(&code)
}

/// Returns true for a 4xx or 5xx reply.
pub fn is_negative(code: u32) -> bool {
    (400..600).contains(&code)
}
