// Exit codes for scripted triage of failed conversions
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INVALID_FORMAT: i32 = 3;
pub const EXIT_TRUNCATED_INPUT: i32 = 4;
pub const EXIT_UNSUPPORTED_TYPE: i32 = 5;
pub const EXIT_ENCODING_FAILURE: i32 = 6;
pub const EXIT_IO: i32 = 7;
