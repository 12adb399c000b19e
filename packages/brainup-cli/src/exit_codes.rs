pub const SUCCESS: i32 = 0;
/// Bad arguments or unreadable/unsupported input.
pub const INPUT_ERROR: i32 = 1;
/// Processing or I/O failure after the input was accepted.
pub const EXECUTION_ERROR: i32 = 2;
