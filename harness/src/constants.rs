/// Token that marks a null field in a fixture.
pub const DEFAULT_NULL_TOKEN: &str = "null";

/// Placeholder substituted for null TEXT and STRING fields.
pub const PLACEHOLDER_STRING: &str = "default";

/// Placeholder substituted for null BLOB fields.
pub const PLACEHOLDER_BLOB: &[u8] = b"default";

/// Placeholder substituted for null DATE fields, as (year, month, day).
pub const PLACEHOLDER_DATE: (i32, u32, u32) = (2024, 1, 1);

/// Default substituted for null FLOAT fields.
pub const DEFAULT_FLOAT32: f32 = 1.01;

/// Largest frame accepted on either side of the transport.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// Rows per tablet when no capacity is configured.
pub const DEFAULT_TABLET_CAPACITY: usize = 64;
