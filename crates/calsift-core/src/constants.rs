/// XML namespace of CalDAV report documents (RFC 4791 §9)
pub const CALDAV_NAMESPACE: &str = "urn:ietf:params:xml:ns:caldav";
pub const DAV_NAMESPACE: &str = "DAV:";

/// Collation identifiers (RFC 4790)
pub const COLLATION_ASCII_CASEMAP: &str = "i;ascii-casemap";
pub const COLLATION_OCTET: &str = "i;octet";
pub const SUPPORTED_COLLATIONS: [&str; 2] = [COLLATION_ASCII_CASEMAP, COLLATION_OCTET];

/// Bounds substituted for a missing `start` or `end` on a time-range
pub const TIME_RANGE_MIN: &str = "00000101T000000Z";
pub const TIME_RANGE_MAX: &str = "99991231T235959Z";

pub const DEFAULT_MAX_RESOURCE_SIZE: u64 = 10 * 1024 * 1024;
pub const MIN_MAX_RESOURCE_SIZE: u64 = 4 * 1024;
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;
/// Deepest BEGIN nesting accepted, VCALENDAR counting as level one.
pub const DEFAULT_MAX_COMPONENT_DEPTH: usize = 64;
/// VCALENDAR > VEVENT > VALARM
pub const MIN_MAX_COMPONENT_DEPTH: usize = 3;
pub const DEFAULT_MAX_INSTANCES: u16 = 1000;

pub const PRODUCT_NAME: &str = "calsift";
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PRODUCT_ID: &str =
    const_str::concat!("-//", PRODUCT_NAME, "//CalDAV query engine ", PRODUCT_VERSION, "//EN");

/// Preconditions reported back to clients (RFC 4791 §7.7, §7.8)
pub const PRECONDITION_VALID_FILTER: &str = "CALDAV:valid-filter";
pub const PRECONDITION_SUPPORTED_COLLATION: &str = "CALDAV:supported-collation";
pub const PRECONDITION_VALID_CALENDAR_DATA: &str = "CALDAV:valid-calendar-data";
pub const PRECONDITION_MAX_RESOURCE_SIZE: &str = "CALDAV:max-resource-size";
