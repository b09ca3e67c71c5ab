//! Durable key-value layout. These names are a contract across
//! sessions and must not change without a migration.

pub const USERS: &str = "users";
pub const SESSION: &str = "session";
pub const ACTIVITIES: &str = "activities";
pub const AGGREGATE: &str = "hub-aggregate";
pub const SECTION_ORDER: &str = "section-order";
pub const FRESH_LOGIN: &str = "fresh-login";
pub const REFRESH_NOW: &str = "refresh-now";
pub const LAST_CHANGE: &str = "last-change";

pub const SECTION_PREFIX: &str = "section:";
pub const SECTION_CONFIG_PREFIX: &str = "section-config:";

pub fn section(section_id: &str) -> String {
    format!("{SECTION_PREFIX}{section_id}")
}

pub fn section_config(section_id: &str) -> String {
    format!("{SECTION_CONFIG_PREFIX}{section_id}")
}
