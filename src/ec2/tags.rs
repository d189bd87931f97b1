use aws_sdk_ec2::types::{Filter, Tag};

use super::filter;

pub const DEFAULT_MARKER_TAG_KEY: &str = "ec2-adapter:managed";
pub const DEFAULT_MARKER_TAG_VALUE: &str = "true";
pub const DEFAULT_NAME_TAG_KEY: &str = "ec2-adapter:name";

/// Name reported for instances without a name tag.
pub const UNKNOWN_NAME: &str = "unknown";

/// Tag keys used to mark managed instances and store their names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScheme {
    pub marker_key: String,
    pub marker_value: String,
    pub name_key: String,
}

impl Default for TagScheme {
    fn default() -> Self {
        Self {
            marker_key: DEFAULT_MARKER_TAG_KEY.to_string(),
            marker_value: DEFAULT_MARKER_TAG_VALUE.to_string(),
            name_key: DEFAULT_NAME_TAG_KEY.to_string(),
        }
    }
}

impl TagScheme {
    /// Filter selecting only instances carrying the marker tag.
    pub fn marker_filter(&self) -> Filter {
        filter(format!("tag:{}", self.marker_key), self.marker_value.as_str())
    }

    /// Tags applied to a freshly launched instance.
    pub fn launch_tags(&self, name: &str) -> Vec<Tag> {
        vec![
            Tag::builder()
                .key(self.marker_key.as_str())
                .value(self.marker_value.as_str())
                .build(),
            Tag::builder().key(self.name_key.as_str()).value(name).build(),
        ]
    }

    pub fn name_of<'a>(&self, tags: &'a [Tag]) -> &'a str {
        TagSet::new(tags).get_or(&self.name_key, UNKNOWN_NAME)
    }
}

/// Key lookup over an instance's tags.
#[derive(Debug, Clone, Copy)]
pub struct TagSet<'a> {
    tags: &'a [Tag],
}

impl<'a> TagSet<'a> {
    pub fn new(tags: &'a [Tag]) -> Self {
        Self { tags }
    }

    /// First value stored under `key`. A tag without a value counts as absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.tags
            .iter()
            .find(|tag| tag.key() == Some(key))
            .and_then(|tag| tag.value())
    }

    pub fn get_or(&self, key: &str, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }
}
