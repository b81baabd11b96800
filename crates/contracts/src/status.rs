//! Status - the inbound event record
//!
//! A read-only view of one status from the upstream feed. The core never
//! mutates a status; it only reads fields to validate and to format output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ContractError;

/// Posting user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub screen_name: Option<String>,
    pub name: Option<String>,
}

/// Attached media item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub id: Option<u64>,
    /// Fetchable URL of the media bytes
    pub media_url_https: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Short link embedded in the status text
    pub url: Option<String>,
}

/// Mention of another user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMention {
    pub id: u64,
    pub screen_name: Option<String>,
    pub name: Option<String>,
}

/// Hashtag annotation (without the leading `#`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hashtag {
    pub text: String,
}

/// Link annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlEntity {
    pub url: String,
    pub expanded_url: Option<String>,
}

/// One status from the feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub id: u64,
    pub text: Option<String>,
    /// Long body, present when `text` is truncated
    pub full_text: Option<String>,
    pub truncated: bool,
    pub created_at: Option<String>,
    pub lang: Option<String>,
    pub user: Option<User>,
    pub media: Vec<Media>,
    pub user_mentions: Vec<UserMention>,
    pub hashtags: Vec<Hashtag>,
    pub urls: Vec<UrlEntity>,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
    pub retweeted: bool,
    pub retweeted_status: Option<Box<Status>>,
    pub quoted_status_id: Option<u64>,
    pub quoted_status: Option<Box<Status>>,
    pub favorite_count: u64,
    pub retweet_count: u64,
}

impl Status {
    /// Parse a raw feed payload.
    ///
    /// Accepts both the upstream wire shape (entities nested under
    /// `entities` / `extended_entities` / `extended_tweet`) and the flat
    /// shape produced by [`Status::as_dict`].
    pub fn from_feed_json(value: &Value) -> Result<Self, ContractError> {
        let raw: RawStatus = serde_json::from_value(value.clone())
            .map_err(|e| ContractError::payload_parse(e.to_string()))?;
        Ok(raw.into_status())
    }

    /// Full field mapping of this status.
    ///
    /// Members whose value is falsy (null, false, 0, "", empty array or
    /// object) are left out at every nesting level. Keys are sorted.
    pub fn as_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => prune_map(map),
            _ => Map::new(),
        }
    }

    /// Text to show: the long body if present, otherwise the short body
    pub fn display_text(&self) -> &str {
        match self.full_text.as_deref() {
            Some(full) if !full.is_empty() => full,
            _ => self.text.as_deref().unwrap_or(""),
        }
    }

    /// Embeds a retweeted status, or was retweeted by the account
    pub fn is_reshare(&self) -> bool {
        self.retweeted_status.is_some() || self.retweeted
    }

    /// Author id, if the status carries a user
    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Fetchable URLs of attached media, in attachment order
    pub fn media_urls(&self) -> Vec<&str> {
        self.media
            .iter()
            .map(|m| m.media_url_https.as_str())
            .collect()
    }
}

fn prune_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(key, value)| prune(value).map(|v| (key, v)))
        .collect()
}

fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(ref n) if n.as_f64() == Some(0.0) => None,
        Value::String(ref s) if s.is_empty() => None,
        Value::Array(items) => {
            if items.is_empty() {
                return None;
            }
            let items = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(prune_map(map)),
                    other => other,
                })
                .collect();
            Some(Value::Array(items))
        }
        Value::Object(map) => {
            let map = prune_map(map);
            if map.is_empty() {
                None
            } else {
                Some(Value::Object(map))
            }
        }
        other => Some(other),
    }
}

// ===== Wire shape =====

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntities {
    media: Option<Vec<Media>>,
    user_mentions: Option<Vec<UserMention>>,
    hashtags: Option<Vec<Hashtag>>,
    urls: Option<Vec<UrlEntity>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtendedTweet {
    full_text: Option<String>,
    entities: Option<RawEntities>,
    extended_entities: Option<RawEntities>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    id: Option<u64>,
    text: Option<String>,
    full_text: Option<String>,
    truncated: Option<bool>,
    created_at: Option<String>,
    lang: Option<String>,
    user: Option<User>,
    entities: Option<RawEntities>,
    extended_entities: Option<RawEntities>,
    extended_tweet: Option<RawExtendedTweet>,
    // flat shape
    media: Option<Vec<Media>>,
    user_mentions: Option<Vec<UserMention>>,
    hashtags: Option<Vec<Hashtag>>,
    urls: Option<Vec<UrlEntity>>,
    in_reply_to_status_id: Option<u64>,
    in_reply_to_user_id: Option<u64>,
    in_reply_to_screen_name: Option<String>,
    retweeted: Option<bool>,
    retweeted_status: Option<Box<RawStatus>>,
    quoted_status_id: Option<u64>,
    quoted_status: Option<Box<RawStatus>>,
    favorite_count: Option<u64>,
    retweet_count: Option<u64>,
}

impl RawStatus {
    fn into_status(self) -> Status {
        let (full_text, entities, extended) = match self.extended_tweet {
            Some(ext) => (
                ext.full_text.or(self.full_text),
                ext.entities.or(self.entities),
                ext.extended_entities.or(self.extended_entities),
            ),
            None => (self.full_text, self.entities, self.extended_entities),
        };
        let entities = entities.unwrap_or_default();
        let extended = extended.unwrap_or_default();

        // extended_entities carries every attached photo, entities only the first
        let media = non_empty(extended.media)
            .or(non_empty(entities.media))
            .or(self.media)
            .unwrap_or_default();

        Status {
            id: self.id.unwrap_or_default(),
            text: self.text,
            full_text,
            truncated: self.truncated.unwrap_or_default(),
            created_at: self.created_at,
            lang: self.lang,
            user: self.user,
            media,
            user_mentions: entities
                .user_mentions
                .or(self.user_mentions)
                .unwrap_or_default(),
            hashtags: entities.hashtags.or(self.hashtags).unwrap_or_default(),
            urls: entities.urls.or(self.urls).unwrap_or_default(),
            in_reply_to_status_id: self.in_reply_to_status_id,
            in_reply_to_user_id: self.in_reply_to_user_id,
            in_reply_to_screen_name: self.in_reply_to_screen_name,
            retweeted: self.retweeted.unwrap_or_default(),
            retweeted_status: self.retweeted_status.map(|s| Box::new(s.into_status())),
            quoted_status_id: self.quoted_status_id,
            quoted_status: self.quoted_status.map(|s| Box::new(s.into_status())),
            favorite_count: self.favorite_count.unwrap_or_default(),
            retweet_count: self.retweet_count.unwrap_or_default(),
        }
    }
}

fn non_empty<T>(items: Option<Vec<T>>) -> Option<Vec<T>> {
    items.filter(|v| !v.is_empty())
}
