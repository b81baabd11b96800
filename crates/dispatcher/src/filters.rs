//! Stock status predicates
//!
//! Plain functions usable directly in a [`Filter`], plus [`resolve`] to
//! turn the configuration form into a filter.

use once_cell::sync::Lazy;
use regex::Regex;

use contracts::{FilterSpec, Status};

use crate::validation::Filter;

static RT_GAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(rt|retweet)\s*game").expect("valid rt game pattern"));

/// Status replies to another user or status
pub fn is_reply(status: &Status) -> bool {
    status.in_reply_to_user_id.is_some_and(|id| id != 0)
        || status.in_reply_to_status_id.is_some_and(|id| id != 0)
}

/// Status mentions at least one user
pub fn has_mentions(status: &Status) -> bool {
    !status.user_mentions.is_empty()
}

/// Status was posted by `user_id`
pub fn tweeted_by(status: &Status, user_id: u64) -> bool {
    status.user_id() == Some(user_id)
}

/// Status embeds a retweeted status
pub fn is_retweet(status: &Status) -> bool {
    status.retweeted_status.is_some()
}

/// Status carries attached media
pub fn has_media(status: &Status) -> bool {
    !status.media.is_empty()
}

/// Status is tagged with `tag` (without the leading `#`)
pub fn has_hashtag(status: &Status, tag: &str, ignore_case: bool) -> bool {
    status.hashtags.iter().any(|h| {
        if ignore_case {
            h.text.to_lowercase() == tag.to_lowercase()
        } else {
            h.text == tag
        }
    })
}

/// Status text advertises an "RT game"
pub fn is_rt_game(status: &Status) -> bool {
    RT_GAME.is_match(status.display_text())
}

/// Status quotes another status
pub fn is_quote(status: &Status) -> bool {
    status.quoted_status_id.is_some() || status.quoted_status.is_some()
}

/// Build a filter from its configuration form.
///
/// `FilterSpec::Default` resolves to `default`, the worker kind's own filter.
pub fn resolve(spec: &FilterSpec, default: &Filter) -> Filter {
    match spec {
        FilterSpec::Default => default.clone(),
        FilterSpec::IsReply => Filter::new("is_reply", is_reply),
        FilterSpec::HasMentions => Filter::new("has_mentions", has_mentions),
        FilterSpec::IsRetweet => Filter::new("is_retweet", is_retweet),
        FilterSpec::HasMedia => Filter::new("has_media", has_media),
        FilterSpec::IsQuote => Filter::new("is_quote", is_quote),
        FilterSpec::IsRtGame => Filter::new("is_rt_game", is_rt_game),
        FilterSpec::TweetedBy { user_id } => {
            let user_id = *user_id;
            Filter::new(spec.to_string(), move |s| tweeted_by(s, user_id))
        }
        FilterSpec::HasHashtag { tag, ignore_case } => {
            let tag = tag.clone();
            let ignore_case = *ignore_case;
            Filter::new(spec.to_string(), move |s| has_hashtag(s, &tag, ignore_case))
        }
        FilterSpec::Not { filter } => resolve(filter, default).negate(),
    }
}

/// Resolve a whole chain, keeping declaration order
pub fn resolve_chain(specs: &[FilterSpec], default: &Filter) -> Vec<Filter> {
    specs.iter().map(|spec| resolve(spec, default)).collect()
}
