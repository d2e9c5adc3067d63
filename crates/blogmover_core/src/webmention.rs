//! Interchange schema for comments and reactions, serialized as a JSON feed.

use serde::Serialize;

pub const IN_REPLY_TO: &str = "in-reply-to";
pub const LIKE_OF: &str = "like-of";
pub const REPOST_OF: &str = "repost-of";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub photo: String,
}

impl Author {
    pub fn card(name: impl Into<String>, url: impl Into<String>, photo: impl Into<String>) -> Self {
        Self {
            kind: "card".to_string(),
            name: name.into(),
            url: url.into(),
            photo: photo.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MentionContent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention {
    #[serde(rename = "type")]
    pub kind: String,
    /// `in-reply-to`, `like-of`, `repost-of`, or whatever text the source
    /// used to describe the interaction. Empty when unknown.
    #[serde(rename = "wm-property", skip_serializing_if = "String::is_empty")]
    pub property: String,
    pub author: Author,
    pub url: String,
    #[serde(rename = "wm-received")]
    pub received: String,
    pub content: MentionContent,
}

impl Mention {
    pub fn new(author: Author) -> Self {
        Self {
            kind: "entry".to_string(),
            property: String::new(),
            author,
            url: String::new(),
            received: String::new(),
            content: MentionContent::default(),
        }
    }

    /// A genuine reply, built from one comment of the source page.
    pub fn reply(comment: &dyn CommentSource) -> Self {
        Self {
            property: IN_REPLY_TO.to_string(),
            url: comment.url(),
            received: comment.date(),
            content: comment.content(),
            ..Self::new(comment.author())
        }
    }

    /// A like or reshare that carries nothing but its author.
    pub fn reaction(property: &str, author: Author) -> Self {
        Self {
            property: property.to_string(),
            ..Self::new(author)
        }
    }
}

/// Read access to one comment in a platform's markup.
pub trait CommentSource {
    fn author(&self) -> Author;
    fn content(&self) -> MentionContent;
    /// Permalink of the comment, empty when the platform has none.
    fn url(&self) -> String;
    fn date(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionFeed {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Mention>,
}

impl MentionFeed {
    pub fn new(children: Vec<Mention>) -> Self {
        Self {
            kind: "feed".to_string(),
            name: "Webmentions".to_string(),
            children,
        }
    }

    /// Pretty JSON with one-space indentation, or `None` when there is
    /// nothing to write.
    pub fn to_json(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        if self.children.is_empty() {
            return Ok(None);
        }
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        Ok(Some(buffer))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Fixed;

    impl CommentSource for Fixed {
        fn author(&self) -> Author {
            Author::card("alice", "", "http://img/a.png")
        }
        fn content(&self) -> MentionContent {
            MentionContent {
                text: "hi".into(),
                html: "<b>hi</b>".into(),
            }
        }
        fn url(&self) -> String {
            String::new()
        }
        fn date(&self) -> String {
            "2009-03-17 21:10:00 +0300".into()
        }
    }

    #[test]
    fn empty_feed_is_not_rendered() {
        assert_eq!(MentionFeed::new(Vec::new()).to_json().unwrap(), None);
    }

    #[test]
    fn reply_serializes_with_interchange_field_names() {
        let json = MentionFeed::new(vec![Mention::reply(&Fixed)])
            .to_json()
            .unwrap()
            .unwrap();
        let expected = r#"{
 "type": "feed",
 "name": "Webmentions",
 "children": [
  {
   "type": "entry",
   "wm-property": "in-reply-to",
   "author": {
    "type": "card",
    "name": "alice",
    "photo": "http://img/a.png"
   },
   "url": "",
   "wm-received": "2009-03-17 21:10:00 +0300",
   "content": {
    "text": "hi",
    "html": "<b>hi</b>"
   }
  }
 ]
}"#;
        assert_eq!(String::from_utf8(json).unwrap(), expected);
    }

    #[test]
    fn reaction_without_property_omits_the_key() {
        let value = serde_json::to_value(Mention::reaction("", Author::card("bob", "", ""))).unwrap();
        assert!(value.get("wm-property").is_none());
        assert_eq!(value["content"], serde_json::json!({}));
        assert_eq!(value["url"], "");
    }
}
