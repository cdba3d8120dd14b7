//! Canned answers for questions about the assistant itself

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Authorship,
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannedReply {
    pub topic: Topic,
    pub markup: &'static str,
}

const AUTHORSHIP_PHRASES: &[&str] = &[
    "who built you",
    "who is your developer",
    "your creator",
    "who made you",
    "your maker",
];

const IDENTITY_PHRASES: &[&str] = &["your name", "who are you"];

pub const AUTHORSHIP_REPLY: &str = "I was proudly crafted by <strong class='glow'>Max</strong> — a creative developer from <strong class='glow'>Kenya</strong> 🇰🇪, mixing logic and imagination to make something awesome 💻✨";

pub const IDENTITY_REPLY: &str = "I’m <strong>MaxMovies AI</strong> 🎬🍿 — your movie and series companion who loves finding the perfect film for you and sharing insights!<br>I can help you with <strong>other</strong> topics too✌️🌚";

/// Checked in order; the first group with a matching phrase wins
const GROUPS: [(Topic, &[&str], &str); 2] = [
    (Topic::Authorship, AUTHORSHIP_PHRASES, AUTHORSHIP_REPLY),
    (Topic::Identity, IDENTITY_PHRASES, IDENTITY_REPLY),
];

/// Case-insensitive substring match against the fixed topic groups
pub fn intercept(prompt: &str) -> Option<CannedReply> {
    let lower = prompt.to_lowercase();
    GROUPS
        .iter()
        .find(|(_, phrases, _)| phrases.iter().any(|phrase| lower.contains(phrase)))
        .map(|(topic, _, markup)| CannedReply {
            topic: *topic,
            markup: *markup,
        })
}
