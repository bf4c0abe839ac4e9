//! Canned replies to chat triggers

use std::fmt;

/// Server sub-commands the agent issues through chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    VanishOn,
    VanishOff,
}

impl ServerCommand {
    pub fn as_chat(&self) -> &'static str {
        match self {
            ServerCommand::VanishOn => "/vanish on",
            ServerCommand::VanishOff => "/vanish off",
        }
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_chat())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Say(String),
    Command(ServerCommand),
}

impl Reply {
    /// The chat line that carries this reply.
    pub fn line(&self) -> &str {
        match self {
            Reply::Say(text) => text,
            Reply::Command(command) => command.as_chat(),
        }
    }
}

pub const AFK_REPLY: &str = "Yes, I'm keeping the server alive ⛏️";
pub const STATE_REPLY: &str = "✅ I am online and AFK.";

pub struct ChatResponder {
    own_identity: String,
}

impl ChatResponder {
    pub fn new(own_identity: impl Into<String>) -> Self {
        Self {
            own_identity: own_identity.into(),
        }
    }

    /// Evaluates every trigger against one chat line.
    ///
    /// Rules do not short-circuit, so one line can produce several replies.
    /// Lines spoken by the agent itself never produce any.
    pub fn respond(&self, speaker: &str, text: &str) -> Vec<Reply> {
        if speaker == self.own_identity {
            return Vec::new();
        }

        let lowered = text.to_lowercase();
        let mut replies = Vec::new();

        if lowered.contains("hi bot") {
            replies.push(Reply::Say(format!("Hello {}! 👋", speaker)));
        }
        // "afk" with an optional "?" matches wherever "afk" does.
        if lowered.contains("afk") {
            replies.push(Reply::Say(AFK_REPLY.to_string()));
        }
        if text == "!vanish on" {
            replies.push(Reply::Command(ServerCommand::VanishOn));
        }
        if text == "!vanish off" {
            replies.push(Reply::Command(ServerCommand::VanishOff));
        }
        if text == "!state" {
            replies.push(Reply::Say(STATE_REPLY.to_string()));
        }

        replies
    }
}
