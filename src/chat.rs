use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "tool")]
    Tool,
    #[serde(untagged)]
    Other(String),
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Other(s) => s.as_str(),
        };
        write!(f, "{role}")
    }
}

/// One turn of a conversation, shaped the way chat templates index it
/// (`message['role']`, `message['content']`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_read_from_toml() {
        #[derive(serde::Deserialize)]
        struct Turns {
            messages: Vec<Message>,
        }

        let turns: Turns = toml::from_str(
            r#"
            messages = [
                { role = "system", content = "be brief" },
                { role = "ipython", content = "42" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(turns.messages[0].role, Role::System);
        assert_eq!(turns.messages[1].role, Role::Other("ipython".to_string()));
        assert_eq!(turns.messages[1].role.to_string(), "ipython");
    }
}
