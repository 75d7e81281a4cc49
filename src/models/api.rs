use serde::{ Deserialize, Serialize };
use std::str::FromStr;

use super::chat::ConversationKey;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceRequest {
    pub call_agent: String,
    pub call_id: String,
    pub utterance: String,
    pub speaker: String,
}

impl UtteranceRequest {
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(self.call_agent.clone(), self.call_id.clone())
    }
}

/// Who spoke an utterance on the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    Customer,
    Advocate,
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Speaker::Customer),
            "advocate" => Ok(Speaker::Advocate),
            _ => Err(format!("Invalid speaker role: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_is_trimmed_and_case_insensitive() {
        assert_eq!(" Customer ".parse::<Speaker>(), Ok(Speaker::Customer));
        assert_eq!("ADVOCATE".parse::<Speaker>(), Ok(Speaker::Advocate));
        assert!("agent".parse::<Speaker>().is_err());
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let req: UtteranceRequest = serde_json
            ::from_str(r#"{"callAgent":"A1","callId":"C1","utterance":"hi","speaker":"customer"}"#)
            .unwrap();
        assert_eq!(req.key(), ConversationKey::new("A1", "C1"));
    }
}
