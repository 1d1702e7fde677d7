//! Events emitted by the agent CLI in `--json` mode, one JSON object per line.
//!
//! Only the event and item kinds the harness folds are modelled; everything
//! else decodes to an `Unknown`/`Other` variant and is ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// One decoded line of the agent's event stream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: Option<String>,
    },

    #[serde(rename = "item.completed")]
    ItemCompleted {
        #[serde(default)]
        item: ThreadItem,
    },

    #[serde(rename = "turn.completed")]
    TurnCompleted {
        #[serde(default, deserialize_with = "usage_or_default")]
        usage: Usage,
    },

    #[serde(other)]
    Unknown,
}

/// A completed thread item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItem {
    AgentMessage {
        #[serde(default)]
        text: String,
    },

    CommandExecution {
        #[serde(default)]
        command: String,

        /// Integer exit code; absent, null or non-integer values decode to `None`.
        #[serde(default, deserialize_with = "lenient_exit_code")]
        exit_code: Option<i64>,

        #[serde(default)]
        aggregated_output: String,
    },

    #[default]
    #[serde(other)]
    Other,
}

/// Token accounting reported at the end of a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,

    #[serde(default)]
    pub cached_input_tokens: u64,

    #[serde(default)]
    pub output_tokens: u64,
}

fn usage_or_default<'de, D>(deserializer: D) -> Result<Usage, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Usage>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_exit_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> AgentEvent {
        serde_json::from_str(line).expect("decode event")
    }

    #[test]
    fn test_thread_started() {
        let ev = decode(r#"{"type":"thread.started","thread_id":"t-1"}"#);
        assert_eq!(
            ev,
            AgentEvent::ThreadStarted {
                thread_id: Some("t-1".to_string())
            }
        );
    }

    #[test]
    fn test_agent_message_item() {
        let ev = decode(r#"{"type":"item.completed","item":{"type":"agent_message","text":"done"}}"#);
        assert_eq!(
            ev,
            AgentEvent::ItemCompleted {
                item: ThreadItem::AgentMessage {
                    text: "done".to_string()
                }
            }
        );
    }

    #[test]
    fn test_command_item_with_null_exit_code() {
        let ev = decode(
            r#"{"type":"item.completed","item":{"type":"command_execution","command":"ls","exit_code":null,"aggregated_output":"a\n"}}"#,
        );
        match ev {
            AgentEvent::ItemCompleted {
                item: ThreadItem::CommandExecution { exit_code, .. },
            } => assert_eq!(exit_code, None),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_command_item_with_string_exit_code_is_ignored() {
        let ev = decode(
            r#"{"type":"item.completed","item":{"type":"command_execution","command":"ls","exit_code":"1"}}"#,
        );
        match ev {
            AgentEvent::ItemCompleted {
                item:
                    ThreadItem::CommandExecution {
                        exit_code,
                        aggregated_output,
                        ..
                    },
            } => {
                assert_eq!(exit_code, None);
                assert!(aggregated_output.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_item_kind() {
        let ev = decode(r#"{"type":"item.completed","item":{"type":"reasoning","text":"hmm"}}"#);
        assert_eq!(
            ev,
            AgentEvent::ItemCompleted {
                item: ThreadItem::Other
            }
        );
    }

    #[test]
    fn test_item_missing_defaults_to_other() {
        let ev = decode(r#"{"type":"item.completed"}"#);
        assert_eq!(
            ev,
            AgentEvent::ItemCompleted {
                item: ThreadItem::Other
            }
        );
    }

    #[test]
    fn test_turn_completed_null_usage() {
        let ev = decode(r#"{"type":"turn.completed","usage":null}"#);
        assert_eq!(
            ev,
            AgentEvent::TurnCompleted {
                usage: Usage::default()
            }
        );
    }

    #[test]
    fn test_turn_completed_partial_usage() {
        let ev = decode(r#"{"type":"turn.completed","usage":{"input_tokens":12,"output_tokens":3}}"#);
        assert_eq!(
            ev,
            AgentEvent::TurnCompleted {
                usage: Usage {
                    input_tokens: 12,
                    cached_input_tokens: 0,
                    output_tokens: 3
                }
            }
        );
    }

    #[test]
    fn test_unknown_event_type() {
        assert_eq!(decode(r#"{"type":"turn.started"}"#), AgentEvent::Unknown);
    }
}
