//! kea control channel messages
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// `config-get`
pub const CONFIG_GET: &str = "config-get";
/// `statistic-get-all`
pub const STATISTIC_GET_ALL: &str = "statistic-get-all";

/// a control command. `service` is only understood by the control agent,
/// daemons addressed directly must not get it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Command {
    /// command name
    pub command: String,
    /// daemons the control agent should forward to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<String>>,
    /// command arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl Command {
    /// command with no service and no arguments
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            service: None,
            arguments: None,
        }
    }

    /// forward to these services
    pub fn service(mut self, service: Option<Vec<String>>) -> Self {
        self.service = service;
        self
    }

    /// set the arguments
    pub fn arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// one daemon's answer
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Response {
    /// 0 on success
    pub result: i64,
    /// explanation, mostly present on errors
    #[serde(default)]
    pub text: Option<String>,
    /// command output
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl Response {
    /// successful response with arguments
    pub fn success(arguments: Value) -> Self {
        Self {
            result: 0,
            text: None,
            arguments: Some(arguments),
        }
    }

    /// arguments of a successful response, the kea error otherwise
    pub fn into_arguments(self, command: &str) -> ClientResult<Value> {
        if self.result != 0 {
            return Err(ClientError::Command {
                command: command.to_owned(),
                result: self.result,
                text: self.text.unwrap_or_default(),
            });
        }
        Ok(self.arguments.unwrap_or(Value::Null))
    }
}

/// The control agent always answers with a list, one entry per service.
/// Daemon sockets answer with a single object.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(crate) enum Reply {
    Many(Vec<Response>),
    One(Response),
}

impl Reply {
    pub(crate) fn parse(bytes: &[u8]) -> ClientResult<Vec<Response>> {
        Ok(match serde_json::from_slice(bytes)? {
            Reply::Many(responses) => responses,
            Reply::One(response) => vec![response],
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn command_serialization() {
        let cmd = Command::new(STATISTIC_GET_ALL)
            .service(Some(vec!["dhcp4".into(), "dhcp6".into()]))
            .arguments(json!({}));
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "statistic-get-all", "service": ["dhcp4", "dhcp6"], "arguments": {}})
        );
        // daemons addressed directly get neither field
        assert_eq!(
            serde_json::to_value(Command::new(CONFIG_GET)).unwrap(),
            json!({"command": "config-get"})
        );
    }

    #[test]
    fn reply_shapes() {
        let many = Reply::parse(br#"[{"result": 0, "arguments": {}}, {"result": 1, "text": "down"}]"#)
            .unwrap();
        assert_eq!(many.len(), 2);
        let one = Reply::parse(br#"{"result": 0, "arguments": {"a": 1}}"#).unwrap();
        assert_eq!(one, vec![Response::success(json!({"a": 1}))]);
        assert!(Reply::parse(b"not json").is_err());
    }

    #[test]
    fn non_zero_result_is_an_error() {
        let resp = Response {
            result: 1,
            text: Some("unable to forward command to the dhcp6 service".into()),
            arguments: None,
        };
        let err = resp.into_arguments(CONFIG_GET).unwrap_err();
        assert!(err.is_command());
        assert_eq!(
            Response::success(json!({"x": 1}))
                .into_arguments(CONFIG_GET)
                .unwrap(),
            json!({"x": 1})
        );
    }
}
