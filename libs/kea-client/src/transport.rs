//! The seam between a [`Target`](crate::Target) and the wire.
use std::fmt;

use async_trait::async_trait;

use crate::{
    command::{Command, Response},
    error::ClientResult,
};

/// Sends one command and returns every response in the reply. A daemon
/// socket yields exactly one response, the control agent one per service.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// send `command` and wait for the complete reply
    async fn send(&self, command: &Command) -> ClientResult<Vec<Response>>;

    /// true if the peer is a control agent that understands `service`
    fn is_agent(&self) -> bool;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, command: &Command) -> ClientResult<Vec<Response>> {
        (**self).send(command).await
    }

    fn is_agent(&self) -> bool {
        (**self).is_agent()
    }
}
