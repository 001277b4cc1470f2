use coinbot_types::{
    api::{MessageHandle, View},
    casino::{ChannelId, PlayerId},
};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresentError {
    #[error("message not found: {0:?}")]
    NotFound(MessageHandle),
    #[error("presentation failed: {0}")]
    Failed(String),
}

/// Where game state is shown to players.
pub trait Presenter: Send + Sync + 'static {
    /// Post a new message for `player` in `channel`.
    fn send_initial(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> impl Future<Output = Result<MessageHandle, PresentError>> + Send;

    /// Replace the content of a previously posted message.
    fn update(
        &self,
        handle: MessageHandle,
        view: View,
    ) -> impl Future<Output = Result<(), PresentError>> + Send;

    /// Forget a message that will not be edited again.
    fn close(&self, handle: MessageHandle) -> impl Future<Output = ()> + Send;

    /// Post a final result (or a rejection) for `player`.
    fn report_outcome(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> impl Future<Output = Result<(), PresentError>> + Send;
}
