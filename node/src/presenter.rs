//! Presentation channel that turns views into JSON-lines events.

use coinbot_execution::{PresentError, Presenter};
use coinbot_types::{
    api::{MessageHandle, View},
    casino::{ChannelId, PlayerId},
};
use serde::Serialize;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::debug;

/// One line of output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A new message was posted.
    Post {
        handle: MessageHandle,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    },
    /// A posted message was edited in place.
    Edit { handle: MessageHandle, view: View },
    /// A standalone result for the player.
    Outcome {
        channel: ChannelId,
        player: PlayerId,
        view: View,
    },
}

/// Hands events to a writer task. Handles are allocated locally and only
/// open handles this presenter issued can be edited.
pub struct ConsolePresenter {
    next: AtomicU64,
    posted: Mutex<HashSet<MessageHandle>>,
    events: mpsc::UnboundedSender<Event>,
}

impl ConsolePresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let presenter = Self {
            next: AtomicU64::new(1),
            posted: Mutex::new(HashSet::new()),
            events,
        };
        (presenter, receiver)
    }

    /// Messages that can still be edited.
    pub fn open_messages(&self) -> usize {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn emit(&self, event: Event) -> Result<(), PresentError> {
        self.events
            .send(event)
            .map_err(|_| PresentError::Failed("event writer stopped".into()))
    }
}

impl Presenter for ConsolePresenter {
    async fn send_initial(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> Result<MessageHandle, PresentError> {
        let handle = MessageHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.emit(Event::Post {
            handle,
            channel,
            player,
            view,
        })?;
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle);
        debug!(?handle, %player, "message posted");
        Ok(handle)
    }

    async fn update(&self, handle: MessageHandle, view: View) -> Result<(), PresentError> {
        let known = self
            .posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&handle);
        if !known {
            return Err(PresentError::NotFound(handle));
        }
        self.emit(Event::Edit { handle, view })
    }

    async fn close(&self, handle: MessageHandle) {
        let removed = self
            .posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        debug!(?handle, removed, "message closed");
    }

    async fn report_outcome(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> Result<(), PresentError> {
        self.emit(Event::Outcome {
            channel,
            player,
            view,
        })
    }
}

/// Write every event as one JSON line until all senders are gone.
pub async fn write_events<W: AsyncWrite + Unpin>(
    mut events: mpsc::UnboundedReceiver<Event>,
    mut out: W,
) -> std::io::Result<usize> {
    let mut written = 0;
    while let Some(event) = events.recv().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
        written += 1;
    }
    Ok(written)
}
