//! Interrupt-aware request runner.
//!
//! One completion runs under a child of the caller's cancellation token while a watcher
//! task waits for a user interrupt. The watcher is the only other task in the program: it
//! cancels the child token and records that the interrupt was the cause, and it is always
//! joined before [`run_with_interrupt`] returns.

use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chat::completion::{ChatClient, RequestOptions};
use crate::chat::interrupt::Interrupts;
use crate::chat::message::Message;
use crate::client::CompletionTransport;
use crate::error::{Error, Result};
use crate::observability::CHAT_INTERRUPTS;
use crate::render::Renderer;

/// Run one completion, racing it against user interrupts.
///
/// Streamed tokens go straight to `renderer`. When an interrupt cancels the request, the
/// renderer shows a notice and the failure is reported as `generation canceled` (for a
/// cancellation) or `generation interrupted` (for anything else). Failures without an
/// interrupt propagate unchanged.
pub async fn run_with_interrupt<T: CompletionTransport>(
    client: &ChatClient<T>,
    messages: &[Message],
    options: &RequestOptions,
    parent: &CancellationToken,
    interrupts: &Interrupts,
    renderer: &mut dyn Renderer,
) -> Result<String> {
    let token = parent.child_token();
    let _guard = token.clone().drop_guard();

    let receiver = interrupts.subscribe();
    let (cause_tx, mut cause_rx) = oneshot::channel();
    let watcher = tokio::spawn(watch(token.clone(), receiver, cause_tx));

    let result = if options.stream {
        let mut on_token = |delta: &str| renderer.print_token(delta);
        client
            .complete(messages, options, &token, Some(&mut on_token))
            .await
    } else {
        client.complete(messages, options, &token, None).await
    };

    token.cancel();
    if let Err(err) = watcher.await {
        debug!(error = %err, "interrupt watcher did not finish cleanly");
    }
    let interrupted = cause_rx.try_recv().is_ok();

    match result {
        Ok(answer) => Ok(answer),
        Err(err) if interrupted => {
            renderer.print_interrupted();
            debug!(error = %err, "request ended after interrupt");
            Err(interrupted_error(&err))
        }
        Err(err) => Err(err),
    }
}

/// The error reported for a request that ended after an interrupt.
///
/// The request normally observes the canceled token and fails with a cancellation. A
/// transport failure that completes in the same instant the interrupt lands is reported as
/// an interruption instead.
fn interrupted_error(err: &Error) -> Error {
    if err.is_cancellation() {
        Error::cancelled("generation canceled")
    } else {
        Error::interrupted("generation interrupted")
    }
}

/// Wait for an interrupt or for the request to finish, whichever comes first.
async fn watch(
    token: CancellationToken,
    mut receiver: broadcast::Receiver<()>,
    cause: oneshot::Sender<()>,
) {
    tokio::select! {
        biased;
        _ = token.cancelled() => {}
        received = receiver.recv() => match received {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                info!("interrupt received; canceling generation");
                CHAT_INTERRUPTS.click();
                token.cancel();
                let _ = cause.send(());
            }
            Err(broadcast::error::RecvError::Closed) => token.cancelled().await,
        },
    }
}
