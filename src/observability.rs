use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gonkagate_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("gonkagate_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("gonkagate_chat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("gonkagate_chat.stream.chunks");
pub(crate) static STREAM_DELTAS: Counter = Counter::new("gonkagate_chat.stream.deltas");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gonkagate_chat.stream.errors");

pub(crate) static CHAT_TURNS: Counter = Counter::new("gonkagate_chat.chat.turns");
pub(crate) static CHAT_TURN_FAILURES: Counter = Counter::new("gonkagate_chat.chat.turn_failures");
pub(crate) static CHAT_INTERRUPTS: Counter = Counter::new("gonkagate_chat.chat.interrupts");

pub(crate) static TRANSCRIPT_SAVES: Counter = Counter::new("gonkagate_chat.transcript.saves");
pub(crate) static TRANSCRIPT_SAVE_ERRORS: Counter =
    Counter::new("gonkagate_chat.transcript.save_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_FAILURES);
    collector.register_counter(&CHAT_INTERRUPTS);

    collector.register_counter(&TRANSCRIPT_SAVES);
    collector.register_counter(&TRANSCRIPT_SAVE_ERRORS);
}
