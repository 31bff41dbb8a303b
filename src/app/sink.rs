//! Notification sink: decode, count, present.
//!
//! Decode failures stop here: they are reported through the presenter's
//! error channel and the sink returns normally, so the session keeps
//! running.

use log::debug;
use uuid::Uuid;

use super::ports::{Presenter, RawPayload};
use crate::diagnostics::SessionStats;
use crate::payload::{self, DecodeError};

pub struct NotificationSink<P> {
    presenter: P,
    stats: SessionStats,
}

impl<P: Presenter> NotificationSink<P> {
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            stats: SessionStats::new(),
        }
    }

    /// Handle one characteristic value change.  Never fails.
    pub fn on_notification(&mut self, source: Uuid, payload: &[u8]) {
        match payload::decode(payload) {
            Ok(record) => {
                self.stats.record_ok();
                self.presenter.display_record(&record);
            }
            Err(err) => {
                debug!("{source}: rejected {}-byte payload ({})", payload.len(), err.kind());
                self.stats.record_failure(&err);
                let message = err.to_string();
                self.presenter.display_error(&message, raw_payload(&err));
            }
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }
}

fn raw_payload(err: &DecodeError) -> RawPayload<'_> {
    match err {
        DecodeError::InvalidEncoding(bytes) | DecodeError::UnexpectedError { bytes, .. } => {
            RawPayload::Bytes(bytes)
        }
        DecodeError::MalformedJson(text) | DecodeError::MissingField { text, .. } => {
            RawPayload::Text(text)
        }
    }
}
