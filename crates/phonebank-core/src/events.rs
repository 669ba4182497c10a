//! Append-only session event log with a running replay hash.

use contracts::{PhoneId, SessionEvent, SessionEventType, SCHEMA_VERSION_V1};
use serde_json::Value;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fold a u64 value into a running FNV-1a hash.
fn fnv1a_fold(hash: u64, value: u64) -> u64 {
    value.to_le_bytes().iter().fold(hash, |h, &byte| {
        (h ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Fold a string plus a separator byte into a running FNV-1a hash.
fn fnv1a_fold_str(hash: u64, text: &str) -> u64 {
    let h = text.as_bytes().iter().fold(hash, |h, &byte| {
        (h ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    (h ^ 0xff).wrapping_mul(FNV_PRIME)
}

fn mix_event(hash: u64, event: &SessionEvent) -> u64 {
    let mut h = fnv1a_fold(hash, event.frame);
    h = fnv1a_fold(h, event.sequence_in_frame);
    h = fnv1a_fold_str(h, &format!("{:?}", event.event_type));
    h = fnv1a_fold(h, event.phone.map_or(u64::MAX, |phone| u64::from(phone.0)));
    if let Some(details) = &event.details {
        h = fnv1a_fold_str(h, &details.to_string());
    }
    h
}

/// Replay hash over a slice of events. Covers frame, sequence, type, phone
/// and details; ids and schema version are configuration, not output.
pub fn replay_hash_of_events(events: &[SessionEvent]) -> u64 {
    events.iter().fold(FNV_OFFSET_BASIS, mix_event)
}

#[derive(Debug, Clone)]
pub struct EventLog {
    session_id: String,
    events: Vec<SessionEvent>,
    frame: u64,
    sequence_in_frame: u64,
    hash: u64,
}

impl EventLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
            frame: 0,
            sequence_in_frame: 0,
            hash: FNV_OFFSET_BASIS,
        }
    }

    pub fn push(
        &mut self,
        frame: u64,
        event_type: SessionEventType,
        phone: Option<PhoneId>,
        details: Option<Value>,
    ) {
        if frame != self.frame {
            self.frame = frame;
            self.sequence_in_frame = 0;
        }
        let event = SessionEvent {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            event_id: format!("evt_{:06}_{:03}", frame, self.sequence_in_frame),
            session_id: self.session_id.clone(),
            frame,
            sequence_in_frame: self.sequence_in_frame,
            event_type,
            phone,
            details,
        };
        self.sequence_in_frame += 1;
        self.hash = mix_event(self.hash, &event);
        self.events.push(event);
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn replay_hash(&self) -> u64 {
        self.hash
    }

    pub fn count(&self, event_type: SessionEventType) -> usize {
        self.events
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }
}
