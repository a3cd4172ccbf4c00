//! Sequential flow-based session grouping.
//!
//! Walks one table key's status log in chronological order and cuts it
//! into discrete sync sessions using status-transition rules: `FULL_LOAD`
//! opens a flow, as does a `LISTENING_CHANGES` ping immediately followed
//! in time by `IN_PROGRESS` (a steady listening key beginning a fresh
//! incremental cycle). The first terminal transition after real work
//! closes the flow. A lone ping with nothing around it is steady-state
//! noise, never a session.
//!
//! Input may arrive in either timestamp order; it is normalized to
//! ascending `processed_at` (ties broken by id) before the walk, so
//! "the adjacent event" always means "the next event in time".

use tracing::debug;

use crate::model::{StatusEvent, SyncSession, SyncStatus};
use crate::timeline;

/// Accumulator for a session that has been opened but not yet closed.
struct OpenFlow {
    session: SyncSession,
}

impl OpenFlow {
    fn seed(event: &StatusEvent) -> Self {
        let error_message = if event.status == SyncStatus::Error {
            event.message.clone()
        } else {
            None
        };
        Self {
            session: SyncSession {
                id: event.id,
                schema_name: event.schema_name.clone(),
                table_name: event.table_name.clone(),
                db_engine: event.db_engine.clone(),
                start_time: event.processed_at,
                end_time: event.processed_at,
                status: event.status.clone(),
                status_flow: vec![event.status.clone()],
                total_rows_processed: event.record_count.unwrap_or(0),
                error_message,
                metadata: None,
                created_at: event.processed_at,
                record_ids: vec![event.id],
                duration_seconds: 0,
            },
        }
    }

    fn absorb(&mut self, event: &StatusEvent) {
        self.session.status_flow.push(event.status.clone());
        self.session.end_time = event.processed_at;
        self.session.status = event.status.clone();
        self.session.record_ids.push(event.id);
        if let Some(count) = event.record_count {
            self.session.total_rows_processed = self.session.total_rows_processed.max(count);
        }
        if event.status == SyncStatus::Error && event.message.is_some() {
            self.session.error_message = event.message.clone();
        }
    }

    /// Flow-end predicate: a terminal status that differs from the opening
    /// one, on a flow that has either seen `IN_PROGRESS` or started as a
    /// full load. Distinguishes a real cycle from steady-state noise.
    fn should_close(&self) -> bool {
        let flow = &self.session.status_flow;
        let Some(last) = flow.last() else {
            return false;
        };
        let first = &flow[0];
        last.is_flow_terminal()
            && last != first
            && (flow.contains(&SyncStatus::InProgress) || *first == SyncStatus::FullLoad)
    }

    fn len(&self) -> usize {
        self.session.status_flow.len()
    }

    fn into_session(self) -> SyncSession {
        let mut session = self.session;
        session.duration_seconds = (session.end_time - session.start_time).num_seconds();
        session
    }
}

fn is_flow_start(status: &SyncStatus, next: Option<&SyncStatus>) -> bool {
    match status {
        SyncStatus::FullLoad => true,
        SyncStatus::ListeningChanges => matches!(next, Some(SyncStatus::InProgress)),
        _ => false,
    }
}

/// Group one key's status events into sessions, most recent first, capped
/// to `limit`.
///
/// A flow that accumulates only its opening event is discarded: a single
/// isolated ping is never itself a session.
#[must_use]
pub fn group_flows(events: &[StatusEvent], limit: usize) -> Vec<SyncSession> {
    let mut ordered: Vec<&StatusEvent> = events.iter().collect();
    ordered.sort_by(|a, b| {
        a.processed_at
            .cmp(&b.processed_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut sessions = Vec::new();
    let mut open: Option<OpenFlow> = None;

    for (idx, event) in ordered.iter().enumerate() {
        let next_status = ordered.get(idx + 1).map(|e| &e.status);

        if is_flow_start(&event.status, next_status) {
            if let Some(flow) = open.take() {
                if flow.len() > 1 {
                    sessions.push(flow.into_session());
                } else {
                    debug!(id = flow.session.id, "discarding singleton flow");
                }
            }
            open = Some(OpenFlow::seed(event));
            continue;
        }

        if let Some(mut flow) = open.take() {
            flow.absorb(event);
            if flow.should_close() {
                sessions.push(flow.into_session());
            } else {
                open = Some(flow);
            }
        }
        // No open flow: steady-state noise, skipped.
    }

    if let Some(flow) = open.take() {
        if flow.len() > 1 {
            sessions.push(flow.into_session());
        } else {
            debug!(id = flow.session.id, "discarding singleton flow at end of log");
        }
    }

    timeline::most_recent_first(&mut sessions);
    timeline::cap(&mut sessions, limit);
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).unwrap()
    }

    fn event(id: i64, status: SyncStatus, minute: u32) -> StatusEvent {
        StatusEvent {
            id,
            schema_name: "public".to_string(),
            table_name: "orders".to_string(),
            db_engine: "postgres".to_string(),
            status,
            processed_at: at(minute),
            record_count: None,
            message: None,
        }
    }

    fn event_with_count(id: i64, status: SyncStatus, minute: u32, count: i64) -> StatusEvent {
        StatusEvent {
            record_count: Some(count),
            ..event(id, status, minute)
        }
    }

    #[test]
    fn empty_input_yields_no_sessions() {
        assert!(group_flows(&[], 10).is_empty());
    }

    #[test]
    fn singleton_full_load_is_suppressed() {
        let events = vec![event(1, SyncStatus::FullLoad, 0)];
        assert!(group_flows(&events, 10).is_empty());
    }

    #[test]
    fn two_event_flow_becomes_one_session() {
        let events = vec![
            event(1, SyncStatus::FullLoad, 0),
            event(2, SyncStatus::ListeningChanges, 5),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);

        let session = &sessions[0];
        assert_eq!(session.id, 1);
        assert_eq!(session.start_time, at(0));
        assert_eq!(session.end_time, at(5));
        assert_eq!(session.duration_seconds, 300);
        assert_eq!(
            session.status_flow,
            vec![SyncStatus::FullLoad, SyncStatus::ListeningChanges]
        );
        assert_eq!(session.record_ids, vec![1, 2]);
        assert_eq!(session.status, SyncStatus::ListeningChanges);
        assert!(session.error_message.is_none());
    }

    #[test]
    fn terminal_transition_closes_mid_log() {
        // First cycle closes on LISTENING_CHANGES; the stray listening ping
        // after it is noise; the second cycle closes on ERROR.
        let mut events = vec![
            event(1, SyncStatus::FullLoad, 0),
            event(2, SyncStatus::InProgress, 1),
            event(3, SyncStatus::ListeningChanges, 2),
            event(4, SyncStatus::ListeningChanges, 10),
            event(5, SyncStatus::FullLoad, 20),
            event(6, SyncStatus::InProgress, 21),
        ];
        events.push(StatusEvent {
            message: Some("duplicate key violation".to_string()),
            ..event(7, SyncStatus::Error, 22)
        });

        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 2);

        // Most recent first.
        assert_eq!(sessions[0].id, 5);
        assert_eq!(sessions[0].status, SyncStatus::Error);
        assert_eq!(
            sessions[0].error_message.as_deref(),
            Some("duplicate key violation")
        );
        assert_eq!(sessions[1].id, 1);
        assert_eq!(sessions[1].record_ids, vec![1, 2, 3]);

        let mut all_ids: Vec<i64> = sessions.iter().flat_map(|s| s.record_ids.clone()).collect();
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 6, "event 4 is noise, everything else once");
    }

    #[test]
    fn listening_followed_by_in_progress_opens_flow() {
        let events = vec![
            event(1, SyncStatus::ListeningChanges, 0),
            event(2, SyncStatus::InProgress, 1),
            event(3, SyncStatus::NoData, 2),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status_flow[0], SyncStatus::ListeningChanges);
        assert_eq!(sessions[0].status, SyncStatus::NoData);
        assert_eq!(sessions[0].record_ids, vec![1, 2, 3]);
    }

    #[test]
    fn lone_listening_pings_are_noise() {
        let events = vec![
            event(1, SyncStatus::ListeningChanges, 0),
            event(2, SyncStatus::ListeningChanges, 10),
            event(3, SyncStatus::ListeningChanges, 20),
        ];
        assert!(group_flows(&events, 10).is_empty());
    }

    #[test]
    fn open_flow_at_end_of_log_is_emitted() {
        let events = vec![
            event(1, SyncStatus::FullLoad, 0),
            event(2, SyncStatus::InProgress, 1),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SyncStatus::InProgress);
        assert_eq!(sessions[0].duration_seconds, 60);
    }

    #[test]
    fn total_rows_is_running_maximum() {
        let events = vec![
            event_with_count(1, SyncStatus::FullLoad, 0, 250),
            event_with_count(2, SyncStatus::InProgress, 1, 1000),
            event_with_count(3, SyncStatus::ListeningChanges, 2, 400),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].total_rows_processed, 1000);
    }

    #[test]
    fn new_full_load_displaces_singleton_start() {
        // The first FULL_LOAD never accumulates a second event before the
        // next one arrives, so only the second cycle survives.
        let events = vec![
            event(1, SyncStatus::FullLoad, 0),
            event(2, SyncStatus::FullLoad, 5),
            event(3, SyncStatus::ListeningChanges, 6),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, 2);
    }

    #[test]
    fn limit_caps_output_newest_first() {
        let mut events = Vec::new();
        for cycle in 0..5_i64 {
            let base = u32::try_from(cycle).unwrap() * 10;
            events.push(event(cycle * 2 + 1, SyncStatus::FullLoad, base));
            events.push(event(cycle * 2 + 2, SyncStatus::ListeningChanges, base + 2));
        }
        let sessions = group_flows(&events, 2);
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].start_time > sessions[1].start_time);
        assert_eq!(sessions[0].id, 9);
    }

    #[test]
    fn descending_input_matches_ascending_input() {
        let ascending = vec![
            event(1, SyncStatus::ListeningChanges, 0),
            event(2, SyncStatus::InProgress, 1),
            event(3, SyncStatus::ListeningChanges, 2),
            event(4, SyncStatus::FullLoad, 10),
            event(5, SyncStatus::ListeningChanges, 12),
        ];
        let mut descending = ascending.clone();
        descending.reverse();

        assert_eq!(group_flows(&ascending, 10), group_flows(&descending, 10));
        assert_eq!(group_flows(&ascending, 10).len(), 2);
    }

    #[test]
    fn events_after_a_close_are_not_absorbed() {
        let events = vec![
            event(1, SyncStatus::FullLoad, 0),
            event(2, SyncStatus::Error, 1),
            event(3, SyncStatus::InProgress, 2),
        ];
        let sessions = group_flows(&events, 10);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].record_ids, vec![1, 2]);
        assert_eq!(sessions[0].status, SyncStatus::Error);
    }
}
