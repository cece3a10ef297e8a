// Copyright (C) 2024, 2025 Firopool Developers (see AUTHORS)
//
// This file is part of Firopool
//
// Firopool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Firopool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Firopool. If not, see <https://www.gnu.org/licenses/>.

use crate::stratum::work::template::Job;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// What a share record counts towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Primary,
    Share,
    Auxiliary,
}

/// A validated or rejected share, consumed by accounting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub job: String,
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub addr_primary: Option<String>,
    pub addr_auxiliary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_diff_primary: Option<f64>,
    pub block_type: BlockType,
    /// Coinbase transaction as hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    pub difficulty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// The PoW digest as a decimal integer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receives manager notifications. Called synchronously from the
/// manager, implementations must not block.
#[cfg_attr(test, automock)]
pub trait ManagerEvents: Send + Sync {
    /// A new job was built for the same chain tip
    fn on_job_updated(&self, job: Arc<Job>);
    /// A new job was built for a new chain tip, older jobs are gone
    fn on_new_block(&self, job: Arc<Job>);
    /// A share was processed. The auxiliary record is only present for
    /// accepted shares.
    fn on_share_result(
        &self,
        primary: ShareRecord,
        auxiliary: Option<ShareRecord>,
        block_valid: bool,
    );
}

/// Events as sent over a channel by `ChannelEvents`
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    JobUpdated(Arc<Job>),
    NewBlock(Arc<Job>),
    ShareResult {
        primary: ShareRecord,
        auxiliary: Option<ShareRecord>,
        block_valid: bool,
    },
}

pub type ManagerEventSender = mpsc::Sender<ManagerEvent>;
pub type ManagerEventReceiver = mpsc::Receiver<ManagerEvent>;

/// Forwards manager events to a bounded channel.
///
/// Events are dropped with an error log when the receiver falls behind.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: ManagerEventSender,
}

impl ChannelEvents {
    pub fn new(capacity: usize) -> (Self, ManagerEventReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, event: ManagerEvent) {
        if let Err(e) = self.tx.try_send(event) {
            error!("Failed to emit manager event: {}", e);
        }
    }
}

impl ManagerEvents for ChannelEvents {
    fn on_job_updated(&self, job: Arc<Job>) {
        self.send(ManagerEvent::JobUpdated(job));
    }

    fn on_new_block(&self, job: Arc<Job>) {
        self.send(ManagerEvent::NewBlock(job));
    }

    fn on_share_result(
        &self,
        primary: ShareRecord,
        auxiliary: Option<ShareRecord>,
        block_valid: bool,
    ) {
        self.send(ManagerEvent::ShareResult {
            primary,
            auxiliary,
            block_valid,
        });
    }
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl ManagerEvents for NoopEvents {
    fn on_job_updated(&self, _job: Arc<Job>) {}

    fn on_new_block(&self, _job: Arc<Job>) {}

    fn on_share_result(&self, _: ShareRecord, _: Option<ShareRecord>, _: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected_record() -> ShareRecord {
        ShareRecord {
            job: "1".to_string(),
            id: "client".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 3002,
            addr_primary: Some("aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj".to_string()),
            addr_auxiliary: None,
            block_diff_primary: None,
            block_type: BlockType::Share,
            coinbase: None,
            difficulty: 1.0,
            hash: None,
            hex: None,
            header: None,
            header_diff: None,
            height: None,
            identifier: "firopool".to_string(),
            reward: None,
            share_diff: None,
            error: Some("job not found".to_string()),
        }
    }

    #[test]
    fn test_share_record_serializes_camel_case() {
        let value = serde_json::to_value(rejected_record()).unwrap();
        assert_eq!(
            value,
            json!({
                "job": "1",
                "id": "client",
                "ip": "127.0.0.1",
                "port": 3002,
                "addrPrimary": "aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj",
                "addrAuxiliary": null,
                "blockType": "share",
                "difficulty": 1.0,
                "identifier": "firopool",
                "error": "job not found"
            })
        );
    }

    #[tokio::test]
    async fn test_channel_events_forwards_share_results() {
        let (events, mut rx) = ChannelEvents::new(4);
        events.on_share_result(rejected_record(), None, false);

        match rx.recv().await {
            Some(ManagerEvent::ShareResult {
                primary,
                auxiliary,
                block_valid,
            }) => {
                assert_eq!(primary, rejected_record());
                assert!(auxiliary.is_none());
                assert!(!block_valid);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_channel_events_drops_when_full() {
        let (events, mut rx) = ChannelEvents::new(1);
        events.on_share_result(rejected_record(), None, false);
        events.on_share_result(rejected_record(), None, true);

        assert!(matches!(
            rx.recv().await,
            Some(ManagerEvent::ShareResult {
                block_valid: false,
                ..
            })
        ));
        assert!(rx.try_recv().is_err());
    }
}
