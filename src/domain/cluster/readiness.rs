// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::nodes::{all_ready, NodeSummary};
use crate::infrastructure::kubernetes::NodeLister;
use crate::shared::error::{K3supError, Result};
use backon::{BackoffBuilder, ConstantBuilder};
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of polling the node list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready(Vec<NodeSummary>),
    /// Attempts ran out. Holds the last node list seen, if any call worked.
    TimedOut(Option<Vec<NodeSummary>>),
}

/// Poll `lister` until at least one node exists and all of them are Ready,
/// making at most `attempts` calls spaced `pause` apart. API errors count as
/// a failed attempt; only the last one is reported.
pub async fn wait_for_ready(
    lister: &dyn NodeLister,
    attempts: usize,
    pause: Duration,
) -> Result<Readiness> {
    if attempts == 0 {
        return Err(K3supError::validation("attempts must be at least 1"));
    }

    let mut delays = ConstantBuilder::default()
        .with_delay(pause)
        .with_max_times(attempts - 1)
        .build();

    let mut last_seen = None;
    let mut last_error: Option<K3supError>;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match lister.list_nodes().await {
            Ok(nodes) => {
                let summaries: Vec<NodeSummary> =
                    nodes.iter().map(NodeSummary::from_node).collect();
                let ready = summaries.iter().filter(|n| n.is_ready()).count();
                debug!(
                    "Attempt {}/{}: {}/{} nodes ready",
                    attempt,
                    attempts,
                    ready,
                    summaries.len()
                );
                if all_ready(&summaries) {
                    info!("All {} nodes ready after {} attempts", summaries.len(), attempt);
                    return Ok(Readiness::Ready(summaries));
                }
                last_seen = Some(summaries);
                last_error = None;
            }
            Err(e) => {
                debug!("Attempt {}/{}: {}", attempt, attempts, e);
                last_error = Some(e);
            }
        }

        match delays.next() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => break,
        }
    }

    match (last_seen, last_error) {
        (None, Some(e)) => Err(e),
        (seen, _) => Ok(Readiness::TimedOut(seen)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports NotReady until the given call number, Ready from then on.
    struct ScriptedLister {
        calls: AtomicUsize,
        ready_from: usize,
        fail_until: usize,
    }

    impl ScriptedLister {
        fn new(ready_from: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                ready_from,
                fail_until: 0,
            }
        }
    }

    fn node(ready: bool) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("server-1".to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[async_trait::async_trait]
    impl NodeLister for ScriptedLister {
        async fn list_nodes(&self) -> Result<Vec<Node>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_until {
                return Err(K3supError::Kube("connection refused".to_string()));
            }
            Ok(vec![node(call >= self.ready_from)])
        }
    }

    #[tokio::test]
    async fn test_ready_after_a_few_attempts() {
        let lister = ScriptedLister::new(3);
        let outcome = wait_for_ready(&lister, 5, Duration::ZERO).await.unwrap();

        assert!(matches!(outcome, Readiness::Ready(ref nodes) if nodes.len() == 1));
        assert_eq!(lister.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_with_last_seen_nodes() {
        let lister = ScriptedLister::new(usize::MAX);
        let outcome = wait_for_ready(&lister, 4, Duration::ZERO).await.unwrap();

        match outcome {
            Readiness::TimedOut(Some(nodes)) => assert!(!nodes[0].is_ready()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(lister.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_api_errors_are_retried() {
        let lister = ScriptedLister {
            calls: AtomicUsize::new(0),
            ready_from: 1,
            fail_until: 2,
        };
        let outcome = wait_for_ready(&lister, 3, Duration::ZERO).await.unwrap();
        assert!(matches!(outcome, Readiness::Ready(_)));
    }

    #[tokio::test]
    async fn test_only_errors_returns_last_error() {
        let lister = ScriptedLister {
            calls: AtomicUsize::new(0),
            ready_from: 1,
            fail_until: usize::MAX,
        };
        let err = wait_for_ready(&lister, 2, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, K3supError::Kube(_)));
    }

    #[tokio::test]
    async fn test_single_attempt_reports_its_outcome() {
        let failing = ScriptedLister {
            calls: AtomicUsize::new(0),
            ready_from: 1,
            fail_until: 1,
        };
        let err = wait_for_ready(&failing, 1, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, K3supError::Kube(_)));

        let not_ready = ScriptedLister::new(2);
        let outcome = wait_for_ready(&not_ready, 1, Duration::ZERO).await.unwrap();
        assert!(matches!(outcome, Readiness::TimedOut(Some(_))));
        assert_eq!(not_ready.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let lister = ScriptedLister::new(1);
        assert!(wait_for_ready(&lister, 0, Duration::ZERO).await.is_err());
    }
}
