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

//! Node readiness as reported by the API server.

use k8s_openapi::api::core::v1::Node;

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReadiness {
    Ready,
    NotReady,
    Unknown,
}

impl NodeReadiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeReadiness::Ready => "Ready",
            NodeReadiness::NotReady => "NotReady",
            NodeReadiness::Unknown => "Unknown",
        }
    }
}

/// The columns shown for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub name: String,
    pub readiness: NodeReadiness,
    pub roles: Vec<String>,
    pub version: String,
    pub internal_ip: Option<String>,
}

impl NodeSummary {
    pub fn from_node(node: &Node) -> Self {
        let name = node.metadata.name.clone().unwrap_or_default();

        let mut roles: Vec<String> = node
            .metadata
            .labels
            .iter()
            .flatten()
            .filter_map(|(key, _)| key.strip_prefix(ROLE_LABEL_PREFIX))
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();
        roles.sort();

        let status = node.status.as_ref();

        let readiness = status
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
            .map(|c| match c.status.as_str() {
                "True" => NodeReadiness::Ready,
                "False" => NodeReadiness::NotReady,
                _ => NodeReadiness::Unknown,
            })
            .unwrap_or(NodeReadiness::Unknown);

        let version = status
            .and_then(|s| s.node_info.as_ref())
            .map(|info| info.kubelet_version.clone())
            .unwrap_or_default();

        let internal_ip = status
            .and_then(|s| s.addresses.as_ref())
            .and_then(|addrs| addrs.iter().find(|a| a.type_ == "InternalIP"))
            .map(|a| a.address.clone());

        Self {
            name,
            readiness,
            roles,
            version,
            internal_ip,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == NodeReadiness::Ready
    }

    pub fn roles_display(&self) -> String {
        if self.roles.is_empty() {
            "<none>".to_string()
        } else {
            self.roles.join(",")
        }
    }
}

/// At least one node, and every node Ready.
pub fn all_ready(nodes: &[NodeSummary]) -> bool {
    !nodes.is_empty() && nodes.iter().all(NodeSummary::is_ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeAddress, NodeCondition, NodeStatus, NodeSystemInfo};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn node(name: &str, ready: &str, labels: &[&str]) -> Node {
        let labels: BTreeMap<String, String> = labels
            .iter()
            .map(|l| (l.to_string(), "true".to_string()))
            .collect();

        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                addresses: Some(vec![
                    NodeAddress {
                        type_: "Hostname".to_string(),
                        address: name.to_string(),
                    },
                    NodeAddress {
                        type_: "InternalIP".to_string(),
                        address: "10.0.0.5".to_string(),
                    },
                ]),
                node_info: Some(NodeSystemInfo {
                    kubelet_version: "v1.30.4+k3s1".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_from_server_node() {
        let summary = NodeSummary::from_node(&node(
            "server-1",
            "True",
            &[
                "node-role.kubernetes.io/master",
                "node-role.kubernetes.io/control-plane",
                "kubernetes.io/os",
            ],
        ));

        assert_eq!(summary.name, "server-1");
        assert!(summary.is_ready());
        assert_eq!(summary.roles_display(), "control-plane,master");
        assert_eq!(summary.version, "v1.30.4+k3s1");
        assert_eq!(summary.internal_ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_agent_without_roles() {
        let summary = NodeSummary::from_node(&node("agent-1", "False", &[]));
        assert_eq!(summary.readiness, NodeReadiness::NotReady);
        assert_eq!(summary.roles_display(), "<none>");
    }

    #[test]
    fn test_node_without_status_is_unknown() {
        let summary = NodeSummary::from_node(&Node::default());
        assert_eq!(summary.readiness, NodeReadiness::Unknown);
        assert_eq!(summary.internal_ip, None);
    }

    #[test]
    fn test_all_ready() {
        let ready = NodeSummary::from_node(&node("a", "True", &[]));
        let not_ready = NodeSummary::from_node(&node("b", "Unknown", &[]));

        assert!(!all_ready(&[]));
        assert!(all_ready(&[ready.clone()]));
        assert!(!all_ready(&[ready, not_ready]));
    }
}
