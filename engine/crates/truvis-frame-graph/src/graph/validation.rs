//! 读写声明的校验
//!
//! 执行顺序始终是注册顺序。这里只根据 setup 填充的令牌构建依赖图，报告注册顺序与数据流不一致的地方，
//! 从不调整顺序。

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use petgraph::graph::{DiGraph, NodeIndex};
use slotmap::Key;

use crate::pass::pass_id::RgPassId;
use crate::pass::render_pass::RgPassAccess;
use crate::resource::handle::RgResourceHandle;

/// 校验发现的问题
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgValidationIssue {
    /// 同一帧内有多个 pass 写同一个资源
    MultipleWriters {
        resource: RgResourceHandle,
        writers: Vec<RgPassId>,
    },
    /// reader 注册在 writer 之前，会读到上一帧的内容
    ReadBeforeWrite {
        resource: RgResourceHandle,
        reader: RgPassId,
        writer: RgPassId,
    },
    /// 依赖成环
    Cycle { passes: Vec<RgPassId> },
}

impl fmt::Display for RgValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleWriters { resource, writers } => {
                write!(f, "{resource:?} is written by {}", writers.iter().join(", "))
            }
            Self::ReadBeforeWrite {
                resource,
                reader,
                writer,
            } => write!(f, "{reader} reads {resource:?} before {writer} writes it"),
            Self::Cycle { passes } => write!(f, "dependency cycle: {}", passes.iter().join(" -> ")),
        }
    }
}

/// 一帧的依赖分析结果
pub struct RgValidationReport {
    /// 节点为 pass，边为 writer -> reader，权重为资源
    graph: DiGraph<RgPassId, RgResourceHandle>,
    issues: Vec<RgValidationIssue>,
}

impl RgValidationReport {
    /// 按注册顺序分析各 pass 的令牌
    pub fn analyze<'a>(passes: impl IntoIterator<Item = &'a RgPassAccess>) -> Self {
        let _span = tracy_client::span!("RgValidationReport::analyze");
        let passes = passes.into_iter().collect_vec();

        let mut graph = DiGraph::with_capacity(passes.len(), 0);
        let nodes = passes.iter().map(|p| graph.add_node(p.id())).collect_vec();

        // 资源 -> 按注册顺序排列的 writer / reader 下标
        let mut writers: HashMap<RgResourceHandle, Vec<usize>> = HashMap::new();
        let mut readers: HashMap<RgResourceHandle, Vec<usize>> = HashMap::new();
        for (index, pass) in passes.iter().enumerate() {
            for handle in pass.write_token().accessible_handles() {
                writers.entry(*handle).or_default().push(index);
            }
            for handle in pass.read_token().accessible_handles() {
                readers.entry(*handle).or_default().push(index);
            }
        }

        // 按首个 writer 排序，同一 writer 的资源按句柄排序，保证报告顺序稳定
        let mut issues = Vec::new();
        for (&resource, resource_writers) in writers.iter().sorted_by_key(|&(h, w)| (w[0], h.data().as_ffi())) {
            if resource_writers.len() > 1 {
                issues.push(RgValidationIssue::MultipleWriters {
                    resource,
                    writers: resource_writers.iter().map(|&i| passes[i].id()).collect(),
                });
            }

            let Some(resource_readers) = readers.get(&resource) else {
                continue;
            };
            for &writer in resource_writers {
                for &reader in resource_readers.iter().filter(|&&r| r != writer) {
                    graph.update_edge(nodes[writer], nodes[reader], resource);
                    if reader < writer {
                        issues.push(RgValidationIssue::ReadBeforeWrite {
                            resource,
                            reader: passes[reader].id(),
                            writer: passes[writer].id(),
                        });
                    }
                }
            }
        }

        for scc in petgraph::algo::tarjan_scc(&graph) {
            if scc.len() > 1 {
                let mut scc: Vec<NodeIndex> = scc;
                scc.sort();
                issues.push(RgValidationIssue::Cycle {
                    passes: scc.into_iter().map(|n| graph[n]).collect(),
                });
            }
        }

        Self { graph, issues }
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    #[inline]
    pub fn issues(&self) -> &[RgValidationIssue] {
        &self.issues
    }

    /// 数据流推导出的顺序，仅用于调试；成环时返回 `None`
    pub fn dependency_order(&self) -> Option<Vec<RgPassId>> {
        petgraph::algo::toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|n| self.graph[n]).collect())
    }

    /// 直接依赖（写入了 `pass` 所读资源的 pass）
    pub fn producers_of(&self, pass: RgPassId) -> Vec<RgPassId> {
        let Some(node) = self.graph.node_indices().find(|&n| self.graph[n] == pass) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(|n| self.graph[n])
            .sorted_by_key(|id| id.name())
            .collect()
    }

    /// 把所有问题打印为 warning
    pub fn log_issues(&self) {
        for issue in &self.issues {
            log::warn!("render graph validation: {issue}");
        }
    }
}
