//! Reshapes a flat parameter list into request and response trees.
//!
//! # Design
//! Parameters are partitioned by category first, so a tree never mixes
//! request and response fields. Within a category, children are collected
//! per parent in input order, then nodes are assembled bottom-up from an
//! explicit DFS preorder, so building never recurses. `ParameterNode` drops
//! its subtree iteratively as well; comparing, cloning or serializing a tree
//! still walks it recursively. Every record that does not end up under a root is reported as a
//! `DetachedParameter` instead of vanishing.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{DetachReason, DetachedParameter, ParamCategory, Parameter, ParameterNode};

/// Roots of one category plus the records that could not be attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterForest {
    pub roots: Vec<ParameterNode>,
    pub detached: Vec<DetachedParameter>,
}

/// Output of `build_parameter_trees`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTrees {
    pub request: ParameterForest,
    pub response: ParameterForest,
    /// Records whose category is neither request nor response.
    pub excluded: Vec<Parameter>,
}

impl ParameterTrees {
    /// Detached records of both categories, request side first.
    pub fn detached(&self) -> impl Iterator<Item = &DetachedParameter> {
        self.request.detached.iter().chain(self.response.detached.iter())
    }
}

/// Split `params` by category and build one forest per category.
///
/// Root and child order follow input order; the `order` field is not
/// consulted.
pub fn build_parameter_trees(params: &[Parameter]) -> ParameterTrees {
    let mut request = Vec::new();
    let mut response = Vec::new();
    let mut excluded = Vec::new();

    for param in params {
        match param.param_type {
            ParamCategory::Request => request.push(param),
            ParamCategory::Response => response.push(param),
            ParamCategory::Unknown => excluded.push(param.clone()),
        }
    }

    if !excluded.is_empty() {
        debug!(count = excluded.len(), "excluding parameters with unknown category");
    }

    ParameterTrees {
        request: build_forest(&request),
        response: build_forest(&response),
        excluded,
    }
}

/// Build a forest from parameters that all share one category.
pub fn build_forest(bucket: &[&Parameter]) -> ParameterForest {
    let mut index_of: HashMap<u32, usize> = HashMap::with_capacity(bucket.len());
    let mut duplicates = vec![false; bucket.len()];
    for (idx, param) in bucket.iter().enumerate() {
        if index_of.contains_key(&param.id) {
            duplicates[idx] = true;
        } else {
            index_of.insert(param.id, idx);
        }
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); bucket.len()];
    let mut missing_parent: Vec<Option<u32>> = vec![None; bucket.len()];

    for (idx, param) in bucket.iter().enumerate() {
        if duplicates[idx] {
            continue;
        }
        match param.parent_id {
            None => roots.push(idx),
            Some(parent_id) => match index_of.get(&parent_id) {
                Some(&parent) => children[parent].push(idx),
                None => missing_parent[idx] = Some(parent_id),
            },
        }
    }

    // Preorder walk from the roots. A node already visited is never entered
    // twice, which keeps malformed parent links from looping.
    let mut visited = vec![false; bucket.len()];
    let mut preorder = Vec::with_capacity(bucket.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        if visited[idx] {
            debug!(id = bucket[idx].id, "skipping revisited parameter");
            continue;
        }
        visited[idx] = true;
        preorder.push(idx);
        stack.extend(children[idx].iter().rev().copied());
    }

    // Children follow their parent in preorder, so walking it backwards
    // finishes every child before its parent is built.
    let mut built: Vec<Option<ParameterNode>> = vec![None; bucket.len()];
    for &idx in preorder.iter().rev() {
        let kids = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(ParameterNode {
            parameter: bucket[idx].clone(),
            children: kids,
        });
    }

    let roots = roots
        .iter()
        .filter_map(|&idx| built[idx].take())
        .collect();

    let detached: Vec<DetachedParameter> = bucket
        .iter()
        .enumerate()
        .filter(|&(idx, _)| !visited[idx])
        .map(|(idx, param)| {
            let reason = if duplicates[idx] {
                DetachReason::DuplicateId
            } else if let Some(parent_id) = missing_parent[idx] {
                DetachReason::MissingParent { parent_id }
            } else {
                DetachReason::Unreachable {
                    parent_id: param.parent_id.unwrap_or_default(),
                }
            };
            DetachedParameter {
                parameter: (*param).clone(),
                reason,
            }
        })
        .collect();

    if !detached.is_empty() {
        debug!(count = detached.len(), "parameters left out of tree");
    }

    ParameterForest { roots, detached }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    fn param(id: u32, parent_id: Option<u32>, category: ParamCategory) -> Parameter {
        Parameter {
            id,
            api_id: 1,
            name: format!("p{id}"),
            value_type: ValueType::String,
            required: false,
            description: None,
            param_type: category,
            parent_id,
            order: id as i32,
        }
    }

    fn req(id: u32, parent_id: Option<u32>) -> Parameter {
        param(id, parent_id, ParamCategory::Request)
    }

    fn res(id: u32, parent_id: Option<u32>) -> Parameter {
        param(id, parent_id, ParamCategory::Response)
    }

    /// Collect `(id, child ids)` shape for compact assertions.
    fn shape(nodes: &[ParameterNode]) -> Vec<(u32, Vec<(u32, usize)>)> {
        nodes
            .iter()
            .map(|n| {
                (
                    n.parameter.id,
                    n.children
                        .iter()
                        .map(|c| (c.parameter.id, c.children.len()))
                        .collect(),
                )
            })
            .collect()
    }

    fn all_ids(nodes: &[ParameterNode], out: &mut Vec<u32>) {
        for node in nodes {
            out.push(node.parameter.id);
            all_ids(&node.children, out);
        }
    }

    #[test]
    fn dangling_parent_is_dropped() {
        let trees = build_parameter_trees(&[req(1, None), req(2, Some(1)), req(3, Some(99))]);

        assert_eq!(shape(&trees.request.roots), vec![(1, vec![(2, 0)])]);
        assert!(trees.response.roots.is_empty());
        assert_eq!(trees.request.detached.len(), 1);
        assert_eq!(trees.request.detached[0].parameter.id, 3);
        assert_eq!(
            trees.request.detached[0].reason,
            DetachReason::MissingParent { parent_id: 99 }
        );
    }

    #[test]
    fn categories_never_mix() {
        // 3 points at a request parent but is a response parameter.
        let trees = build_parameter_trees(&[req(1, None), res(2, None), res(3, Some(1)), req(4, Some(1))]);

        assert_eq!(shape(&trees.request.roots), vec![(1, vec![(4, 0)])]);
        assert_eq!(shape(&trees.response.roots), vec![(2, vec![])]);
        assert_eq!(
            trees.response.detached[0].reason,
            DetachReason::MissingParent { parent_id: 1 }
        );
    }

    #[test]
    fn order_follows_input_not_order_field() {
        let mut a = req(10, None);
        a.order = 5;
        let mut b = req(11, None);
        b.order = 1;
        let trees = build_parameter_trees(&[a, b, req(12, Some(10)), req(13, Some(10))]);

        let roots: Vec<u32> = trees.request.roots.iter().map(|n| n.parameter.id).collect();
        assert_eq!(roots, vec![10, 11]);
        let kids: Vec<u32> = trees.request.roots[0]
            .children
            .iter()
            .map(|n| n.parameter.id)
            .collect();
        assert_eq!(kids, vec![12, 13]);
    }

    #[test]
    fn child_listed_before_parent_is_still_attached() {
        let trees = build_parameter_trees(&[req(2, Some(1)), req(1, None)]);
        assert_eq!(shape(&trees.request.roots), vec![(1, vec![(2, 0)])]);
        assert!(trees.request.detached.is_empty());
    }

    #[test]
    fn descendants_of_orphans_are_unreachable() {
        let trees = build_parameter_trees(&[req(1, None), req(5, Some(50)), req(6, Some(5))]);

        assert_eq!(trees.request.roots.len(), 1);
        let reasons: Vec<_> = trees.request.detached.iter().map(|d| (d.parameter.id, d.reason.clone())).collect();
        assert_eq!(
            reasons,
            vec![
                (5, DetachReason::MissingParent { parent_id: 50 }),
                (6, DetachReason::Unreachable { parent_id: 5 }),
            ]
        );
    }

    #[test]
    fn parent_cycles_terminate_and_are_detached() {
        let trees = build_parameter_trees(&[req(1, None), req(2, Some(3)), req(3, Some(2)), req(4, Some(4))]);

        assert_eq!(shape(&trees.request.roots), vec![(1, vec![])]);
        let ids: Vec<u32> = trees.request.detached.iter().map(|d| d.parameter.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(trees
            .request
            .detached
            .iter()
            .all(|d| matches!(d.reason, DetachReason::Unreachable { .. })));
    }

    #[test]
    fn duplicate_ids_keep_the_first_record() {
        let mut dup = req(1, None);
        dup.name = "shadow".to_string();
        let trees = build_parameter_trees(&[req(1, None), dup, req(2, Some(1))]);

        assert_eq!(shape(&trees.request.roots), vec![(1, vec![(2, 0)])]);
        assert_eq!(trees.request.roots[0].parameter.name, "p1");
        assert_eq!(trees.request.detached[0].reason, DetachReason::DuplicateId);
    }

    #[test]
    fn unknown_categories_are_excluded() {
        let trees = build_parameter_trees(&[req(1, None), param(2, None, ParamCategory::Unknown)]);
        assert_eq!(trees.request.roots.len(), 1);
        assert!(trees.response.roots.is_empty());
        assert_eq!(trees.excluded.len(), 1);
        assert_eq!(trees.excluded[0].id, 2);
    }

    #[test]
    fn every_node_appears_exactly_once() {
        let input = vec![
            req(1, None),
            req(2, Some(1)),
            req(3, Some(2)),
            req(4, Some(1)),
            res(5, None),
            res(6, Some(5)),
            req(7, None),
            res(8, Some(6)),
        ];
        let trees = build_parameter_trees(&input);

        let mut request_ids = Vec::new();
        all_ids(&trees.request.roots, &mut request_ids);
        let mut response_ids = Vec::new();
        all_ids(&trees.response.roots, &mut response_ids);

        request_ids.sort_unstable();
        response_ids.sort_unstable();
        assert_eq!(request_ids, vec![1, 2, 3, 4, 7]);
        assert_eq!(response_ids, vec![5, 6, 8]);
        assert_eq!(trees.detached().count(), 0);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 100_000u32;
        let mut input = vec![req(0, None)];
        input.extend((1..depth).map(|id| req(id, Some(id - 1))));

        let trees = build_parameter_trees(&input);
        assert_eq!(trees.request.roots.len(), 1);

        let mut level = 0;
        let mut node = &trees.request.roots[0];
        while let Some(child) = node.children.first() {
            node = child;
            level += 1;
        }
        assert_eq!(level, depth - 1);

        drop(trees);
    }

    #[test]
    fn building_twice_is_identical() {
        let input = vec![req(1, None), req(2, Some(1)), res(3, None), req(4, Some(9))];
        assert_eq!(build_parameter_trees(&input), build_parameter_trees(&input));
    }
}
