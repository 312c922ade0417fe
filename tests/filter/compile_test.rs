//! Condition-list compilation properties.

use std::collections::HashMap;

use prism::filter::{build_filter_tree, CompareOp, FilterItem, FilterLeaf, FilterNode, Relation};

fn cmp(dim: &str, value: &str, level: i32) -> FilterItem {
    FilterItem::Comparison(
        FilterLeaf::new(
            format!("[{dim}]"),
            format!("[{dim}].[L]"),
            0,
            CompareOp::Eq,
            vec![value.to_string()],
        )
        .at_level(level),
    )
}

fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(d, v)| (format!("[{d}]"), v.to_string()))
        .collect()
}

/// Direct evaluation of an alternating item list with AND binding
/// tighter than OR, the reference the tree must match.
fn direct_eval(items: &[FilterItem], row: &HashMap<String, String>) -> bool {
    // split on OR at the outermost level, AND within each run
    let mut or_result = false;
    let mut and_result = true;
    for item in items {
        match item {
            FilterItem::Comparison(leaf) => {
                let matched = row
                    .get(&leaf.dimension)
                    .is_some_and(|v| leaf.matches(v));
                and_result = and_result && matched;
            }
            FilterItem::Junction { relation, .. } => {
                if *relation == Relation::Or {
                    or_result = or_result || and_result;
                    and_result = true;
                }
            }
        }
    }
    or_result || and_result
}

fn leaf_count(items: &[FilterItem]) -> usize {
    items
        .iter()
        .filter(|i| matches!(i, FilterItem::Comparison(_)))
        .count()
}

#[test]
fn leaf_count_equals_comparison_count() {
    let lists = vec![
        vec![cmp("A", "1", 1)],
        vec![cmp("A", "1", 1), FilterItem::and(1), cmp("B", "2", 1)],
        vec![
            cmp("A", "1", 1),
            FilterItem::and(1),
            cmp("B", "2", 1),
            FilterItem::or(1),
            cmp("C", "3", 1),
            FilterItem::and(1),
            cmp("D", "4", 1),
        ],
        vec![
            cmp("A", "1", 1),
            FilterItem::or(1),
            cmp("B", "2", 2),
            FilterItem::and(2),
            cmp("C", "3", 2),
            FilterItem::or(1),
            cmp("D", "4", 1),
        ],
    ];

    for items in lists {
        let n = leaf_count(&items);
        let tree = build_filter_tree(items).unwrap();
        assert_eq!(tree.leaves().len(), n);
    }
}

#[test]
fn evaluation_matches_direct_boolean_evaluation() {
    // a AND b OR c AND d, one precedence level
    let items = vec![
        cmp("A", "1", 1),
        FilterItem::and(1),
        cmp("B", "2", 1),
        FilterItem::or(1),
        cmp("C", "3", 1),
        FilterItem::and(1),
        cmp("D", "4", 1),
    ];
    let tree = build_filter_tree(items.clone()).unwrap();

    let samples = vec![
        row(&[("A", "1"), ("B", "2"), ("C", "0"), ("D", "0")]),
        row(&[("A", "1"), ("B", "0"), ("C", "3"), ("D", "4")]),
        row(&[("A", "0"), ("B", "0"), ("C", "3"), ("D", "0")]),
        row(&[("A", "0"), ("B", "0"), ("C", "0"), ("D", "0")]),
        row(&[("A", "1"), ("B", "2"), ("C", "3"), ("D", "4")]),
    ];
    for sample in &samples {
        assert_eq!(
            tree.evaluate(sample),
            direct_eval(&items, sample),
            "mismatch on row {:?}",
            sample
        );
    }
}

#[test]
fn or_run_of_three() {
    let items = vec![
        cmp("A", "1", 1),
        FilterItem::or(1),
        cmp("B", "2", 1),
        FilterItem::or(1),
        cmp("C", "3", 1),
    ];
    let tree = build_filter_tree(items.clone()).unwrap();

    for sample in [
        row(&[("A", "1"), ("B", "0"), ("C", "0")]),
        row(&[("A", "0"), ("B", "2"), ("C", "0")]),
        row(&[("A", "0"), ("B", "0"), ("C", "3")]),
        row(&[("A", "0"), ("B", "0"), ("C", "0")]),
    ] {
        assert_eq!(tree.evaluate(&sample), direct_eval(&items, &sample));
    }
}

#[test]
fn nested_level_grouping() {
    // A AND (B OR C): the parenthesized group sits one level deeper
    let items = vec![
        cmp("A", "1", 1),
        FilterItem::and(1),
        cmp("B", "2", 2),
        FilterItem::or(2),
        cmp("C", "3", 2),
    ];
    let tree = build_filter_tree(items).unwrap();

    assert!(tree.evaluate(&row(&[("A", "1"), ("B", "0"), ("C", "3")])));
    assert!(tree.evaluate(&row(&[("A", "1"), ("B", "2"), ("C", "0")])));
    assert!(!tree.evaluate(&row(&[("A", "0"), ("B", "2"), ("C", "3")])));
    assert!(!tree.evaluate(&row(&[("A", "1"), ("B", "0"), ("C", "0")])));
}

#[test]
fn promoted_group_joins_outer_comparison() {
    // (A OR B) AND C
    let items = vec![
        cmp("A", "1", 2),
        FilterItem::or(2),
        cmp("B", "2", 2),
        FilterItem::and(1),
        cmp("C", "3", 1),
    ];
    let tree = build_filter_tree(items).unwrap();

    assert!(tree.evaluate(&row(&[("A", "1"), ("B", "0"), ("C", "3")])));
    assert!(tree.evaluate(&row(&[("A", "0"), ("B", "2"), ("C", "3")])));
    assert!(!tree.evaluate(&row(&[("A", "1"), ("B", "2"), ("C", "0")])));
}

#[test]
fn every_branch_has_two_children() {
    fn check(node: &FilterNode) {
        if let FilterNode::Branch { left, right, .. } = node {
            check(left);
            check(right);
        }
    }
    let tree = build_filter_tree(vec![
        cmp("A", "1", 1),
        FilterItem::and(1),
        cmp("B", "2", 1),
        FilterItem::or(1),
        cmp("C", "3", 1),
    ])
    .unwrap();
    check(&tree);
}
