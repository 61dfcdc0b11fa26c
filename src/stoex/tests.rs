use super::*;
use crate::estimator::{Condition, TreeNode};

#[test]
fn test_format_number() {
    assert_eq!(format_number(2.0), "2.0");
    assert_eq!(format_number(-3.0), "-3.0");
    assert_eq!(format_number(0.25), "0.25");
    assert_eq!(format_number(-0.0), "0.0");
    assert_eq!(format_number(1.234), "1.234");
}

#[test]
fn test_round3_normalizes_negative_zero() {
    assert_eq!(round3(1.23456), 1.235);
    assert_eq!(round3(-0.0001).to_string(), "0");
}

#[test]
fn test_regression_expression_nesting() {
    let terms = vec![
        (1.5, "a_VALUE".to_string()),
        (2.0, "b_VALUE".to_string()),
    ];
    assert_eq!(
        regression_expression(&terms, 3.0),
        "1.5 * a_VALUE + (2.0 * b_VALUE + (3.0))"
    );
}

#[test]
fn test_regression_expression_skips_zero_coefficients() {
    let terms = vec![
        (0.0001, "a_VALUE".to_string()),
        (2.0, "size_VALUE".to_string()),
    ];
    assert_eq!(
        regression_expression(&terms, 0.5),
        "2.0 * size_VALUE + (0.5)"
    );
    assert_eq!(regression_expression(&[], 4.0), "4.0");
}

#[test]
fn test_tree_expression_walk() {
    let root = TreeNode::Split {
        condition: Condition::LessOrEqual {
            index: 0,
            attribute: "n_VALUE".to_string(),
            threshold: 2.5,
        },
        then_branch: Box::new(TreeNode::Leaf {
            counts: vec![3.0, 1.0],
        }),
        else_branch: Box::new(TreeNode::Split {
            condition: Condition::Equals {
                index: 1,
                attribute: "s_VALUE".to_string(),
                level: "x".to_string(),
            },
            then_branch: Box::new(TreeNode::Leaf {
                counts: vec![0.0, 2.0],
            }),
            else_branch: Box::new(TreeNode::Leaf {
                counts: vec![2.0, 0.0],
            }),
            then_weight: 2.0,
            else_weight: 2.0,
        }),
        then_weight: 4.0,
        else_weight: 4.0,
    };
    let labels = vec!["a".to_string(), "b".to_string()];

    assert_eq!(
        tree_expression(&root, &labels),
        "((n_VALUE <= 2.5) ? a : ((s_VALUE == \"x\") ? b : a))"
    );
    assert_eq!(
        tree_probability_expression(&root, &labels, "b"),
        "((n_VALUE <= 2.5) ? 0.25 : ((s_VALUE == \"x\") ? 1.0 : 0.0))"
    );
}

#[test]
fn test_leaf_probabilities_sum_to_one() {
    let root = TreeNode::Leaf {
        counts: vec![2.0, 2.0, 2.0],
    };
    let labels = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
    let texts: Vec<String> = labels
        .iter()
        .map(|l| tree_probability_expression(&root, &labels, l))
        .collect();
    assert_eq!(texts, vec!["0.334", "0.333", "0.333"]);

    let thousandths: u32 = texts
        .iter()
        .map(|t| (t.parse::<f64>().unwrap() * 1000.0).round() as u32)
        .sum();
    assert_eq!(thousandths, 1000);
}

#[test]
fn test_single_leaf_tree_is_label() {
    let root = TreeNode::Leaf {
        counts: vec![0.0, 5.0],
    };
    let labels = vec!["t1".to_string(), "t2".to_string()];
    assert_eq!(tree_expression(&root, &labels), "t2");
}

#[test]
fn test_underscores_to_dots() {
    assert_eq!(
        replace_underscores_with_dots("2.0 * size_VALUE + (1.0 * s_BYTESIZE + (l_NUMBER_OF_ELEMENTS))"),
        "2.0 * size.VALUE + (1.0 * s.BYTESIZE + (l.NUMBER_OF_ELEMENTS))"
    );
    // only whole suffixes are rewritten
    assert_eq!(replace_underscores_with_dots("a_VALUES"), "a_VALUES");
}

#[test]
fn test_fraction_to_pmf() {
    assert_eq!(
        replace_fractions_with_pmf("2.3"),
        "IntPMF[(2;0.70)(3;0.30)]"
    );
    assert_eq!(
        replace_fractions_with_pmf("2.0 * size_VALUE + (0.5)"),
        "2 * size_VALUE + (IntPMF[(0;0.50)(1;0.50)])"
    );
}

#[test]
fn test_fraction_rewrite_skips_identifiers_and_strings() {
    assert_eq!(
        replace_fractions_with_pmf("v1.5_VALUE + 1.25"),
        "v1.5_VALUE + IntPMF[(1;0.75)(2;0.25)]"
    );
    assert_eq!(
        replace_fractions_with_pmf("((m_VALUE == \"1.5\") ? 2.0 : 3.0)"),
        "((m_VALUE == \"1.5\") ? 2 : 3)"
    );
}

#[test]
fn test_negative_fraction_keeps_sign() {
    assert_eq!(
        replace_fractions_with_pmf("-1.5 * x_VALUE + (4.0)"),
        "-IntPMF[(1;0.50)(2;0.50)] * x_VALUE + (4)"
    );
}
