//! Compiled statement text.

use prism::filter::{build_filter_tree, CompareOp, FilterItem, FilterLeaf};
use prism::mdx::{Dialect, MdxBuilder};
use prism::query::{CubeQuery, DimensionRef, MeasureRef};

fn comparison(dim: &str, level: &str, number: i32, value: &str) -> FilterItem {
    FilterItem::Comparison(
        FilterLeaf::new(
            dim,
            level,
            number,
            CompareOp::Eq,
            vec![value.to_string()],
        )
        .at_level(1),
    )
}

fn sales_query() -> CubeQuery {
    let mut q = CubeQuery::new("sales-ds", "Sales");
    q.dimensions
        .push(DimensionRef::new("[Region]", "[Region].[State]", 1));
    q.measures
        .push(MeasureRef::new("Amount", "[Measures].[Amount]"));
    q
}

#[test]
fn same_dimension_or_compiles_to_union() {
    let mut q = sales_query();
    q.filter = build_filter_tree(vec![
        comparison("[Region]", "[Region].[State]", 1, "East"),
        FilterItem::or(1),
        comparison("[Region]", "[Region].[State]", 1, "West"),
    ]);

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    insta::assert_snapshot!(
        stmt.text,
        @"SELECT Union({[Region].[State].[East]}, {[Region].[State].[West]}) ON COLUMNS, {[Measures].[Amount]} ON ROWS FROM [Sales]"
    );
}

#[test]
fn cross_dimension_and_stays_per_dimension() {
    let mut q = sales_query();
    q.dimensions
        .push(DimensionRef::new("[Category]", "[Category].[Name]", 0));
    q.filter = build_filter_tree(vec![
        comparison("[Region]", "[Region].[State]", 1, "East"),
        FilterItem::and(1),
        comparison("[Category]", "[Category].[Name]", 0, "Tech"),
    ]);

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    // two independent per-dimension sets crossjoined, no Intersect
    insta::assert_snapshot!(
        stmt.text,
        @"SELECT CrossJoin({[Region].[State].[East]}, {[Category].[Name].[Tech]}) ON COLUMNS, {[Measures].[Amount]} ON ROWS FROM [Sales]"
    );
    assert!(!stmt.text.contains("Intersect"));
}

#[test]
fn same_dimension_and_compiles_to_intersect() {
    let mut q = sales_query();
    q.filter = build_filter_tree(vec![
        comparison("[Region]", "[Region].[State]", 1, "East"),
        FilterItem::and(1),
        FilterItem::Comparison(
            FilterLeaf::new(
                "[Region]",
                "[Region].[State]",
                1,
                CompareOp::Ne,
                vec!["West".to_string()],
            )
            .at_level(1),
        ),
    ]);

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(stmt.text.contains(
        "Intersect({[Region].[State].[East]}, \
         Except({[Region].[State].members}, {[Region].[State].[West]}))"
    ));
}

#[test]
fn ancestor_level_filter_uses_rank() {
    let mut q = sales_query();
    q.filter = build_filter_tree(vec![comparison(
        "[Region]",
        "[Region].[Country]",
        0,
        "USA",
    )]);

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    insta::assert_snapshot!(
        stmt.text,
        @"SELECT Filter({[Region].[State].members}, Rank(Ancestor([Region].CurrentMember, 1), {[Region].[Country].[USA]}) > 0) ON COLUMNS, {[Measures].[Amount]} ON ROWS FROM [Sales]"
    );
}

#[test]
fn descendant_level_filter_uses_descendants() {
    let mut q = sales_query();
    q.filter = build_filter_tree(vec![comparison(
        "[Region]",
        "[Region].[City]",
        2,
        "Albany",
    )]);

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(stmt.text.contains("Descendants([Region].CurrentMember, 1)"));
    assert!(stmt.text.contains("Intersect"));
}

#[test]
fn multiple_levels_of_one_dimension_share_one_axis_set() {
    let mut q = sales_query();
    // Country is an ancestor column; only State reaches the axis
    q.dimensions.insert(
        0,
        DimensionRef::new("[Region]", "[Region].[Country]", 0),
    );

    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(!stmt.text.contains("CrossJoin"));
    assert!(stmt.text.contains("{[Region].[State].members}"));
    assert!(!stmt.text.contains("{[Region].[Country].members}"));
}

#[test]
fn expanded_paths_are_excluded() {
    let mut q = sales_query();
    q.expanded_paths.insert(
        "[Region]".to_string(),
        vec!["[Region].[State].[NY]".to_string()],
    );
    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(stmt
        .text
        .contains("Except({[Region].[State].members}, {[Region].[State].[NY]})"));

    // re-running with the same expansion state compiles the same text
    let again = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert_eq!(stmt.text, again.text);
}

#[test]
fn slicer_members_land_in_where() {
    let mut q = sales_query();
    q.slicer.push("[Time].[Year].[2024]".to_string());
    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(stmt.text.ends_with("WHERE ([Time].[Year].[2024])"));
}
