//! Named groups, statistical aggregates, and dialect differences in
//! the compiled statement.

use prism::mdx::{Dialect, MdxBuilder};
use prism::query::{
    AggregateFormula, CalcMeasure, CubeQuery, DimensionRef, GroupSpec, MeasureAggregate,
    MeasureRef, NamedGroup,
};

fn grouped_query() -> CubeQuery {
    let mut q = CubeQuery::new("sales-ds", "Sales");
    q.dimensions
        .push(DimensionRef::new("[Region]", "[Region].[State]", 1));
    q.measures
        .push(MeasureRef::new("Amount", "[Measures].[Amount]"));
    q.groups = Some(GroupSpec {
        named_groups: vec![NamedGroup {
            name: "Coasts".to_string(),
            dimension: "[Region]".to_string(),
            level_unique_name: "[Region].[State]".to_string(),
            members: vec!["NY".to_string(), "CA".to_string()],
        }],
        aggregates: vec![],
        calc_measures: vec![],
    });
    q
}

#[test]
fn group_emits_three_named_sets_and_calculated_member() {
    let q = grouped_query();
    let stmt = MdxBuilder::new(&q, Dialect::Extended).build().unwrap();

    assert!(stmt.text.starts_with("WITH "));
    assert!(stmt
        .text
        .contains("SET [Coasts Members] AS '{[Region].[State].[NY], [Region].[State].[CA]}'"));
    assert!(stmt.text.contains(
        "SET [Coasts Children] AS 'Generate([Coasts Members], \
         {[Region].CurrentMember.Children})'"
    ));
    assert!(stmt.text.contains(
        "SET [Coasts Filtered] AS 'Filter([Coasts Children], \
         NOT IsEmpty([Measures].CurrentMember))'"
    ));
    assert!(stmt.text.contains(
        "MEMBER [Region].[Coasts] AS 'IIF(Count([Coasts Filtered]) = 0, NULL, \
         Aggregate([Coasts Children], [Measures].CurrentMember))'"
    ));
}

#[test]
fn grouped_members_are_woven_with_iif_chains() {
    let q = grouped_query();
    let stmt = MdxBuilder::new(&q, Dialect::Extended).build().unwrap();

    assert!(stmt.text.contains(
        "Generate({[Region].[State].members}, \
         IIF([Region].CurrentMember IS [Region].[State].[NY], {[Region].[Coasts]}, \
         IIF([Region].CurrentMember IS [Region].[State].[CA], {[Region].[Coasts]}, \
         {[Region].CurrentMember})))"
    ));
}

#[test]
fn base_dialect_ignores_groups() {
    let q = grouped_query();
    let stmt = MdxBuilder::new(&q, Dialect::Base).build().unwrap();
    assert!(!stmt.text.contains("WITH"));
    assert!(!stmt.text.contains("Coasts"));
}

#[test]
fn sql2000_wraps_named_set_references() {
    let q = grouped_query();
    let stmt = MdxBuilder::new(&q, Dialect::Sql2000).build().unwrap();

    // definitions still declare plain names, references are wrapped
    assert!(stmt.text.contains("SET [Coasts Members] AS"));
    assert!(stmt.text.contains(
        "Generate(StrToSet(SetToStr([Coasts Members])), {[Region].CurrentMember.Children})"
    ));
    assert!(stmt
        .text
        .contains("IIF(Count(StrToSet(SetToStr([Coasts Filtered]))) = 0"));
}

#[test]
fn statistical_aggregate_replaces_measure() {
    let mut q = grouped_query();
    q.groups.as_mut().unwrap().aggregates.push(MeasureAggregate {
        measure: "[Measures].[Amount]".to_string(),
        formula: AggregateFormula::Sum,
    });

    let stmt = MdxBuilder::new(&q, Dialect::Extended).build().unwrap();
    assert!(stmt.text.contains(
        "MEMBER [Measures].[Amount Sum] AS \
         'Aggregate([Region].CurrentMember.Children, [Measures].[Amount])'"
    ));
    assert!(stmt.text.contains("{[Measures].[Amount Sum]} ON ROWS"));
    assert_eq!(stmt.measure_names, vec!["Amount Sum"]);
}

#[test]
fn running_total_uses_current_tuple() {
    let mut q = grouped_query();
    q.groups.as_mut().unwrap().aggregates.push(MeasureAggregate {
        measure: "[Measures].[Amount]".to_string(),
        formula: AggregateFormula::RunningTotal,
    });

    let stmt = MdxBuilder::new(&q, Dialect::Extended).build().unwrap();
    assert!(stmt
        .text
        .contains("Rank(([Region].CurrentMember), [Region].CurrentMember.Children)"));
}

#[test]
fn calculated_measure_expression_is_emitted_verbatim() {
    let mut q = grouped_query();
    q.groups.as_mut().unwrap().calc_measures.push(CalcMeasure {
        name: "Margin".to_string(),
        expression: "[Measures].[Profit] / [Measures].[Amount]".to_string(),
    });

    let stmt = MdxBuilder::new(&q, Dialect::Extended).build().unwrap();
    assert!(stmt.text.contains(
        "MEMBER [Measures].[Margin] AS '[Measures].[Profit] / [Measures].[Amount]'"
    ));
    assert_eq!(stmt.measure_names, vec!["Amount", "Margin"]);
    assert_eq!(stmt.measure_indexes, vec![0, 1]);
}

#[test]
fn group_on_unselected_dimension_is_rejected() {
    let mut q = grouped_query();
    q.groups.as_mut().unwrap().named_groups[0].dimension = "[Time]".to_string();
    assert!(MdxBuilder::new(&q, Dialect::Extended).build().is_err());
}
