//! Result parsing over canned execute responses.

use prism::cache::{CacheScope, LevelEntry, MemberCache};
use prism::mdx::{Dialect, MdxBuilder};
use prism::model::{Cube, CubeType, Dimension, Level, Member, Value};
use prism::query::{CubeQuery, DimensionRef, MeasureRef};
use prism::result::Cell;
use prism::xmla::parser::ResultParser;
use prism::xmla::{CancelToken, XmlaError};

fn sales_cube(cube_type: CubeType) -> Cube {
    let mut cube = Cube::new("Sales");
    cube.cube_type = cube_type;
    let mut region = Dimension::new("Region", "[Region]");
    region.push_level(Level::new("Country", "[Region].[Country]"));
    region.push_level(Level::new("State", "[Region].[State]"));
    region.push_level(Level::new("City", "[Region].[City]"));
    cube.dimensions.push(region);
    cube
}

fn two_level_query() -> CubeQuery {
    let mut q = CubeQuery::new("ds", "Sales");
    q.dimensions
        .push(DimensionRef::new("[Region]", "[Region].[Country]", 0));
    q.dimensions
        .push(DimensionRef::new("[Region]", "[Region].[State]", 1));
    q.measures
        .push(MeasureRef::new("Amount", "[Measures].[Amount]"));
    q
}

fn member_xml(unique: &str, caption: &str, lname: &str, lnum: i32, parent: Option<&str>) -> String {
    let parent = parent
        .map(|p| format!("<PARENT_UNIQUE_NAME>{p}</PARENT_UNIQUE_NAME>"))
        .unwrap_or_default();
    format!(
        "<Member Hierarchy=\"Region\"><UName>{unique}</UName>\
         <Caption>{caption}</Caption><LName>{lname}</LName>\
         <LNum>{lnum}</LNum>{parent}</Member>"
    )
}

fn leaf_only_response() -> String {
    format!(
        "<root><Axes><Axis name=\"Axis0\"><Tuples>\
         <Tuple>{ny}</Tuple><Tuple>{ca}</Tuple>\
         </Tuples></Axis>\
         <Axis name=\"Axis1\"><Tuples><Tuple>\
         <Member Hierarchy=\"Measures\"><UName>[Measures].[Amount]</UName>\
         <Caption>Amount</Caption><LName>[Measures]</LName><LNum>0</LNum></Member>\
         </Tuple></Tuples></Axis></Axes>\
         <CellData>\
         <Cell CellOrdinal=\"0\"><Value xsi:type=\"xsd:double\">250.5</Value></Cell>\
         <Cell CellOrdinal=\"1\"><Value xsi:type=\"xsd:double\">-INF</Value></Cell>\
         </CellData></root>",
        ny = member_xml("[Region].[State].[NY]", "NY", "[Region].[State]", 1, None),
        ca = member_xml(
            "[Region].[State].[CA]",
            "CA",
            "[Region].[State]",
            1,
            Some("[Region].[Country].[USA]")
        ),
    )
}

fn seeded_cache(scope: &CacheScope) -> MemberCache {
    let cache = MemberCache::open_in_memory().unwrap();

    let mut countries = LevelEntry::new("[Region].[Country]", 0);
    countries
        .members
        .push(Member::new("[Region].[Country].[USA]", "USA"));
    countries.members[0].level_number = 0;
    cache
        .put(&scope.key("[Region].[Country]"), countries)
        .unwrap();

    let mut states = LevelEntry::new("[Region].[State]", 1);
    let mut ny = Member::new("[Region].[State].[NY]", "NY");
    ny.level_number = 1;
    ny.parent_unique_name = Some("[Region].[Country].[USA]".to_string());
    states.members.push(ny);
    cache.put(&scope.key("[Region].[State]"), states).unwrap();

    cache
}

#[test]
fn ancestor_columns_resolve_from_cache_without_roundtrips() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::SqlServer);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);

    // no client exists here at all: resolution is cache-only
    let parser = ResultParser::new(&query, &statement, &cube, Some((&cache, scope)));
    let parsed = parser
        .parse(&leaf_only_response(), &CancelToken::new())
        .unwrap();

    let table = parsed.table;
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Country", "State", "Amount"]);
    assert_eq!(table.rows.len(), 2);

    // NY row: parent pointer was absent in the response and got
    // reconstructed from NY's own cached level entry
    match table.cell(0, 0).unwrap() {
        Cell::Member(m) => assert_eq!(m.caption, "USA"),
        other => panic!("expected member, got {:?}", other),
    }
    match table.cell(0, 1).unwrap() {
        Cell::Member(m) => assert_eq!(m.caption, "NY"),
        other => panic!("expected member, got {:?}", other),
    }
    // CA row: parent pointer came with the response
    match table.cell(1, 0).unwrap() {
        Cell::Member(m) => assert_eq!(m.unique_name, "[Region].[Country].[USA]"),
        other => panic!("expected member, got {:?}", other),
    }

    // cell coercion: declared double, and -INF collapses to null
    assert_eq!(table.cell(0, 2), Some(&Cell::Value(Value::Float(250.5))));
    assert_eq!(table.cell(1, 2), Some(&Cell::Value(Value::Null)));
}

#[test]
fn harvested_levels_cover_delivered_members() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::SqlServer);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();
    let scope = CacheScope::new("ds", "Sales");
    let cache = seeded_cache(&scope);

    let parser = ResultParser::new(&query, &statement, &cube, Some((&cache, scope)));
    let parsed = parser
        .parse(&leaf_only_response(), &CancelToken::new())
        .unwrap();

    assert_eq!(parsed.levels.len(), 1);
    assert_eq!(parsed.levels[0].level_unique_name, "[Region].[State]");
    assert_eq!(parsed.levels[0].members.len(), 2);
}

#[test]
fn chain_delivering_vendor_never_consults_cache() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::Mondrian);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();

    // tuples carry the full ancestor chain; no cache is supplied
    let body = format!(
        "<root><Axes><Axis name=\"Axis0\"><Tuples><Tuple>{usa}{ny}</Tuple>\
         </Tuples></Axis></Axes><CellData>\
         <Cell CellOrdinal=\"0\"><Value xsi:type=\"xsd:int\">7</Value></Cell>\
         </CellData></root>",
        usa = member_xml("[Region].[Country].[USA]", "USA", "[Region].[Country]", 0, None),
        ny = member_xml("[Region].[State].[NY]", "NY", "[Region].[State]", 1, None),
    );

    let parser = ResultParser::new(&query, &statement, &cube, None);
    let table = parser.parse(&body, &CancelToken::new()).unwrap().table;

    match table.cell(0, 0).unwrap() {
        Cell::Member(m) => assert_eq!(m.caption, "USA"),
        other => panic!("expected member, got {:?}", other),
    }
    assert_eq!(table.cell(0, 2), Some(&Cell::Value(Value::Int(7))));
}

#[test]
fn unresolvable_ancestor_is_null_not_error() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::SqlServer);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();

    // leaf-only response, no cache: the ancestor column stays empty
    let parser = ResultParser::new(&query, &statement, &cube, None);
    let table = parser
        .parse(&leaf_only_response(), &CancelToken::new())
        .unwrap()
        .table;
    assert_eq!(table.cell(0, 0), Some(&Cell::Value(Value::Null)));
    match table.cell(0, 1).unwrap() {
        Cell::Member(m) => assert_eq!(m.caption, "NY"),
        other => panic!("expected member, got {:?}", other),
    }
}

#[test]
fn qualified_caption_vendor() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::Essbase);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();

    let parser = ResultParser::new(&query, &statement, &cube, None);
    let table = parser
        .parse(&leaf_only_response(), &CancelToken::new())
        .unwrap()
        .table;

    match table.cell(0, 1).unwrap() {
        Cell::Member(m) => {
            assert_eq!(m.caption, "NY");
            assert_eq!(m.full_caption, "State.NY");
        }
        other => panic!("expected member, got {:?}", other),
    }
}

#[test]
fn cancellation_mid_stream_raises_cancelled() {
    let query = two_level_query();
    let cube = sales_cube(CubeType::SqlServer);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();

    let token = CancelToken::new();
    token.cancel();

    let parser = ResultParser::new(&query, &statement, &cube, None);
    let result = parser.parse(&leaf_only_response(), &token);
    assert!(matches!(result, Err(XmlaError::Cancelled)));
}

#[test]
fn measures_only_response_yields_single_row() {
    let mut query = CubeQuery::new("ds", "Sales");
    query
        .measures
        .push(MeasureRef::new("Amount", "[Measures].[Amount]"));
    let cube = sales_cube(CubeType::SqlServer);
    let statement = MdxBuilder::new(&query, Dialect::Base).build().unwrap();

    let body = "<root><Axes><Axis name=\"Axis0\"><Tuples><Tuple>\
         <Member Hierarchy=\"Measures\"><UName>[Measures].[Amount]</UName>\
         <Caption>Amount</Caption><LName>[Measures]</LName><LNum>0</LNum></Member>\
         </Tuple></Tuples></Axis></Axes><CellData>\
         <Cell CellOrdinal=\"0\"><Value xsi:type=\"xsd:double\">99.5</Value></Cell>\
         </CellData></root>";

    let parser = ResultParser::new(&query, &statement, &cube, None);
    let table = parser.parse(body, &CancelToken::new()).unwrap().table;
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.cell(0, 0), Some(&Cell::Value(Value::Float(99.5))));
}
