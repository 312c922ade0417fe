//! Metadata discovery.
//!
//! Parses Tabular discover responses (`<row><COL>value</COL>...</row>`)
//! and assembles the metadata model from the MDSCHEMA rowsets:
//! catalogs, cubes, dimensions, hierarchies, levels, measures, and
//! members. An `<Error>` element with a non-empty description anywhere
//! in a discover response fails the request immediately.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cache::LevelEntry;
use crate::model::{
    Cube, CubeType, DataType, Dimension, DimensionKind, Level, Measure, Member,
};

use super::client::XmlaClient;
use super::{XmlaError, XmlaResult};

/// Schema rowset request types.
pub const DBSCHEMA_CATALOGS: &str = "DBSCHEMA_CATALOGS";
pub const MDSCHEMA_CUBES: &str = "MDSCHEMA_CUBES";
pub const MDSCHEMA_DIMENSIONS: &str = "MDSCHEMA_DIMENSIONS";
pub const MDSCHEMA_HIERARCHIES: &str = "MDSCHEMA_HIERARCHIES";
pub const MDSCHEMA_LEVELS: &str = "MDSCHEMA_LEVELS";
pub const MDSCHEMA_MEASURES: &str = "MDSCHEMA_MEASURES";
pub const MDSCHEMA_MEMBERS: &str = "MDSCHEMA_MEMBERS";

/// Parse a Tabular discover response into rows of column/value pairs.
pub fn parse_rowset(body: &str) -> XmlaResult<Vec<HashMap<String, String>>> {
    let mut reader = Reader::from_reader(body.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    let mut current: Option<HashMap<String, String>> = None;
    let mut current_col: Option<String> = None;
    let mut text = String::new();
    let mut in_error = false;
    let mut error_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(e.local_name());
                if name == "Error" {
                    if let Some(desc) = error_description(&e)? {
                        return Err(XmlaError::Server(desc));
                    }
                    in_error = true;
                } else if in_error && name == "Description" {
                    error_text.clear();
                    current_col = Some(name);
                    text.clear();
                } else if name == "row" {
                    current = Some(HashMap::new());
                } else if current.is_some() {
                    current_col = Some(name);
                    text.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.local_name());
                if name == "Error" {
                    if let Some(desc) = error_description(&e)? {
                        return Err(XmlaError::Server(desc));
                    }
                } else if let Some(row) = current.as_mut() {
                    row.insert(name, String::new());
                }
            }
            Ok(Event::Text(t)) if current_col.is_some() => {
                let piece = t
                    .unescape()
                    .map_err(|e| XmlaError::Malformed(e.to_string()))?;
                text.push_str(&piece);
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.local_name());
                if name == "Error" {
                    if in_error && !error_text.is_empty() {
                        return Err(XmlaError::Server(error_text));
                    }
                    in_error = false;
                } else if name == "row" {
                    if let Some(row) = current.take() {
                        rows.push(row);
                    }
                    current_col = None;
                } else if current_col.as_deref() == Some(name.as_str()) {
                    if in_error && name == "Description" {
                        error_text = text.clone();
                    } else if let Some(row) = current.as_mut() {
                        row.insert(name, text.clone());
                    }
                    current_col = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XmlaError::Malformed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn local_name(name: quick_xml::name::LocalName) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn error_description(e: &BytesStart) -> XmlaResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlaError::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == b"Description" {
            let value = attr
                .unescape_value()
                .map_err(|e| XmlaError::Malformed(e.to_string()))?
                .into_owned();
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

/// Map an OLE DB type code (MDSCHEMA DATA_TYPE column) to a data type.
fn data_type_from_dbtype(code: &str) -> DataType {
    match code.parse::<i32>().unwrap_or(130) {
        2 | 3 | 16 | 17 | 18 | 19 | 20 | 21 => DataType::Int,
        4 | 5 => DataType::Float,
        6 | 14 | 131 => DataType::Decimal,
        11 => DataType::Bool,
        7 | 133 | 134 | 135 => DataType::Date,
        _ => DataType::String,
    }
}

/// Date pattern for a time level, from the MDSCHEMA LEVEL_TYPE code.
fn as_date_from_level_type(code: &str) -> Option<String> {
    match code.parse::<i32>().unwrap_or(0) {
        20 => Some("yyyy".to_string()),
        68 => Some("yyyy 'Q'q".to_string()),
        132 => Some("yyyy-MM".to_string()),
        260 => Some("yyyy-'W'ww".to_string()),
        516 => Some("yyyy-MM-dd".to_string()),
        _ => None,
    }
}

fn dimension_kind(type_code: &str) -> DimensionKind {
    match type_code.parse::<i32>().unwrap_or(3) {
        1 => DimensionKind::Time,
        2 => DimensionKind::Measure,
        _ => DimensionKind::Regular,
    }
}

fn get<'a>(row: &'a HashMap<String, String>, col: &str) -> &'a str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Assembles the metadata model from discovery calls.
pub struct Discovery<'a> {
    client: &'a XmlaClient,
    cube_type: CubeType,
}

impl<'a> Discovery<'a> {
    pub fn new(client: &'a XmlaClient, cube_type: CubeType) -> Self {
        Self { client, cube_type }
    }

    /// List catalog names.
    pub fn catalogs(&self) -> XmlaResult<Vec<String>> {
        let rows = self.client.discover(DBSCHEMA_CATALOGS, &[])?;
        Ok(rows
            .iter()
            .map(|r| get(r, "CATALOG_NAME").to_string())
            .filter(|n| !n.is_empty())
            .collect())
    }

    /// Discover every cube in the client's catalog, fully assembled
    /// with dimensions, hierarchies, levels, and measures.
    pub fn cubes(&self) -> XmlaResult<Vec<Cube>> {
        let rows = self.client.discover(MDSCHEMA_CUBES, &[])?;
        let mut cubes = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = get(row, "CUBE_NAME");
            if name.is_empty() {
                continue;
            }
            let mut cube = Cube::new(name);
            let caption = get(row, "CUBE_CAPTION");
            if !caption.is_empty() {
                cube.caption = caption.to_string();
            }
            cube.catalog = get(row, "CATALOG_NAME").to_string();
            cube.cube_type = self.cube_type;
            cube.dimensions = self.dimensions(name)?;
            cube.measures = self.measures(name)?;
            cubes.push(cube);
        }
        Ok(cubes)
    }

    /// Discover a cube's dimensions, scoped to hierarchies where a
    /// dimension exposes more than one.
    fn dimensions(&self, cube_name: &str) -> XmlaResult<Vec<Dimension>> {
        let restriction = [("CUBE_NAME", cube_name)];

        // Base dimension rows: name/caption/kind by unique name.
        let dim_rows = self.client.discover(MDSCHEMA_DIMENSIONS, &restriction)?;
        let mut base: HashMap<String, (String, String, DimensionKind)> = HashMap::new();
        for row in &dim_rows {
            let unique = get(row, "DIMENSION_UNIQUE_NAME");
            if unique.is_empty() {
                continue;
            }
            base.insert(
                unique.to_string(),
                (
                    get(row, "DIMENSION_NAME").to_string(),
                    get(row, "DIMENSION_CAPTION").to_string(),
                    dimension_kind(get(row, "DIMENSION_TYPE")),
                ),
            );
        }

        let hier_rows = self.client.discover(MDSCHEMA_HIERARCHIES, &restriction)?;
        let mut hier_count: HashMap<&str, usize> = HashMap::new();
        for row in &hier_rows {
            *hier_count.entry(get(row, "DIMENSION_UNIQUE_NAME")).or_insert(0) += 1;
        }

        let mut dimensions = Vec::new();
        for row in &hier_rows {
            let dim_unique = get(row, "DIMENSION_UNIQUE_NAME");
            let (name, caption, kind) = match base.get(dim_unique) {
                Some(b) => b.clone(),
                None => (
                    get(row, "HIERARCHY_NAME").to_string(),
                    get(row, "HIERARCHY_CAPTION").to_string(),
                    DimensionKind::Regular,
                ),
            };
            // The synthetic measures dimension is not a query axis.
            if kind == DimensionKind::Measure {
                continue;
            }

            let mut dim = Dimension::new(name, dim_unique);
            if !caption.is_empty() {
                dim.caption = caption;
            }
            dim.kind = kind;
            if hier_count.get(dim_unique).copied().unwrap_or(0) > 1 {
                dim.hierarchy_name = Some(get(row, "HIERARCHY_NAME").to_string());
                dim.hierarchy_unique_name =
                    Some(get(row, "HIERARCHY_UNIQUE_NAME").to_string());
                dim.hierarchy_caption = Some(get(row, "HIERARCHY_CAPTION").to_string());
            }
            dimensions.push(dim);
        }

        self.attach_levels(cube_name, &mut dimensions)?;
        Ok(dimensions)
    }

    /// Attach MDSCHEMA_LEVELS rows to their owning dimensions, ordered
    /// by depth.
    fn attach_levels(&self, cube_name: &str, dimensions: &mut [Dimension]) -> XmlaResult<()> {
        let mut rows = self
            .client
            .discover(MDSCHEMA_LEVELS, &[("CUBE_NAME", cube_name)])?;
        rows.sort_by_key(|r| get(r, "LEVEL_NUMBER").parse::<i32>().unwrap_or(0));

        for row in &rows {
            let hierarchy = get(row, "HIERARCHY_UNIQUE_NAME");
            let Some(dim) = dimensions.iter_mut().find(|d| {
                d.hierarchy_unique_name.as_deref() == Some(hierarchy)
                    || (d.hierarchy_unique_name.is_none() && d.unique_name == hierarchy)
            }) else {
                continue;
            };

            let mut level = Level::new(
                get(row, "LEVEL_NAME"),
                get(row, "LEVEL_UNIQUE_NAME"),
            );
            let caption = get(row, "LEVEL_CAPTION");
            if !caption.is_empty() {
                level.caption = caption.to_string();
            }
            if dim.kind == DimensionKind::Time {
                level.as_date = as_date_from_level_type(get(row, "LEVEL_TYPE"));
            }
            dim.push_level(level);
        }
        Ok(())
    }

    fn measures(&self, cube_name: &str) -> XmlaResult<Vec<Measure>> {
        let rows = self
            .client
            .discover(MDSCHEMA_MEASURES, &[("CUBE_NAME", cube_name)])?;
        let mut measures = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = get(row, "MEASURE_NAME");
            if name.is_empty() {
                continue;
            }
            let mut measure = Measure::new(name, get(row, "MEASURE_UNIQUE_NAME"));
            let caption = get(row, "MEASURE_CAPTION");
            if !caption.is_empty() {
                measure.caption = caption.to_string();
            }
            measure.data_type = data_type_from_dbtype(get(row, "DATA_TYPE"));
            let folder = get(row, "MEASURE_DISPLAY_FOLDER");
            if !folder.is_empty() {
                measure.folder = Some(folder.to_string());
            }
            measures.push(measure);
        }
        Ok(measures)
    }

    /// Fetch one level's member list, ready for the cache.
    ///
    /// The caption fix-up pass runs here, immediately after parsing:
    /// full captions are qualified against parents found in the same
    /// rowset.
    pub fn members(&self, cube_name: &str, level: &Level) -> XmlaResult<LevelEntry> {
        let rows = self.client.discover(
            MDSCHEMA_MEMBERS,
            &[
                ("CUBE_NAME", cube_name),
                ("LEVEL_UNIQUE_NAME", level.unique_name.as_str()),
            ],
        )?;

        let mut entry = LevelEntry::new(level.unique_name.clone(), level.number);
        for row in &rows {
            let unique = get(row, "MEMBER_UNIQUE_NAME");
            if unique.is_empty() {
                continue;
            }
            let mut member = Member::new(unique, get(row, "MEMBER_CAPTION"));
            member.hierarchy = get(row, "HIERARCHY_UNIQUE_NAME").to_string();
            member.level_unique_name = get(row, "LEVEL_UNIQUE_NAME").to_string();
            member.level_number = get(row, "LEVEL_NUMBER").parse().unwrap_or(level.number);
            let parent = get(row, "PARENT_UNIQUE_NAME");
            if !parent.is_empty() {
                member.parent_unique_name = Some(parent.to_string());
            }
            member.parent_level_number =
                get(row, "PARENT_LEVEL").parse().unwrap_or(member.level_number - 1);
            entry.members.push(member);
        }
        Ok(entry)
    }
}
