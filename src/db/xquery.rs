//! XQuery wrapper for ModelInterface queries.
//!
//! Both engines evaluate the same XQuery: the ModelInterface `runMIQuery`
//! function applied to a query definition, a scenario filter and a region
//! filter. An empty filter sequence means "all".

use crate::query::Query;

const MODULE_IMPORT: &str =
    "import module namespace mi = 'ModelInterface.ModelGUI2.xmldb.RunMIQuery';";

/// Builds the XQuery that runs `query` against the given scenarios.
pub fn build_xquery(query: &Query, scenarios: &[String]) -> String {
    format!(
        "{}\nmi:runMIQuery({}, {}, {})",
        MODULE_IMPORT,
        query.definition(),
        string_sequence(scenarios),
        string_sequence(query.regions()),
    )
}

/// Renders `("a", "b")`, escaping quotes and ampersands for XQuery string literals.
fn string_sequence(values: &[String]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('&', "&amp;").replace('"', "\"\"")))
        .collect();
    format!("({})", items.join(", "))
}
