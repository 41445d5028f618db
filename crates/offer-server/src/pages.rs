use offer_core::table::DisplayTable;
use offer_core::util::escape_html;

const INDEX: &str = include_str!("../templates/index.html");
const NO_DATA: &str = include_str!("../templates/no_data.html");
const MAIN: &str = include_str!("../templates/main.html");

/// Landing page with the `customer_id` form.
pub fn index() -> &'static str {
    INDEX
}

/// "Nothing found" page echoing the submitted id.
pub fn no_data(display: &str) -> String {
    NO_DATA.replace("{{ display }}", &escape_html(display))
}

/// Results page embedding each table's HTML.
pub fn results(tables: &[DisplayTable]) -> String {
    let html: Vec<String> = tables.iter().map(|t| t.to_html(&["data"])).collect();
    MAIN.replace("{{ tables }}", &html.join("\n"))
}
