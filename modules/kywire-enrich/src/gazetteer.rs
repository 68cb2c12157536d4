//! Kentucky gazetteer: the 120 counties, a city-to-county map for the
//! towns that show up in coverage, and the competing state names used to
//! suppress out-of-state false positives.

/// All 120 Kentucky counties, canonical capitalization.
pub const KY_COUNTIES: &[&str] = &[
    "Adair", "Allen", "Anderson", "Ballard", "Barren", "Bath", "Bell", "Boone",
    "Bourbon", "Boyd", "Boyle", "Bracken", "Breathitt", "Breckinridge", "Bullitt",
    "Butler", "Caldwell", "Calloway", "Campbell", "Carlisle", "Carroll", "Carter",
    "Casey", "Christian", "Clark", "Clay", "Clinton", "Crittenden", "Cumberland",
    "Daviess", "Edmonson", "Elliott", "Estill", "Fayette", "Fleming", "Floyd",
    "Franklin", "Fulton", "Gallatin", "Garrard", "Grant", "Graves", "Grayson",
    "Green", "Greenup", "Hancock", "Hardin", "Harlan", "Harrison", "Hart",
    "Henderson", "Henry", "Hickman", "Hopkins", "Jackson", "Jefferson",
    "Jessamine", "Johnson", "Kenton", "Knott", "Knox", "Larue", "Laurel",
    "Lawrence", "Lee", "Leslie", "Letcher", "Lewis", "Lincoln", "Livingston",
    "Logan", "Lyon", "Madison", "Magoffin", "Marion", "Marshall", "Martin",
    "Mason", "McCracken", "McCreary", "McLean", "Meade", "Menifee", "Mercer",
    "Metcalfe", "Monroe", "Montgomery", "Morgan", "Muhlenberg", "Nelson",
    "Nicholas", "Ohio", "Oldham", "Owen", "Owsley", "Pendleton", "Perry", "Pike",
    "Powell", "Pulaski", "Robertson", "Rockcastle", "Rowan", "Russell", "Scott",
    "Shelby", "Simpson", "Spencer", "Taylor", "Todd", "Trigg", "Trimble", "Union",
    "Warren", "Washington", "Wayne", "Webster", "Whitley", "Wolfe", "Woodford",
];

/// City/town → county. Covers county seats and the larger incorporated
/// places; bare city mentions only count under a Kentucky-context signal,
/// so collisions with out-of-state namesakes (Paris, London, Frankfort…)
/// are handled upstream.
pub const CITY_TO_COUNTY: &[(&str, &str)] = &[
    ("louisville", "Jefferson"),
    ("lexington", "Fayette"),
    ("bowling green", "Warren"),
    ("owensboro", "Daviess"),
    ("covington", "Kenton"),
    ("erlanger", "Kenton"),
    ("independence", "Kenton"),
    ("richmond", "Madison"),
    ("berea", "Madison"),
    ("georgetown", "Scott"),
    ("florence", "Boone"),
    ("burlington", "Boone"),
    ("hopkinsville", "Christian"),
    ("nicholasville", "Jessamine"),
    ("elizabethtown", "Hardin"),
    ("radcliff", "Hardin"),
    ("henderson", "Henderson"),
    ("frankfort", "Franklin"),
    ("paducah", "McCracken"),
    ("ashland", "Boyd"),
    ("madisonville", "Hopkins"),
    ("winchester", "Clark"),
    ("murray", "Calloway"),
    ("danville", "Boyle"),
    ("newport", "Campbell"),
    ("fort thomas", "Campbell"),
    ("alexandria", "Campbell"),
    ("shelbyville", "Shelby"),
    ("glasgow", "Barren"),
    ("bardstown", "Nelson"),
    ("shepherdsville", "Bullitt"),
    ("mount washington", "Bullitt"),
    ("somerset", "Pulaski"),
    ("lawrenceburg", "Anderson"),
    ("campbellsville", "Taylor"),
    ("mayfield", "Graves"),
    ("versailles", "Woodford"),
    ("paris", "Bourbon"),
    ("hazard", "Perry"),
    ("harrodsburg", "Mercer"),
    ("middlesboro", "Bell"),
    ("pineville", "Bell"),
    ("corbin", "Whitley"),
    ("williamsburg", "Whitley"),
    ("london", "Laurel"),
    ("maysville", "Mason"),
    ("morehead", "Rowan"),
    ("franklin", "Simpson"),
    ("grayson", "Carter"),
    ("olive hill", "Carter"),
    ("pikeville", "Pike"),
    ("prestonsburg", "Floyd"),
    ("cynthiana", "Harrison"),
    ("leitchfield", "Grayson"),
    ("princeton", "Caldwell"),
    ("flemingsburg", "Fleming"),
    ("russellville", "Logan"),
    ("benton", "Marshall"),
    ("barbourville", "Knox"),
    ("whitesburg", "Letcher"),
    ("manchester", "Clay"),
    ("jackson", "Breathitt"),
    ("beattyville", "Lee"),
    ("booneville", "Owsley"),
    ("campton", "Wolfe"),
    ("west liberty", "Morgan"),
    ("salyersville", "Magoffin"),
    ("paintsville", "Johnson"),
    ("inez", "Martin"),
    ("hindman", "Knott"),
    ("hyden", "Leslie"),
    ("harlan", "Harlan"),
    ("monticello", "Wayne"),
    ("albany", "Clinton"),
    ("burkesville", "Cumberland"),
    ("columbia", "Adair"),
    ("greensburg", "Green"),
    ("hodgenville", "Larue"),
    ("brandenburg", "Meade"),
    ("hartford", "Ohio"),
    ("beaver dam", "Ohio"),
    ("central city", "Muhlenberg"),
    ("greenville", "Muhlenberg"),
    ("morganfield", "Union"),
    ("marion", "Crittenden"),
    ("eddyville", "Lyon"),
    ("cadiz", "Trigg"),
    ("elkton", "Todd"),
    ("hawesville", "Hancock"),
    ("brownsville", "Edmonson"),
    ("munfordville", "Hart"),
    ("edmonton", "Metcalfe"),
    ("tompkinsville", "Monroe"),
    ("scottsville", "Allen"),
    ("smithland", "Livingston"),
    ("wickliffe", "Ballard"),
    ("bardwell", "Carlisle"),
    ("fulton", "Fulton"),
    ("calhoun", "McLean"),
    ("dixon", "Webster"),
    ("providence", "Webster"),
    ("sturgis", "Union"),
    ("stanton", "Powell"),
    ("stanford", "Lincoln"),
    ("mount sterling", "Montgomery"),
    ("mount vernon", "Rockcastle"),
    ("mt sterling", "Montgomery"),
    ("owenton", "Owen"),
    ("warsaw", "Gallatin"),
    ("carrollton", "Carroll"),
    ("bedford", "Trimble"),
    ("new castle", "Henry"),
    ("la grange", "Oldham"),
    ("taylorsville", "Spencer"),
    ("springfield", "Washington"),
    ("lebanon", "Marion"),
    ("liberty", "Casey"),
    ("russell springs", "Russell"),
    ("jamestown", "Russell"),
    ("greenup", "Greenup"),
    ("flatwoods", "Greenup"),
    ("russell", "Greenup"),
    ("louisa", "Lawrence"),
    ("sandy hook", "Elliott"),
    ("frenchburg", "Menifee"),
    ("owingsville", "Bath"),
    ("carlisle", "Nicholas"),
    ("mount olivet", "Robertson"),
    ("brooksville", "Bracken"),
    ("falmouth", "Pendleton"),
    ("williamstown", "Grant"),
    ("dry ridge", "Grant"),
    ("vanceburg", "Lewis"),
    ("irvine", "Estill"),
    ("mckee", "Jackson"),
    ("whitley city", "McCreary"),
    ("hardinsburg", "Breckinridge"),
    ("morgantown", "Butler"),
    ("clinton", "Hickman"),
    ("hickman", "Fulton"),
    ("lancaster", "Garrard"),
];

/// Competing US state names (Kentucky excluded). A bare hit in the title
/// or leading body without any KY signal suppresses county inference.
pub const OTHER_STATE_NAMES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado",
    "connecticut", "delaware", "florida", "georgia", "hawaii", "idaho",
    "illinois", "indiana", "iowa", "kansas", "louisiana", "maine", "maryland",
    "massachusetts", "michigan", "minnesota", "mississippi", "missouri",
    "montana", "nebraska", "nevada", "new hampshire", "new jersey",
    "new mexico", "new york", "north carolina", "north dakota", "ohio",
    "oklahoma", "oregon", "pennsylvania", "rhode island", "south carolina",
    "south dakota", "tennessee", "texas", "utah", "vermont", "virginia",
    "washington state", "west virginia", "wisconsin", "wyoming",
];

/// Look up the county for a (lowercased) city name.
pub fn county_for_city(city: &str) -> Option<&'static str> {
    CITY_TO_COUNTY
        .iter()
        .find(|(c, _)| *c == city)
        .map(|(_, county)| *county)
}

/// True if `name` is one of the 120 Kentucky counties (case-insensitive).
pub fn is_ky_county(name: &str) -> bool {
    KY_COUNTIES.iter().any(|c| c.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_all_120_counties() {
        assert_eq!(KY_COUNTIES.len(), 120);
    }

    #[test]
    fn counties_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for c in KY_COUNTIES {
            assert!(seen.insert(*c), "duplicate county {c}");
        }
    }

    #[test]
    fn city_lookup() {
        assert_eq!(county_for_city("hazard"), Some("Perry"));
        assert_eq!(county_for_city("louisville"), Some("Jefferson"));
        assert_eq!(county_for_city("gotham"), None);
    }

    #[test]
    fn city_map_counties_are_real() {
        for (city, county) in CITY_TO_COUNTY {
            assert!(is_ky_county(county), "{city} maps to unknown county {county}");
        }
    }

    #[test]
    fn county_check_is_case_insensitive() {
        assert!(is_ky_county("fayette"));
        assert!(is_ky_county("McCracken"));
        assert!(!is_ky_county("Cook"));
    }

    #[test]
    fn kentucky_is_not_a_competing_state() {
        assert!(!OTHER_STATE_NAMES.contains(&"kentucky"));
    }
}
