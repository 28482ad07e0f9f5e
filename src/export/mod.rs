/// Output artifacts built from GeoCSV tracks and R2R cruise records.
///
/// * `geojson`      – FeatureCollection with one LineString per track
/// * `keyframes`    – `<cruise_id>_keyframes.asset`, a timeline of positions
/// * `cruise_asset` – `<cruise_id>.asset`, the scene nodes using those keyframes

pub mod cruise_asset;
pub mod geojson;
pub mod keyframes;

// -- Lua literal helpers --

/// Format a number the way the asset files expect: integral values keep a
/// trailing `.0` so they read as floats.
pub(crate) fn lua_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Double-quoted Lua string literal.
pub(crate) fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Text that is safe inside a `[[ ... ]]` long bracket.
pub(crate) fn lua_long_text(s: &str) -> String {
    s.replace("]]", "] ]")
}
