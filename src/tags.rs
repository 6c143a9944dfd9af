//! Process-wide tag classification tables.
//!
//! All lookups take canonical names: lowercase in HTML mode, as-written in
//! XML mode (where none of these classes apply anyway). The sets are fixed
//! at compile time; there is no registry and no way to extend them.

/// Elements that never have content or an end tag (HTML mode only).
pub fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "menuitem"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose body is consumed verbatim until the matching end tag.
pub fn is_raw_text(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Inline-level content. End tags of these elements may not cross a
/// non-phrasing ancestor, and opening a paragraph breaker implicitly ends
/// any of them left open.
pub fn is_phrasing(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr"
            | "area"
            | "audio"
            | "b"
            | "bdi"
            | "bdo"
            | "br"
            | "button"
            | "canvas"
            | "cite"
            | "code"
            | "data"
            | "datalist"
            | "del"
            | "dfn"
            | "em"
            | "embed"
            | "i"
            | "iframe"
            | "img"
            | "input"
            | "ins"
            | "kbd"
            | "keygen"
            | "label"
            | "link"
            | "map"
            | "mark"
            | "math"
            | "meta"
            | "meter"
            | "noscript"
            | "object"
            | "output"
            | "progress"
            | "q"
            | "ruby"
            | "s"
            | "samp"
            | "script"
            | "select"
            | "small"
            | "span"
            | "strong"
            | "sub"
            | "sup"
            | "svg"
            | "template"
            | "textarea"
            | "time"
            | "u"
            | "var"
            | "video"
            | "wbr"
            // obsolete inline names still seen in the wild
            | "acronym"
            | "applet"
            | "basefont"
            | "big"
            | "font"
            | "strike"
            | "tt"
    )
}

/// Elements whose start tag implicitly ends an open `p`.
pub fn breaks_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "dir"
            | "div"
            | "dl"
            | "fieldset"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

/// Structural table content closed as a group when sections change or the
/// table itself ends.
pub const TABLE_SECTIONS: &[&str] = &["colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"];

pub fn is_table_section(name: &str) -> bool {
    TABLE_SECTIONS.contains(&name)
}
