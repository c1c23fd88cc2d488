use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

fn doctype_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?is)\A\x{FEFF}?(?:\s|<!--.*?-->)*(<!DOCTYPE(?:\s+([^\s>]+))?(?:\s+PUBLIC\s*(?:"([^"]*)"|'([^']*)'))?(?:\s+(?:SYSTEM\s*)?(?:"([^"]*)"|'([^']*)'))?[^>]*>)"#,
        )
        .expect("invalid doctype regex")
    })
}

/// Document type declaration of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype {
    /// Lowercased root element name.
    pub name: String,
    /// Public identifier, empty when absent.
    pub public_id: String,
    /// System identifier, empty when absent.
    pub system_id: String,
}

impl Default for Doctype {
    fn default() -> Self {
        Self {
            name: "html".into(),
            public_id: String::new(),
            system_id: String::new(),
        }
    }
}

impl Doctype {
    /// Locate the declaration at the start of a document, returning it with its byte span.
    ///
    /// Only whitespace and comments may precede the declaration.
    pub fn find(html: &str) -> Option<(Self, Range<usize>)> {
        let captures = doctype_pattern().captures(html)?;
        let declaration = captures.get(1)?;
        let group = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let name = group(2).to_ascii_lowercase();
        let public_id = captures
            .get(3)
            .or_else(|| captures.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let system_id = if captures.get(5).is_some() {
            group(5)
        } else {
            group(6)
        };

        let doctype = Self {
            name: if name.is_empty() { "html".into() } else { name },
            public_id,
            system_id,
        };
        Some((doctype, declaration.range()))
    }

    /// Render the declaration the way a DOM serializer writes it.
    pub fn render(&self) -> String {
        let mut rendered = format!("<!DOCTYPE {}", self.name);
        if !self.public_id.is_empty() {
            rendered.push_str(&format!(" PUBLIC \"{}\"", self.public_id));
        }
        if !self.system_id.is_empty() {
            if self.public_id.is_empty() {
                rendered.push_str(" SYSTEM");
            }
            rendered.push_str(&format!(" \"{}\"", self.system_id));
        }
        rendered.push('>');
        rendered
    }
}
