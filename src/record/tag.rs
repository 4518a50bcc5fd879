/// Key role of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Hash,
    Range,
}

/// Parsed attribute tag: `name? ("," role_or_option)*`.
///
/// Unknown parts are ignored. An empty leading name keeps the derived name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub default: Option<String>,
    pub embed: bool,
    pub version: bool,
}

const DEFAULT_PREFIX: &str = "default=";

impl Tag {
    pub fn parse(raw: &str) -> Tag {
        let mut tag = Tag::default();
        let mut parts = raw.split(',');

        if let Some(name) = parts.next() {
            let name = name.trim();
            if !name.is_empty() {
                tag.name = Some(name.to_string());
            }
        }

        for part in parts {
            let part = part.trim();
            match part {
                "hash" => tag.role = Some(Role::Hash),
                "range" => tag.role = Some(Role::Range),
                "embed" => tag.embed = true,
                "version" => tag.version = true,
                _ => {
                    // An empty literal means no default.
                    if let Some(literal) = part.strip_prefix(DEFAULT_PREFIX) {
                        if !literal.is_empty() {
                            tag.default = Some(literal.to_string());
                        }
                    }
                }
            }
        }

        tag
    }

    pub fn is_key(&self) -> bool {
        self.role.is_some()
    }
}
