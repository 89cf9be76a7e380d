//! Laws known to a deployment and how their names map to registry ids.

use serde::{Deserialize, Serialize};

use crate::model::LawCategory;

/// One law in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawEntry {
    /// Registry id, zero-padded ("001823").
    pub id: String,
    pub name: String,
    pub category: LawCategory,
    /// Alternate spellings that resolve to this law.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Name of the parent act, for decrees and rules.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Name → id table plus the primary act/decree pair used when a citation
/// only says "법" or "대통령령".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawCatalog {
    pub laws: Vec<LawEntry>,
    pub primary_act: String,
    pub primary_decree: String,
}

impl Default for LawCatalog {
    fn default() -> Self {
        Self {
            laws: vec![
                LawEntry {
                    id: "001823".into(),
                    name: "건축법".into(),
                    category: LawCategory::Act,
                    aliases: vec![],
                    parent: None,
                },
                LawEntry {
                    id: "002118".into(),
                    name: "건축법 시행령".into(),
                    category: LawCategory::Decree,
                    aliases: vec!["건축법시행령".into()],
                    parent: Some("건축법".into()),
                },
            ],
            primary_act: "001823".into(),
            primary_decree: "002118".into(),
        }
    }
}

impl LawCatalog {
    /// Exact lookup by name or alias.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.laws
            .iter()
            .find(|law| law.name == name || law.aliases.iter().any(|a| a == name))
            .map(|law| law.id.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&LawEntry> {
        let name = name.trim();
        self.laws
            .iter()
            .find(|law| law.name == name || law.aliases.iter().any(|a| a == name))
    }

    /// Parent act cited as "법" from within `law_name`.
    ///
    /// Uses the catalog entry when present, otherwise strips the
    /// "시행령"/"시행규칙" suffix ("건축법 시행령" → "건축법").
    pub fn parent_act_of(&self, law_name: &str) -> String {
        if let Some(parent) = self.entry(law_name).and_then(|e| e.parent.clone()) {
            return parent;
        }
        let stripped = law_name
            .trim()
            .trim_end_matches("시행규칙")
            .trim_end_matches("시행령")
            .trim();
        if stripped.is_empty() {
            law_name.trim().to_string()
        } else {
            stripped.to_string()
        }
    }

    pub fn primary_act_id(&self) -> &str {
        &self.primary_act
    }

    pub fn primary_decree_id(&self) -> &str {
        &self.primary_decree
    }
}
