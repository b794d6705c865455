use std::collections::BTreeMap;

use serde::Deserialize;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

const LANG_PREFIXES: [&str; 2] = ["lang/", "minecraft/lang/"];

/// Top-level asset index JSON structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetObject {
    pub fn url(&self) -> String {
        let prefix = self.hash.get(..2).unwrap_or(&self.hash);
        format!("{}/{}/{}", RESOURCES_URL, prefix, self.hash)
    }
}

impl AssetIndex {
    /// Language objects keyed by bare file name (`de_de.json`).
    pub fn language_objects(&self) -> BTreeMap<String, &AssetObject> {
        let mut out = BTreeMap::new();
        for (key, object) in &self.objects {
            let Some(name) = LANG_PREFIXES.iter().find_map(|p| key.strip_prefix(p)) else {
                continue;
            };
            if name.is_empty() || name.contains('/') {
                continue;
            }
            out.entry(name.to_string()).or_insert(object);
        }
        out
    }
}
