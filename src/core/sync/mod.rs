// ─── CI Sync ───
// Walks every version an edition publishes, processes the missing ones oldest
// first and commits each as it lands.

pub mod driver;
pub mod git;
pub mod output;

use std::fmt;

pub use driver::{
    BedrockEdition, Driver, EditionPipeline, JavaEdition, SyncFailure, SyncOptions, SyncSummary,
};
pub use git::{Committer, GitCommitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edition {
    Java,
    Bedrock,
}

impl Edition {
    pub fn display_name(self) -> &'static str {
        match self {
            Edition::Java => "Minecraft: Java Edition",
            Edition::Bedrock => "Minecraft: Bedrock Edition",
        }
    }

    /// Variable naming the file CI output is appended to.
    pub fn output_env(self) -> &'static str {
        match self {
            Edition::Java => "JAVA_EDITION",
            Edition::Bedrock => "BEDROCK_EDITION",
        }
    }

    pub fn commit_message(self, version: &str) -> String {
        format!("Update {} {} locales", self.display_name(), version)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Edition::Java => "java",
            Edition::Bedrock => "bedrock",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_messages_name_the_edition() {
        assert_eq!(
            Edition::Bedrock.commit_message("1.21.0.3"),
            "Update Minecraft: Bedrock Edition 1.21.0.3 locales"
        );
        assert_eq!(
            Edition::Java.commit_message("1.20.4"),
            "Update Minecraft: Java Edition 1.20.4 locales"
        );
    }
}
