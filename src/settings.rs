use std::path::Path;

use config::Config;
use serde::Deserialize;

use crate::error::ExtractError;
use crate::parser::provisions::{DecisionScope, DecisionWindow};
use crate::parser::ExtractOptions;

/// Layered settings: built-in defaults, then `compliance.toml` (or the file
/// given on the command line), then `ADU_*` environment variables, then flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub lookahead_chars: usize,
    pub decision_scope: DecisionScope,
    pub records_marker: String,
    pub narratives_marker: String,
    pub sources_marker: String,
}

/// Values set directly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub lookahead_chars: Option<usize>,
    pub decision_scope: Option<DecisionScope>,
}

impl Settings {
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self, ExtractError> {
        let defaults = ExtractOptions::default();
        let mut builder = Config::builder()
            .set_default("lookahead_chars", defaults.window.lookahead_chars as i64)?
            .set_default("decision_scope", defaults.window.scope.as_str())?
            .set_default("records_marker", defaults.records_marker)?
            .set_default("narratives_marker", defaults.narratives_marker)?
            .set_default("sources_marker", defaults.sources_marker)?;

        builder = match file {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("compliance").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("ADU"))
            .set_override_option(
                "lookahead_chars",
                overrides.lookahead_chars.map(|n| n as i64),
            )?
            .set_override_option(
                "decision_scope",
                overrides.decision_scope.map(|s| s.as_str()),
            )?
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            window: DecisionWindow {
                scope: self.decision_scope,
                lookahead_chars: self.lookahead_chars,
            },
            records_marker: self.records_marker.clone(),
            narratives_marker: self.narratives_marker.clone(),
            sources_marker: self.sources_marker.clone(),
        }
    }
}
