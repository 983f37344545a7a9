use std::{fs::File, path::Path};

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::{distribution::Money, engine::Options, members::ProrationPolicy};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    pub minimum: Option<Money>,
    #[serde(default)]
    pub adjusted: bool,
    #[serde(default)]
    pub proration: ProrationPolicy,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Configuration> {
        let file = File::open(path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Values given on the command line win over the file.
    pub fn options(
        &self,
        minimum: Option<Money>,
        adjusted: bool,
        proration: Option<ProrationPolicy>,
    ) -> Result<Options> {
        let minimum = minimum
            .or_else(|| self.minimum.clone())
            .ok_or_else(|| anyhow!("No minimum given, use --minimum or a configuration file"))?;

        Ok(Options::new(minimum)
            .adjusted(adjusted || self.adjusted)
            .proration(proration.unwrap_or(self.proration)))
    }
}
