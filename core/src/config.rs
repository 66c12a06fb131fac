use crate::roster::LifecycleState;
use serde::{Deserialize, Serialize};

/// How an optional import column is interpreted once its raw text is known.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldParser {
    /// Kept verbatim; blank means absent.
    #[default]
    Text,
    /// Must parse as an integer > 0. Falls back to the field default
    /// instead of rejecting the row.
    PositiveInteger,
    /// Must name a lifecycle state. Unknown values reject the row.
    Lifecycle,
    /// Parsed as an integer id; unparsable values are dropped.
    Integer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionalField {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub parser: FieldParser,
}

impl OptionalField {
    pub fn text(name: &str) -> Self {
        Self { name: name.into(), default: None, parser: FieldParser::Text }
    }

    pub fn with_default(name: &str, default: &str, parser: FieldParser) -> Self {
        Self { name: name.into(), default: Some(default.into()), parser }
    }

    /// A configured default must itself pass the field's parser.
    fn check_default(&self) -> Result<(), String> {
        let Some(default) = self.default.as_deref() else {
            return match self.parser {
                FieldParser::PositiveInteger => Err("positive_integer fields need a default".into()),
                _ => Ok(()),
            };
        };
        match self.parser {
            FieldParser::Text => Ok(()),
            FieldParser::PositiveInteger => match default.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(()),
                _ => Err(format!("default '{default}' is not a positive integer")),
            },
            FieldParser::Lifecycle => default.parse::<LifecycleState>().map(|_| ()),
            FieldParser::Integer => default
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("default '{default}' is not an integer")),
        }
    }
}

/// Column contract for one kind of bulk import.
/// Required columns must be present in the header and non-blank on every row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportSchema {
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<OptionalField>,
}

impl ImportSchema {
    pub fn agents() -> Self {
        Self {
            required: vec!["name".into(), "phone".into(), "location".into()],
            optional: vec![
                OptionalField::text("email"),
                OptionalField::text("state"),
                OptionalField::with_default("language", "Hindi", FieldParser::Text),
                OptionalField::with_default("lifecycle_state", "dormant", FieldParser::Lifecycle),
                OptionalField::text("dormancy_reason"),
                OptionalField::text("license_number"),
                OptionalField::text("specialization"),
                OptionalField { name: "assigned_adm_id".into(), default: None, parser: FieldParser::Integer },
            ],
        }
    }

    pub fn adms() -> Self {
        Self {
            required: vec!["name".into(), "phone".into(), "region".into()],
            optional: vec![
                OptionalField::text("email"),
                OptionalField::with_default("language", "Hindi,English", FieldParser::Text),
                OptionalField::with_default("max_capacity", "50", FieldParser::PositiveInteger),
            ],
        }
    }
}

/// Operator-tunable knobs for the rebalancing engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalanceConfig {
    /// An ADM at or above this utilization (percent) is a candidate donor,
    /// provided it is also above the fleet average.
    pub overload_threshold_pct: f64,
    /// An ADM more than this many standard deviations above the mean is a
    /// candidate donor regardless of the fixed threshold.
    pub std_dev_factor: f64,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            overload_threshold_pct: 90.0,
            std_dev_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub agent_import: ImportSchema,
    pub adm_import: ImportSchema,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_import: ImportSchema::agents(),
            adm_import: ImportSchema::adms(),
            rebalance: RebalanceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, construct directly or use EngineConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (label, schema) in [("agent_import", &self.agent_import), ("adm_import", &self.adm_import)] {
            if schema.required.is_empty() {
                anyhow::bail!("{label}: at least one required field must be configured");
            }
            for field in &schema.optional {
                if let Err(reason) = field.check_default() {
                    anyhow::bail!("{label}.{}: {reason}", field.name);
                }
            }
        }
        if self.rebalance.std_dev_factor < 0.0 {
            anyhow::bail!("rebalance.std_dev_factor must not be negative");
        }
        Ok(())
    }
}
