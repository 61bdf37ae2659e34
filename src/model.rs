//! Structural view of a modulemd-packager document.
//!
//! The patched output always comes from the line-oriented scanner; this
//! model exists to enumerate build configurations and to prove, after the
//! edit, that the scanner and an equivalent structural edit agree. Any YAML
//! object model could stand in here; `serde_yaml` values are enough because
//! only the configurations list is ever touched.
use serde_yaml::{Mapping, Value};
use thiserror::Error;

const CONTEXT_KEY: &str = "context";
const PLATFORM_KEY: &str = "platform";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid YAML")]
    Yaml(#[from] serde_yaml::Error),
    #[error("not a modulemd-packager document")]
    UnknownVariant,
    #[error("this is a modulemd-v2 document")]
    ModulemdV2,
}

pub struct PackagerDocument {
    root: Value,
}

impl PackagerDocument {
    /// Parse the text and check it is a modulemd-packager document. A
    /// modulemd-v2 document is reported as its own variant because it has no
    /// configurations concept and callers may want to skip it.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let root: Value = serde_yaml::from_str(text)?;
        match root.get("document").and_then(Value::as_str) {
            Some("modulemd-packager") => Ok(Self { root }),
            Some("modulemd") => Err(ModelError::ModulemdV2),
            _ => Err(ModelError::UnknownVariant),
        }
    }

    pub fn build_configs(&self) -> impl Iterator<Item = &Mapping> {
        self.root
            .get("data")
            .and_then(|data| data.get("configurations"))
            .and_then(Value::as_sequence)
            .into_iter()
            .flatten()
            .filter_map(Value::as_mapping)
    }

    /// Contexts of all build configurations, in document order.
    pub fn contexts(&self) -> Vec<String> {
        self.build_configs().filter_map(config_context).collect()
    }

    pub fn add_build_config(&mut self, config: Mapping) {
        if let Some(configs) = self
            .root
            .get_mut("data")
            .and_then(|data| data.get_mut("configurations"))
            .and_then(Value::as_sequence_mut)
        {
            configs.push(Value::Mapping(config));
        }
    }

    /// Serialization used only for equivalence checks. Mandatory fields the
    /// comparison must ignore are forced to fixed values, context and
    /// platform scalars are stringified, mapping keys are sorted, and
    /// configurations are ordered by context, so two models serialize
    /// identically exactly when they describe the same document.
    pub fn normalized(&self) -> Result<String, serde_yaml::Error> {
        let mut root = self.root.clone();
        if let Some(data) = root.get_mut("data").and_then(Value::as_mapping_mut) {
            for field in ["summary", "description"] {
                data.insert(
                    Value::String(field.to_string()),
                    Value::String("dummy".to_string()),
                );
            }
            if let Some(configs) = data
                .get_mut("configurations")
                .and_then(Value::as_sequence_mut)
            {
                for config in configs.iter_mut() {
                    if let Some(config) = config.as_mapping_mut() {
                        stringify_scalar(config, CONTEXT_KEY);
                        stringify_scalar(config, PLATFORM_KEY);
                    }
                }
                configs.sort_by_key(|config| config.as_mapping().and_then(config_context));
            }
        }
        serde_yaml::to_string(&canonical(&root))
    }
}

/// Compare two documents by their normalized serializations.
pub fn equivalent(a: &PackagerDocument, b: &PackagerDocument) -> Result<bool, serde_yaml::Error> {
    Ok(a.normalized()? == b.normalized()?)
}

pub fn config_context(config: &Mapping) -> Option<String> {
    scalar_text(config.get(CONTEXT_KEY)?)
}

pub fn config_platform(config: &Mapping) -> Option<String> {
    scalar_text(config.get(PLATFORM_KEY)?)
}

/// Copy a template configuration with a new context and platform.
pub fn duplicate_config(template: &Mapping, new_context: &str, new_platform: &str) -> Mapping {
    let mut config = template.clone();
    config.insert(
        Value::String(CONTEXT_KEY.to_string()),
        Value::String(new_context.to_string()),
    );
    config.insert(
        Value::String(PLATFORM_KEY.to_string()),
        Value::String(new_platform.to_string()),
    );
    config
}

// YAML resolves an unquoted `context: 0` to an integer; the document treats
// contexts and platforms as opaque strings, so scalars compare as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(boolean) => Some(boolean.to_string()),
        _ => None,
    }
}

fn stringify_scalar(config: &mut Mapping, key: &str) {
    let Some(text) = config.get(key).and_then(scalar_text) else {
        return;
    };
    config.insert(Value::String(key.to_string()), Value::String(text));
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(Value, Value)> = map
                .iter()
                .map(|(key, value)| (key.clone(), canonical(value)))
                .collect();
            entries.sort_by_key(|(key, _)| key_text(key));
            Value::Mapping(entries.into_iter().collect())
        }
        Value::Sequence(sequence) => Value::Sequence(sequence.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

fn key_text(key: &Value) -> String {
    scalar_text(key).unwrap_or_default()
}
